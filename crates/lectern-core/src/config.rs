use url::Url;

use crate::error::{LecternError, Result};
use crate::rank::RankWeights;

const ENV_RANK_TITLE_PREFIX: &str = "LECTERN_RANK_TITLE_PREFIX";
const ENV_RANK_TITLE_CONTAINS: &str = "LECTERN_RANK_TITLE_CONTAINS";
const ENV_RANK_SPEAKER: &str = "LECTERN_RANK_SPEAKER";
const ENV_RANK_TAG: &str = "LECTERN_RANK_TAG";
const ENV_RANK_ABSTRACT: &str = "LECTERN_RANK_ABSTRACT";
const ENV_RANK_MEETING: &str = "LECTERN_RANK_MEETING";
const ENV_RANK_CATEGORY: &str = "LECTERN_RANK_CATEGORY";
const ENV_RANK_RECENCY: &str = "LECTERN_RANK_RECENCY";
const ENV_SUGGEST_TOPIC_CAP: &str = "LECTERN_SUGGEST_TOPIC_CAP";
const ENV_RENDER_BASE_URL: &str = "LECTERN_RENDER_BASE_URL";

/// Relative links in archived content resolve against the devmtg tree.
pub const DEFAULT_BASE_URL: &str = "https://llvm.org/devmtg/";

#[derive(Debug, Clone, Default)]
pub struct ArchiveConfig {
    pub rank: RankWeights,
    pub suggest: SuggestConfig,
    pub render: RenderConfig,
}

impl ArchiveConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rank: rank_weights_from_env()?,
            suggest: SuggestConfig::from_env()?,
            render: RenderConfig::from_env()?,
        })
    }

    /// Replaces the render base URL, validating the raw value the same way
    /// the environment override does.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        self.render.base_url = Url::parse(raw.trim())
            .map_err(|err| LecternError::InvalidUrl(format!("{raw} ({err})")))?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuggestConfig {
    /// Per-record topic extraction cap; `None` means unbounded.
    pub topic_cap: Option<usize>,
}

impl SuggestConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            topic_cap: parse_topic_cap(std::env::var(ENV_SUGGEST_TOPIC_CAP).ok().as_deref())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub base_url: Url,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url parses"),
        }
    }
}

impl RenderConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(std::env::var(ENV_RENDER_BASE_URL).ok().as_deref())?,
        })
    }
}

fn rank_weights_from_env() -> Result<RankWeights> {
    let defaults = RankWeights::default();
    Ok(RankWeights {
        title_prefix: read_weight(ENV_RANK_TITLE_PREFIX, defaults.title_prefix)?,
        title_contains: read_weight(ENV_RANK_TITLE_CONTAINS, defaults.title_contains)?,
        speaker: read_weight(ENV_RANK_SPEAKER, defaults.speaker)?,
        tag: read_weight(ENV_RANK_TAG, defaults.tag)?,
        abstract_text: read_weight(ENV_RANK_ABSTRACT, defaults.abstract_text)?,
        meeting: read_weight(ENV_RANK_MEETING, defaults.meeting)?,
        category: read_weight(ENV_RANK_CATEGORY, defaults.category)?,
        recency_per_year: read_weight(ENV_RANK_RECENCY, defaults.recency_per_year)?,
    })
}

fn read_weight(name: &str, default_value: f32) -> Result<f32> {
    parse_weight(name, std::env::var(name).ok().as_deref(), default_value)
}

fn parse_weight(name: &str, raw: Option<&str>, default_value: f32) -> Result<f32> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(default_value);
    };
    let parsed = value.parse::<f32>().map_err(|_| {
        LecternError::Validation(format!("invalid {name}: {value} (expected a number)"))
    })?;
    if !parsed.is_finite() {
        return Err(LecternError::Validation(format!(
            "invalid {name}: {value} (expected a finite number)"
        )));
    }
    Ok(parsed)
}

fn parse_topic_cap(raw: Option<&str>) -> Result<Option<usize>> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let parsed = value.parse::<usize>().map_err(|_| {
        LecternError::Validation(format!(
            "invalid {ENV_SUGGEST_TOPIC_CAP}: {value} (expected a positive integer)"
        ))
    })?;
    if parsed == 0 {
        return Err(LecternError::Validation(format!(
            "invalid {ENV_SUGGEST_TOPIC_CAP}: 0 (expected a positive integer)"
        )));
    }
    Ok(Some(parsed))
}

fn parse_base_url(raw: Option<&str>) -> Result<Url> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(RenderConfig::default().base_url);
    };
    Url::parse(value)
        .map_err(|err| LecternError::InvalidUrl(format!("{ENV_RENDER_BASE_URL}: {value} ({err})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_parser_defaults_when_unset_or_blank() {
        assert_eq!(parse_weight("X", None, 12.5).expect("default"), 12.5);
        assert_eq!(parse_weight("X", Some("  "), 12.5).expect("blank"), 12.5);
    }

    #[test]
    fn weight_parser_accepts_numbers_and_rejects_garbage() {
        assert_eq!(parse_weight("X", Some("42.5"), 0.0).expect("number"), 42.5);
        assert!(parse_weight("X", Some("heavy"), 0.0).is_err());
        assert!(parse_weight("X", Some("NaN"), 0.0).is_err());
    }

    #[test]
    fn topic_cap_parser_rejects_zero_and_garbage() {
        assert_eq!(parse_topic_cap(None).expect("unset"), None);
        assert_eq!(parse_topic_cap(Some("8")).expect("cap"), Some(8));
        assert!(parse_topic_cap(Some("0")).is_err());
        assert!(parse_topic_cap(Some("many")).is_err());
    }

    #[test]
    fn base_url_parser_defaults_and_validates() {
        let defaulted = parse_base_url(None).expect("default");
        assert_eq!(defaulted.as_str(), DEFAULT_BASE_URL);
        assert!(parse_base_url(Some("https://archive.example.org/")).is_ok());
        assert!(parse_base_url(Some("not a url")).is_err());
    }
}
