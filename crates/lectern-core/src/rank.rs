use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{Paper, RecordKind, Talk};
use crate::normalize::tokenize_query;

const W_TITLE_PREFIX: f32 = 100.0;
const W_TITLE_CONTAINS: f32 = 50.0;
const W_SPEAKER: f32 = 30.0;
const W_TAG: f32 = 15.0;
const W_ABSTRACT: f32 = 10.0;
const W_MEETING: f32 = 5.0;
const W_CATEGORY: f32 = 5.0;
const W_RECENCY_PER_YEAR: f32 = 0.1;

/// Records with no parseable year rank as if from the first archived meeting.
pub const BASELINE_YEAR: i32 = 2007;

/// Field weights for [`score_record`]. The defaults are the tuned archive
/// values; they are plain data so deployments can adjust them via
/// configuration without a rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankWeights {
    pub title_prefix: f32,
    pub title_contains: f32,
    pub speaker: f32,
    pub tag: f32,
    pub abstract_text: f32,
    pub meeting: f32,
    pub category: f32,
    pub recency_per_year: f32,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            title_prefix: W_TITLE_PREFIX,
            title_contains: W_TITLE_CONTAINS,
            speaker: W_SPEAKER,
            tag: W_TAG,
            abstract_text: W_ABSTRACT,
            meeting: W_MEETING,
            category: W_CATEGORY,
            recency_per_year: W_RECENCY_PER_YEAR,
        }
    }
}

/// Lowercased projection of a talk or paper used for matching. Derived once
/// at load time, never serialized; display data stays on the source record.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub id: Arc<str>,
    pub kind: RecordKind,
    pub title: Arc<str>,
    /// Sort key for chronological ordering: meeting slug for talks, the
    /// publication year rendered as text for papers.
    pub collection_key: Arc<str>,
    pub year: i32,
    title_lower: String,
    speakers_lower: Vec<String>,
    tags_lower: Vec<String>,
    abstract_lower: String,
    meeting_lower: String,
    category_lower: String,
}

impl IndexedRecord {
    #[must_use]
    pub fn from_talk(talk: &Talk) -> Self {
        let meeting_text = format!("{} {}", talk.meeting, talk.meeting_name);
        Self {
            id: Arc::from(talk.id.as_str()),
            kind: RecordKind::Talk,
            title: Arc::from(talk.title.as_str()),
            collection_key: Arc::from(talk.meeting.as_str()),
            year: talk.meeting_year().unwrap_or(BASELINE_YEAR),
            title_lower: talk.title.to_lowercase(),
            speakers_lower: talk
                .speakers
                .iter()
                .map(|speaker| speaker.name.to_lowercase())
                .collect(),
            tags_lower: talk.tags.iter().map(|tag| tag.to_lowercase()).collect(),
            abstract_lower: talk.abstract_text.to_lowercase(),
            meeting_lower: meeting_text.trim().to_lowercase(),
            category_lower: talk.category.to_lowercase(),
        }
    }

    #[must_use]
    pub fn from_paper(paper: &Paper) -> Self {
        let year = paper.year.unwrap_or(BASELINE_YEAR);
        let collection_key = paper.year.map(|y| y.to_string()).unwrap_or_default();
        let mut tags_lower = paper
            .tags
            .iter()
            .map(|tag| tag.to_lowercase())
            .collect::<Vec<_>>();
        tags_lower.extend(paper.keywords.iter().map(|kw| kw.to_lowercase()));
        Self {
            id: Arc::from(paper.id.as_str()),
            kind: RecordKind::Paper,
            title: Arc::from(paper.title.as_str()),
            collection_key: Arc::from(collection_key.as_str()),
            year,
            title_lower: paper.title.to_lowercase(),
            speakers_lower: paper
                .authors
                .iter()
                .map(|author| author.name.to_lowercase())
                .collect(),
            tags_lower,
            abstract_lower: paper.abstract_text.to_lowercase(),
            meeting_lower: paper.venue.to_lowercase(),
            category_lower: paper.record_type.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub id: Arc<str>,
    pub kind: RecordKind,
    pub title: Arc<str>,
    pub collection_key: Arc<str>,
    pub score: f32,
}

impl ScoredHit {
    fn from_record(record: &IndexedRecord, score: f32) -> Self {
        Self {
            id: Arc::clone(&record.id),
            kind: record.kind,
            title: Arc::clone(&record.title),
            collection_key: Arc::clone(&record.collection_key),
            score,
        }
    }
}

/// Per-record score for one tokenized query. Token contributions are summed
/// across fields; the title counts once, preferring the prefix weight. A
/// token that matches no field at all zeroes the record ("all tokens must
/// match somewhere"). Matching records get a recency nudge on top.
#[must_use]
pub fn score_record(record: &IndexedRecord, tokens: &[String], weights: &RankWeights) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }

    let mut total = 0.0f32;
    for token in tokens {
        let mut token_score = 0.0f32;
        if record.title_lower.starts_with(token.as_str()) {
            token_score += weights.title_prefix;
        } else if record.title_lower.contains(token.as_str()) {
            token_score += weights.title_contains;
        }
        if record
            .speakers_lower
            .iter()
            .any(|name| name.contains(token.as_str()))
        {
            token_score += weights.speaker;
        }
        if record
            .tags_lower
            .iter()
            .any(|tag| tag.contains(token.as_str()))
        {
            token_score += weights.tag;
        }
        if record.abstract_lower.contains(token.as_str()) {
            token_score += weights.abstract_text;
        }
        if record.meeting_lower.contains(token.as_str()) {
            token_score += weights.meeting;
        }
        if record.category_lower.contains(token.as_str()) {
            token_score += weights.category;
        }
        if token_score == 0.0 {
            return 0.0;
        }
        total += token_score;
    }

    total + recency_nudge(record.year, weights)
}

fn recency_nudge(year: i32, weights: &RankWeights) -> f32 {
    i32_to_f32(year - BASELINE_YEAR) * weights.recency_per_year
}

/// Ranks records against a query string. An empty (or all-discarded) query
/// returns every record in reverse-chronological collection order; otherwise
/// only records with a positive score survive, ordered by score, then newest
/// collection, then id, then title. The result is fully deterministic for a
/// given input set.
#[must_use]
pub fn rank_records(
    records: &[IndexedRecord],
    query: &str,
    weights: &RankWeights,
) -> Vec<ScoredHit> {
    let tokens = tokenize_query(query);
    let mut hits = Vec::new();

    if tokens.is_empty() {
        for record in records {
            hits.push(ScoredHit::from_record(record, 0.0));
        }
        hits.sort_by(hit_ordering);
        return hits;
    }

    for record in records {
        let score = score_record(record, &tokens, weights);
        if score > 0.0 {
            hits.push(ScoredHit::from_record(record, score));
        }
    }
    hits.sort_by(hit_ordering);
    hits
}

fn hit_ordering(a: &ScoredHit, b: &ScoredHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.collection_key.cmp(&a.collection_key))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.title.cmp(&b.title))
}

/// Re-sorts hits with the ranking comparator. Used when hit lists ranked
/// per collection are merged into one result set.
pub fn sort_hits(hits: &mut [ScoredHit]) {
    hits.sort_by(hit_ordering);
}

#[allow(
    clippy::cast_precision_loss,
    reason = "ranking nudges are intentionally lossy floating-point values"
)]
const fn i32_to_f32(value: i32) -> f32 {
    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Person;

    fn talk(id: &str, title: &str, tags: &[&str], meeting: &str) -> Talk {
        Talk {
            id: id.to_string(),
            title: title.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            meeting: meeting.to_string(),
            ..Talk::default()
        }
    }

    fn indexed(talks: &[Talk]) -> Vec<IndexedRecord> {
        talks.iter().map(IndexedRecord::from_talk).collect()
    }

    #[test]
    fn title_prefix_outweighs_title_containment() {
        let records = indexed(&[
            talk("a", "Clang Static Analysis", &[], "2022-10"),
            talk("b", "Adventures in Clang", &[], "2022-10"),
        ]);
        let hits = rank_records(&records, "clang", &RankWeights::default());
        assert_eq!(hits[0].id.as_ref(), "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn every_token_must_match_somewhere() {
        let records = indexed(&[talk("a", "Clang Static Analysis", &["Clang"], "2022-10")]);
        let weights = RankWeights::default();
        assert!(rank_records(&records, "clang", &weights).len() == 1);
        assert!(rank_records(&records, "clang zebra", &weights).is_empty());
    }

    #[test]
    fn matching_fields_sum_with_recency_nudge() {
        // Title prefix (100) + tag (15) for one token, meeting 2022 adds
        // (2022 - 2007) * 0.1 = 1.5.
        let records = indexed(&[
            talk("a", "Clang Static Analysis", &["Clang"], "2022-10"),
            talk("b", "MLIR Basics", &["MLIR"], "2023-10"),
        ]);
        let hits = rank_records(&records, "clang", &RankWeights::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_ref(), "a");
        assert!((hits[0].score - 116.5).abs() < 1e-3);
    }

    #[test]
    fn empty_query_returns_all_records_newest_meeting_first() {
        let records = indexed(&[
            talk("a", "Clang Static Analysis", &["Clang"], "2022-10"),
            talk("b", "MLIR Basics", &["MLIR"], "2023-10"),
        ]);
        let hits = rank_records(&records, "", &RankWeights::default());
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_ref()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn empty_query_fallback_preserves_record_count() {
        let records = indexed(&[
            talk("a", "One", &[], "2019-10"),
            talk("b", "Two", &[], "2021-10"),
            talk("c", "Three", &[], "2015-04"),
        ]);
        let hits = rank_records(&records, "  a ", &RankWeights::default());
        assert_eq!(hits.len(), records.len());
    }

    #[test]
    fn equal_scores_break_ties_by_meeting_then_id() {
        let records = indexed(&[
            talk("b", "Clang Tidy", &[], "2020-10"),
            talk("a", "Clang Tidy", &[], "2020-10"),
            talk("c", "Clang Tidy", &[], "2021-10"),
        ]);
        let hits = rank_records(&records, "clang", &RankWeights::default());
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_ref()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn ranking_is_deterministic_across_runs() {
        let records = indexed(&[
            talk("a", "Clang Static Analysis", &["Clang"], "2022-10"),
            talk("b", "Clang Modules", &["Clang"], "2022-10"),
            talk("c", "Adventures in Clang", &["tools"], "2018-10"),
        ]);
        let weights = RankWeights::default();
        let first = rank_records(&records, "clang", &weights);
        let second = rank_records(&records, "clang", &weights);
        let first_ids: Vec<&str> = first.iter().map(|hit| hit.id.as_ref()).collect();
        let second_ids: Vec<&str> = second.iter().map(|hit| hit.id.as_ref()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn speaker_and_author_names_match_on_substrings() {
        let mut talk_record = talk("a", "Untitled Session", &[], "2022-10");
        talk_record.speakers = vec![Person {
            name: "Grace Hopper".to_string(),
            ..Person::default()
        }];
        let records = indexed(std::slice::from_ref(&talk_record));
        let hits = rank_records(&records, "hopper", &RankWeights::default());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - (30.0 + 1.5)).abs() < 1e-3);
    }

    #[test]
    fn quoted_phrase_matches_as_one_token() {
        let records = indexed(&[
            talk("a", "Machine Learning in LLVM", &[], "2022-10"),
            talk("b", "Learning Machine Models", &[], "2022-10"),
        ]);
        let hits = rank_records(&records, r#""machine learning""#, &RankWeights::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_ref(), "a");
    }

    #[test]
    fn paper_records_use_year_as_collection_key() {
        let paper = Paper {
            id: "p-1".to_string(),
            title: "Polyhedral Optimizations".to_string(),
            year: Some(2019),
            ..Paper::default()
        };
        let record = IndexedRecord::from_paper(&paper);
        assert_eq!(record.collection_key.as_ref(), "2019");
        assert_eq!(record.year, 2019);
        assert_eq!(record.kind, RecordKind::Paper);
    }
}
