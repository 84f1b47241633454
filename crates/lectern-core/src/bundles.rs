//! Tolerant parsing for the archive's JSON data bundles. A bundle only
//! errors as a whole when its JSON does not parse at all; individual records
//! that fail to decode are skipped and counted, so one bad entry never loses
//! a whole meeting.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{EventManifest, Meeting, Paper, PaperManifest, Talk};

/// Outcome counters for one load pass.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub dropped: usize,
    /// First per-record failure, kept for diagnostics; later ones are only
    /// counted.
    pub first_error: Option<String>,
}

impl LoadReport {
    pub fn absorb(&mut self, other: &LoadReport) {
        self.loaded += other.loaded;
        self.dropped += other.dropped;
        if self.first_error.is_none() {
            self.first_error = other.first_error.clone();
        }
    }

    pub(crate) fn record_drop(&mut self, context: String) {
        self.dropped += 1;
        if self.first_error.is_none() {
            self.first_error = Some(context);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawEventBundle {
    meeting: Meeting,
    talks: Vec<Value>,
}

/// One parsed event file: the meeting header plus every talk that decoded.
#[derive(Debug, Clone)]
pub struct EventBundle {
    pub meeting: Meeting,
    pub talks: Vec<Talk>,
    pub report: LoadReport,
}

pub fn parse_event_bundle(raw: &str) -> Result<EventBundle> {
    let bundle: RawEventBundle = serde_json::from_str(raw)?;
    let mut report = LoadReport::default();
    let mut talks = Vec::with_capacity(bundle.talks.len());
    for (index, value) in bundle.talks.into_iter().enumerate() {
        match serde_json::from_value::<Talk>(value) {
            Ok(talk) => {
                talks.push(talk);
                report.loaded += 1;
            }
            Err(err) => {
                tracing::warn!(
                    meeting = %bundle.meeting.slug,
                    index,
                    %err,
                    "skipping undecodable talk record",
                );
                report.record_drop(format!(
                    "talk {index} in {}: {err}",
                    bundle.meeting.slug,
                ));
            }
        }
    }
    Ok(EventBundle {
        meeting: bundle.meeting,
        talks,
        report,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPaperBundle {
    papers: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct PaperBundle {
    pub papers: Vec<Paper>,
    pub report: LoadReport,
}

pub fn parse_paper_bundle(raw: &str) -> Result<PaperBundle> {
    let bundle: RawPaperBundle = serde_json::from_str(raw)?;
    let mut report = LoadReport::default();
    let mut papers = Vec::with_capacity(bundle.papers.len());
    for (index, value) in bundle.papers.into_iter().enumerate() {
        match serde_json::from_value::<Paper>(value) {
            Ok(paper) => {
                papers.push(paper);
                report.loaded += 1;
            }
            Err(err) => {
                tracing::warn!(index, %err, "skipping undecodable paper record");
                report.record_drop(format!("paper {index}: {err}"));
            }
        }
    }
    Ok(PaperBundle { papers, report })
}

pub fn parse_event_manifest(raw: &str) -> Result<EventManifest> {
    Ok(serde_json::from_str(raw)?)
}

pub fn parse_paper_manifest(raw: &str) -> Result<PaperManifest> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bundle_skips_bad_records_and_counts_them() {
        let raw = r#"{
            "meeting": {"slug": "2022-10", "name": "Dev Meeting"},
            "talks": [
                {"id": "2022-10-001", "title": "Good Talk"},
                {"id": "2022-10-002", "title": "Bad Talk", "speakers": "oops"},
                {"id": "2022-10-003", "title": "Another Good Talk"}
            ]
        }"#;
        let bundle = parse_event_bundle(raw).expect("bundle");
        assert_eq!(bundle.meeting.slug, "2022-10");
        assert_eq!(bundle.talks.len(), 2);
        assert_eq!(bundle.report.loaded, 2);
        assert_eq!(bundle.report.dropped, 1);
        let first_error = bundle.report.first_error.expect("first error");
        assert!(first_error.contains("talk 1 in 2022-10"), "{first_error}");
    }

    #[test]
    fn unparseable_bundle_is_a_whole_file_error() {
        assert!(parse_event_bundle("{not json").is_err());
        assert!(parse_paper_bundle("null").is_err());
    }

    #[test]
    fn paper_bundle_tolerates_missing_papers_key() {
        let bundle = parse_paper_bundle("{}").expect("bundle");
        assert!(bundle.papers.is_empty());
        assert_eq!(bundle.report.loaded, 0);
    }

    #[test]
    fn manifests_parse_data_version_and_file_lists() {
        let manifest = parse_event_manifest(
            r#"{"dataVersion": "2025-08-24-auto-sync", "eventFiles": ["2022-10.json"]}"#,
        )
        .expect("manifest");
        assert_eq!(manifest.data_version, "2025-08-24-auto-sync");
        assert_eq!(manifest.event_files, vec!["2022-10.json"]);

        let papers = parse_paper_manifest(r#"{"dataVersion": "v", "paperFiles": []}"#)
            .expect("manifest");
        assert!(papers.paper_files.is_empty());
    }

    #[test]
    fn reports_merge_keeping_earliest_error() {
        let mut first = LoadReport {
            loaded: 2,
            ..LoadReport::default()
        };
        first.record_drop("one".to_string());
        let mut second = LoadReport {
            loaded: 1,
            ..LoadReport::default()
        };
        second.record_drop("two".to_string());

        let mut total = LoadReport::default();
        total.absorb(&first);
        total.absorb(&second);
        assert_eq!(total.loaded, 3);
        assert_eq!(total.dropped, 2);
        assert_eq!(total.first_error.as_deref(), Some("one"));
    }
}
