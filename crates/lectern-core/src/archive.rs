//! In-memory session over the archive data: loaded records, search indexes,
//! lazily built suggestion pools, and the content renderer, behind one
//! handle.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use serde::Serialize;

use crate::bundles::{EventBundle, LoadReport, PaperBundle};
use crate::config::ArchiveConfig;
use crate::error::{LecternError, Result};
use crate::models::{ContentFormat, Meeting, Paper, Talk};
use crate::normalize::{normalize_paper, normalize_talk};
use crate::rank::{self, IndexedRecord, ScoredHit};
use crate::render::ContentRenderer;
use crate::suggest::{SuggestCatalog, SuggestionSet};

#[derive(Debug, Default)]
pub struct Archive {
    config: ArchiveConfig,
    renderer: ContentRenderer,
    talks: Vec<Talk>,
    papers: Vec<Paper>,
    indexed_talks: Vec<IndexedRecord>,
    indexed_papers: Vec<IndexedRecord>,
    talk_ids: HashMap<String, usize>,
    paper_ids: HashMap<String, usize>,
    meetings: Vec<Meeting>,
    event_data_version: Option<String>,
    paper_data_version: Option<String>,
    dropped_records: usize,
    suggestions: Option<SuggestCatalog>,
    suggest_generation: AtomicU64,
}

impl Archive {
    #[must_use]
    pub fn new(config: ArchiveConfig) -> Self {
        let renderer = ContentRenderer::new(config.render.clone());
        Self {
            config,
            renderer,
            ..Self::default()
        }
    }

    /// Ingests parsed event bundles. Records are normalized first; a record
    /// without an id or title is dropped, and a duplicate id keeps the first
    /// occurrence. The returned report folds in the per-bundle decode
    /// counters, with `loaded` meaning records actually retained.
    pub fn load_events(&mut self, bundles: Vec<EventBundle>) -> LoadReport {
        let mut report = LoadReport::default();
        for bundle in bundles {
            report.absorb(&bundle.report);
            self.register_meeting(bundle.meeting);
            for mut talk in bundle.talks {
                normalize_talk(&mut talk);
                if talk.id.is_empty() || talk.title.is_empty() {
                    tracing::warn!(
                        id = %talk.id,
                        title = %talk.title,
                        "dropping talk without id or title",
                    );
                    report.loaded -= 1;
                    report.record_drop(format!("talk missing id or title: {:?}", talk.id));
                    continue;
                }
                if self.talk_ids.contains_key(&talk.id) {
                    tracing::warn!(id = %talk.id, "dropping duplicate talk id");
                    report.loaded -= 1;
                    report.record_drop(format!("duplicate talk id: {}", talk.id));
                    continue;
                }
                self.indexed_talks.push(IndexedRecord::from_talk(&talk));
                self.talk_ids.insert(talk.id.clone(), self.talks.len());
                self.talks.push(talk);
            }
        }
        self.dropped_records += report.dropped;
        self.invalidate_suggestions();
        report
    }

    pub fn load_papers(&mut self, bundles: Vec<PaperBundle>) -> LoadReport {
        let mut report = LoadReport::default();
        for bundle in bundles {
            report.absorb(&bundle.report);
            for mut paper in bundle.papers {
                normalize_paper(&mut paper);
                if paper.id.is_empty() || paper.title.is_empty() {
                    tracing::warn!(
                        id = %paper.id,
                        title = %paper.title,
                        "dropping paper without id or title",
                    );
                    report.loaded -= 1;
                    report.record_drop(format!("paper missing id or title: {:?}", paper.id));
                    continue;
                }
                if self.paper_ids.contains_key(&paper.id) {
                    tracing::warn!(id = %paper.id, "dropping duplicate paper id");
                    report.loaded -= 1;
                    report.record_drop(format!("duplicate paper id: {}", paper.id));
                    continue;
                }
                self.indexed_papers.push(IndexedRecord::from_paper(&paper));
                self.paper_ids.insert(paper.id.clone(), self.papers.len());
                self.papers.push(paper);
            }
        }
        self.dropped_records += report.dropped;
        self.invalidate_suggestions();
        report
    }

    /// Ranked search across talks and papers merged into one result list.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<ScoredHit> {
        let mut hits = rank::rank_records(&self.indexed_talks, query, &self.config.rank);
        hits.extend(rank::rank_records(&self.indexed_papers, query, &self.config.rank));
        rank::sort_hits(&mut hits);
        hits
    }

    #[must_use]
    pub fn search_talks(&self, query: &str) -> Vec<ScoredHit> {
        rank::rank_records(&self.indexed_talks, query, &self.config.rank)
    }

    #[must_use]
    pub fn search_papers(&self, query: &str) -> Vec<ScoredHit> {
        rank::rank_records(&self.indexed_papers, query, &self.config.rank)
    }

    /// Autocomplete pools for a prefix or fragment. The catalog is built on
    /// first use and kept until a load invalidates it.
    pub fn suggestions(&mut self, query: &str) -> SuggestionSet {
        if self.suggestions.is_none() {
            let stamp = self.begin_suggestion_build();
            let catalog = self.build_suggestion_catalog();
            self.commit_suggestions(stamp, catalog);
        }
        match &self.suggestions {
            Some(catalog) => catalog.lookup(query),
            None => SuggestionSet::default(),
        }
    }

    /// Starts a suggestion build and returns its generation stamp. Loads bump
    /// the generation, so a build begun before a load commits as stale.
    pub fn begin_suggestion_build(&self) -> u64 {
        self.suggest_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn build_suggestion_catalog(&self) -> SuggestCatalog {
        SuggestCatalog::build(&self.talks, &self.papers, self.config.suggest.topic_cap)
    }

    /// Installs a built catalog unless a newer build or load superseded the
    /// stamp. Returns whether the catalog was installed.
    pub fn commit_suggestions(&mut self, stamp: u64, catalog: SuggestCatalog) -> bool {
        if self.suggest_generation.load(Ordering::SeqCst) != stamp {
            return false;
        }
        self.suggestions = Some(catalog);
        true
    }

    /// Drops the memoized catalog and bumps the generation so in-flight
    /// builds cannot commit. Loads call this automatically.
    pub fn invalidate_suggestions(&mut self) {
        self.suggest_generation.fetch_add(1, Ordering::SeqCst);
        self.suggestions = None;
    }

    #[must_use]
    pub fn talk(&self, id: &str) -> Option<&Talk> {
        self.talk_ids.get(id).map(|&index| &self.talks[index])
    }

    #[must_use]
    pub fn paper(&self, id: &str) -> Option<&Paper> {
        self.paper_ids.get(id).map(|&index| &self.papers[index])
    }

    #[must_use]
    pub fn talks(&self) -> &[Talk] {
        &self.talks
    }

    #[must_use]
    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    #[must_use]
    pub fn meetings(&self) -> &[Meeting] {
        &self.meetings
    }

    /// Renders a record's long-form content to sanitized HTML. A record with
    /// no content renders as an empty string; an unknown id is an error.
    pub fn render_record(&self, id: &str) -> Result<String> {
        if let Some(talk) = self.talk(id) {
            return Ok(self.render_optional(talk.content.as_deref(), talk.content_format));
        }
        if let Some(paper) = self.paper(id) {
            return Ok(self.render_optional(paper.content.as_deref(), paper.content_format));
        }
        Err(LecternError::NotFound(format!("record {id}")))
    }

    /// Renders a free-standing content blob with this session's policy.
    #[must_use]
    pub fn render_fragment(&self, raw: &str, format: ContentFormat) -> String {
        self.renderer.render(raw, format)
    }

    fn render_optional(&self, content: Option<&str>, format: Option<ContentFormat>) -> String {
        match content {
            Some(raw) => self.renderer.render(raw, format.unwrap_or_default()),
            None => String::new(),
        }
    }

    pub fn set_event_data_version(&mut self, version: String) {
        if !version.is_empty() {
            self.event_data_version = Some(version);
        }
    }

    pub fn set_paper_data_version(&mut self, version: String) {
        if !version.is_empty() {
            self.paper_data_version = Some(version);
        }
    }

    #[must_use]
    pub fn stats(&self) -> ArchiveStats {
        let blog_posts = self.papers.iter().filter(|paper| paper.is_blog()).count();
        let mut meeting_slugs: HashSet<&str> = self
            .meetings
            .iter()
            .map(|meeting| meeting.slug.as_str())
            .collect();
        meeting_slugs.extend(
            self.talks
                .iter()
                .map(|talk| talk.meeting.as_str())
                .filter(|slug| !slug.is_empty()),
        );
        ArchiveStats {
            talks: self.talks.len(),
            papers: self.papers.len() - blog_posts,
            blog_posts,
            meetings: meeting_slugs.len(),
            dropped_records: self.dropped_records,
            event_data_version: self.event_data_version.clone(),
            paper_data_version: self.paper_data_version.clone(),
            data_date: self.data_date(),
            suggestions_built: self.suggestions.is_some(),
        }
    }

    /// Latest date stamp parseable from the bundle versions, e.g.
    /// `2025-08-24-auto-sync-devmtg` carries 2025-08-24.
    fn data_date(&self) -> Option<NaiveDate> {
        [&self.event_data_version, &self.paper_data_version]
            .into_iter()
            .flatten()
            .filter_map(|version| leading_date(version))
            .max()
    }

    fn register_meeting(&mut self, meeting: Meeting) {
        if meeting.slug.is_empty() {
            return;
        }
        if self.meetings.iter().any(|known| known.slug == meeting.slug) {
            return;
        }
        self.meetings.push(meeting);
    }
}

fn leading_date(version: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(version.get(..10)?, "%Y-%m-%d").ok()
}

/// Counters for the `stats` surface. Papers and blog posts are disjoint:
/// blog entries ride in the paper bundles but report separately.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStats {
    pub talks: usize,
    pub papers: usize,
    pub blog_posts: usize,
    pub meetings: usize,
    pub dropped_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_data_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_data_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_date: Option<NaiveDate>,
    pub suggestions_built: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundles::{parse_event_bundle, parse_paper_bundle};

    fn event_archive() -> Archive {
        let raw = r#"{
            "meeting": {"slug": "2022-10", "name": "2022 LLVM Developers' Meeting"},
            "talks": [
                {"id": "2022-10-001", "meeting": "2022-10", "title": "Clang Static Analysis",
                 "abstract": "Finding bugs.", "tags": ["Clang"]},
                {"id": "2022-10-002", "meeting": "2022-10", "title": "Adventures in Clang"},
                {"id": "", "title": "Ghost Talk"},
                {"id": "2022-10-001", "meeting": "2022-10", "title": "Duplicate Id"}
            ]
        }"#;
        let mut archive = Archive::default();
        let report = archive.load_events(vec![parse_event_bundle(raw).expect("bundle")]);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.dropped, 2);
        archive
    }

    #[test]
    fn load_drops_invalid_and_duplicate_records() {
        let archive = event_archive();
        assert_eq!(archive.talks().len(), 2);
        assert_eq!(archive.stats().dropped_records, 2);
        assert_eq!(
            archive.talk("2022-10-001").expect("talk").title,
            "Clang Static Analysis",
        );
    }

    #[test]
    fn search_merges_talks_and_papers() {
        let mut archive = event_archive();
        let papers = r#"{
            "papers": [
                {"id": "p-1", "title": "Clang Frontend Internals", "year": 2019, "type": "paper"}
            ]
        }"#;
        archive.load_papers(vec![parse_paper_bundle(papers).expect("bundle")]);
        let hits = archive.search("clang");
        assert_eq!(hits.len(), 3);
        // Both title-prefix hits outrank the containment hit; the paper's
        // lower recency nudge puts it second.
        assert_eq!(hits[0].id.as_ref(), "2022-10-001");
        assert_eq!(hits[1].id.as_ref(), "p-1");
        assert_eq!(hits[2].id.as_ref(), "2022-10-002");
        assert_eq!(archive.search_talks("clang").len(), 2);
        assert_eq!(archive.search_papers("clang").len(), 1);
    }

    #[test]
    fn render_record_distinguishes_empty_from_missing() {
        let raw = r##"{
            "meeting": {"slug": "2023-10", "name": "Meeting"},
            "talks": [
                {"id": "t-1", "title": "Has Content", "content": "# Hi", "contentFormat": "markdown"},
                {"id": "t-2", "title": "No Content"}
            ]
        }"##;
        let mut archive = Archive::default();
        archive.load_events(vec![parse_event_bundle(raw).expect("bundle")]);
        assert_eq!(archive.render_record("t-1").expect("render"), "<h1>Hi</h1>");
        assert_eq!(archive.render_record("t-2").expect("render"), "");
        let missing = archive.render_record("nope").expect_err("missing id");
        assert_eq!(missing.code(), "NOT_FOUND");
    }

    #[test]
    fn suggestions_build_lazily_and_loads_invalidate() {
        let mut archive = event_archive();
        assert!(!archive.stats().suggestions_built);
        let first = archive.suggestions("cla");
        assert!(!first.topics.is_empty());
        assert!(archive.stats().suggestions_built);

        let papers = r#"{"papers": [{"id": "p-1", "title": "Clang Paper", "type": "paper"}]}"#;
        archive.load_papers(vec![parse_paper_bundle(papers).expect("bundle")]);
        assert!(!archive.stats().suggestions_built);
    }

    #[test]
    fn stale_suggestion_builds_are_discarded() {
        let mut archive = event_archive();
        let stale_stamp = archive.begin_suggestion_build();
        let stale_catalog = archive.build_suggestion_catalog();
        // A load supersedes the build in flight.
        archive.load_papers(Vec::new());
        assert!(!archive.commit_suggestions(stale_stamp, stale_catalog));
        assert!(!archive.stats().suggestions_built);

        let fresh_stamp = archive.begin_suggestion_build();
        let fresh_catalog = archive.build_suggestion_catalog();
        assert!(archive.commit_suggestions(fresh_stamp, fresh_catalog));
        assert!(archive.stats().suggestions_built);
    }

    #[test]
    fn stats_separate_papers_from_blog_posts() {
        let mut archive = event_archive();
        let papers = r#"{
            "papers": [
                {"id": "p-1", "title": "A Paper", "type": "paper"},
                {"id": "b-1", "title": "A Post", "type": "blog-post"}
            ]
        }"#;
        archive.load_papers(vec![parse_paper_bundle(papers).expect("bundle")]);
        archive.set_event_data_version("2025-08-24-auto-sync-devmtg".to_string());
        archive.set_paper_data_version("2025-07-01-auto-sync-papers".to_string());

        let stats = archive.stats();
        assert_eq!(stats.talks, 2);
        assert_eq!(stats.papers, 1);
        assert_eq!(stats.blog_posts, 1);
        assert_eq!(stats.meetings, 1);
        assert_eq!(
            stats.data_date,
            NaiveDate::from_ymd_opt(2025, 8, 24),
        );
    }

    #[test]
    fn fragment_rendering_uses_session_policy() {
        let archive = Archive::default();
        let html = archive.render_fragment("[x](slides.html)", ContentFormat::Markdown);
        assert!(html.contains("https://llvm.org/devmtg/slides.html"), "{html}");
    }
}
