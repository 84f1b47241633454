use serde::{Deserialize, Serialize};

/// Talk/session categories used by the archive data files. Free text is
/// tolerated on the wire; this list is what the sync pipeline emits.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "keynote",
    "technical-talk",
    "student-talk",
    "tutorial",
    "panel",
    "quick-talk",
    "lightning-talk",
    "bof",
    "poster",
    "workshop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Talk,
    Paper,
}

impl RecordKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Talk => "talk",
            Self::Paper => "paper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Html,
    #[default]
    Markdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Person {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Talk {
    pub id: String,
    /// Meeting slug, `YYYY-MM` or `YYYY-MM-DD`.
    pub meeting: String,
    pub meeting_name: String,
    pub meeting_location: String,
    pub meeting_date: String,
    pub category: String,
    pub title: String,
    pub speakers: Vec<Person>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_github: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_format: Option<ContentFormat>,
}

impl Talk {
    /// Year from the meeting slug prefix, when one is present.
    #[must_use]
    pub fn meeting_year(&self) -> Option<i32> {
        let prefix = self.meeting.get(..4)?;
        prefix.parse::<i32>().ok()
    }

    /// Whitespace-flattened abstract preview for list output.
    #[must_use]
    pub fn abstract_snippet(&self, max_chars: usize) -> String {
        crate::text::truncate_text(&crate::text::collapse_ws(&self.abstract_text), max_chars)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Vec<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub venue: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openalex_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
    pub source: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_format: Option<ContentFormat>,
}

impl Paper {
    /// Blog entries ship in the paper bundles and are told apart by their
    /// declared work type alone; the feed source string is informational.
    #[must_use]
    pub fn is_blog(&self) -> bool {
        matches!(self.record_type.as_str(), "blog-post" | "blog")
    }

    /// Whitespace-flattened abstract preview for list output.
    #[must_use]
    pub fn abstract_snippet(&self, max_chars: usize) -> String {
        crate::text::truncate_text(&crate::text::collapse_ws(&self.abstract_text), max_chars)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Meeting {
    pub slug: String,
    pub name: String,
    pub date: String,
    pub location: String,
    pub canceled: bool,
    pub talk_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventManifest {
    /// Freshness stamp, e.g. `2025-08-24-auto-sync-devmtg`.
    pub data_version: String,
    pub event_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaperManifest {
    pub data_version: String,
    pub paper_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn talk_deserializes_camel_case_data_fields() {
        let raw = r#"{
            "id": "2022-10-003",
            "meeting": "2022-10",
            "meetingName": "2022 LLVM Developers' Meeting",
            "title": "Clang Static Analysis",
            "speakers": [{"name": "A. Speaker", "affiliation": "Example Corp"}],
            "abstract": "Deep dive.",
            "videoUrl": "https://youtu.be/abc12345678",
            "videoId": "abc12345678",
            "slidesUrl": "slides.pdf",
            "tags": ["Clang"]
        }"#;
        let talk: Talk = serde_json::from_str(raw).expect("talk json");
        assert_eq!(talk.id, "2022-10-003");
        assert_eq!(talk.meeting_name, "2022 LLVM Developers' Meeting");
        assert_eq!(talk.abstract_text, "Deep dive.");
        assert_eq!(talk.video_id.as_deref(), Some("abc12345678"));
        assert_eq!(talk.speakers[0].affiliation.as_deref(), Some("Example Corp"));
        assert_eq!(talk.meeting_year(), Some(2022));
    }

    #[test]
    fn talk_tolerates_missing_optional_fields() {
        let talk: Talk = serde_json::from_str(r#"{"id": "x-001", "title": "T"}"#).expect("talk");
        assert!(talk.video_id.is_none());
        assert!(talk.speakers.is_empty());
        assert_eq!(talk.meeting_year(), None);
    }

    #[test]
    fn blog_detection_follows_declared_type() {
        let blog: Paper = serde_json::from_str(
            r#"{"id": "b-1", "title": "Post", "source": "llvm-blog-www", "type": "blog-post"}"#,
        )
        .expect("paper");
        assert!(blog.is_blog());

        // Source alone does not make a record a blog post.
        let paper: Paper = serde_json::from_str(
            r#"{"id": "p-1", "title": "Paper", "source": "llvm-blog-www", "type": "paper"}"#,
        )
        .expect("paper");
        assert!(!paper.is_blog());
    }

    #[test]
    fn content_format_parses_lowercase_names() {
        let talk: Talk = serde_json::from_str(
            r#"{"id": "x-001", "title": "T", "content": "<p>hi</p>", "contentFormat": "html"}"#,
        )
        .expect("talk");
        assert_eq!(talk.content_format, Some(ContentFormat::Html));
    }
}
