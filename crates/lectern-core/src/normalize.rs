use url::Url;

use crate::models::{Paper, Person, Talk};
use crate::text::{collapse_ws, is_meaningful_abstract, is_meaningful_meta};

pub const YOUTUBE_ID_LEN: usize = 11;
pub const MIN_QUERY_TOKEN_CHARS: usize = 2;

/// YouTube video ids are exactly 11 characters of `[A-Za-z0-9_-]`.
#[must_use]
pub fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == YOUTUBE_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Pulls a video id out of any of the YouTube URL shapes the archive data has
/// accumulated over the years: `youtu.be/<id>`, `watch?v=`, `/embed/`,
/// `/shorts/`, `/live/`, `/v/`, and the legacy `vi` query parameter.
/// Anything unparseable yields `None`, never an error.
#[must_use]
pub fn extract_youtube_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host == "youtu.be" {
        let candidate = url.path_segments()?.next()?;
        return checked_video_id(candidate);
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        for (key, value) in url.query_pairs() {
            if (key == "v" || key == "vi")
                && let Some(id) = checked_video_id(&value)
            {
                return Some(id);
            }
        }
        let mut segments = url.path_segments()?;
        if let Some(first) = segments.next()
            && matches!(first, "embed" | "shorts" | "live" | "v")
            && let Some(second) = segments.next()
        {
            return checked_video_id(second);
        }
    }

    None
}

fn checked_video_id(candidate: &str) -> Option<String> {
    is_valid_video_id(candidate).then(|| candidate.to_string())
}

/// Cleans a talk record in place: collapses whitespace, drops placeholder
/// meta values, and reconciles `videoId`/`videoUrl`. An explicit valid
/// `videoId` wins; otherwise the id is derived from the URL. When an id is
/// known but no URL survived, a canonical `https://youtu.be/<id>` URL is
/// synthesized. The whole pass is idempotent.
pub fn normalize_talk(talk: &mut Talk) {
    talk.id = collapse_ws(&talk.id);
    talk.title = collapse_ws(&talk.title);
    talk.meeting = collapse_ws(&talk.meeting);
    talk.category = collapse_ws(&talk.category);
    talk.meeting_name = meaningful_meta_or_empty(&talk.meeting_name);
    talk.meeting_location = meaningful_meta_or_empty(&talk.meeting_location);
    talk.meeting_date = meaningful_meta_or_empty(&talk.meeting_date);
    if !is_meaningful_abstract(&talk.abstract_text) {
        talk.abstract_text = String::new();
    }
    normalize_people(&mut talk.speakers);
    normalize_labels(&mut talk.tags);

    talk.video_url = meaningful_meta_opt(talk.video_url.take());
    talk.slides_url = meaningful_meta_opt(talk.slides_url.take());
    talk.project_github = meaningful_meta_opt(talk.project_github.take());

    let explicit = talk
        .video_id
        .take()
        .map(|id| collapse_ws(&id))
        .filter(|id| is_valid_video_id(id));
    talk.video_id = explicit.or_else(|| talk.video_url.as_deref().and_then(extract_youtube_id));
    if let Some(id) = &talk.video_id
        && talk.video_url.is_none()
    {
        talk.video_url = Some(format!("https://youtu.be/{id}"));
    }
}

/// Paper/blog counterpart of [`normalize_talk`].
pub fn normalize_paper(paper: &mut Paper) {
    paper.id = collapse_ws(&paper.id);
    paper.title = collapse_ws(&paper.title);
    paper.venue = meaningful_meta_or_empty(&paper.venue);
    paper.source = collapse_ws(&paper.source);
    paper.record_type = collapse_ws(&paper.record_type);
    if !is_meaningful_abstract(&paper.abstract_text) {
        paper.abstract_text = String::new();
    }
    normalize_people(&mut paper.authors);
    normalize_labels(&mut paper.keywords);
    normalize_labels(&mut paper.tags);

    paper.paper_url = meaningful_meta_opt(paper.paper_url.take());
    paper.pdf_url = meaningful_meta_opt(paper.pdf_url.take());
    paper.doi = meaningful_meta_opt(paper.doi.take());
    paper.openalex_id = meaningful_meta_opt(paper.openalex_id.take());
}

fn normalize_people(people: &mut Vec<Person>) {
    for person in people.iter_mut() {
        person.name = collapse_ws(&person.name);
        person.affiliation = meaningful_meta_opt(person.affiliation.take());
        person.github = meaningful_meta_opt(person.github.take());
        person.linkedin = meaningful_meta_opt(person.linkedin.take());
        person.twitter = meaningful_meta_opt(person.twitter.take());
    }
    people.retain(|person| !person.name.is_empty());
}

fn normalize_labels(labels: &mut Vec<String>) {
    for label in labels.iter_mut() {
        *label = collapse_ws(label);
    }
    labels.retain(|label| !label.is_empty());
}

fn meaningful_meta_or_empty(value: &str) -> String {
    let collapsed = collapse_ws(value);
    if is_meaningful_meta(&collapsed) {
        collapsed
    } else {
        String::new()
    }
}

fn meaningful_meta_opt(value: Option<String>) -> Option<String> {
    value
        .map(|raw| collapse_ws(&raw))
        .filter(|collapsed| is_meaningful_meta(collapsed))
}

/// Splits a search query into lowercase tokens. Double-quoted spans stay
/// together as one token with interior whitespace intact; everything else
/// splits on whitespace. Tokens shorter than [`MIN_QUERY_TOKEN_CHARS`] are
/// discarded, duplicates keep only their first occurrence.
#[must_use]
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in query.chars() {
        if ch == '"' {
            flush_token(&mut tokens, &mut current);
            in_quotes = !in_quotes;
            continue;
        }
        if !in_quotes && ch.is_whitespace() {
            flush_token(&mut tokens, &mut current);
            continue;
        }
        current.push(ch);
    }
    flush_token(&mut tokens, &mut current);
    tokens
}

fn flush_token(tokens: &mut Vec<String>, current: &mut String) {
    if current.chars().count() >= MIN_QUERY_TOKEN_CHARS {
        let lowered = current.to_lowercase();
        if !tokens.contains(&lowered) {
            tokens.push(lowered);
        }
    }
    current.clear();
}
