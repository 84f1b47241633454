//! Small text helpers shared by the normalizer, ranker, and suggester.

/// Meta values that archive pages historically used as "no data yet" fillers.
/// Compared against [`compact_alnum_key`] output, so punctuation and case do
/// not matter ("N/A", "n.a.", "To Be Announced" all collapse here).
const META_PLACEHOLDER_KEYS: &[&str] = &[
    "tbd",
    "tba",
    "tbc",
    "na",
    "none",
    "unknown",
    "null",
    "todo",
    "comingsoon",
    "tobeannounced",
    "tobedetermined",
];

#[must_use]
pub(crate) fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[must_use]
pub(crate) fn compact_alnum_key(text: &str) -> String {
    text.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Abstracts have their own filler vocabulary on old program pages.
const ABSTRACT_PLACEHOLDER_KEYS: &[&str] = &[
    "tbd",
    "tba",
    "none",
    "unknown",
    "noabstract",
    "noabstractavailable",
    "abstracttbd",
];

/// True when the value carries real information rather than a "TBD"-style
/// placeholder left over from a half-filled program page.
#[must_use]
pub(crate) fn is_meaningful_meta(value: &str) -> bool {
    let key = compact_alnum_key(value);
    if key.is_empty() {
        return false;
    }
    !META_PLACEHOLDER_KEYS.contains(&key.as_str())
}

#[must_use]
pub(crate) fn is_meaningful_abstract(value: &str) -> bool {
    let key = compact_alnum_key(value);
    if key.is_empty() {
        return false;
    }
    !ABSTRACT_PLACEHOLDER_KEYS.contains(&key.as_str())
}

/// Identity key for a person name: whitespace-collapsed, lowercased.
/// "Chris  Lattner" and "chris lattner" aggregate into one suggestion entry.
#[must_use]
pub(crate) fn person_key(name: &str) -> String {
    collapse_ws(name).to_lowercase()
}

#[must_use]
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    let Some((clip_idx, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let mut out = text[..clip_idx].to_string();
    out.push_str("...");
    out
}
