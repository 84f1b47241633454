use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::urls::{LinkPolicy, external_anchor_attrs};
use super::{PlaceholderStore, escape_attr, escape_html};
use crate::text::collapse_ws;

/// Inline HTML tags preserved verbatim, and only when written attribute-free.
/// Anything else angle-bracketed in markdown text gets escaped.
pub(super) const INLINE_SAFE_TAGS: &[&str] = &[
    "mark", "kbd", "samp", "sub", "sup", "br", "em", "strong", "tt", "ins", "del",
];

/// Reference-style link definitions, keyed by normalized label. Targets are
/// vetted at extraction time, so lookups hand back ready-to-emit URLs.
#[derive(Debug, Default)]
pub(crate) struct RefMap {
    defs: HashMap<String, RefDef>,
}

#[derive(Debug, Clone)]
pub(crate) struct RefDef {
    pub(crate) url: String,
    pub(crate) title: Option<String>,
}

impl RefMap {
    /// First definition of a label wins.
    pub(crate) fn insert(&mut self, label: &str, def: RefDef) {
        self.defs.entry(ref_key(label)).or_insert(def);
    }

    pub(crate) fn lookup(&self, label: &str) -> Option<&RefDef> {
        self.defs.get(&ref_key(label))
    }
}

/// Labels match case-insensitively with interior whitespace collapsed.
fn ref_key(label: &str) -> String {
    collapse_ws(label).to_lowercase()
}

/// Renders one block's worth of inline text to HTML. Constructs that carry
/// final HTML are stashed as placeholders, the remaining text is escaped,
/// and emphasis runs last over the escaped text.
pub(crate) fn render_inline(
    text: &str,
    refs: &RefMap,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    let text = protect_code_spans(text, store);
    let text = protect_inline_tags(&text, store);
    let text = replace_images(&text, policy, store);
    let text = replace_links(&text, refs, policy, store);
    apply_emphasis(&escape_html(&text))
}

fn code_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\n]+)`").expect("code span pattern"))
}

fn inline_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)\s*/?>").expect("inline tag pattern"))
}

// Destinations allow one level of balanced parentheses, so targets like
// `javascript:alert(1)` are captured whole and vetted as a unit.
fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"!\[([^\]]*)\]\(\s*((?:\([^()\s]*\)|[^()\s])+)(?:\s+"([^"]*)")?\s*\)"#)
            .expect("image pattern")
    })
}

fn inline_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[([^\]]+)\]\(\s*((?:\([^()\s]*\)|[^()\s])*)(?:\s+"([^"]*)")?\s*\)"#)
            .expect("inline link pattern")
    })
}

fn ref_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\[([^\]]*)\]").expect("reference link pattern"))
}

fn protect_code_spans(text: &str, store: &mut PlaceholderStore) -> String {
    code_span_re()
        .replace_all(text, |caps: &Captures<'_>| {
            store.stash(format!("<code>{}</code>", escape_html(&caps[1])))
        })
        .into_owned()
}

fn protect_inline_tags(text: &str, store: &mut PlaceholderStore) -> String {
    inline_tag_re()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps[1].to_ascii_lowercase();
            if INLINE_SAFE_TAGS.contains(&name.as_str()) {
                store.stash(caps[0].to_string())
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn replace_images(text: &str, policy: &LinkPolicy, store: &mut PlaceholderStore) -> String {
    image_re()
        .replace_all(text, |caps: &Captures<'_>| {
            let alt = &caps[1];
            match policy.resolve_src(&caps[2], true) {
                Some(src) => {
                    let mut tag = format!(
                        "<img src=\"{}\" alt=\"{}\"",
                        escape_attr(&src),
                        escape_attr(alt),
                    );
                    if let Some(title) = caps.get(3) {
                        tag.push_str(&format!(" title=\"{}\"", escape_attr(title.as_str())));
                    }
                    tag.push('>');
                    store.stash(tag)
                }
                // A rejected image degrades to its alt text.
                None => alt.to_string(),
            }
        })
        .into_owned()
}

fn replace_links(
    text: &str,
    refs: &RefMap,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    let text = inline_link_re()
        .replace_all(text, |caps: &Captures<'_>| {
            let label = inline_label(&caps[1]);
            let title = caps.get(3).map(|m| m.as_str());
            match policy.resolve_href(&caps[2]) {
                Some(url) => store.stash(anchor(&url, title, &label)),
                // Rejected target: keep the label, emit no destination.
                None => store.stash(format!("<a>{label}</a>")),
            }
        })
        .into_owned();
    ref_link_re()
        .replace_all(&text, |caps: &Captures<'_>| {
            let label_src = &caps[1];
            let key = if caps[2].is_empty() { label_src } else { &caps[2] };
            match refs.lookup(key) {
                Some(def) => {
                    let label = inline_label(label_src);
                    store.stash(anchor(&def.url, def.title.as_deref(), &label))
                }
                // Unresolved references stay literal text.
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn anchor(url: &str, title: Option<&str>, label: &str) -> String {
    let mut tag = format!("<a href=\"{}\"", escape_attr(url));
    if let Some(title) = title.filter(|title| !title.is_empty()) {
        tag.push_str(&format!(" title=\"{}\"", escape_attr(title)));
    }
    tag.push_str(external_anchor_attrs(url));
    tag.push_str(&format!(">{label}</a>"));
    tag
}

/// Link labels render their own emphasis but never nested links.
fn inline_label(label: &str) -> String {
    apply_emphasis(&escape_html(label))
}

fn strong_star_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^\s*](?:.*?[^\s*])?)\*\*").expect("strong pattern"))
}

fn strong_under_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b__([^\s_](?:.*?[^\s_])?)__\b").expect("strong pattern"))
}

fn em_star_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^\s*](?:[^*]*?[^\s*])?)\*").expect("emphasis pattern"))
}

fn em_under_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b_([^\s_](?:[^_]*?[^\s_])?)_\b").expect("emphasis pattern"))
}

/// Emphasis runs on already-escaped text. Code spans and link labels were
/// tokenized earlier, so identifiers like `snake_case` inside them never
/// reach these patterns; the word-boundary guards keep intra-word
/// underscores in plain text literal.
fn apply_emphasis(text: &str) -> String {
    let text = strong_star_re().replace_all(text, "<strong>$1</strong>");
    let text = strong_under_re().replace_all(&text, "<strong>$1</strong>");
    let text = em_star_re().replace_all(&text, "<em>$1</em>");
    em_under_re().replace_all(&text, "<em>$1</em>").into_owned()
}
