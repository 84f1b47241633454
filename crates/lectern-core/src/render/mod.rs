//! Defensive content rendering: untrusted markdown or legacy HTML in,
//! display-safe HTML out. Malformed constructs degrade to plain text or are
//! dropped; rendering never fails and never emits scripts, event handlers,
//! or unvetted URL schemes.

use uuid::Uuid;

use crate::config::RenderConfig;
use crate::models::ContentFormat;

mod inline;
mod markdown;
mod sanitize;
mod shortcode;
mod urls;

#[cfg(test)]
mod tests;

pub(crate) use urls::LinkPolicy;

const MAX_RESTORE_ROUNDS: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct ContentRenderer {
    config: RenderConfig,
}

impl ContentRenderer {
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Renders a raw content blob into sanitized HTML. The HTML path runs
    /// the tag-level sanitizer directly; the markdown path runs the block
    /// renderer and then restores protected spans as the very last step.
    #[must_use]
    pub fn render(&self, raw: &str, format: ContentFormat) -> String {
        let policy = LinkPolicy::new(self.config.base_url.clone());
        match format {
            ContentFormat::Html => sanitize::sanitize_html(raw, &policy),
            ContentFormat::Markdown => {
                let mut store = PlaceholderStore::new();
                let html = markdown::render_markdown(raw, &policy, &mut store);
                store.restore_all(html)
            }
        }
    }
}

/// Substitution slots for content that must survive the markdown passes
/// untouched: fenced code, shortcode expansions, restricted inline HTML,
/// and generated links. Tokens carry a per-render nonce so document text
/// cannot collide with them, and a `z` terminator so one slot index is never
/// a prefix of another.
pub(crate) struct PlaceholderStore {
    prefix: String,
    entries: Vec<String>,
}

impl PlaceholderStore {
    pub(crate) fn new() -> Self {
        Self {
            prefix: format!("lectern-ph-{}", Uuid::new_v4().simple()),
            entries: Vec::new(),
        }
    }

    /// Stashes a fragment of final HTML and returns the token standing in
    /// for it.
    pub(crate) fn stash(&mut self, html: String) -> String {
        let token = format!("{}-{}z", self.prefix, self.entries.len());
        self.entries.push(html);
        token
    }

    /// True when `text` is exactly one placeholder token.
    pub(crate) fn is_token(&self, text: &str) -> bool {
        text.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|rest| rest.strip_suffix('z'))
            .and_then(|digits| digits.parse::<usize>().ok())
            .is_some_and(|index| index < self.entries.len())
    }

    /// Replaces every token with its stored HTML. Stored fragments may embed
    /// tokens of their own (a link label holding a code span), so restoration
    /// repeats until the output is stable.
    pub(crate) fn restore_all(&self, html: String) -> String {
        let mut out = html;
        for _ in 0..MAX_RESTORE_ROUNDS {
            if !out.contains(&self.prefix) {
                break;
            }
            for (index, entry) in self.entries.iter().enumerate() {
                let token = format!("{}-{index}z", self.prefix);
                if out.contains(&token) {
                    out = out.replace(&token, entry);
                }
            }
        }
        out
    }
}

/// Escapes text for an HTML text node.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes text for a double-quoted attribute value.
pub(crate) fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
