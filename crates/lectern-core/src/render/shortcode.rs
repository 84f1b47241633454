//! Hugo-style `{{< name args >}}` shortcodes embedded in legacy markdown.
//! Media shortcodes expand to plain outbound link buttons rather than
//! embedded players; cross-reference shortcodes expand to resolved URLs;
//! anything unrecognized renders to nothing.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::urls::{LinkPolicy, external_anchor_attrs};
use super::{PlaceholderStore, escape_attr, escape_html};
use crate::normalize::is_valid_video_id;

fn shortcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Single-line only: an unterminated opener degrades to literal text
    // instead of swallowing the rest of the document.
    RE.get_or_init(|| Regex::new(r"\{\{<(.*?)>\}\}").expect("shortcode pattern"))
}

/// Replaces every shortcode occurrence with its expansion. Generated HTML is
/// stashed as a placeholder so later markdown passes cannot rewrite it;
/// `relref`/`ref` expand to bare URLs that stay live for the link parser.
pub(crate) fn expand_shortcodes(
    text: &str,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in shortcode_re().find_iter(text) {
        out.push_str(&text[last..found.start()]);
        let inner = found
            .as_str()
            .trim_start_matches("{{<")
            .trim_end_matches(">}}");
        out.push_str(&expand_one(inner, policy, store));
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

fn expand_one(inner: &str, policy: &LinkPolicy, store: &mut PlaceholderStore) -> String {
    let body = inner.trim();
    let (name, rest) = body
        .split_once(char::is_whitespace)
        .unwrap_or((body, ""));
    let args = ShortcodeArgs::parse(rest);
    match name.to_ascii_lowercase().as_str() {
        "youtube" => youtube_button(&args, store),
        "vimeo" => vimeo_button(&args, store),
        "tweet" => tweet_button(&args, store),
        "gist" => gist_button(&args, store),
        "figure" => figure_block(&args, policy, store),
        "relref" | "ref" => resolved_ref(&args, policy),
        _ => String::new(),
    }
}

/// Parsed shortcode arguments. Tokens split on whitespace outside double
/// quotes; a `key=value` token with a key-shaped left side is named,
/// everything else is positional.
pub(crate) struct ShortcodeArgs {
    named: HashMap<String, String>,
    positional: Vec<String>,
}

impl ShortcodeArgs {
    pub(crate) fn parse(raw: &str) -> Self {
        let mut named = HashMap::new();
        let mut positional = Vec::new();
        for token in split_quote_aware(raw) {
            match split_named(&token) {
                Some((key, value)) => {
                    named.insert(key, value);
                }
                None => positional.push(token),
            }
        }
        Self { named, positional }
    }

    /// Named lookup with positional fallback, the way the legacy templates
    /// accept both `{{< youtube id="x" >}}` and `{{< youtube x >}}`. Empty
    /// values count as absent.
    pub(crate) fn get(&self, key: &str, position: usize) -> Option<&str> {
        self.named(key).or_else(|| self.positional(position))
    }

    pub(crate) fn named(&self, key: &str) -> Option<&str> {
        self.named
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn positional(&self, index: usize) -> Option<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn positional_count(&self) -> usize {
        self.positional.len()
    }
}

fn split_quote_aware(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in raw.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if !in_quotes && ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn split_named(token: &str) -> Option<(String, String)> {
    let (key, value) = token.split_once('=')?;
    is_key_shaped(key).then(|| (key.to_ascii_lowercase(), value.to_string()))
}

fn is_key_shaped(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn link_button(url: &str, label: &str, store: &mut PlaceholderStore) -> String {
    store.stash(format!(
        "<a class=\"external-link-button\" href=\"{}\"{}>{label}</a>",
        escape_attr(url),
        external_anchor_attrs(url),
    ))
}

fn youtube_button(args: &ShortcodeArgs, store: &mut PlaceholderStore) -> String {
    let Some(id) = args.get("id", 0).filter(|id| is_valid_video_id(id)) else {
        return String::new();
    };
    link_button(
        &format!("https://www.youtube.com/watch?v={id}"),
        "Watch on YouTube",
        store,
    )
}

fn vimeo_button(args: &ShortcodeArgs, store: &mut PlaceholderStore) -> String {
    let Some(id) = args.get("id", 0).filter(|id| is_all_digits(id)) else {
        return String::new();
    };
    link_button(&format!("https://vimeo.com/{id}"), "Watch on Vimeo", store)
}

fn tweet_button(args: &ShortcodeArgs, store: &mut PlaceholderStore) -> String {
    // Two positional forms exist in the wild: `user id` and bare `id`.
    let id = args
        .named("id")
        .or_else(|| args.positional(1))
        .or_else(|| args.positional(0));
    let Some(id) = id.filter(|id| is_all_digits(id)) else {
        return String::new();
    };
    let user = args.named("user").or_else(|| {
        (args.positional_count() >= 2)
            .then(|| args.positional(0))
            .flatten()
    });
    let url = match user.filter(|user| is_handle_shaped(user)) {
        Some(user) => format!("https://twitter.com/{user}/status/{id}"),
        None => format!("https://twitter.com/i/status/{id}"),
    };
    link_button(&url, "View on Twitter", store)
}

fn gist_button(args: &ShortcodeArgs, store: &mut PlaceholderStore) -> String {
    let user = args.get("user", 0).filter(|user| is_handle_shaped(user));
    let id = args
        .get("id", 1)
        .filter(|id| id.bytes().all(|b| b.is_ascii_alphanumeric()));
    let (Some(user), Some(id)) = (user, id) else {
        return String::new();
    };
    link_button(
        &format!("https://gist.github.com/{user}/{id}"),
        "View Gist",
        store,
    )
}

fn figure_block(
    args: &ShortcodeArgs,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    // No vetted image source, no figure.
    let Some(src) = args
        .get("src", 0)
        .and_then(|raw| policy.resolve_src(raw, true))
    else {
        return String::new();
    };

    let mut img = format!("<img src=\"{}\"", escape_attr(&src));
    if let Some(alt) = args.named("alt") {
        img.push_str(&format!(" alt=\"{}\"", escape_attr(alt)));
    }
    for dimension in ["width", "height"] {
        if let Some(value) = args.named(dimension).filter(|value| is_all_digits(value)) {
            img.push_str(&format!(" {dimension}=\"{value}\""));
        }
    }
    img.push('>');

    let mut html = String::from("<figure>");
    match args.named("link").and_then(|raw| policy.resolve_href(raw)) {
        Some(link) => {
            html.push_str(&format!(
                "<a href=\"{}\"{}>{img}</a>",
                escape_attr(&link),
                external_anchor_attrs(&link),
            ));
        }
        None => html.push_str(&img),
    }

    let caption = figure_caption(args, policy);
    if !caption.is_empty() {
        html.push_str(&format!("<figcaption>{caption}</figcaption>"));
    }
    html.push_str("</figure>");
    store.stash(html)
}

fn figure_caption(args: &ShortcodeArgs, policy: &LinkPolicy) -> String {
    let mut parts = Vec::new();
    if let Some(title) = args.named("title") {
        parts.push(format!("<strong>{}</strong>", escape_html(title)));
    }
    if let Some(caption) = args.named("caption") {
        parts.push(escape_html(caption));
    }
    if let Some(attr) = args.named("attr") {
        let credit = escape_html(attr);
        match args
            .named("attrlink")
            .and_then(|raw| policy.resolve_href(raw))
        {
            Some(link) => parts.push(format!(
                "<a href=\"{}\"{}>{credit}</a>",
                escape_attr(&link),
                external_anchor_attrs(&link),
            )),
            None => parts.push(credit),
        }
    }
    parts.join(" ")
}

/// `relref`/`ref` expand to the resolved target URL as plain text, or to
/// nothing when the target cannot be vetted. Inside a markdown link the URL
/// lands in the destination slot and renders as a normal anchor.
fn resolved_ref(args: &ShortcodeArgs, policy: &LinkPolicy) -> String {
    args.get("path", 0)
        .and_then(|raw| policy.resolve_href(raw))
        .unwrap_or_default()
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_handle_shaped(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 39
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
