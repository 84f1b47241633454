//! Line-oriented block renderer for the markdown dialect used by the
//! archived conference pages. Fenced code is protected before any other
//! pass so transformations never touch code content; shortcodes expand
//! next; reference definitions are extracted; then a single state machine
//! walks the remaining lines.

use std::sync::OnceLock;

use regex::Regex;

use super::inline::{INLINE_SAFE_TAGS, RefDef, RefMap, render_inline};
use super::sanitize::sanitize_html;
use super::shortcode::{ShortcodeArgs, expand_shortcodes};
use super::urls::LinkPolicy;
use super::{PlaceholderStore, escape_attr, escape_html};

pub(crate) fn render_markdown(
    raw: &str,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    let lines = protect_code_blocks(raw, store);
    let expanded = expand_shortcodes(&lines.join("\n"), policy, store);
    let (lines, refs) = extract_reference_defs(expanded.lines(), policy);
    render_blocks(&lines, &refs, policy, store)
}

enum FenceKind {
    Backtick,
    Highlight,
}

fn highlight_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\{\{<\s*highlight\b(.*?)>\}\}$").expect("highlight open pattern")
    })
}

fn highlight_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\{\{<\s*/\s*highlight\s*>\}\}$").expect("highlight close pattern")
    })
}

fn ref_def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s{0,3}\[([^\]]+)\]:\s*(\S+)(?:\s+"([^"]*)")?\s*$"#)
            .expect("reference definition pattern")
    })
}

/// Replaces the interior of every fenced-code region with one placeholder
/// line whose stored value is the escaped code text. Fence markers stay in
/// the stream, normalized to ```` ```lang ````; `{{< highlight lang >}}`
/// pairs count as fences too. An unterminated fence keeps its opener so the
/// block renderer still emits the trailing lines as code.
fn protect_code_blocks(raw: &str, store: &mut PlaceholderStore) -> Vec<String> {
    let mut out = Vec::new();
    let mut open: Option<(FenceKind, String, Vec<&str>)> = None;
    for line in raw.lines() {
        let trimmed = line.trim();
        match open.take() {
            Some((kind, lang, mut body)) => {
                let closes = match kind {
                    FenceKind::Backtick => trimmed.starts_with("```"),
                    FenceKind::Highlight => highlight_close_re().is_match(trimmed),
                };
                if closes {
                    push_fence(&mut out, &lang, &body, true, store);
                } else {
                    body.push(line);
                    open = Some((kind, lang, body));
                }
            }
            None => {
                if let Some(rest) = trimmed.strip_prefix("```") {
                    open = Some((FenceKind::Backtick, fence_language(rest), Vec::new()));
                } else if let Some(caps) = highlight_open_re().captures(trimmed) {
                    let args = ShortcodeArgs::parse(&caps[1]);
                    let lang = args
                        .get("lang", 0)
                        .map(sanitize_language)
                        .unwrap_or_default();
                    open = Some((FenceKind::Highlight, lang, Vec::new()));
                } else {
                    out.push(line.to_string());
                }
            }
        }
    }
    if let Some((_, lang, body)) = open {
        push_fence(&mut out, &lang, &body, false, store);
    }
    out
}

fn push_fence(
    out: &mut Vec<String>,
    lang: &str,
    body: &[&str],
    terminated: bool,
    store: &mut PlaceholderStore,
) {
    out.push(format!("```{lang}"));
    if !body.is_empty() {
        out.push(store.stash(escape_html(&body.join("\n"))));
    }
    if terminated {
        out.push("```".to_string());
    }
}

/// Language tag from the text after the opening backticks.
fn fence_language(rest: &str) -> String {
    let token = rest
        .trim_start_matches('`')
        .trim()
        .split_whitespace()
        .next()
        .unwrap_or_default();
    sanitize_language(token)
}

fn sanitize_language(token: &str) -> String {
    token
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '+' | '-' | '#'))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Pulls `[label]: url "title"` definition lines out of the stream. The
/// line is removed whether or not its target survives vetting; fenced
/// content was tokenized earlier, so no fence tracking is needed here.
fn extract_reference_defs<'a>(
    lines: impl Iterator<Item = &'a str>,
    policy: &LinkPolicy,
) -> (Vec<String>, RefMap) {
    let mut refs = RefMap::default();
    let mut kept = Vec::new();
    for line in lines {
        if let Some(caps) = ref_def_re().captures(line) {
            if let Some(url) = policy.resolve_href(&caps[2]) {
                refs.insert(
                    &caps[1],
                    RefDef {
                        url,
                        title: caps.get(3).map(|m| m.as_str().to_string()),
                    },
                );
            }
            continue;
        }
        kept.push(line.to_string());
    }
    (kept, refs)
}

enum Block {
    None,
    Paragraph(Vec<String>),
    UnorderedList(Vec<String>),
    OrderedList(Vec<String>),
    FencedCode { lang: String, body: Vec<String> },
}

fn render_blocks(
    lines: &[String],
    refs: &RefMap,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut block = Block::None;
    let mut idx = 0;
    while idx < lines.len() {
        let line = &lines[idx];
        let trimmed = line.trim();

        if let Block::FencedCode { body, .. } = &mut block {
            if trimmed.starts_with("```") {
                flush(&mut block, &mut out, refs, policy, store);
            } else {
                body.push(line.clone());
            }
            idx += 1;
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut block, &mut out, refs, policy, store);
            idx += 1;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("```") {
            flush(&mut block, &mut out, refs, policy, store);
            block = Block::FencedCode {
                lang: fence_language(rest),
                body: Vec::new(),
            };
            idx += 1;
            continue;
        }

        // A line that is exactly one placeholder is an already-rendered
        // block (shortcode expansion); emit it bare so it never gets a
        // paragraph wrapper.
        if store.is_token(trimmed) {
            flush(&mut block, &mut out, refs, policy, store);
            out.push(trimmed.to_string());
            idx += 1;
            continue;
        }

        if let Some((level, text)) = heading(trimmed) {
            flush(&mut block, &mut out, refs, policy, store);
            out.push(format!(
                "<h{level}>{}</h{level}>",
                render_inline(text, refs, policy, store),
            ));
            idx += 1;
            continue;
        }

        if is_horizontal_rule(trimmed) {
            flush(&mut block, &mut out, refs, policy, store);
            out.push("<hr>".to_string());
            idx += 1;
            continue;
        }

        if trimmed.starts_with('>') {
            flush(&mut block, &mut out, refs, policy, store);
            let mut quote_lines = Vec::new();
            while idx < lines.len() {
                let quoted = lines[idx].trim();
                if !quoted.starts_with('>') {
                    break;
                }
                quote_lines.push(blockquote_text(quoted));
                idx += 1;
            }
            out.push(format!(
                "<blockquote><p>{}</p></blockquote>",
                render_inline(&quote_lines.join(" "), refs, policy, store),
            ));
            continue;
        }

        if html_block_start(trimmed) {
            flush(&mut block, &mut out, refs, policy, store);
            let mut chunk = Vec::new();
            while idx < lines.len() && !lines[idx].trim().is_empty() {
                chunk.push(lines[idx].as_str());
                idx += 1;
            }
            let cleaned = sanitize_html(&chunk.join("\n"), policy);
            if !cleaned.trim().is_empty() {
                out.push(cleaned);
            }
            continue;
        }

        if let Some(item) = unordered_item(trimmed) {
            match &mut block {
                Block::UnorderedList(items) => items.push(item.to_string()),
                _ => {
                    flush(&mut block, &mut out, refs, policy, store);
                    block = Block::UnorderedList(vec![item.to_string()]);
                }
            }
            idx += 1;
            continue;
        }

        if let Some(item) = ordered_item(trimmed) {
            match &mut block {
                Block::OrderedList(items) => items.push(item.to_string()),
                _ => {
                    flush(&mut block, &mut out, refs, policy, store);
                    block = Block::OrderedList(vec![item.to_string()]);
                }
            }
            idx += 1;
            continue;
        }

        match &mut block {
            Block::Paragraph(text_lines) => text_lines.push(trimmed.to_string()),
            _ => {
                flush(&mut block, &mut out, refs, policy, store);
                block = Block::Paragraph(vec![trimmed.to_string()]);
            }
        }
        idx += 1;
    }
    flush(&mut block, &mut out, refs, policy, store);
    out.join("\n")
}

fn flush(
    block: &mut Block,
    out: &mut Vec<String>,
    refs: &RefMap,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) {
    match std::mem::replace(block, Block::None) {
        Block::None => {}
        Block::Paragraph(lines) => out.push(format!(
            "<p>{}</p>",
            render_inline(&lines.join(" "), refs, policy, store),
        )),
        Block::UnorderedList(items) => out.push(list_html("ul", &items, refs, policy, store)),
        Block::OrderedList(items) => out.push(list_html("ol", &items, refs, policy, store)),
        Block::FencedCode { lang, body } => out.push(code_block_html(&lang, &body)),
    }
}

fn list_html(
    tag: &str,
    items: &[String],
    refs: &RefMap,
    policy: &LinkPolicy,
    store: &mut PlaceholderStore,
) -> String {
    let mut html = format!("<{tag}>");
    for item in items {
        html.push_str(&format!(
            "<li>{}</li>",
            render_inline(item, refs, policy, store),
        ));
    }
    html.push_str(&format!("</{tag}>"));
    html
}

/// Body lines here are placeholder tokens whose stored text is already
/// escaped, so they go out without further escaping.
fn code_block_html(lang: &str, body: &[String]) -> String {
    let content = body.join("\n");
    if lang.is_empty() {
        format!("<pre><code>{content}</code></pre>")
    } else {
        format!(
            "<pre><code class=\"language-{}\">{content}</code></pre>",
            escape_attr(lang),
        )
    }
}

fn heading(trimmed: &str) -> Option<(usize, &str)> {
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    let text = rest.trim();
    // A trailing hash run only closes the heading when space-separated;
    // "# C#" keeps its hash.
    let stripped = text.trim_end_matches('#');
    let text = if stripped.len() != text.len() && stripped.ends_with(' ') {
        stripped.trim_end()
    } else {
        text
    };
    Some((hashes, text))
}

fn is_horizontal_rule(trimmed: &str) -> bool {
    let compact: Vec<char> = trimmed.chars().filter(|ch| !ch.is_whitespace()).collect();
    let Some(first) = compact.first().copied() else {
        return false;
    };
    compact.len() >= 3 && matches!(first, '-' | '*' | '_') && compact.iter().all(|ch| *ch == first)
}

fn blockquote_text(trimmed: &str) -> &str {
    let rest = trimmed.strip_prefix('>').unwrap_or(trimmed);
    rest.strip_prefix(' ').unwrap_or(rest)
}

fn unordered_item(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix(['-', '*', '+'])?;
    rest.strip_prefix(' ').map(str::trim_start)
}

fn ordered_item(trimmed: &str) -> Option<&str> {
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix(['.', ')'])?;
    rest.strip_prefix(' ').map(str::trim_start)
}

/// Raw HTML starts a block when the tag is not one of the restricted inline
/// set; those run through the tag-level sanitizer as a unit.
fn html_block_start(trimmed: &str) -> bool {
    if !trimmed.starts_with('<') {
        return false;
    }
    if trimmed.starts_with("<!--") {
        return true;
    }
    let rest = trimmed[1..].strip_prefix('/').unwrap_or(&trimmed[1..]);
    let name: String = rest
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    !name.is_empty() && !INLINE_SAFE_TAGS.contains(&name.as_str())
}
