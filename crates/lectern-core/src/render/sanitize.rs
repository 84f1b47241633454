//! Tag-level sanitizer for legacy HTML pages. The scanner walks the input
//! once: text passes through untouched, dangerous elements disappear (with
//! their content where it matters), surviving tags are re-emitted from
//! parsed parts with a filtered attribute list. Output is stable under a
//! second pass.

use std::sync::OnceLock;

use regex::Regex;

use super::escape_attr;
use super::urls::LinkPolicy;

/// Elements removed together with everything up to their closing tag.
const DROP_WITH_CONTENT: &[&str] = &["script", "style", "iframe", "object", "form"];

/// Void dangerous elements; there is no content to drop.
const DROP_TAG_ONLY: &[&str] = &["meta", "link", "base", "embed"];

/// Attributes that can carry script without an `on` prefix.
const SCRIPT_BEARING_ATTRS: &[&str] = &["formaction", "action", "srcdoc"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "hr", "img", "input", "source", "track", "wbr",
];

/// Elements whose styling historically marked them as code.
const CODE_LIKE_TAGS: &[&str] = &["code", "tt", "samp", "kbd"];

/// Elements where a large font-size historically faked a heading.
const TEXT_CONTAINER_TAGS: &[&str] = &[
    "p", "div", "span", "section", "article", "font", "b", "strong", "i", "em",
];

pub(crate) fn sanitize_html(raw: &str, policy: &LinkPolicy) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut pre_depth = 0usize;
    let mut promoted_code = false;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];
        if rest.starts_with("<!--") {
            rest = skip_past(rest, "-->");
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = skip_past(rest, ">");
            continue;
        }
        let Some(tag) = parse_tag(rest) else {
            // Not tag-shaped: neutralize the bracket and move on.
            out.push_str("&lt;");
            rest = &rest[1..];
            continue;
        };
        rest = &rest[tag.len..];
        let name = tag.name.as_str();
        if DROP_TAG_ONLY.contains(&name) {
            continue;
        }
        if DROP_WITH_CONTENT.contains(&name) {
            if !tag.closing && !tag.self_closing {
                rest = skip_element_content(rest, name);
            }
            continue;
        }
        if tag.closing {
            if VOID_ELEMENTS.contains(&name) {
                continue;
            }
            if name == "pre" {
                pre_depth = pre_depth.saturating_sub(1);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            if name == "code" && promoted_code {
                out.push_str("</pre>");
                promoted_code = false;
            }
            continue;
        }
        emit_open_tag(&mut out, tag, rest, policy, &mut pre_depth, &mut promoted_code);
    }
    out.push_str(rest);
    out
}

struct ParsedTag {
    /// Lowercased element name.
    name: String,
    closing: bool,
    self_closing: bool,
    /// Lowercased attribute names with entity-decoded values.
    attrs: Vec<(String, Option<String>)>,
    /// Bytes consumed from the opening `<`.
    len: usize,
}

/// Parses one tag starting at `<`. Returns `None` for anything that is not
/// tag-shaped (no name, unterminated quote, missing `>`), in which case the
/// caller escapes the bracket rather than passing raw markup through.
fn parse_tag(rest: &str) -> Option<ParsedTag> {
    let bytes = rest.as_bytes();
    let len = bytes.len();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name = rest[name_start..i].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return None;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
            }
            _ => {
                let attr_start = i;
                while i < len
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                let attr_name = rest[attr_start..i].to_ascii_lowercase();
                while i < len && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let value = if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < len && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    match bytes.get(i) {
                        Some(&quote @ (b'"' | b'\'')) => {
                            i += 1;
                            let value_start = i;
                            while i < len && bytes[i] != quote {
                                i += 1;
                            }
                            if i >= len {
                                return None;
                            }
                            let value = &rest[value_start..i];
                            i += 1;
                            Some(decode_entities(value))
                        }
                        _ => {
                            let value_start = i;
                            while i < len
                                && !bytes[i].is_ascii_whitespace()
                                && bytes[i] != b'>'
                            {
                                i += 1;
                            }
                            Some(decode_entities(&rest[value_start..i]))
                        }
                    }
                } else {
                    None
                };
                attrs.push((attr_name, value));
            }
        }
    }
    Some(ParsedTag {
        name,
        closing,
        self_closing,
        attrs,
        len: i,
    })
}

#[allow(clippy::too_many_lines, reason = "single attribute-filtering pass reads better unsplit")]
fn emit_open_tag(
    out: &mut String,
    tag: ParsedTag,
    rest: &str,
    policy: &LinkPolicy,
    pre_depth: &mut usize,
    promoted_code: &mut bool,
) {
    let name = tag.name.as_str();
    let mut kept: Vec<(String, Option<String>)> = Vec::new();
    let mut extra_classes: Vec<&'static str> = Vec::new();
    let mut author_classes: Option<String> = None;
    let mut deferred_anchor: Vec<(String, Option<String>)> = Vec::new();
    let mut external_href = false;

    for (attr, value) in tag.attrs {
        if attr.starts_with("on")
            || SCRIPT_BEARING_ATTRS.contains(&attr.as_str())
            || attr == "srcset"
        {
            continue;
        }
        match attr.as_str() {
            "style" => {
                // The attribute itself never survives; recognizable intent
                // is carried over as presentation classes.
                extra_classes.extend(style_classes(value.as_deref().unwrap_or(""), name));
            }
            "class" => author_classes = value,
            "href" => {
                if let Some(url) = value.as_deref().and_then(|raw| policy.resolve_href(raw)) {
                    external_href = LinkPolicy::is_external(&url);
                    kept.push((attr, Some(url)));
                }
            }
            "src" => {
                if let Some(url) = value
                    .as_deref()
                    .and_then(|raw| policy.resolve_src(raw, name == "img"))
                {
                    kept.push((attr, Some(url)));
                }
            }
            "target" | "rel" if name == "a" => deferred_anchor.push((attr, value)),
            _ => kept.push((attr, value)),
        }
    }

    if name == "pre" && !next_tag_is_code(rest) {
        extra_classes.push("code-block");
    }
    if name == "code" {
        if *pre_depth > 0 {
            extra_classes.push("code");
        } else {
            let block_like = has_class(author_classes.as_deref(), &["preformatted", "code-block"])
                || extra_classes.contains(&"preformatted")
                || extra_classes.contains(&"code-block")
                || lone_code_inner(rest).contains('\n');
            if block_like && !*promoted_code {
                out.push_str("<pre>");
                *promoted_code = true;
                extra_classes.push("code");
            }
        }
    }

    let classes = merge_classes(author_classes.as_deref(), &extra_classes);
    if !classes.is_empty() {
        kept.push(("class".to_string(), Some(classes)));
    }
    if name == "a" {
        if external_href {
            kept.push(("target".to_string(), Some("_blank".to_string())));
            kept.push(("rel".to_string(), Some("noopener noreferrer".to_string())));
        } else {
            kept.extend(deferred_anchor);
        }
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in &kept {
        out.push(' ');
        out.push_str(attr);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }
    out.push('>');
    if name == "pre" && !tag.self_closing {
        *pre_depth += 1;
    }
}

/// True when the next markup after a `<pre>` tag is a `<code>` child.
fn next_tag_is_code(rest: &str) -> bool {
    let trimmed = rest.trim_start();
    let Some(after) = strip_prefix_ci(trimmed, "<code") else {
        return false;
    };
    match after.bytes().next() {
        Some(next) => !next.is_ascii_alphanumeric(),
        None => false,
    }
}

/// Raw text between a lone `<code>` and its closing tag, for block-shape
/// sniffing.
fn lone_code_inner(rest: &str) -> &str {
    match find_ci(rest, "</code") {
        Some(pos) => &rest[..pos],
        None => rest,
    }
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn skip_past<'a>(rest: &'a str, terminator: &str) -> &'a str {
    match rest.find(terminator) {
        Some(pos) => &rest[pos + terminator.len()..],
        None => "",
    }
}

/// Advances past the closing tag of a dropped element. An unterminated
/// dangerous element swallows the remainder of the input.
fn skip_element_content<'a>(rest: &'a str, name: &str) -> &'a str {
    let close = format!("</{name}");
    match find_ci(rest, &close) {
        Some(pos) => {
            let after = &rest[pos..];
            match after.find('>') {
                Some(gt) => &after[gt + 1..],
                None => "",
            }
        }
        None => "",
    }
}

/// Minimal entity decoding for attribute values, so scheme checks see the
/// real target (`java&#115;cript:` and friends) and re-escaping on output
/// stays idempotent.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = match rest.find(';') {
            Some(pos) if pos <= 12 => pos,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        match decode_entity(&rest[1..semi]) {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code).filter(|ch| !ch.is_control() || matches!(ch, '\t' | '\n' | '\r'))
        }
    }
}

fn font_size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?)(px|pt|em|rem|%)$").expect("font size pattern")
    })
}

/// Maps inline-style intent onto the archive's presentation classes.
fn style_classes(style: &str, tag: &str) -> Vec<&'static str> {
    let mut classes = Vec::new();
    let mut push = |class: &'static str, classes: &mut Vec<&'static str>| {
        if !classes.contains(&class) {
            classes.push(class);
        }
    };
    let code_like = CODE_LIKE_TAGS.contains(&tag);
    let lower = style.to_lowercase();
    for decl in lower.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let (prop, value) = (prop.trim(), value.trim());
        match prop {
            "font-family" if is_mono_family(value) => push("inline-mono", &mut classes),
            "white-space" if value.starts_with("pre") => push("preformatted", &mut classes),
            "display" if value == "block" && code_like => push("code-block", &mut classes),
            "background" | "background-color"
                if code_like && !value.is_empty() && value != "none" && value != "transparent" =>
            {
                push("code-surface", &mut classes);
            }
            "font-size" if is_large_font(value) && TEXT_CONTAINER_TAGS.contains(&tag) => {
                push("heading-like", &mut classes);
            }
            "text-align" if value == "center" => push("centered", &mut classes),
            "margin" | "margin-left" | "margin-right" if value.contains("auto") => {
                push("centered", &mut classes);
            }
            _ => {}
        }
    }
    classes
}

fn is_mono_family(value: &str) -> bool {
    ["monospace", "courier", "consolas", "menlo", "monaco"]
        .iter()
        .any(|family| value.contains(family))
}

fn is_large_font(value: &str) -> bool {
    if matches!(value, "large" | "x-large" | "xx-large" | "larger") {
        return true;
    }
    let Some(caps) = font_size_re().captures(value) else {
        return false;
    };
    let Ok(size) = caps[1].parse::<f32>() else {
        return false;
    };
    match &caps[2] {
        "px" => size >= 20.0,
        "pt" => size >= 15.0,
        "em" | "rem" => size >= 1.25,
        "%" => size >= 125.0,
        _ => false,
    }
}

fn has_class(author: Option<&str>, wanted: &[&str]) -> bool {
    author
        .unwrap_or_default()
        .split_whitespace()
        .any(|class| wanted.contains(&class))
}

fn merge_classes(author: Option<&str>, extra: &[&'static str]) -> String {
    let mut merged: Vec<&str> = Vec::new();
    for class in author
        .unwrap_or_default()
        .split_whitespace()
        .chain(extra.iter().copied())
    {
        if !merged.contains(&class) {
            merged.push(class);
        }
    }
    merged.join(" ")
}
