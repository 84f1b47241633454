use url::Url;

/// Schemes a link target may carry after sanitization.
const ALLOWED_LINK_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Resolves and vets URL targets. Relative references resolve against the
/// configured base; anything that does not land on an allowed scheme is
/// rejected so the caller drops the attribute or construct instead of
/// emitting it.
#[derive(Debug, Clone)]
pub(crate) struct LinkPolicy {
    base: Url,
}

impl LinkPolicy {
    pub(crate) fn new(base: Url) -> Self {
        Self { base }
    }

    /// Vets an anchor target. Same-document fragments pass through
    /// unchanged; everything else must resolve to http, https, mailto,
    /// or tel.
    pub(crate) fn resolve_href(&self, raw: &str) -> Option<String> {
        self.resolve(raw, false)
    }

    /// Vets a media source. Same rules as links, plus `data:` URIs when the
    /// element is an image.
    pub(crate) fn resolve_src(&self, raw: &str, allow_data: bool) -> Option<String> {
        self.resolve(raw, allow_data)
    }

    fn resolve(&self, raw: &str, allow_data: bool) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('#') {
            return Some(trimmed.to_string());
        }
        // Scheme-relative targets switch hosts silently; reject outright.
        if trimmed.starts_with("//") {
            return None;
        }
        match Url::parse(trimmed) {
            Ok(url) => {
                let scheme = url.scheme();
                if ALLOWED_LINK_SCHEMES.contains(&scheme) || (allow_data && scheme == "data") {
                    Some(url.to_string())
                } else {
                    None
                }
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let resolved = self.base.join(trimmed).ok()?;
                ALLOWED_LINK_SCHEMES
                    .contains(&resolved.scheme())
                    .then(|| resolved.to_string())
            }
            Err(_) => None,
        }
    }

    /// True for targets that leave the archive and should open in a new tab
    /// with opener protection.
    pub(crate) fn is_external(target: &str) -> bool {
        target.starts_with("http://") || target.starts_with("https://")
    }
}

/// Attribute suffix forced onto anchors that point off-site.
pub(crate) fn external_anchor_attrs(target: &str) -> &'static str {
    if LinkPolicy::is_external(target) {
        " target=\"_blank\" rel=\"noopener noreferrer\""
    } else {
        ""
    }
}
