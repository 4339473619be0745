// ABOUTME: Resource hint passes: images, inline SVG, scripts, fonts, preconnect, and CSS delivery.
// ABOUTME: Each pass is independent and gated by its own option flag.

pub mod css;
pub mod fonts;
pub mod images;
pub mod preconnect;
pub mod scripts;
pub mod svg;

use dom_query::NodeRef;
use url::Url;

/// Parse an absolute or protocol-relative http(s) URL.
pub(crate) fn absolute_url(src: &str) -> Option<Url> {
    let src = src.trim();
    let url = if src.starts_with("//") {
        Url::parse(&format!("https:{}", src)).ok()?
    } else {
        Url::parse(src).ok()?
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Set an attribute, reporting whether the value actually changed.
pub(crate) fn set_attr_if_changed(node: &NodeRef, name: &str, value: &str) -> bool {
    if node.attr(name).as_deref() == Some(value) {
        return false;
    }
    node.set_attr(name, value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_forms() {
        assert!(absolute_url("https://a.test/x").is_some());
        assert_eq!(
            absolute_url("//cdn.test/lib.js").unwrap().origin().ascii_serialization(),
            "https://cdn.test"
        );
        assert!(absolute_url("/relative.js").is_none());
        assert!(absolute_url("data:image/png;base64,AA==").is_none());
        assert!(absolute_url("mailto:a@b.test").is_none());
    }
}
