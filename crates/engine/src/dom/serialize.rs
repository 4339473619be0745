// ABOUTME: HTML serializer for the fragment tree with optional whitespace collapsing and inline minification.
// ABOUTME: Emits raw text for script/style-like elements and honours link/shortcode preservation.

use dom_query::{Document, NodeRef};
use once_cell::sync::Lazy;
use regex::Regex;

use super::tree::{fragment_root, tag_name};
use crate::minify::{minify_css, minify_script, should_minify_script};

/// Bracket-delimited shortcode token such as `[gallery ids="1,2"]`.
pub static SHORTCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]\n]+\]").unwrap());

// HTML whitespace only; U+00A0 is content.
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\n\r\x0C]+").unwrap());

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_whitespace())
}

// Elements whose text children are emitted without escaping.
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

// Elements whose whitespace is significant.
const VERBATIM_TAGS: &[&str] = &["pre", "textarea", "listing"];

// Inline elements between which a whitespace-only text node still matters.
const PHRASING_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "i", "img",
    "ins", "kbd", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u",
    "var", "strike", "tt", "big", "label", "button", "input", "select", "svg",
];

/// Serializer switches derived from the effective options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    pub collapse_whitespace: bool,
    pub minify_inline: bool,
    pub preserve_links: bool,
    pub preserve_shortcodes: bool,
    /// Script id that is never minified.
    pub runtime_id: Option<&'static str>,
}

/// Serialize the fragment's top-level nodes.
pub fn serialize_fragment(doc: &Document, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    let root = fragment_root(doc);
    serialize_children(&root, opts, false, &mut out);
    if opts.collapse_whitespace {
        out.trim().to_string()
    } else {
        out
    }
}

fn serialize_children(parent: &NodeRef, opts: &SerializeOptions, verbatim: bool, out: &mut String) {
    let children = parent.children();
    let parent_tag = tag_name(parent).unwrap_or_default();
    let raw = RAW_TEXT_TAGS.contains(&parent_tag.as_str());

    for (idx, child) in children.iter().enumerate() {
        if child.is_text() {
            let text = child.text();
            if raw && verbatim {
                out.push_str(&text);
            } else if raw {
                out.push_str(&raw_text(parent, &parent_tag, &text, opts));
            } else if !opts.collapse_whitespace || verbatim || is_shortcode_text(&text, opts) {
                out.push_str(&escape_text(&text));
            } else if is_blank(&text) {
                let prev = idx.checked_sub(1).and_then(|i| children.get(i));
                let next = children.get(idx + 1);
                if is_phrasing(prev) && is_phrasing(next) {
                    out.push(' ');
                }
            } else {
                let collapsed = WHITESPACE_RUN.replace_all(&text, " ");
                out.push_str(&escape_text(&collapsed));
            }
        } else if child.is_element() {
            serialize_element(child, opts, verbatim, out);
        } else if child.is_comment() {
            out.push_str(&child.html());
        }
    }
}

fn serialize_element(node: &NodeRef, opts: &SerializeOptions, verbatim: bool, out: &mut String) {
    let name = match node.node_name() {
        Some(n) => n.to_string(),
        None => return,
    };
    let lower = name.to_ascii_lowercase();

    out.push('<');
    out.push_str(&name);
    for attr in node.attrs() {
        out.push(' ');
        match &attr.name.prefix {
            Some(prefix) => {
                out.push_str(prefix);
                out.push(':');
                out.push_str(&attr.name.local);
            }
            None => out.push_str(&attr.name.local),
        }
        out.push_str("=\"");
        out.push_str(&escape_attr(&attr.value));
        out.push('"');
    }
    out.push('>');

    if is_void_element(&lower) {
        return;
    }

    let keep_verbatim = verbatim
        || VERBATIM_TAGS.contains(&lower.as_str())
        || (opts.preserve_links && lower == "a");
    serialize_children(node, opts, keep_verbatim, out);

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn raw_text(parent: &NodeRef, parent_tag: &str, text: &str, opts: &SerializeOptions) -> String {
    if !opts.minify_inline {
        return text.to_string();
    }
    match parent_tag {
        "style" => minify_css(text),
        "script" => {
            let id = parent.attr("id");
            if opts.runtime_id.is_some() && id.as_deref() == opts.runtime_id {
                return text.to_string();
            }
            let ty = parent.attr("type");
            if should_minify_script(ty.as_deref(), parent.has_attr("src")) {
                minify_script(text, ty.as_deref())
            } else {
                text.to_string()
            }
        }
        _ => text.to_string(),
    }
}

fn is_shortcode_text(text: &str, opts: &SerializeOptions) -> bool {
    opts.preserve_shortcodes && SHORTCODE_RE.is_match(text)
}

fn is_phrasing(node: Option<&NodeRef>) -> bool {
    match node {
        Some(n) if n.is_text() => !is_blank(&n.text()),
        Some(n) => match tag_name(n) {
            Some(tag) => PHRASING_TAGS.contains(&tag.as_str()),
            None => false,
        },
        None => false,
    }
}

/// Escape text content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape attribute value.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Check if tag is void element
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::parse_fragment;
    use pretty_assertions::assert_eq;

    fn ser(html: &str, opts: SerializeOptions) -> String {
        serialize_fragment(&parse_fragment(html), &opts)
    }

    fn collapsing() -> SerializeOptions {
        SerializeOptions {
            collapse_whitespace: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_roundtrip_is_stable() {
        let html = r#"<p class="a">Hello <b>world</b> &amp; more</p><img src="x.jpg" alt=""><!-- note -->"#;
        let once = ser(html, SerializeOptions::default());
        assert_eq!(once, html);
        assert_eq!(ser(&once, SerializeOptions::default()), once);
    }

    #[test]
    fn test_collapse_inner_and_between_tags() {
        let out = ser("<p>  x  </p>\n\n<div>\n  <p>a   b</p>\n</div>", collapsing());
        assert_eq!(out, "<p> x </p><div><p>a b</p></div>");
    }

    #[test]
    fn test_collapse_keeps_space_between_inline_elements() {
        let out = ser("<p><b>a</b>   <i>b</i></p>", collapsing());
        assert_eq!(out, "<p><b>a</b> <i>b</i></p>");
    }

    #[test]
    fn test_collapse_leaves_nbsp_alone() {
        let out = ser("<p>a&nbsp;&nbsp; b</p><p>&nbsp;</p>", collapsing());
        assert_eq!(out, "<p>a&nbsp;&nbsp; b</p><p>&nbsp;</p>");
    }

    #[test]
    fn test_pre_is_verbatim() {
        let out = ser("<pre>  a\n   b</pre>", collapsing());
        assert_eq!(out, "<pre>  a\n   b</pre>");
    }

    #[test]
    fn test_preserved_links_are_verbatim() {
        let opts = SerializeOptions {
            collapse_whitespace: true,
            preserve_links: true,
            ..Default::default()
        };
        let out = ser("<p><a href=\"/x\">  spaced   text </a></p>", opts);
        assert_eq!(out, "<p><a href=\"/x\">  spaced   text </a></p>");
    }

    #[test]
    fn test_script_text_is_raw() {
        let out = ser("<script>if (a < b && c) {}</script>", SerializeOptions::default());
        assert_eq!(out, "<script>if (a < b && c) {}</script>");
    }

    #[test]
    fn test_minify_inline_style_and_script() {
        let opts = SerializeOptions {
            minify_inline: true,
            ..Default::default()
        };
        let out = ser(
            "<style>\n  /* hero */\n  .a {  color: red; }\n</style><script>\n  // init\n  var x = 1;\n</script>",
            opts,
        );
        assert!(out.starts_with("<style>.a{color:red}</style><script>"), "{}", out);
        assert!(out.ends_with("</script>"), "{}", out);
    }

    #[test]
    fn test_external_and_runtime_scripts_not_minified() {
        let opts = SerializeOptions {
            minify_inline: true,
            runtime_id: Some("rt"),
            ..Default::default()
        };
        let out = ser("<script id=\"rt\">  // keep\n  go();</script>", opts);
        assert_eq!(out, "<script id=\"rt\">  // keep\n  go();</script>");
    }

    #[test]
    fn test_svg_attribute_prefix_and_case() {
        let out = ser(
            r##"<svg viewBox="0 0 1 1"><use xlink:href="#a"></use></svg>"##,
            SerializeOptions::default(),
        );
        assert!(out.contains("viewBox=\"0 0 1 1\""), "{}", out);
        assert!(out.contains("xlink:href=\"#a\""), "{}", out);
    }

    #[test]
    fn test_shortcode_text_not_collapsed() {
        let opts = SerializeOptions {
            collapse_whitespace: true,
            preserve_shortcodes: true,
            ..Default::default()
        };
        let out = ser("<p>[gallery   ids=\"1,2\"]</p>", opts);
        assert_eq!(out, "<p>[gallery   ids=\"1,2\"]</p>");
    }
}
