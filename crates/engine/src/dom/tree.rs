// ABOUTME: Parsing and traversal helpers over the dom_query fragment tree.
// ABOUTME: Locates the fragment root, names nodes, counts elements, and answers facade ancestry questions.

use dom_query::{Document, NodeRef};

use crate::embeds::kinds::FacadeKind;

/// Parse an HTML body fragment.
///
/// html5ever never rejects input: malformed or partial markup (editor
/// clipboard fragments, unclosed tags) is repaired the way a browser would.
pub fn parse_fragment(html: &str) -> Document {
    Document::fragment(html)
}

/// The element whose children are the fragment's top-level nodes.
///
/// Fragment parsing wraps content in a synthetic `<html>` element; when that
/// wrapper is absent the document root itself is returned.
pub fn fragment_root(doc: &Document) -> NodeRef<'_> {
    let root = doc.root();
    root.children()
        .into_iter()
        .find(|child| tag_name(child).as_deref() == Some("html"))
        .unwrap_or(root)
}

/// Lower-cased tag name for element nodes, `None` for everything else.
pub fn tag_name(node: &NodeRef) -> Option<String> {
    if !node.is_element() {
        return None;
    }
    node.node_name().map(|name| name.to_ascii_lowercase())
}

/// Returns true if `node` is an element with the given (lower-case) tag.
pub fn is_tag(node: &NodeRef, tag: &str) -> bool {
    tag_name(node).as_deref() == Some(tag)
}

/// Attribute value as an owned string.
pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.attr(name).map(|v| v.to_string())
}

/// Number of elements in the fragment, excluding the synthetic wrapper.
pub fn count_elements(doc: &Document) -> usize {
    fragment_root(doc)
        .descendants()
        .iter()
        .filter(|n| n.is_element())
        .count()
}

/// Count elements in serialized markup.
pub fn count_elements_in(html: &str) -> usize {
    count_elements(&parse_fragment(html))
}

/// Returns true if `node` is, or sits inside, a facade placeholder.
pub fn in_facade(node: &NodeRef) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if n.is_element() && FacadeKind::of(&n).is_some() {
            return true;
        }
        current = n.parent();
    }
    false
}

/// Returns true if any ancestor (not `node` itself) has the given tag.
pub fn has_ancestor_tag(node: &NodeRef, tag: &str) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if is_tag(&n, tag) {
            return true;
        }
        current = n.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_root_holds_top_level_nodes() {
        let doc = parse_fragment("<p>one</p><p>two</p>");
        let root = fragment_root(&doc);
        let tags: Vec<String> = root.children().iter().filter_map(tag_name).collect();
        assert_eq!(tags, vec!["p", "p"]);
    }

    #[test]
    fn test_count_elements_excludes_wrapper() {
        let doc = parse_fragment("<div><p>x</p><img src=a.jpg></div>");
        assert_eq!(count_elements(&doc), 3);
        assert_eq!(count_elements_in(""), 0);
    }

    #[test]
    fn test_malformed_fragment_is_repaired() {
        let doc = parse_fragment("<p><b>unclosed <i>tags");
        assert_eq!(count_elements(&doc), 3);
    }

    #[test]
    fn test_in_facade_checks_self_and_ancestors() {
        let doc = parse_fragment(
            r#"<div class="lazy-tweet-facade"><p><span>x</span></p></div><span>y</span>"#,
        );
        let spans = crate::dom::compiled::select_all(&doc, "span");
        assert!(in_facade(&spans[0]));
        assert!(!in_facade(&spans[1]));
    }

    #[test]
    fn test_has_ancestor_tag() {
        let doc = parse_fragment("<a href=x><b>bold</b></a><b>plain</b>");
        let bolds = crate::dom::compiled::select_all(&doc, "b");
        assert!(has_ancestor_tag(&bolds[0], "a"));
        assert!(!has_ancestor_tag(&bolds[1], "a"));
    }
}
