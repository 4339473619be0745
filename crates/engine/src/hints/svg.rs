// ABOUTME: Inline SVG trimming: drops comments, metadata, title, desc, and empty defs.
// ABOUTME: Non-empty <defs> stay because <use> elements may reference them.

use dom_query::{Document, NodeRef};

use crate::dom::compiled::select_all;
use crate::dom::tree::{in_facade, tag_name};
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

const DROPPED_TAGS: &[&str] = &["metadata", "title", "desc"];

fn is_empty_defs(node: &NodeRef) -> bool {
    node.children()
        .iter()
        .all(|c| (c.is_text() && c.text().trim().is_empty()) || c.is_comment())
}

/// Trim one `<svg>`, returning the number of removed nodes.
fn trim_svg(svg: &NodeRef) -> usize {
    let mut removed = 0usize;
    for node in svg.descendants() {
        let drop = if node.is_comment() {
            true
        } else {
            match tag_name(&node).as_deref() {
                Some(tag) if DROPPED_TAGS.contains(&tag) => true,
                Some("defs") => is_empty_defs(&node),
                _ => false,
            }
        };
        if drop {
            node.remove_from_parent();
            removed += 1;
        }
    }
    removed
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut trimmed = 0usize;
    let mut nodes = 0usize;

    for svg in select_all(doc, "svg") {
        if in_facade(&svg) || ctx.in_preserved_link(&svg) {
            continue;
        }
        let removed = trim_svg(&svg);
        if removed > 0 {
            trimmed += 1;
            nodes += removed;
        }
    }

    if trimmed > 0 {
        ctx.log(format!(
            "Trimmed {} inline SVG(s), removing {} non-rendering node(s).",
            trimmed, nodes
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize::{serialize_fragment, SerializeOptions};
    use crate::dom::tree::parse_fragment;
    use crate::options::{CleaningOptions, OptimizerConfig, OptionKey};
    use pretty_assertions::assert_eq;

    fn trim(html: &str) -> (String, Vec<String>) {
        trim_with(html, &CleaningOptions::none())
    }

    fn trim_with(html: &str, opts: &CleaningOptions) -> (String, Vec<String>) {
        let doc = parse_fragment(html);
        let config = OptimizerConfig::default();
        let mut ctx = PassContext::new(opts, &config);
        run(&doc, &mut ctx).unwrap();
        (serialize_fragment(&doc, &SerializeOptions::default()), ctx.log)
    }

    #[test]
    fn test_removes_non_rendering_nodes() {
        let (out, log) = trim(
            r##"<svg viewBox="0 0 10 10"><!-- exported --><title>Logo</title><desc>d</desc><metadata>m</metadata><defs></defs><circle r="4"></circle></svg>"##,
        );
        assert_eq!(out, r#"<svg viewBox="0 0 10 10"><circle r="4"></circle></svg>"#);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_svg_inside_preserved_link_keeps_its_title() {
        let html = r#"<a href="/"><svg viewBox="0 0 1 1"><title>Home</title><rect width="1" height="1"></rect></svg></a>"#;
        let opts = CleaningOptions::with(&[OptionKey::PreserveLinks]);
        let (out, log) = trim_with(html, &opts);
        assert_eq!(out, html);
        assert!(log.is_empty());

        let (out, _) = trim(html);
        assert!(!out.contains("<title>"));
    }

    #[test]
    fn test_keeps_referenced_defs() {
        let html = r##"<svg><defs><path id="p" d="M0 0"></path></defs><use href="#p"></use></svg>"##;
        let (out, log) = trim(html);
        assert_eq!(out, html);
        assert!(log.is_empty());
    }
}
