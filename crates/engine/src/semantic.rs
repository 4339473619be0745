// ABOUTME: Tree-based semantic tag rewrite: presentational tags become their semantic equivalents.
// ABOUTME: b→strong, i→em, strike→del, tt→code; icon <i> elements and preserved links are skipped.

use dom_query::{Document, NodeRef};

use crate::dom::compiled::select_all;
use crate::dom::serialize::escape_attr;
use crate::dom::tree::{in_facade, tag_name};
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

const REWRITES: &[(&str, &str)] = &[("b", "strong"), ("i", "em"), ("strike", "del"), ("tt", "code")];

fn replacement_for(node: &NodeRef) -> Option<&'static str> {
    let tag = tag_name(node)?;
    let to = REWRITES
        .iter()
        .find(|(from, _)| *from == tag)
        .map(|(_, to)| *to)?;
    // <i class="fa fa-star"> is an icon, not emphasis.
    if tag == "i" && node.has_attr("class") {
        return None;
    }
    Some(to)
}

fn open_tag(name: &str, node: &NodeRef) -> String {
    let mut out = format!("<{}", name);
    for attr in node.attrs() {
        out.push(' ');
        out.push_str(&attr.name.local);
        out.push_str("=\"");
        out.push_str(&escape_attr(&attr.value));
        out.push('"');
    }
    out.push('>');
    out
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut rewritten = 0usize;

    // Innermost first, so an outer element's inner markup already carries the rewritten children.
    let mut nodes = select_all(doc, "b, i, strike, tt");
    nodes.reverse();

    for node in nodes {
        let Some(to) = replacement_for(&node) else {
            continue;
        };
        if in_facade(&node) || ctx.in_preserved_link(&node) {
            continue;
        }
        let markup = format!("{}{}</{}>", open_tag(to, &node), node.inner_html(), to);
        node.replace_with_html(markup);
        rewritten += 1;
    }

    if rewritten > 0 {
        ctx.log(format!(
            "Rewrote {} presentational tag(s) to semantic equivalents.",
            rewritten
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

    fn rewrite(html: &str, keys: &[OptionKey]) -> String {
        let doc = parse_fragment(html);
        let opts = CleaningOptions::with(keys);
        let config = OptimizerConfig::default();
        let mut ctx = PassContext::new(&opts, &config);
        run(&doc, &mut ctx).unwrap();
        serialize_fragment(&doc, &SerializeOptions::default())
    }

    #[test]
    fn test_rewrites_nested_tags_with_attributes() {
        assert_eq!(
            rewrite(
                r#"<p><b id="k">bold <i>both</i></b> <strike>old</strike> <tt>x &lt; y</tt></p>"#,
                &[OptionKey::SemanticRewrite],
            ),
            r#"<p><strong id="k">bold <em>both</em></strong> <del>old</del> <code>x &lt; y</code></p>"#
        );
    }

    #[test]
    fn test_icon_italics_kept() {
        let html = r#"<p><i class="fa fa-star"></i> rated</p>"#;
        assert_eq!(rewrite(html, &[OptionKey::SemanticRewrite]), html);
    }

    #[test]
    fn test_preserved_links_untouched() {
        let html = r#"<a href="/x"><b>go</b></a><b>out</b>"#;
        assert_eq!(
            rewrite(html, &[OptionKey::SemanticRewrite, OptionKey::PreserveLinks]),
            r#"<a href="/x"><b>go</b></a><strong>out</strong>"#
        );
    }
}
