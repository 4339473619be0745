// ABOUTME: Tree sanitizer: comment stripping and empty-attribute removal with preservation exceptions.
// ABOUTME: Links, iframes, and shortcode-bearing blocks are shielded according to the effective options.

use dom_query::{Document, NodeRef};

use super::serialize::SHORTCODE_RE;
use super::tree::{fragment_root, tag_name};
use crate::error::OptimizeError;
use crate::options::CleaningOptions;
use crate::pipeline::PassContext;

/// Attributes whose presence alone carries meaning.
const BOOLEAN_ATTRS: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "crossorigin",
    "default",
    "defer",
    "disabled",
    "download",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

/// Attributes whose empty value differs from absence.
const MEANINGFUL_EMPTY_ATTRS: &[&str] = &["alt", "value"];

/// What a node's ancestry shields it from.
fn is_shielded(node: &NodeRef, opts: &CleaningOptions) -> bool {
    let iframes = opts.preserve_iframes && !opts.lazy_load_embeds;
    let mut current = Some(node.clone());
    while let Some(n) = current {
        match tag_name(&n).as_deref() {
            Some("a") if opts.preserve_links => return true,
            Some("iframe") if iframes => return true,
            _ => {}
        }
        current = n.parent();
    }
    false
}

fn has_shortcode_text(node: &NodeRef) -> bool {
    node.is_text() && SHORTCODE_RE.is_match(&node.text())
}

fn has_shortcode_sibling(node: &NodeRef) -> bool {
    node.parent()
        .is_some_and(|p| p.children().iter().any(has_shortcode_text))
}

pub fn strip_comments(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let opts = ctx.options;
    let mut removed = 0usize;

    for node in fragment_root(doc).descendants() {
        if !node.is_comment() {
            continue;
        }
        if is_shielded(&node, opts) {
            continue;
        }
        if opts.preserve_shortcodes && has_shortcode_sibling(&node) {
            continue;
        }
        node.remove_from_parent();
        removed += 1;
    }

    if removed > 0 {
        ctx.log(format!("Removed {} HTML comment(s).", removed));
    }
    Ok(())
}

pub fn remove_empty_attributes(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let opts = ctx.options;
    let mut removed = 0usize;

    for node in fragment_root(doc).descendants() {
        if !node.is_element() || is_shielded(&node, opts) {
            continue;
        }
        if opts.preserve_shortcodes && node.children().iter().any(has_shortcode_text) {
            continue;
        }

        let empty: Vec<String> = node
            .attrs()
            .iter()
            .filter(|a| a.value.chars().all(|c| c.is_ascii_whitespace()))
            .map(|a| a.name.local.to_string())
            .filter(|name| {
                let lower = name.to_ascii_lowercase();
                !BOOLEAN_ATTRS.contains(&lower.as_str())
                    && !MEANINGFUL_EMPTY_ATTRS.contains(&lower.as_str())
            })
            .collect();
        for name in &empty {
            node.remove_attr(name);
        }
        removed += empty.len();
    }

    if removed > 0 {
        ctx.log(format!("Removed {} empty attribute(s).", removed));
    }
    Ok(())
}
