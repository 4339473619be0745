// ABOUTME: Defers non-critical stylesheets with the media=print swap and a <noscript> fallback.
// ABOUTME: Critical stylesheets (by keyword), web font CSS, and already-deferred links are left alone.

use dom_query::{Document, NodeRef};

use crate::dom::compiled::select_all;
use crate::dom::tree::{attr, has_ancestor_tag};
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

fn is_stylesheet(link: &NodeRef) -> bool {
    attr(link, "rel").is_some_and(|rel| {
        rel.split_whitespace()
            .any(|t| t.eq_ignore_ascii_case("stylesheet"))
    })
}

fn is_already_deferred(link: &NodeRef) -> bool {
    let media_print = attr(link, "media").is_some_and(|m| m.trim().eq_ignore_ascii_case("print"));
    let swaps = attr(link, "onload").is_some_and(|o| o.contains("this.media"));
    media_print && swaps
}

/// Keyword heuristic over the link's href, id and class.
fn is_critical(link: &NodeRef, keywords: &[String]) -> bool {
    let haystack = ["href", "id", "class"]
        .iter()
        .filter_map(|name| attr(link, name))
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    keywords
        .iter()
        .any(|k| haystack.contains(&k.to_ascii_lowercase()))
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut deferred = 0usize;
    let mut critical = 0usize;

    for link in select_all(doc, "link[rel][href]") {
        if !is_stylesheet(&link)
            || has_ancestor_tag(&link, "noscript")
            || ctx.in_preserved_link(&link)
        {
            continue;
        }
        let href = attr(&link, "href").unwrap_or_default();
        if href.contains("fonts.googleapis.com") || is_already_deferred(&link) {
            continue;
        }
        if is_critical(&link, &ctx.config.critical_css_keywords) {
            critical += 1;
            continue;
        }

        let original = link.html().to_string();
        let media = attr(&link, "media")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "all".to_string());
        link.set_attr("media", "print");
        link.set_attr(
            "onload",
            &format!("this.onload=null;this.media='{}'", media.replace('\'', "")),
        );
        let deferred_markup = link.html().to_string();
        link.replace_with_html(format!("{}<noscript>{}</noscript>", deferred_markup, original));
        deferred += 1;
    }

    if deferred > 0 {
        ctx.log(format!(
            "Deferred {} non-critical stylesheet(s) with a noscript fallback.",
            deferred
        ));
    }
    if critical > 0 {
        tracing::debug!(count = critical, "critical stylesheets kept render-blocking");
    }
    Ok(())
}
