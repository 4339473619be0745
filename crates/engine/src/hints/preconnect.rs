// ABOUTME: Collects the external origins a document loads from and queues preconnect hints for them.
// ABOUTME: Origins already hinted in the document are skipped so repeated runs add nothing.

use std::collections::HashSet;

use dom_query::Document;

use super::absolute_url;
use crate::dom::compiled::select_all;
use crate::dom::serialize::escape_attr;
use crate::dom::tree::{attr, in_facade};
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

const HINT_RELS: &[&str] = &["preconnect", "dns-prefetch"];
const FONT_FILES_ORIGIN: &str = "https://fonts.gstatic.com";

/// A single preconnect hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub origin: String,
    pub crossorigin: bool,
}

impl Hint {
    pub fn to_markup(&self) -> String {
        if self.crossorigin {
            format!(
                r#"<link rel="preconnect" href="{}" crossorigin="">"#,
                escape_attr(&self.origin)
            )
        } else {
            format!(r#"<link rel="preconnect" href="{}">"#, escape_attr(&self.origin))
        }
    }
}

fn rel_tokens(rel: &str) -> Vec<String> {
    rel.split_whitespace().map(|t| t.to_ascii_lowercase()).collect()
}

fn origin_of(url: &str) -> Option<String> {
    Some(absolute_url(url)?.origin().ascii_serialization())
}

/// Origins in document order, de-duplicated against existing hints.
pub fn collect_hints(doc: &Document) -> Vec<Hint> {
    let mut existing: HashSet<String> = HashSet::new();
    let mut sources: Vec<String> = Vec::new();
    let mut wants_font_files = false;

    for link in select_all(doc, "link[href]") {
        let Some(href) = attr(&link, "href") else {
            continue;
        };
        let rels = rel_tokens(&attr(&link, "rel").unwrap_or_default());
        if rels.iter().any(|r| HINT_RELS.contains(&r.as_str())) {
            if let Some(origin) = origin_of(&href) {
                existing.insert(origin);
            }
            continue;
        }
        if href.contains("fonts.googleapis.com/css") {
            wants_font_files = true;
        }
        sources.push(href);
    }
    for script in select_all(doc, "script[src]") {
        sources.extend(attr(&script, "src"));
    }
    for img in select_all(doc, "img[src]") {
        if !in_facade(&img) {
            sources.extend(attr(&img, "src"));
        }
    }

    let mut seen = existing;
    let mut hints = Vec::new();
    for origin in sources.iter().filter_map(|s| origin_of(s)) {
        if seen.insert(origin.clone()) {
            hints.push(Hint {
                origin,
                crossorigin: false,
            });
        }
    }
    if wants_font_files && seen.insert(FONT_FILES_ORIGIN.to_string()) {
        hints.push(Hint {
            origin: FONT_FILES_ORIGIN.to_string(),
            crossorigin: true,
        });
    }
    hints
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let hints = collect_hints(doc);
    if hints.is_empty() {
        return Ok(());
    }
    ctx.log(format!(
        "Added {} preconnect hint(s) for third-party origins.",
        hints.len()
    ));
    ctx.hints.extend(hints.iter().map(Hint::to_markup));
    Ok(())
}
