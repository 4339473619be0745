// ABOUTME: Pre-compiled CSS selector cache shared by every pass.
// ABOUTME: Selectors are compiled once; invalid selectors yield an empty match instead of a panic.

use std::collections::HashMap;
use std::sync::RwLock;

use dom_query::{Document, Matcher, NodeRef};
use once_cell::sync::Lazy;

/// Thread-safe cache of compiled CSS selectors.
///
/// Concurrent runs on different documents share it; entries are never removed.
static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Matcher>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Gets or compiles a CSS selector, caching the result.
///
/// Returns `Some(Matcher)` if the selector is valid, `None` if invalid.
pub fn get_or_compile(css: &str) -> Option<Matcher> {
    {
        let cache = SELECTOR_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = Matcher::new(css).ok();
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(|e| e.into_inner());
    if let Some(cached) = cache.get(css) {
        return cached.clone();
    }
    cache.insert(css.to_string(), compiled.clone());
    compiled
}

/// Select nodes matching `css` in document order.
///
/// An invalid selector logs a warning and matches nothing, so a bad pattern
/// degrades one pass instead of aborting the run.
pub fn select_all<'a>(doc: &'a Document, css: &str) -> Vec<NodeRef<'a>> {
    match get_or_compile(css) {
        Some(matcher) => doc.select_matcher(&matcher).nodes().to_vec(),
        None => {
            tracing::warn!(selector = css, "invalid selector skipped");
            Vec::new()
        }
    }
}
