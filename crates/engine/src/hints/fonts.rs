// ABOUTME: Appends `display=swap` to Google Fonts stylesheet URLs so text renders during font load.
// ABOUTME: The URL is edited as a string; existing display parameters are respected.

use dom_query::Document;

use crate::dom::compiled::select_all;
use crate::dom::tree::attr;
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

const FONT_LINK_SELECTOR: &str = r#"link[href*="fonts.googleapis.com/css"]"#;

/// Append `display=swap` unless the URL already sets a display strategy.
pub fn with_display_swap(href: &str) -> Option<String> {
    if href.contains("display=") {
        return None;
    }
    let (base, fragment) = match href.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (href, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut out = format!("{}{}display=swap", base, separator);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Some(out)
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut fixed = 0usize;
    for link in select_all(doc, FONT_LINK_SELECTOR) {
        if ctx.in_preserved_link(&link) {
            continue;
        }
        if let Some(updated) = attr(&link, "href").and_then(|href| with_display_swap(&href)) {
            link.set_attr("href", &updated);
            fixed += 1;
        }
    }
    if fixed > 0 {
        ctx.log(format!(
            "Added font-display: swap to {} web font stylesheet(s).",
            fixed
        ));
    }
    Ok(())
}
