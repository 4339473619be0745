// ABOUTME: Image passes: eager/lazy loading policy, dimension back-fill, responsive srcset, and format upgrade.
// ABOUTME: CDN-specific query parameters are edited as strings so the author's URL encoding is kept.

use dom_query::{Document, NodeRef};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{absolute_url, set_attr_if_changed};
use crate::dom::compiled::select_all;
use crate::dom::tree::{attr, in_facade};
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

static FILENAME_DIMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)-(\d{2,5})x(\d{2,5})\.(?:jpe?g|png|gif|webp|avif)$").unwrap());

/// Query parameters an image CDN understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cdn {
    pub width_param: &'static str,
    pub format_param: Option<&'static str>,
}

/// Recognize an image CDN by host.
pub fn cdn_for(src: &str) -> Option<Cdn> {
    let url = absolute_url(src)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let cdn = if host.ends_with(".wp.com") {
        Cdn {
            width_param: "w",
            format_param: None,
        }
    } else if host == "images.unsplash.com"
        || host.ends_with(".imgix.net")
        || host == "images.ctfassets.net"
        || host == "cdn.sanity.io"
    {
        Cdn {
            width_param: "w",
            format_param: Some("fm"),
        }
    } else if host == "cdn.shopify.com" {
        Cdn {
            width_param: "width",
            format_param: Some("format"),
        }
    } else {
        return None;
    };
    Some(cdn)
}

fn split_url(src: &str) -> (&str, Option<&str>, Option<&str>) {
    let (base, fragment) = match src.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (src, None),
    };
    match base.split_once('?') {
        Some((path, query)) => (path, Some(query), fragment),
        None => (base, None, fragment),
    }
}

/// Raw value of query parameter `key`.
pub fn query_param(src: &str, key: &str) -> Option<String> {
    let (_, query, _) = split_url(src);
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

/// Set query parameter `key`, replacing an existing value in place.
pub fn set_query_param(src: &str, key: &str, value: &str) -> String {
    let (path, query, fragment) = split_url(src);
    let mut replaced = false;
    let mut pairs: Vec<String> = query
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let name = pair.split_once('=').map_or(pair, |(k, _)| k);
            if name == key && !replaced {
                replaced = true;
                format!("{}={}", key, value)
            } else {
                pair.to_string()
            }
        })
        .collect();
    if !replaced {
        pairs.push(format!("{}={}", key, value));
    }

    let mut out = format!("{}?{}", path, pairs.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// `(width, height)` encoded in a WordPress-style file name such as `photo-800x600.jpg`.
pub fn filename_dimensions(src: &str) -> Option<(u32, u32)> {
    let (path, _, _) = split_url(src);
    let caps = FILENAME_DIMS_RE.captures(path)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

fn numeric_attr(node: &NodeRef, name: &str) -> Option<u32> {
    attr(node, name)?.trim().parse().ok().filter(|v: &u32| *v > 0)
}

fn content_images<'a>(doc: &'a Document) -> Vec<NodeRef<'a>> {
    select_all(doc, "img")
        .into_iter()
        .filter(|img| !in_facade(img))
        .collect()
}

fn editable_images<'a>(doc: &'a Document, ctx: &PassContext) -> Vec<NodeRef<'a>> {
    content_images(doc)
        .into_iter()
        .filter(|img| !ctx.in_preserved_link(img))
        .collect()
}

/// Fill in `width`/`height` from the file name when both are missing.
fn backfill_dimensions(img: &NodeRef) -> bool {
    if img.has_attr("width") || img.has_attr("height") {
        return false;
    }
    let Some((w, h)) = attr(img, "src").and_then(|src| filename_dimensions(&src)) else {
        return false;
    };
    img.set_attr("width", &w.to_string());
    img.set_attr("height", &h.to_string());
    true
}

/// Loading policy plus dimension back-fill.
pub fn run_loading(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut eager = 0usize;
    let mut lazy = 0usize;
    let mut sized = 0usize;

    for (index, img) in content_images(doc).iter().enumerate() {
        // A linked image keeps its position in the eager count.
        if ctx.in_preserved_link(img) {
            continue;
        }
        if ctx.options.lazy_load_images {
            if index < ctx.config.eager_images {
                let mut changed = set_attr_if_changed(img, "loading", "eager");
                if index == 0 {
                    changed |= set_attr_if_changed(img, "fetchpriority", "high");
                }
                eager += usize::from(changed);
            } else {
                let changed = set_attr_if_changed(img, "loading", "lazy")
                    | set_attr_if_changed(img, "decoding", "async");
                lazy += usize::from(changed);
            }
        }
        if ctx.options.optimize_images && backfill_dimensions(img) {
            sized += 1;
        }
    }

    if eager > 0 {
        ctx.log(format!(
            "Marked {} above-the-fold image(s) for eager, high-priority loading.",
            eager
        ));
    }
    if lazy > 0 {
        ctx.log(format!(
            "Added lazy loading and async decoding to {} image(s).",
            lazy
        ));
    }
    if sized > 0 {
        ctx.log(format!(
            "Added explicit width/height to {} image(s) to prevent layout shift.",
            sized
        ));
    }
    Ok(())
}

fn intrinsic_width(img: &NodeRef, src: &str, cdn: Cdn) -> Option<u32> {
    numeric_attr(img, "width")
        .or_else(|| query_param(src, cdn.width_param).and_then(|w| w.parse().ok()))
        .or_else(|| filename_dimensions(src).map(|(w, _)| w))
        .filter(|w| *w > 0)
}

/// Synthesize `srcset`/`sizes` for CDN-hosted images.
pub fn run_srcset(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut count = 0usize;

    for img in editable_images(doc, ctx) {
        if img.has_attr("srcset") {
            continue;
        }
        let Some(src) = attr(&img, "src") else {
            continue;
        };
        if src.contains(',') || src.contains(char::is_whitespace) {
            continue;
        }
        let Some(cdn) = cdn_for(&src) else {
            continue;
        };
        let Some(width) = intrinsic_width(&img, &src, cdn) else {
            continue;
        };

        let mut widths: Vec<u32> = ctx
            .config
            .srcset_widths
            .iter()
            .copied()
            .filter(|w| *w <= width)
            .collect();
        widths.push(width);
        widths.sort_unstable();
        widths.dedup();
        if widths.len() < 2 {
            continue;
        }

        let srcset = widths
            .iter()
            .map(|w| format!("{} {}w", set_query_param(&src, cdn.width_param, &w.to_string()), w))
            .collect::<Vec<_>>()
            .join(", ");
        img.set_attr("srcset", &srcset);
        if !img.has_attr("sizes") {
            img.set_attr("sizes", &format!("(max-width: {w}px) 100vw, {w}px", w = width));
        }
        count += 1;
    }

    if count > 0 {
        ctx.log(format!("Generated responsive srcset for {} image(s).", count));
    }
    Ok(())
}

fn upgrade_url(src: &str, format: &str) -> Option<String> {
    let (path, _, _) = split_url(src);
    if src.starts_with("data:") || path.to_ascii_lowercase().ends_with(".svg") {
        return None;
    }
    let param = cdn_for(src)?.format_param?;
    if query_param(src, param).as_deref() == Some(format) {
        return None;
    }
    Some(set_query_param(src, param, format))
}

fn upgrade_srcset(srcset: &str, format: &str) -> Option<String> {
    let mut changed = false;
    let candidates: Vec<String> = srcset
        .split(',')
        .map(|candidate| {
            let trimmed = candidate.trim();
            let (url, descriptor) = match trimmed.split_once(char::is_whitespace) {
                Some((u, d)) => (u, Some(d.trim())),
                None => (trimmed, None),
            };
            let url = match upgrade_url(url, format) {
                Some(upgraded) => {
                    changed = true;
                    upgraded
                }
                None => url.to_string(),
            };
            match descriptor {
                Some(d) => format!("{} {}", url, d),
                None => url,
            }
        })
        .collect();
    changed.then(|| candidates.join(", "))
}

/// Request a next-generation format from CDNs that support format negotiation.
pub fn run_format(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let format = if ctx.options.convert_to_avif { "avif" } else { "webp" };
    let mut count = 0usize;

    for img in editable_images(doc, ctx) {
        let mut changed = false;
        if let Some(upgraded) = attr(&img, "src").and_then(|src| upgrade_url(&src, format)) {
            img.set_attr("src", &upgraded);
            changed = true;
        }
        if let Some(upgraded) = attr(&img, "srcset").and_then(|set| upgrade_srcset(&set, format)) {
            img.set_attr("srcset", &upgraded);
            changed = true;
        }
        count += usize::from(changed);
    }

    if count > 0 {
        ctx.log(format!(
            "Requested {} format for {} CDN image(s).",
            format.to_uppercase(),
            count
        ));
    }
    Ok(())
}
