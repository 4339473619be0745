// ABOUTME: Replaces heavy embeds with lightweight click- or visibility-triggered placeholders.
// ABOUTME: Original markup is carried base64-encoded on the placeholder so the runtime can restore it exactly.

use dom_query::{Document, NodeRef};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::codec::encode_payload;
use super::kinds::{FacadeKind, Trigger};
use crate::dom::compiled::select_all;
use crate::dom::serialize::{escape_attr, escape_text};
use crate::dom::tree::{attr, in_facade, is_tag, tag_name};
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

static EMBED_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"embed/([^?&/"]+)"#).unwrap());
static TWEET_AUTHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"— (.*?) \(@").unwrap());

const TWEET_PREVIEW_CHARS: usize = 150;

const SOCIAL_KINDS: [FacadeKind; 4] = [
    FacadeKind::Tweet,
    FacadeKind::Instagram,
    FacadeKind::TikTok,
    FacadeKind::Reddit,
];

/// Extract a YouTube video id from an embed, watch, short or share URL.
pub fn youtube_video_id(src: &str) -> Option<String> {
    let absolute = if src.starts_with("//") {
        format!("https:{}", src)
    } else {
        src.to_string()
    };

    let from_url = Url::parse(&absolute).ok().and_then(|url| {
        let host = url.host_str()?.trim_start_matches("www.").to_string();
        let segments: Vec<String> = url.path_segments()?.map(|s| s.to_string()).collect();
        if host == "youtu.be" {
            return segments.first().cloned();
        }
        if !host.ends_with("youtube.com") && !host.ends_with("youtube-nocookie.com") {
            return None;
        }
        match segments.as_slice() {
            [prefix, id, ..] if matches!(prefix.as_str(), "embed" | "shorts" | "live" | "v") => {
                Some(id.clone())
            }
            _ => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
        }
    });

    from_url
        .or_else(|| EMBED_ID_RE.captures(src).map(|c| c[1].to_string()))
        .filter(|id| {
            !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

/// Attributes every placeholder of `kind` carries, rendered as markup.
fn contract_attrs(kind: FacadeKind) -> String {
    let mut attrs = format!(r#"class="{}" data-facade="{}""#, kind.class_name(), kind.as_str());
    if kind.trigger() == Trigger::Click {
        attrs.push_str(r#" role="button" tabindex="0""#);
    }
    attrs
}

fn numeric_attr(node: &NodeRef, name: &str) -> Option<u32> {
    attr(node, name)?
        .trim()
        .trim_end_matches("px")
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
}

/// `width:…;aspect-ratio:…` from the element's own dimensions.
fn sizing_style(node: &NodeRef) -> String {
    let width = numeric_attr(node, "width");
    let height = numeric_attr(node, "height");
    let width_css = width
        .map(|w| format!("{}px", w))
        .unwrap_or_else(|| "100%".to_string());
    let ratio = match (width, height) {
        (Some(w), Some(h)) => format!("{}/{}", w, h),
        _ => "16/9".to_string(),
    };
    format!("width:{};max-width:100%;aspect-ratio:{};", width_css, ratio)
}

const YOUTUBE_PLAY_ICON: &str = r##"<svg viewBox="0 0 68 48" style="width:68px;height:48px;filter:drop-shadow(0 0 5px rgba(0,0,0,0.5));"><path d="M66.52,7.74c-0.78-2.93-2.49-5.41-5.42-6.19C55.79,.13,34,0,34,0S12.21,.13,6.9,1.55C3.97,2.33,2.27,4.81,1.48,7.74C0.06,13.05,0,24,0,24s0.06,10.95,1.48,16.26c0.78,2.93,2.49,5.41,5.42,6.19C12.21,47.87,34,48,34,48s21.79-0.13,27.1-1.55c2.93-0.78,4.64-3.26,5.42-6.19C67.94,34.95,68,24,68,24S67.94,13.05,66.52,7.74z" fill="#f00"></path><path d="M45,24 27,14 27,34" fill="#fff"></path></svg>"##;

const X_LOGO: &str = r#"<svg viewBox="0 0 24 24" aria-hidden="true" fill="currentColor" style="width:24px;height:24px;"><path d="M18.244 2.25h3.308l-7.227 8.26 8.502 11.24H16.17l-5.214-6.817L4.99 21.75H1.68l7.73-8.835L1.254 2.25H8.08l4.713 6.231zm-1.161 17.52h1.833L7.084 4.126H5.117z"></path></svg>"#;

const INSTAGRAM_LOGO: &str = r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" style="width:32px;height:32px;margin-right:10px;vertical-align:middle;"><rect x="2" y="2" width="20" height="20" rx="5" ry="5"></rect><path d="M16 11.37A4 4 0 1 1 12.63 8 4 4 0 0 1 16 11.37z"></path><line x1="17.5" y1="6.5" x2="17.51" y2="6.5"></line></svg>"#;

const TIKTOK_LOGO: &str = r#"<svg viewBox="0 0 24 24" fill="currentColor" style="width:28px;height:28px;"><path d="M16.6 5.82A4.28 4.28 0 0 1 15.54 3h-3.09v12.4a2.59 2.59 0 0 1-2.59 2.5 2.59 2.59 0 0 1 0-5.18c.27 0 .53.04.78.12V9.67a5.73 5.73 0 0 0-.78-.05A5.73 5.73 0 1 0 15.6 15.4V9.01a7.35 7.35 0 0 0 4.3 1.38V7.3a4.3 4.3 0 0 1-3.3-1.48z"></path></svg>"#;

const REDDIT_LOGO: &str = r#"<svg viewBox="0 0 24 24" fill="currentColor" style="width:28px;height:28px;"><circle cx="12" cy="13" r="7"></circle><circle cx="18.5" cy="5.5" r="1.5"></circle></svg>"#;

const CARD_STYLE: &str = "border:1px solid #374151;border-radius:12px;padding:16px;cursor:pointer;background-color:#1a202c;color:#e5e7eb;font-family:system-ui,sans-serif;font-size:15px;line-height:1.4;margin:1rem auto;";
const BUTTON_STYLE: &str = "text-align:center;padding:10px;border:1px solid #374151;border-radius:9999px;font-weight:bold;color:#fff;pointer-events:none;";

fn youtube_placeholder(iframe: &NodeRef, id: &str, src: &str) -> String {
    format!(
        r#"<div {attrs} data-video-id="{id}" data-original-src="{src}" aria-label="Play video" style="position:relative;cursor:pointer;{sizing}background-image:url(https://i.ytimg.com/vi/{id}/hqdefault.jpg);background-size:cover;background-position:center;border-radius:8px;overflow:hidden;"><div style="position:absolute;top:0;left:0;width:100%;height:100%;display:flex;align-items:center;justify-content:center;background:rgba(0,0,0,0.2);pointer-events:none;">{icon}</div></div>"#,
        attrs = contract_attrs(FacadeKind::YouTube),
        id = escape_attr(id),
        src = escape_attr(src),
        sizing = sizing_style(iframe),
        icon = YOUTUBE_PLAY_ICON,
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

/// Decorative inner markup of a social placeholder. Nothing here is interactive.
fn social_card(kind: FacadeKind, original: &NodeRef) -> (String, String) {
    match kind {
        FacadeKind::Tweet => {
            let full_text = original.text().to_string();
            let author = TWEET_AUTHOR_RE
                .captures(&full_text)
                .map(|c| c[1].trim().to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "X User".to_string());
            let body = original
                .descendants()
                .into_iter()
                .find(|n| is_tag(n, "p"))
                .map(|p| p.text().trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "A tweet from X.".to_string());
            let inner = format!(
                r#"<div style="display:flex;align-items:center;margin-bottom:12px;pointer-events:none;"><div style="width:48px;height:48px;background-color:#374151;border-radius:9999px;display:flex;align-items:center;justify-content:center;margin-right:12px;">{logo}</div><div><strong style="color:#fff;">{author}</strong><div style="color:#8899a6;">View on X</div></div></div><p style="margin:0 0 16px 0;pointer-events:none;">{body}</p><div style="{button}">Load Tweet</div>"#,
                logo = X_LOGO,
                author = escape_text(&author),
                body = escape_text(&truncate_chars(&body, TWEET_PREVIEW_CHARS)),
                button = BUTTON_STYLE,
            );
            (format!("{}max-width:550px;", CARD_STYLE), inner)
        }
        FacadeKind::Instagram => (
            "position:relative;cursor:pointer;width:100%;max-width:540px;margin:1rem auto;border:1px solid #374151;border-radius:8px;display:flex;align-items:center;justify-content:center;aspect-ratio:1/1.2;background-color:#1a202c;color:#e5e7eb;font-family:sans-serif;".to_string(),
            format!(
                r#"<div style="pointer-events:none;">{}Load Instagram Post</div>"#,
                INSTAGRAM_LOGO
            ),
        ),
        FacadeKind::TikTok => (
            format!("{}max-width:325px;", CARD_STYLE),
            format!(
                r#"<div style="display:flex;align-items:center;margin-bottom:12px;pointer-events:none;">{logo}</div><p style="margin:0 0 16px 0;pointer-events:none;">A video from TikTok.</p><div style="{button}">Load TikTok Video</div>"#,
                logo = TIKTOK_LOGO,
                button = BUTTON_STYLE,
            ),
        ),
        _ => (
            format!("{}max-width:550px;", CARD_STYLE),
            format!(
                r#"<div style="display:flex;align-items:center;margin-bottom:12px;pointer-events:none;">{logo}<span style="margin-left:8px;">Reddit</span></div><div style="{button}">Load Reddit Post</div>"#,
                logo = REDDIT_LOGO,
                button = BUTTON_STYLE,
            ),
        ),
    }
}

fn social_placeholder(kind: FacadeKind, original: &NodeRef) -> Option<String> {
    let payload_attr = kind.payload_attr()?;
    let payload = encode_payload(&original.html());
    let (style, inner) = social_card(kind, original);
    Some(format!(
        r#"<div {attrs} {payload_attr}="{payload}" style="{style}">{inner}</div>"#,
        attrs = contract_attrs(kind),
    ))
}

fn video_placeholder(video: &NodeRef) -> Option<String> {
    let payload_attr = FacadeKind::Video.payload_attr()?;
    let payload = encode_payload(&video.html());
    let poster = attr(video, "poster")
        .map(|p| {
            format!(
                "background-image:url('{}');background-size:cover;background-position:center;",
                escape_attr(&p.replace('\'', "%27"))
            )
        })
        .unwrap_or_default();
    Some(format!(
        r##"<div {attrs} {payload_attr}="{payload}" style="position:relative;{sizing}background-color:#000;{poster}"><div style="position:absolute;top:0;left:0;width:100%;height:100%;display:flex;align-items:center;justify-content:center;pointer-events:none;"><svg viewBox="0 0 24 24" fill="#fff" style="width:48px;height:48px;opacity:0.8;"><path d="M8 5v14l11-7z"></path></svg></div></div>"##,
        attrs = contract_attrs(FacadeKind::Video),
        sizing = sizing_style(video),
    ))
}

/// Remove the platform loader script that directly follows an embed.
fn remove_adjacent_loader(kind: FacadeKind, node: &NodeRef) -> bool {
    let Some(loader) = kind.loader() else {
        return false;
    };
    match node.next_element_sibling() {
        Some(next)
            if is_tag(&next, "script")
                && attr(&next, "src").is_some_and(|src| src.contains(loader.pattern)) =>
        {
            next.remove_from_parent();
            true
        }
        _ => false,
    }
}

fn log_count(ctx: &mut PassContext, count: usize, what: &str) {
    if count > 0 {
        ctx.log(format!(
            "Replaced {} {} with lightweight click-to-load facade(s).",
            count, what
        ));
    }
}

/// Facade YouTube iframes, social blockquotes and `<video>` elements.
///
/// A social blockquote is consumed whole, links included: the `<a>` elements
/// inside it leave the live tree and come back byte-for-byte when the
/// placeholder restores its payload. Embeds that sit inside a preserved link
/// are not touched.
pub fn run_embeds(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut youtube = 0usize;
    for iframe in select_all(doc, FacadeKind::YouTube.source_selector()) {
        if in_facade(&iframe) || ctx.in_preserved_link(&iframe) {
            continue;
        }
        let Some(src) = attr(&iframe, "src") else {
            continue;
        };
        let Some(id) = youtube_video_id(&src) else {
            tracing::warn!(src = %src, "could not extract YouTube id, iframe kept");
            continue;
        };
        iframe.replace_with_html(youtube_placeholder(&iframe, &id, &src));
        youtube += 1;
    }
    log_count(ctx, youtube, "YouTube embed(s)");

    for kind in SOCIAL_KINDS {
        let mut replaced = 0usize;
        let mut loaders = 0usize;
        for quote in select_all(doc, kind.source_selector()) {
            if in_facade(&quote) || ctx.in_preserved_link(&quote) {
                continue;
            }
            if remove_adjacent_loader(kind, &quote) {
                loaders += 1;
            }
            if let Some(markup) = social_placeholder(kind, &quote) {
                quote.replace_with_html(markup);
                replaced += 1;
            }
        }
        log_count(ctx, replaced, &format!("{} embed(s)", kind));
        if loaders > 0 {
            ctx.log(format!("Removed {} inline {} loader script(s).", loaders, kind));
        }
    }

    let mut videos = 0usize;
    for video in select_all(doc, FacadeKind::Video.source_selector()) {
        if in_facade(&video) || ctx.in_preserved_link(&video) {
            continue;
        }
        if let Some(markup) = video_placeholder(&video) {
            video.replace_with_html(markup);
            videos += 1;
        }
    }
    if videos > 0 {
        ctx.log(format!(
            "Deferred {} <video> element(s) until scrolled into view.",
            videos
        ));
    }

    Ok(())
}

/// Split an inline style into declarations, ignoring `;` inside quotes or parentheses.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => {
                    parts.push(&style[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&style[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Remove the `background-image` declaration, returning its value and the remaining style.
fn take_background_image(style: &str) -> Option<(String, String)> {
    let mut image = None;
    let mut kept = Vec::new();
    for decl in split_declarations(style) {
        match decl.split_once(':') {
            Some((prop, value))
                if prop.trim().eq_ignore_ascii_case("background-image")
                    && value.to_ascii_lowercase().contains("url(") =>
            {
                image = Some(value.trim().to_string());
            }
            _ => kept.push(decl.trim()),
        }
    }
    image.map(|value| (value, kept.join(";")))
}

/// Turn elements with an inline `background-image: url(…)` into visibility-triggered placeholders.
pub fn run_backgrounds(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let kind = FacadeKind::BackgroundImage;
    let Some(payload_attr) = kind.payload_attr() else {
        return Ok(());
    };
    let mut deferred = 0usize;

    for node in select_all(doc, kind.source_selector()) {
        if in_facade(&node) || tag_name(&node).is_none() || ctx.in_preserved_link(&node) {
            continue;
        }
        let Some(style) = attr(&node, "style") else {
            continue;
        };
        let Some((image, remaining)) = take_background_image(&style) else {
            continue;
        };

        if remaining.is_empty() {
            node.remove_attr("style");
        } else {
            node.set_attr("style", &remaining);
        }
        let class = match attr(&node, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), kind.class_name())
            }
            _ => kind.class_name().to_string(),
        };
        node.set_attr("class", &class);
        node.set_attr("data-facade", kind.as_str());
        node.set_attr(payload_attr, &encode_payload(&image));
        deferred += 1;
    }

    if deferred > 0 {
        ctx.log(format!(
            "Deferred {} CSS background image(s) until scrolled into view.",
            deferred
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize::{serialize_fragment, SerializeOptions};
    use crate::dom::tree::parse_fragment;
    use crate::embeds::codec::decode_payload;
    use crate::options::{CleaningOptions, OptimizerConfig};

    fn run_pass(
        html: &str,
        pass: fn(&Document, &mut PassContext) -> Result<(), OptimizeError>,
    ) -> (String, Vec<String>) {
        let doc = parse_fragment(html);
        let opts = CleaningOptions::none();
        let config = OptimizerConfig::default();
        let mut ctx = PassContext::new(&opts, &config);
        pass(&doc, &mut ctx).unwrap();
        (serialize_fragment(&doc, &SerializeOptions::default()), ctx.log)
    }

    #[test]
    fn test_youtube_video_id_variants() {
        let cases = [
            ("https://www.youtube.com/embed/abc123XYZ_-?rel=0", "abc123XYZ_-"),
            ("//www.youtube-nocookie.com/embed/abc123", "abc123"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1", "dQw4w9WgXcQ"),
            ("https://youtu.be/dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("https://www.youtube.com/shorts/short1", "short1"),
        ];
        for (src, id) in cases {
            assert_eq!(youtube_video_id(src).as_deref(), Some(id), "{}", src);
        }
        assert_eq!(youtube_video_id("https://vimeo.com/123"), None);
    }

    #[test]
    fn test_youtube_iframe_becomes_placeholder() {
        let (out, log) = run_pass(
            r#"<iframe width="640" height="360" src="https://www.youtube.com/embed/abc123?rel=0" allowfullscreen></iframe>"#,
            run_embeds,
        );
        assert!(!out.contains("<iframe"));
        assert!(out.contains(r#"class="lazy-youtube-embed""#));
        assert!(out.contains(r#"data-video-id="abc123""#));
        assert!(out.contains(r#"data-original-src="https://www.youtube.com/embed/abc123?rel=0""#));
        assert!(out.contains("aspect-ratio:640/360"));
        assert!(out.contains("https://i.ytimg.com/vi/abc123/hqdefault.jpg"));
        assert!(out.contains(r#"role="button""#));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_tweet_payload_roundtrips_and_loader_removed() {
        let tweet = r#"<blockquote class="twitter-tweet" data-theme="dark"><p lang="en">Hello &amp; welcome</p>— Jack (@jack) <a href="https://twitter.com/jack/status/20">March 21, 2006</a></blockquote>"#;
        let html = format!(
            r#"{}<script async src="https://platform.twitter.com/widgets.js" charset="utf-8"></script>"#,
            tweet
        );
        let (out, log) = run_pass(&html, run_embeds);
        assert!(!out.contains("<script"));
        assert!(!out.contains("<blockquote"));
        assert!(out.contains("<strong style=\"color:#fff;\">Jack</strong>"));
        assert!(out.contains("Hello &amp; welcome"));
        assert_eq!(log.len(), 2);

        let doc = parse_fragment(&out);
        let placeholder = &select_all(&doc, ".lazy-tweet-facade")[0];
        let payload = placeholder.attr("data-tweet-html").unwrap().to_string();
        assert_eq!(decode_payload(&payload).unwrap(), tweet);
    }

    #[test]
    fn test_decorative_markup_is_not_interactive() {
        let (out, _) = run_pass(
            r#"<blockquote class="tiktok-embed" cite="https://www.tiktok.com/@a/video/1"><section></section></blockquote>"#,
            run_embeds,
        );
        let doc = parse_fragment(&out);
        let placeholder = &select_all(&doc, ".lazy-tiktok-facade")[0];
        for child in placeholder.children().iter().filter(|c| c.is_element()) {
            let style = child.attr("style").map(|s| s.to_string()).unwrap_or_default();
            assert!(style.contains("pointer-events:none"), "{}", style);
        }
    }

    #[test]
    fn test_existing_placeholder_not_rewrapped() {
        let (first, _) = run_pass(
            r#"<blockquote class="instagram-media"><a href="https://instagram.com/p/1">post</a></blockquote>"#,
            run_embeds,
        );
        let (second, log) = run_pass(&first, run_embeds);
        assert_eq!(first, second);
        assert!(log.is_empty());
    }

    #[test]
    fn test_video_is_encoded_whole() {
        let video = r#"<video controls="" poster="/p.jpg" width="320" height="180"><source src="/m.mp4" type="video/mp4"></video>"#;
        let (out, _) = run_pass(video, run_embeds);
        let doc = parse_fragment(&out);
        let placeholder = &select_all(&doc, ".lazy-video-facade")[0];
        assert!(placeholder.attr("role").is_none());
        let payload = placeholder.attr("data-video-html").unwrap().to_string();
        assert_eq!(decode_payload(&payload).unwrap(), video);
    }

    #[test]
    fn test_background_image_moved_to_payload() {
        let (out, log) = run_pass(
            r#"<section class="hero" style="color: red; background-image: url('data:image/png;base64,AA==;x'); padding: 0">x</section>"#,
            run_backgrounds,
        );
        let doc = parse_fragment(&out);
        let hero = &select_all(&doc, "section")[0];
        assert_eq!(hero.attr("style").unwrap().to_string(), "color: red;padding: 0");
        assert_eq!(hero.attr("class").unwrap().to_string(), "hero lazy-bg-image");
        assert_eq!(hero.attr("data-facade").unwrap().to_string(), "background-image");
        let payload = hero.attr("data-bg-image").unwrap().to_string();
        assert_eq!(
            decode_payload(&payload).unwrap(),
            "url('data:image/png;base64,AA==;x')"
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_gradient_background_left_alone() {
        let html = r#"<div style="background-image: linear-gradient(red, blue)">x</div>"#;
        let (out, log) = run_pass(html, run_backgrounds);
        assert_eq!(out, html);
        assert!(log.is_empty());
    }
}
