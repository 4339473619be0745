// ABOUTME: Placeholders must carry enough to restore the original embed exactly.
// ABOUTME: Decodes payload attributes from optimizer output and checks them against the source markup.

use leanpost_engine::dom::compiled::select_all;
use leanpost_engine::dom::tree::{attr, parse_fragment};
use leanpost_engine::{decode_payload, CleaningOptions, FacadeKind, Optimizer, OptionKey};
use pretty_assertions::assert_eq;

fn optimize(html: &str, keys: &[OptionKey]) -> (String, Vec<String>) {
    let result = Optimizer::default().run(html, &CleaningOptions::with(keys), None);
    (result.cleaned_html, result.summary.action_log)
}

fn payload_of(html: &str, kind: FacadeKind) -> String {
    let doc = parse_fragment(html);
    let nodes = select_all(&doc, &format!(".{}", kind.class_name()));
    assert_eq!(nodes.len(), 1, "expected one {} placeholder", kind);
    let attr_name = kind.payload_attr().unwrap();
    let encoded = attr(&nodes[0], attr_name).unwrap();
    decode_payload(&encoded).unwrap()
}

#[test]
fn tweet_payload_restores_blockquote_and_loader_is_dropped() {
    let html = r#"<blockquote class="twitter-tweet"><p lang="en">Hello world</p>&mdash; Jane Doe (@jane) <a href="https://twitter.com/jane/status/1">May 1, 2024</a></blockquote><script async src="https://platform.twitter.com/widgets.js" charset="utf-8"></script>"#;
    let (out, log) = optimize(html, &[OptionKey::LazyLoadEmbeds]);

    let restored = payload_of(&out, FacadeKind::Tweet);
    assert!(restored.starts_with(r#"<blockquote class="twitter-tweet">"#));
    assert!(restored.ends_with("</blockquote>"));
    assert!(restored.contains(r#"<p lang="en">Hello world</p>"#));
    assert!(restored.contains("Jane Doe (@jane)"));

    let doc = parse_fragment(&out);
    assert!(select_all(&doc, "script[src]").is_empty());
    assert!(out.contains("Jane Doe"));
    assert!(log.contains(
        &"Replaced 1 tweet embed(s) with lightweight click-to-load facade(s).".to_string()
    ));
    assert!(log.contains(&"Removed 1 inline tweet loader script(s).".to_string()));
}

#[test]
fn instagram_and_tiktok_payloads_restore() {
    let html = r#"<blockquote class="instagram-media" data-instgrm-permalink="https://www.instagram.com/p/abc/"><a href="https://www.instagram.com/p/abc/">post</a></blockquote><blockquote class="tiktok-embed" cite="https://www.tiktok.com/@u/video/1" data-video-id="1"><section>clip</section></blockquote>"#;
    let (out, _) = optimize(html, &[OptionKey::LazyLoadEmbeds]);

    let insta = payload_of(&out, FacadeKind::Instagram);
    assert!(insta.contains(r#"data-instgrm-permalink="https://www.instagram.com/p/abc/""#));
    let tiktok = payload_of(&out, FacadeKind::TikTok);
    assert!(tiktok.contains(r#"cite="https://www.tiktok.com/@u/video/1""#));
    assert!(tiktok.contains("<section>clip</section>"));
}

#[test]
fn video_payload_restores_element() {
    let html = r#"<video src="/media/a.mp4" poster="/media/a.jpg" width="640" height="360" controls></video>"#;
    let (out, _) = optimize(html, &[OptionKey::LazyLoadEmbeds]);

    let restored = payload_of(&out, FacadeKind::Video);
    assert_eq!(
        restored,
        r#"<video src="/media/a.mp4" poster="/media/a.jpg" width="640" height="360" controls=""></video>"#
    );
    assert!(out.contains("aspect-ratio:640/360"));
    assert!(out.contains("/media/a.jpg"));
}

#[test]
fn background_image_moves_into_payload() {
    let html = r#"<div class="hero" style="color: red; background-image: url('/img/hero.jpg')">Welcome</div>"#;
    let (out, log) = optimize(html, &[OptionKey::LazyLoadBackgroundImages]);

    let doc = parse_fragment(&out);
    let hero = select_all(&doc, "div").into_iter().next().unwrap();
    assert_eq!(attr(&hero, "class").as_deref(), Some("hero lazy-bg-image"));
    assert_eq!(attr(&hero, "style").as_deref(), Some("color: red"));
    assert_eq!(attr(&hero, "data-facade").as_deref(), Some("background-image"));
    assert_eq!(
        payload_of(&out, FacadeKind::BackgroundImage),
        "url('/img/hero.jpg')"
    );
    assert_eq!(
        log,
        vec!["Deferred 1 CSS background image(s) until scrolled into view.".to_string()]
    );
}

#[test]
fn non_ascii_markup_survives_encoding() {
    let html = r#"<blockquote class="reddit-embed-bq"><a href="https://www.reddit.com/r/x/comments/1/">Привет — 😀</a></blockquote>"#;
    let (out, _) = optimize(html, &[OptionKey::LazyLoadEmbeds]);
    let restored = payload_of(&out, FacadeKind::Reddit);
    assert!(restored.contains("Привет — 😀"));
}
