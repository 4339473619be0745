// ABOUTME: Rewrites WordPress embed blocks into the canonical markup the facade pass recognizes.
// ABOUTME: Figures whose URL cannot be extracted or validated are left untouched.

use dom_query::{Document, NodeRef};
use url::Url;

use super::facade::youtube_video_id;
use crate::dom::compiled::select_all;
use crate::dom::serialize::escape_attr;
use crate::error::OptimizeError;
use crate::pipeline::PassContext;

const WP_EMBED_SELECTOR: &str = "figure.wp-block-embed";

/// Provider of a WordPress embed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Twitter,
    YouTube,
    Reddit,
}

impl Provider {
    fn detect(figure: &NodeRef) -> Option<Provider> {
        if figure.has_class("wp-block-embed-twitter")
            || figure.has_class("wp-block-embed-x")
            || figure.has_class("is-provider-twitter")
            || figure.has_class("is-provider-x")
        {
            Some(Provider::Twitter)
        } else if figure.has_class("wp-block-embed-youtube")
            || figure.has_class("is-provider-youtube")
        {
            Some(Provider::YouTube)
        } else if figure.has_class("wp-block-embed-reddit")
            || figure.has_class("is-provider-reddit")
        {
            Some(Provider::Reddit)
        } else {
            None
        }
    }

    fn accepts_host(&self, host: &str) -> bool {
        let host = host.trim_start_matches("www.").trim_start_matches("mobile.");
        match self {
            Provider::Twitter => host == "twitter.com" || host == "x.com",
            Provider::YouTube => {
                host == "youtube.com" || host == "m.youtube.com" || host == "youtu.be"
            }
            Provider::Reddit => host == "reddit.com" || host == "old.reddit.com",
        }
    }

    /// Canonical replacement markup for `url`, or `None` if the URL does not fit.
    fn canonical_markup(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        if !self.accepts_host(parsed.host_str()?) {
            return None;
        }
        match self {
            Provider::Twitter => Some(format!(
                r#"<blockquote class="twitter-tweet"><a href="{}"></a></blockquote>"#,
                escape_attr(url)
            )),
            Provider::Reddit => Some(format!(
                r#"<blockquote class="reddit-embed-bq"><a href="{}"></a></blockquote>"#,
                escape_attr(url)
            )),
            Provider::YouTube => {
                let id = youtube_video_id(url)?;
                Some(format!(
                    r#"<iframe width="560" height="315" src="https://www.youtube.com/embed/{}" allowfullscreen=""></iframe>"#,
                    escape_attr(&id)
                ))
            }
        }
    }
}

/// The embed URL written into the block's wrapper div.
fn wrapper_url(figure: &NodeRef) -> Option<String> {
    let wrapper = figure
        .descendants()
        .into_iter()
        .find(|n| n.is_element() && n.has_class("wp-block-embed__wrapper"))?;
    let text = wrapper.text().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn run(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    let mut normalized = 0usize;

    for figure in select_all(doc, WP_EMBED_SELECTOR) {
        if ctx.in_preserved_link(&figure) {
            continue;
        }
        let Some(provider) = Provider::detect(&figure) else {
            continue;
        };
        let Some(url) = wrapper_url(&figure) else {
            tracing::debug!(?provider, "embed block without wrapper URL left as-is");
            continue;
        };
        match provider.canonical_markup(&url) {
            Some(markup) => {
                figure.replace_with_html(markup);
                normalized += 1;
            }
            None => tracing::warn!(?provider, url = %url, "unrecognized embed URL left as-is"),
        }
    }

    if normalized > 0 {
        ctx.log(format!(
            "Normalized {} WordPress embed block(s) into standard embed markup.",
            normalized
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize::{serialize_fragment, SerializeOptions};
    use crate::dom::tree::parse_fragment;
    use crate::options::{CleaningOptions, OptimizerConfig};

    fn normalize(html: &str) -> (String, Vec<String>) {
        let doc = parse_fragment(html);
        let opts = CleaningOptions::none();
        let config = OptimizerConfig::default();
        let mut ctx = PassContext::new(&opts, &config);
        run(&doc, &mut ctx).unwrap();
        (serialize_fragment(&doc, &SerializeOptions::default()), ctx.log)
    }

    #[test]
    fn test_twitter_block_becomes_blockquote() {
        let (out, log) = normalize(
            r#"<figure class="wp-block-embed is-type-rich wp-block-embed-twitter"><div class="wp-block-embed__wrapper">
https://twitter.com/jack/status/20
</div></figure>"#,
        );
        assert_eq!(
            out,
            r#"<blockquote class="twitter-tweet"><a href="https://twitter.com/jack/status/20"></a></blockquote>"#
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_youtube_block_becomes_iframe() {
        let (out, _) = normalize(
            r#"<figure class="wp-block-embed wp-block-embed-youtube"><div class="wp-block-embed__wrapper">https://www.youtube.com/watch?v=dQw4w9WgXcQ</div></figure>"#,
        );
        assert!(out.starts_with("<iframe"), "{}", out);
        assert!(out.contains(r#"src="https://www.youtube.com/embed/dQw4w9WgXcQ""#));
    }

    #[test]
    fn test_reddit_block_becomes_blockquote() {
        let (out, _) = normalize(
            r#"<figure class="wp-block-embed wp-block-embed-reddit"><div class="wp-block-embed__wrapper">https://www.reddit.com/r/rust/comments/abc/title/</div></figure>"#,
        );
        assert!(out.contains(r#"<blockquote class="reddit-embed-bq">"#), "{}", out);
    }

    #[test]
    fn test_malformed_url_left_untouched() {
        let html = r#"<figure class="wp-block-embed wp-block-embed-twitter"><div class="wp-block-embed__wrapper">not a url</div></figure>"#;
        let (out, log) = normalize(html);
        assert_eq!(out, html);
        assert!(log.is_empty());
    }

    #[test]
    fn test_wrong_host_left_untouched() {
        let html = r#"<figure class="wp-block-embed wp-block-embed-youtube"><div class="wp-block-embed__wrapper">https://vimeo.com/123</div></figure>"#;
        let (out, _) = normalize(html);
        assert_eq!(out, html);
    }

    #[test]
    fn test_missing_wrapper_left_untouched() {
        let html = r#"<figure class="wp-block-embed wp-block-embed-twitter"><p>https://twitter.com/a/status/1</p></figure>"#;
        let (out, _) = normalize(html);
        assert_eq!(out, html);
    }
}
