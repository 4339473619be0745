// ABOUTME: The placeholder naming contract shared by the facade pass, the idempotency guard, and the runtime script.
// ABOUTME: One FacadeKind per embed family with its class, payload attribute, trigger, and third-party loader.

use std::fmt;
use std::str::FromStr;

use dom_query::NodeRef;

/// How the runtime restores a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Restored on user interaction.
    Click,
    /// Restored when scrolled into view.
    Visible,
}

/// Third-party script a restored embed needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loader {
    /// Element id the runtime checks before injecting the script.
    pub id: &'static str,
    pub src: &'static str,
    /// Substring identifying this loader in an arbitrary `script[src]`.
    pub pattern: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacadeKind {
    YouTube,
    Tweet,
    Instagram,
    TikTok,
    Reddit,
    Video,
    BackgroundImage,
}

impl FacadeKind {
    pub const ALL: [FacadeKind; 7] = [
        FacadeKind::YouTube,
        FacadeKind::Tweet,
        FacadeKind::Instagram,
        FacadeKind::TikTok,
        FacadeKind::Reddit,
        FacadeKind::Video,
        FacadeKind::BackgroundImage,
    ];

    /// Value of the placeholder's `data-facade` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            FacadeKind::YouTube => "youtube",
            FacadeKind::Tweet => "tweet",
            FacadeKind::Instagram => "instagram",
            FacadeKind::TikTok => "tiktok",
            FacadeKind::Reddit => "reddit",
            FacadeKind::Video => "video",
            FacadeKind::BackgroundImage => "background-image",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            FacadeKind::YouTube => "lazy-youtube-embed",
            FacadeKind::Tweet => "lazy-tweet-facade",
            FacadeKind::Instagram => "lazy-instagram-embed",
            FacadeKind::TikTok => "lazy-tiktok-facade",
            FacadeKind::Reddit => "lazy-reddit-facade",
            FacadeKind::Video => "lazy-video-facade",
            FacadeKind::BackgroundImage => "lazy-bg-image",
        }
    }

    /// Attribute holding the base64 payload. YouTube placeholders carry the
    /// literal source URL in `data-original-src` instead.
    pub fn payload_attr(&self) -> Option<&'static str> {
        match self {
            FacadeKind::YouTube => None,
            FacadeKind::Tweet => Some("data-tweet-html"),
            FacadeKind::Instagram => Some("data-insta-html"),
            FacadeKind::TikTok => Some("data-tiktok-html"),
            FacadeKind::Reddit => Some("data-reddit-html"),
            FacadeKind::Video => Some("data-video-html"),
            FacadeKind::BackgroundImage => Some("data-bg-image"),
        }
    }

    pub fn trigger(&self) -> Trigger {
        match self {
            FacadeKind::Video | FacadeKind::BackgroundImage => Trigger::Visible,
            _ => Trigger::Click,
        }
    }

    pub fn loader(&self) -> Option<Loader> {
        match self {
            FacadeKind::Tweet => Some(Loader {
                id: "twitter-wjs",
                src: "https://platform.twitter.com/widgets.js",
                pattern: "platform.twitter.com/widgets.js",
            }),
            FacadeKind::Instagram => Some(Loader {
                id: "instagram-embed-script",
                src: "https://www.instagram.com/embed.js",
                pattern: "instagram.com/embed.js",
            }),
            FacadeKind::TikTok => Some(Loader {
                id: "tiktok-embed-script",
                src: "https://www.tiktok.com/embed.js",
                pattern: "tiktok.com/embed.js",
            }),
            FacadeKind::Reddit => Some(Loader {
                id: "reddit-embed-script",
                src: "https://embed.reddit.com/widgets.js",
                pattern: "embed.reddit.com/widgets.js",
            }),
            _ => None,
        }
    }

    /// Selector for the canonical embed markup this kind replaces.
    pub fn source_selector(&self) -> &'static str {
        match self {
            FacadeKind::YouTube => {
                r#"iframe[src*="youtube.com/embed/"], iframe[src*="youtube-nocookie.com/embed/"]"#
            }
            FacadeKind::Tweet => "blockquote.twitter-tweet",
            FacadeKind::Instagram => "blockquote.instagram-media",
            FacadeKind::TikTok => "blockquote.tiktok-embed",
            FacadeKind::Reddit => "blockquote.reddit-embed-bq, blockquote.reddit-card",
            FacadeKind::Video => "video",
            FacadeKind::BackgroundImage => "[style]",
        }
    }

    /// Classes that mark a blockquote as this platform's embed.
    pub fn source_classes(&self) -> &'static [&'static str] {
        match self {
            FacadeKind::Tweet => &["twitter-tweet"],
            FacadeKind::Instagram => &["instagram-media"],
            FacadeKind::TikTok => &["tiktok-embed"],
            FacadeKind::Reddit => &["reddit-embed-bq", "reddit-card"],
            FacadeKind::YouTube | FacadeKind::Video | FacadeKind::BackgroundImage => &[],
        }
    }

    /// Identify the placeholder kind of an element, if it is one.
    pub fn of(node: &NodeRef) -> Option<FacadeKind> {
        if !node.is_element() {
            return None;
        }
        if let Some(marker) = node.attr("data-facade") {
            if let Ok(kind) = marker.parse() {
                return Some(kind);
            }
        }
        FacadeKind::ALL
            .iter()
            .copied()
            .find(|kind| node.has_class(kind.class_name()))
    }
}

impl fmt::Display for FacadeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacadeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FacadeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown facade kind: {}", s))
    }
}

/// Loader whose URL appears in `src`, if any.
pub fn loader_for_src(src: &str) -> Option<Loader> {
    FacadeKind::ALL
        .iter()
        .filter_map(|kind| kind.loader())
        .find(|loader| src.contains(loader.pattern))
}
