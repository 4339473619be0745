// ABOUTME: Idempotency guard run before any pass: removes artifacts a previous run left behind.
// ABOUTME: Strips the injected runtime script and, with lazy embeds, stray platform loader scripts.

use dom_query::{Document, NodeRef};

use super::compiled::select_all;
use super::tree::{attr, is_tag};
use crate::embeds::kinds::{loader_for_src, FacadeKind};
use crate::options::CleaningOptions;
use crate::runtime::RUNTIME_ID;

/// What the guard found and removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GuardReport {
    /// A runtime script from an earlier run was present.
    pub had_runtime: bool,
    pub stray_loaders: usize,
}

// A loader directly after its own unconverted embed belongs to that embed;
// the facade pass removes it together with the blockquote.
fn follows_own_embed(script: &NodeRef) -> bool {
    let Some(src) = attr(script, "src") else {
        return false;
    };
    let Some(prev) = script.prev_element_sibling() else {
        return false;
    };
    if !is_tag(&prev, "blockquote") {
        return false;
    }
    FacadeKind::ALL.iter().any(|kind| {
        kind.loader().is_some_and(|l| src.contains(l.pattern))
            && kind.source_classes().iter().any(|class| prev.has_class(class))
    })
}

pub fn run(doc: &Document, opts: &CleaningOptions) -> GuardReport {
    let mut report = GuardReport::default();

    for node in select_all(doc, &format!("#{}", RUNTIME_ID)) {
        node.remove_from_parent();
        report.had_runtime = true;
    }

    if opts.lazy_load_embeds {
        for script in select_all(doc, "script[src]") {
            let is_loader = attr(&script, "src").is_some_and(|src| loader_for_src(&src).is_some());
            if is_loader && !follows_own_embed(&script) {
                script.remove_from_parent();
                report.stray_loaders += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize::{serialize_fragment, SerializeOptions};
    use crate::dom::tree::parse_fragment;

    #[test]
    fn test_removes_runtime_by_id() {
        let doc = parse_fragment(
            r#"<p>x</p><script id="leanpost-facade-runtime" data-version="2">run()</script>"#,
        );
        let report = run(&doc, &CleaningOptions::none());
        assert!(report.had_runtime);
        assert_eq!(
            serialize_fragment(&doc, &SerializeOptions::default()),
            "<p>x</p>"
        );
    }

    #[test]
    fn test_stray_loaders_removed_only_with_lazy_embeds() {
        let html = r#"<p>x</p><script async src="https://platform.twitter.com/widgets.js"></script>"#;

        let doc = parse_fragment(html);
        let report = run(&doc, &CleaningOptions::none());
        assert_eq!(report.stray_loaders, 0);

        let doc = parse_fragment(html);
        let report = run(&doc, &CleaningOptions::default());
        assert_eq!(report.stray_loaders, 1);
        assert_eq!(
            serialize_fragment(&doc, &SerializeOptions::default()),
            "<p>x</p>"
        );
    }

    #[test]
    fn test_loader_after_its_embed_is_left_for_facade_pass() {
        let doc = parse_fragment(
            r#"<blockquote class="instagram-media">p</blockquote><script async src="//www.instagram.com/embed.js"></script>"#,
        );
        let report = run(&doc, &CleaningOptions::default());
        assert_eq!(report.stray_loaders, 0);
    }

    #[test]
    fn test_loader_matched_against_every_embed_class() {
        let doc = parse_fragment(
            r#"<blockquote class="reddit-card">p</blockquote><script async src="https://embed.reddit.com/widgets.js"></script>"#,
        );
        assert_eq!(run(&doc, &CleaningOptions::default()).stray_loaders, 0);

        let doc = parse_fragment(
            r#"<blockquote class="tiktok-embed">p</blockquote><script async src="https://embed.reddit.com/widgets.js"></script>"#,
        );
        assert_eq!(run(&doc, &CleaningOptions::default()).stray_loaders, 1);
    }
}
