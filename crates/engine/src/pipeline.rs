// ABOUTME: The ordered pass list and the per-run context passes write into.
// ABOUTME: Pass order is data, not control flow, so it can be inspected and tested directly.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use dom_query::{Document, NodeRef};

use crate::dom::sanitize;
use crate::dom::tree::{has_ancestor_tag, is_tag};
use crate::embeds::{facade, normalize};
use crate::error::OptimizeError;
use crate::hints::{css, fonts, images, preconnect, scripts, svg};
use crate::options::{CleaningOptions, OptimizerConfig};
use crate::semantic;

/// Mutable state shared by the passes of a single run.
#[derive(Debug)]
pub struct PassContext<'a> {
    pub options: &'a CleaningOptions,
    pub config: &'a OptimizerConfig,
    /// Human-readable record of the work performed.
    pub log: Vec<String>,
    /// `<link rel="preconnect">` markup to prepend to the output.
    pub hints: Vec<String>,
}

impl<'a> PassContext<'a> {
    pub fn new(options: &'a CleaningOptions, config: &'a OptimizerConfig) -> Self {
        Self {
            options,
            config,
            log: Vec::new(),
            hints: Vec::new(),
        }
    }

    /// Returns true if `node` is, or sits inside, an `<a>` that must be left as authored.
    pub fn in_preserved_link(&self, node: &NodeRef) -> bool {
        self.options.preserve_links && (is_tag(node, "a") || has_ancestor_tag(node, "a"))
    }

    /// Append an action log entry.
    pub fn log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }
}

/// One tree pass of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    NormalizeEmbeds,
    EmbedFacades,
    BackgroundFacades,
    SemanticTags,
    ImageLoading,
    ResponsiveImages,
    ImageFormat,
    SvgTrim,
    ScriptDefer,
    FontDisplay,
    Preconnect,
    CssDelivery,
    StripComments,
    RemoveEmptyAttributes,
}

/// Fixed execution order. The sanitizer runs after the facade passes so
/// embeds are consumed before comment/attribute cleanup can touch them.
pub const PASS_ORDER: &[Pass] = &[
    Pass::NormalizeEmbeds,
    Pass::EmbedFacades,
    Pass::BackgroundFacades,
    Pass::SemanticTags,
    Pass::ImageLoading,
    Pass::ResponsiveImages,
    Pass::ImageFormat,
    Pass::SvgTrim,
    Pass::ScriptDefer,
    Pass::FontDisplay,
    Pass::Preconnect,
    Pass::CssDelivery,
    Pass::StripComments,
    Pass::RemoveEmptyAttributes,
];

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::NormalizeEmbeds => "normalize-embeds",
            Pass::EmbedFacades => "embed-facades",
            Pass::BackgroundFacades => "background-facades",
            Pass::SemanticTags => "semantic-tags",
            Pass::ImageLoading => "image-loading",
            Pass::ResponsiveImages => "responsive-images",
            Pass::ImageFormat => "image-format",
            Pass::SvgTrim => "svg-trim",
            Pass::ScriptDefer => "script-defer",
            Pass::FontDisplay => "font-display",
            Pass::Preconnect => "preconnect",
            Pass::CssDelivery => "css-delivery",
            Pass::StripComments => "strip-comments",
            Pass::RemoveEmptyAttributes => "remove-empty-attributes",
        }
    }

    /// Whether the effective options switch this pass on.
    pub fn enabled(&self, opts: &CleaningOptions) -> bool {
        match self {
            Pass::NormalizeEmbeds | Pass::EmbedFacades => opts.lazy_load_embeds,
            Pass::BackgroundFacades => opts.lazy_load_background_images,
            Pass::SemanticTags => opts.semantic_rewrite,
            Pass::ImageLoading => opts.lazy_load_images || opts.optimize_images,
            Pass::ResponsiveImages => opts.add_responsive_srcset,
            Pass::ImageFormat => opts.optimize_images,
            Pass::SvgTrim => opts.optimize_svgs,
            Pass::ScriptDefer => opts.defer_scripts,
            Pass::FontDisplay => opts.optimize_font_loading,
            Pass::Preconnect => opts.add_prefetch_hints,
            Pass::CssDelivery => opts.optimize_css_loading,
            Pass::StripComments => opts.strip_comments,
            Pass::RemoveEmptyAttributes => opts.remove_empty_attributes,
        }
    }

    pub fn run(&self, doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
        match self {
            Pass::NormalizeEmbeds => normalize::run(doc, ctx),
            Pass::EmbedFacades => facade::run_embeds(doc, ctx),
            Pass::BackgroundFacades => facade::run_backgrounds(doc, ctx),
            Pass::SemanticTags => semantic::run(doc, ctx),
            Pass::ImageLoading => images::run_loading(doc, ctx),
            Pass::ResponsiveImages => images::run_srcset(doc, ctx),
            Pass::ImageFormat => images::run_format(doc, ctx),
            Pass::SvgTrim => svg::run(doc, ctx),
            Pass::ScriptDefer => scripts::run(doc, ctx),
            Pass::FontDisplay => fonts::run(doc, ctx),
            Pass::Preconnect => preconnect::run(doc, ctx),
            Pass::CssDelivery => css::run(doc, ctx),
            Pass::StripComments => sanitize::strip_comments(doc, ctx),
            Pass::RemoveEmptyAttributes => sanitize::remove_empty_attributes(doc, ctx),
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected failure".to_string())
}

/// Run one pass body; a panic inside it becomes a pass failure naming the pass.
pub(crate) fn run_guarded<F>(pass: Pass, body: F) -> Result<(), OptimizeError>
where
    F: FnOnce() -> Result<(), OptimizeError>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(&*payload);
            tracing::error!(pass = %pass, panic = %message, "pass panicked");
            Err(OptimizeError::pass(pass.name(), Some(anyhow::anyhow!(message))))
        }
    }
}

/// Run every enabled pass in order, stopping at the first error.
pub fn run_passes(doc: &Document, ctx: &mut PassContext) -> Result<(), OptimizeError> {
    for pass in PASS_ORDER {
        if !pass.enabled(ctx.options) {
            continue;
        }
        let before = ctx.log.len();
        run_guarded(*pass, || pass.run(doc, ctx))?;
        tracing::debug!(pass = %pass, entries = ctx.log.len() - before, "pass complete");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(pass: Pass) -> usize {
        PASS_ORDER.iter().position(|p| *p == pass).unwrap()
    }

    #[test]
    fn test_facades_precede_sanitizer() {
        assert!(position(Pass::NormalizeEmbeds) < position(Pass::EmbedFacades));
        assert!(position(Pass::EmbedFacades) < position(Pass::StripComments));
        assert!(position(Pass::EmbedFacades) < position(Pass::RemoveEmptyAttributes));
    }

    #[test]
    fn test_image_passes_ordered() {
        assert!(position(Pass::ImageLoading) < position(Pass::ResponsiveImages));
        assert!(position(Pass::ResponsiveImages) < position(Pass::ImageFormat));
    }

    #[test]
    fn test_every_pass_listed_once() {
        let mut names: Vec<&str> = PASS_ORDER.iter().map(|p| p.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_panicking_pass_becomes_pass_failure() {
        let err = run_guarded(Pass::SvgTrim, || panic!("malformed svg")).unwrap_err();
        assert!(err.is_pass());
        assert_eq!(err.op, "svg-trim");
        assert_eq!(err.to_string(), "leanpost: svg-trim: pass failure: malformed svg");
    }

    #[test]
    fn test_guarded_pass_passes_results_through() {
        assert!(run_guarded(Pass::SvgTrim, || Ok(())).is_ok());
        let err = run_guarded(Pass::EmbedFacades, || {
            Err(OptimizeError::codec("DecodePayload", None))
        })
        .unwrap_err();
        assert!(err.is_codec());
    }

    #[test]
    fn test_all_off_enables_nothing() {
        let opts = CleaningOptions::none();
        assert!(PASS_ORDER.iter().all(|p| !p.enabled(&opts)));
    }
}
