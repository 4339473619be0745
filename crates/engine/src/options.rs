// ABOUTME: Configuration for the engine: CleaningOptions flags, the OptionKey vocabulary, and OptimizerConfig tunables.
// ABOUTME: OptimizerBuilder provides a fluent API for constructing Optimizer instances with custom settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::optimizer::Optimizer;

/// Boolean feature flags for a single optimization run.
///
/// Key names match the flag names the web front end sends, so a JSON object
/// from that UI deserializes directly. Missing keys take their default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleaningOptions {
    pub strip_comments: bool,
    pub collapse_whitespace: bool,
    #[serde(rename = "minifyInlineCSSJS")]
    pub minify_inline_css_js: bool,
    pub remove_empty_attributes: bool,
    pub preserve_iframes: bool,
    pub preserve_links: bool,
    pub preserve_shortcodes: bool,
    pub lazy_load_embeds: bool,
    pub lazy_load_images: bool,
    pub lazy_load_background_images: bool,
    pub optimize_images: bool,
    pub convert_to_avif: bool,
    pub add_responsive_srcset: bool,
    pub optimize_svgs: bool,
    pub defer_scripts: bool,
    pub optimize_font_loading: bool,
    pub add_prefetch_hints: bool,
    pub optimize_css_loading: bool,
    pub semantic_rewrite: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            strip_comments: true,
            collapse_whitespace: true,
            minify_inline_css_js: true,
            remove_empty_attributes: true,
            preserve_iframes: true,
            preserve_links: true,
            preserve_shortcodes: true,
            lazy_load_embeds: true,
            lazy_load_images: true,
            lazy_load_background_images: false,
            optimize_images: true,
            convert_to_avif: false,
            add_responsive_srcset: true,
            optimize_svgs: true,
            defer_scripts: true,
            optimize_font_loading: true,
            add_prefetch_hints: true,
            optimize_css_loading: false,
            semantic_rewrite: false,
        }
    }
}

impl CleaningOptions {
    /// All flags off.
    pub fn none() -> Self {
        Self {
            strip_comments: false,
            collapse_whitespace: false,
            minify_inline_css_js: false,
            remove_empty_attributes: false,
            preserve_iframes: false,
            preserve_links: false,
            preserve_shortcodes: false,
            lazy_load_embeds: false,
            lazy_load_images: false,
            lazy_load_background_images: false,
            optimize_images: false,
            convert_to_avif: false,
            add_responsive_srcset: false,
            optimize_svgs: false,
            defer_scripts: false,
            optimize_font_loading: false,
            add_prefetch_hints: false,
            optimize_css_loading: false,
            semantic_rewrite: false,
        }
    }

    /// Start from `none()` and switch on the given keys.
    pub fn with(keys: &[OptionKey]) -> Self {
        let mut opts = Self::none();
        for key in keys {
            opts.set(*key, true);
        }
        opts
    }

    /// Read a flag by key.
    pub fn get(&self, key: OptionKey) -> bool {
        match key {
            OptionKey::StripComments => self.strip_comments,
            OptionKey::CollapseWhitespace => self.collapse_whitespace,
            OptionKey::MinifyInlineCssJs => self.minify_inline_css_js,
            OptionKey::RemoveEmptyAttributes => self.remove_empty_attributes,
            OptionKey::PreserveIframes => self.preserve_iframes,
            OptionKey::PreserveLinks => self.preserve_links,
            OptionKey::PreserveShortcodes => self.preserve_shortcodes,
            OptionKey::LazyLoadEmbeds => self.lazy_load_embeds,
            OptionKey::LazyLoadImages => self.lazy_load_images,
            OptionKey::LazyLoadBackgroundImages => self.lazy_load_background_images,
            OptionKey::OptimizeImages => self.optimize_images,
            OptionKey::ConvertToAvif => self.convert_to_avif,
            OptionKey::AddResponsiveSrcset => self.add_responsive_srcset,
            OptionKey::OptimizeSvgs => self.optimize_svgs,
            OptionKey::DeferScripts => self.defer_scripts,
            OptionKey::OptimizeFontLoading => self.optimize_font_loading,
            OptionKey::AddPrefetchHints => self.add_prefetch_hints,
            OptionKey::OptimizeCssLoading => self.optimize_css_loading,
            OptionKey::SemanticRewrite => self.semantic_rewrite,
        }
    }

    /// Write a flag by key.
    pub fn set(&mut self, key: OptionKey, value: bool) {
        let slot = match key {
            OptionKey::StripComments => &mut self.strip_comments,
            OptionKey::CollapseWhitespace => &mut self.collapse_whitespace,
            OptionKey::MinifyInlineCssJs => &mut self.minify_inline_css_js,
            OptionKey::RemoveEmptyAttributes => &mut self.remove_empty_attributes,
            OptionKey::PreserveIframes => &mut self.preserve_iframes,
            OptionKey::PreserveLinks => &mut self.preserve_links,
            OptionKey::PreserveShortcodes => &mut self.preserve_shortcodes,
            OptionKey::LazyLoadEmbeds => &mut self.lazy_load_embeds,
            OptionKey::LazyLoadImages => &mut self.lazy_load_images,
            OptionKey::LazyLoadBackgroundImages => &mut self.lazy_load_background_images,
            OptionKey::OptimizeImages => &mut self.optimize_images,
            OptionKey::ConvertToAvif => &mut self.convert_to_avif,
            OptionKey::AddResponsiveSrcset => &mut self.add_responsive_srcset,
            OptionKey::OptimizeSvgs => &mut self.optimize_svgs,
            OptionKey::DeferScripts => &mut self.defer_scripts,
            OptionKey::OptimizeFontLoading => &mut self.optimize_font_loading,
            OptionKey::AddPrefetchHints => &mut self.add_prefetch_hints,
            OptionKey::OptimizeCssLoading => &mut self.optimize_css_loading,
            OptionKey::SemanticRewrite => &mut self.semantic_rewrite,
        };
        *slot = value;
    }

    /// Keys currently switched on, in declaration order.
    pub fn enabled_keys(&self) -> Vec<OptionKey> {
        OptionKey::ALL
            .iter()
            .copied()
            .filter(|key| self.get(*key))
            .collect()
    }
}

/// Closed vocabulary naming each flag of [`CleaningOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionKey {
    StripComments,
    CollapseWhitespace,
    #[serde(rename = "minifyInlineCSSJS")]
    MinifyInlineCssJs,
    RemoveEmptyAttributes,
    PreserveIframes,
    PreserveLinks,
    PreserveShortcodes,
    LazyLoadEmbeds,
    LazyLoadImages,
    LazyLoadBackgroundImages,
    OptimizeImages,
    ConvertToAvif,
    AddResponsiveSrcset,
    OptimizeSvgs,
    DeferScripts,
    OptimizeFontLoading,
    AddPrefetchHints,
    OptimizeCssLoading,
    SemanticRewrite,
}

impl OptionKey {
    pub const ALL: [OptionKey; 19] = [
        OptionKey::StripComments,
        OptionKey::CollapseWhitespace,
        OptionKey::MinifyInlineCssJs,
        OptionKey::RemoveEmptyAttributes,
        OptionKey::PreserveIframes,
        OptionKey::PreserveLinks,
        OptionKey::PreserveShortcodes,
        OptionKey::LazyLoadEmbeds,
        OptionKey::LazyLoadImages,
        OptionKey::LazyLoadBackgroundImages,
        OptionKey::OptimizeImages,
        OptionKey::ConvertToAvif,
        OptionKey::AddResponsiveSrcset,
        OptionKey::OptimizeSvgs,
        OptionKey::DeferScripts,
        OptionKey::OptimizeFontLoading,
        OptionKey::AddPrefetchHints,
        OptionKey::OptimizeCssLoading,
        OptionKey::SemanticRewrite,
    ];

    /// The wire name of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::StripComments => "stripComments",
            OptionKey::CollapseWhitespace => "collapseWhitespace",
            OptionKey::MinifyInlineCssJs => "minifyInlineCSSJS",
            OptionKey::RemoveEmptyAttributes => "removeEmptyAttributes",
            OptionKey::PreserveIframes => "preserveIframes",
            OptionKey::PreserveLinks => "preserveLinks",
            OptionKey::PreserveShortcodes => "preserveShortcodes",
            OptionKey::LazyLoadEmbeds => "lazyLoadEmbeds",
            OptionKey::LazyLoadImages => "lazyLoadImages",
            OptionKey::LazyLoadBackgroundImages => "lazyLoadBackgroundImages",
            OptionKey::OptimizeImages => "optimizeImages",
            OptionKey::ConvertToAvif => "convertToAvif",
            OptionKey::AddResponsiveSrcset => "addResponsiveSrcset",
            OptionKey::OptimizeSvgs => "optimizeSvgs",
            OptionKey::DeferScripts => "deferScripts",
            OptionKey::OptimizeFontLoading => "optimizeFontLoading",
            OptionKey::AddPrefetchHints => "addPrefetchHints",
            OptionKey::OptimizeCssLoading => "optimizeCssLoading",
            OptionKey::SemanticRewrite => "semanticRewrite",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = String;

    /// Accepts the wire name case-insensitively, with or without `-`/`_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        OptionKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown option key: {}", s))
    }
}

/// Maximum accepted input size (10 MB).
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Default breakpoint ladder for synthesized `srcset` values.
pub const DEFAULT_SRCSET_WIDTHS: &[u32] = &[320, 480, 640, 768, 1024, 1280, 1600, 1920];

/// Tunables that stay fixed across runs of one `Optimizer`.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Number of leading images kept eager to protect the LCP candidate.
    pub eager_images: usize,
    pub srcset_widths: Vec<u32>,
    pub max_input_bytes: usize,
    /// Substrings of script URLs that must stay synchronous.
    pub defer_exclusions: Vec<String>,
    /// Substrings marking a stylesheet as render-critical.
    pub critical_css_keywords: Vec<String>,
    pub rewrite_timeout: Duration,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            eager_images: 1,
            srcset_widths: DEFAULT_SRCSET_WIDTHS.to_vec(),
            max_input_bytes: MAX_INPUT_BYTES,
            defer_exclusions: vec!["jquery".to_string()],
            critical_css_keywords: vec![
                "critical".to_string(),
                "above-the-fold".to_string(),
                "above-fold".to_string(),
                "atf".to_string(),
            ],
            rewrite_timeout: Duration::from_secs(60),
        }
    }
}

/// Builder for constructing Optimizer instances with custom configuration.
#[derive(Debug, Clone)]
pub struct OptimizerBuilder {
    config: OptimizerConfig,
}

impl OptimizerBuilder {
    /// Create a new OptimizerBuilder with default configuration.
    pub fn new() -> Self {
        Self {
            config: OptimizerConfig::default(),
        }
    }

    /// Set how many leading images stay eagerly loaded.
    pub fn eager_images(mut self, count: usize) -> Self {
        self.config.eager_images = count;
        self
    }

    /// Replace the responsive breakpoint ladder.
    pub fn srcset_widths(mut self, widths: Vec<u32>) -> Self {
        let mut widths = widths;
        widths.sort_unstable();
        widths.dedup();
        self.config.srcset_widths = widths;
        self
    }

    /// Set the maximum accepted input size in bytes.
    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.config.max_input_bytes = limit;
        self
    }

    /// Add a script URL substring that must never be deferred.
    pub fn defer_exclusion(mut self, pattern: impl Into<String>) -> Self {
        self.config.defer_exclusions.push(pattern.into());
        self
    }

    /// Add a keyword that marks a stylesheet as critical.
    pub fn critical_css_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.config.critical_css_keywords.push(keyword.into());
        self
    }

    /// Set the upper bound on a remote semantic rewrite.
    pub fn rewrite_timeout(mut self, timeout: Duration) -> Self {
        self.config.rewrite_timeout = timeout;
        self
    }

    /// Build the Optimizer with the configured settings.
    pub fn build(self) -> Optimizer {
        Optimizer::new(self.config)
    }
}

impl Default for OptimizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
