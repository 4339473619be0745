// ABOUTME: AI recommendation types and the merge that turns recommendations into forced-on options.
// ABOUTME: Prefers the closed optionKeys vocabulary; falls back to the legacy title keyword table.

use serde::{Deserialize, Serialize};

use crate::options::{CleaningOptions, OptionKey};

/// A single item of an AI optimization plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Canonical flags the plan asks for. When present, the title is not inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_keys: Option<Vec<OptionKey>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

// Legacy free-text matching. Substrings are checked against the lower-cased
// title, so coincidental wording can flip a flag.
const KEYWORD_TABLE: &[(&str, &[OptionKey])] = &[
    ("render-blocking", &[OptionKey::DeferScripts, OptionKey::OptimizeCssLoading]),
    ("defer", &[OptionKey::DeferScripts]),
    ("javascript", &[OptionKey::DeferScripts]),
    ("offscreen images", &[OptionKey::LazyLoadImages]),
    ("lazy", &[OptionKey::LazyLoadImages]),
    ("third-party", &[OptionKey::LazyLoadEmbeds]),
    ("facade", &[OptionKey::LazyLoadEmbeds]),
    ("embed", &[OptionKey::LazyLoadEmbeds]),
    ("font", &[OptionKey::OptimizeFontLoading]),
    ("text remains visible", &[OptionKey::OptimizeFontLoading]),
    ("preconnect", &[OptionKey::AddPrefetchHints]),
    ("origins", &[OptionKey::AddPrefetchHints]),
    ("next-gen", &[OptionKey::OptimizeImages]),
    ("webp", &[OptionKey::OptimizeImages]),
    ("avif", &[OptionKey::OptimizeImages, OptionKey::ConvertToAvif]),
    ("properly size", &[OptionKey::AddResponsiveSrcset]),
    ("responsive", &[OptionKey::AddResponsiveSrcset]),
    ("layout shift", &[OptionKey::OptimizeImages]),
    ("explicit width", &[OptionKey::OptimizeImages]),
    ("unused css", &[OptionKey::OptimizeCssLoading]),
    ("critical css", &[OptionKey::OptimizeCssLoading]),
    ("minify", &[OptionKey::MinifyInlineCssJs]),
    ("background image", &[OptionKey::LazyLoadBackgroundImages]),
    ("svg", &[OptionKey::OptimizeSvgs]),
];

/// Outcome of merging recommendations into a set of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub effective: CleaningOptions,
    /// Flags that were off in the input and were switched on.
    pub applied: Vec<OptionKey>,
}

/// Keys a recommendation asks for, without looking at the current options.
pub fn keys_for(rec: &Recommendation) -> Vec<OptionKey> {
    if let Some(keys) = &rec.option_keys {
        return keys.clone();
    }

    let title = rec.title.to_lowercase();
    let mut keys = Vec::new();
    for (keyword, targets) in KEYWORD_TABLE {
        if title.contains(keyword) {
            for key in *targets {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
    }
    keys
}

/// OR the recommended flags into `options`. Flags are only ever switched on.
pub fn merge_recommendations(
    options: &CleaningOptions,
    recommendations: Option<&[Recommendation]>,
) -> MergeOutcome {
    let mut effective = *options;
    let mut applied = Vec::new();

    for rec in recommendations.unwrap_or_default() {
        for key in keys_for(rec) {
            if !effective.get(key) {
                effective.set(key, true);
                applied.push(key);
            }
        }
    }

    MergeOutcome { effective, applied }
}
