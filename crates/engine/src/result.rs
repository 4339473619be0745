// ABOUTME: OptimizeResult and ImpactSummary returned from a pipeline run.
// ABOUTME: Field names serialize in camelCase to match the front end's report types.

use serde::{Deserialize, Serialize};

use crate::options::CleaningOptions;

/// Size and structure delta of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub original_bytes: usize,
    pub cleaned_bytes: usize,
    pub bytes_saved: usize,
    pub nodes_removed: usize,
    /// Percentage of bytes saved, e.g. `"42.5%"`.
    pub estimated_speed_gain: String,
    pub action_log: Vec<String>,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResult {
    pub cleaned_html: String,
    pub summary: ImpactSummary,
    pub effective_options: CleaningOptions,
}

impl OptimizeResult {
    /// True if the run fell back to returning its input unchanged.
    pub fn is_fallback(&self) -> bool {
        self.summary
            .action_log
            .first()
            .is_some_and(|entry| entry.starts_with(crate::impact::ERROR_PREFIX))
    }

    /// Pretty-printed JSON envelope.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
