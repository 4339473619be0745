// ABOUTME: Impact accountant: byte and element deltas plus the action log for a finished run.
// ABOUTME: Deltas are clamped at zero and the log is never empty.

use crate::dom::tree::count_elements_in;
use crate::result::ImpactSummary;

/// Sentinel log entry for runs where no pass did anything.
pub const NO_OPTIMIZATIONS: &str = "No applicable optimizations were found.";

/// Prefix of the log entry written on the fatal path.
pub const ERROR_PREFIX: &str = "Error:";

/// Percentage of `original` saved, one decimal place.
pub fn speed_gain(original: usize, saved: usize) -> String {
    if original == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", saved as f64 / original as f64 * 100.0)
}

/// Summarize a completed run. `original_nodes` is counted before any pass ran.
pub fn summarize(
    original: &str,
    original_nodes: usize,
    cleaned: &str,
    mut log: Vec<String>,
) -> ImpactSummary {
    let original_bytes = original.len();
    let cleaned_bytes = cleaned.len();
    let bytes_saved = original_bytes.saturating_sub(cleaned_bytes);
    let nodes_removed = original_nodes.saturating_sub(count_elements_in(cleaned));
    if log.is_empty() {
        log.push(NO_OPTIMIZATIONS.to_string());
    }

    ImpactSummary {
        original_bytes,
        cleaned_bytes,
        bytes_saved,
        nodes_removed,
        estimated_speed_gain: speed_gain(original_bytes, bytes_saved),
        action_log: log,
    }
}

/// Summary for the fatal path: the input is returned unchanged and every delta is zero.
pub fn failed(original: &str, message: &str) -> ImpactSummary {
    ImpactSummary {
        original_bytes: original.len(),
        cleaned_bytes: original.len(),
        bytes_saved: 0,
        nodes_removed: 0,
        estimated_speed_gain: speed_gain(0, 0),
        action_log: vec![format!("{} {}", ERROR_PREFIX, message)],
    }
}
