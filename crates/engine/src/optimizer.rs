// ABOUTME: The Optimizer: runs the guard, the ordered passes, serialization and accounting for one fragment.
// ABOUTME: Every failure is folded into the returned OptimizeResult; run never returns an error.

use std::panic::{self, AssertUnwindSafe};

use crate::ai::SemanticRewriter;
use crate::dom::guard;
use crate::dom::serialize::{serialize_fragment, SerializeOptions};
use crate::dom::tree::{count_elements, parse_fragment};
use crate::error::OptimizeError;
use crate::impact;
use crate::options::{CleaningOptions, OptimizerBuilder, OptimizerConfig};
use crate::pipeline::{panic_message, run_passes, PassContext};
use crate::recommend::{merge_recommendations, Recommendation};
use crate::result::OptimizeResult;
use crate::runtime;

struct Cleaned {
    html: String,
    original_nodes: usize,
    log: Vec<String>,
}

/// Runs the optimization pipeline over HTML fragments.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    /// Create a new OptimizerBuilder for configuring the optimizer.
    pub fn builder() -> OptimizerBuilder {
        OptimizerBuilder::new()
    }

    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize `html` with `options`, after OR-ing in any AI recommendations.
    pub fn run(
        &self,
        html: &str,
        options: &CleaningOptions,
        recommendations: Option<&[Recommendation]>,
    ) -> OptimizeResult {
        let merged = merge_recommendations(options, recommendations);
        let mut preamble = Vec::new();
        if !merged.applied.is_empty() {
            let keys = merged
                .applied
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            preamble.push(format!(
                "Auto-applied {} option(s) from AI recommendations: {}",
                merged.applied.len(),
                keys
            ));
        }
        self.run_effective(html, merged.effective, preamble)
    }

    /// Like [`run`](Self::run), but with `semanticRewrite` on the fragment is
    /// first sent through `rewriter`. A failed or timed-out rewrite is logged
    /// and the tree-based rewrite is used instead.
    pub async fn run_with_rewriter(
        &self,
        html: &str,
        options: &CleaningOptions,
        recommendations: Option<&[Recommendation]>,
        rewriter: &dyn SemanticRewriter,
    ) -> OptimizeResult {
        let effective = merge_recommendations(options, recommendations).effective;
        if !effective.semantic_rewrite || html.len() > self.config.max_input_bytes {
            return self.run(html, options, recommendations);
        }

        let rewritten =
            match tokio::time::timeout(self.config.rewrite_timeout, rewriter.rewrite(html)).await {
                Ok(Ok(rewritten)) => Ok(rewritten),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(OptimizeError::timeout(
                    "SemanticRewrite",
                    Some(anyhow::anyhow!(
                        "no response within {}s",
                        self.config.rewrite_timeout.as_secs()
                    )),
                )),
            };

        match rewritten {
            Ok(rewritten) => {
                let mut result = self.run(&rewritten, options, recommendations);
                // Measure against what the caller actually sent.
                let cleaned_bytes = result.cleaned_html.len();
                result.summary.original_bytes = html.len();
                result.summary.bytes_saved = html.len().saturating_sub(cleaned_bytes);
                result.summary.estimated_speed_gain =
                    impact::speed_gain(html.len(), result.summary.bytes_saved);
                result
                    .summary
                    .action_log
                    .retain(|entry| entry != impact::NO_OPTIMIZATIONS);
                result
                    .summary
                    .action_log
                    .insert(0, "Rewrote markup with AI semantic rewrite.".to_string());
                result
            }
            Err(err) => {
                tracing::warn!(error = %err, "semantic rewrite failed, using tree rewrite");
                let mut result = self.run(html, options, recommendations);
                result
                    .summary
                    .action_log
                    .retain(|entry| entry != impact::NO_OPTIMIZATIONS);
                result.summary.action_log.insert(
                    0,
                    format!("AI semantic rewrite unavailable ({}); used built-in rewrite.", err),
                );
                result
            }
        }
    }

    fn run_effective(
        &self,
        html: &str,
        effective: CleaningOptions,
        preamble: Vec<String>,
    ) -> OptimizeResult {
        if html.len() > self.config.max_input_bytes {
            let err = OptimizeError::too_large("Run", html.len(), self.config.max_input_bytes);
            tracing::error!(bytes = html.len(), error = %err, "input rejected");
            return fallback(html, effective, &err.to_string());
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.clean(html, &effective)));
        match outcome {
            Ok(Ok(cleaned)) => {
                let mut log = preamble;
                log.extend(cleaned.log);
                OptimizeResult {
                    summary: impact::summarize(html, cleaned.original_nodes, &cleaned.html, log),
                    cleaned_html: cleaned.html,
                    effective_options: effective,
                }
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "optimization failed");
                fallback(html, effective, &err.to_string())
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                tracing::error!(panic = %message, "optimization panicked");
                fallback(html, effective, &message)
            }
        }
    }

    fn clean(&self, html: &str, options: &CleaningOptions) -> Result<Cleaned, OptimizeError> {
        let doc = parse_fragment(html);
        let original_nodes = count_elements(&doc);

        let mut ctx = PassContext::new(options, &self.config);
        let report = guard::run(&doc, options);
        if report.had_runtime {
            tracing::debug!("removed facade runtime from a previous run");
        }
        if report.stray_loaders > 0 {
            ctx.log(format!(
                "Removed {} stray embed loader script(s).",
                report.stray_loaders
            ));
        }

        run_passes(&doc, &mut ctx)?;

        let mut out = serialize_fragment(
            &doc,
            &SerializeOptions {
                collapse_whitespace: options.collapse_whitespace,
                minify_inline: options.minify_inline_css_js,
                preserve_links: options.preserve_links,
                preserve_shortcodes: options.preserve_shortcodes,
                runtime_id: Some(runtime::RUNTIME_ID),
            },
        );

        if !ctx.hints.is_empty() {
            out = format!("{}{}", ctx.hints.concat(), out);
        }
        if runtime::needs_runtime(&doc) {
            runtime::inject(&mut out);
        }

        Ok(Cleaned {
            html: out,
            original_nodes,
            log: ctx.log,
        })
    }
}

fn fallback(html: &str, effective: CleaningOptions, message: &str) -> OptimizeResult {
    OptimizeResult {
        cleaned_html: html.to_string(),
        summary: impact::failed(html, message),
        effective_options: effective,
    }
}
