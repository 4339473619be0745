// ABOUTME: Main library entry point for the leanpost HTML optimization engine.
// ABOUTME: Re-exports the public API: Optimizer, CleaningOptions, OptimizeResult, OptimizeError, Recommendation.

//! leanpost - an optimization pipeline for CMS-generated HTML fragments.
//!
//! The engine parses a body fragment, swaps heavy third-party embeds for
//! click-to-load placeholders, adds resource hints, sanitizes and minifies the
//! markup, and reports what it changed.
//!
//! # Example
//!
//! ```no_run
//! use leanpost_engine::{CleaningOptions, Optimizer};
//!
//! let optimizer = Optimizer::builder().eager_images(2).build();
//! let result = optimizer.run("<!-- x --><p>  hello  </p>", &CleaningOptions::default(), None);
//! println!("{}", result.cleaned_html);
//! for entry in &result.summary.action_log {
//!     println!("- {}", entry);
//! }
//! ```

pub mod ai;
pub mod dom;
pub mod embeds;
pub mod error;
pub mod hints;
pub mod impact;
pub mod minify;
pub mod optimizer;
pub mod options;
pub mod pipeline;
pub mod recommend;
pub mod result;
pub mod runtime;
pub mod semantic;

pub use crate::ai::{GeminiClient, GeminiConfig, SemanticRewriter};
pub use crate::embeds::{decode_payload, encode_payload, CodecError, FacadeKind};
pub use crate::error::{ErrorCode, OptimizeError};
pub use crate::optimizer::Optimizer;
pub use crate::options::{CleaningOptions, OptimizerBuilder, OptimizerConfig, OptionKey};
pub use crate::recommend::{Priority, Recommendation};
pub use crate::result::{ImpactSummary, OptimizeResult};
