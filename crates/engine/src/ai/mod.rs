// ABOUTME: The AI collaborator: the SemanticRewriter seam and its Gemini implementation.
// ABOUTME: The engine only sees the trait; the CLI wires in GeminiClient.

mod gemini;
mod prompt;

use futures::future::BoxFuture;

use crate::error::OptimizeError;

pub use gemini::{
    missing_key_recommendation, GeminiClient, GeminiConfig, API_KEY_ENV, DEFAULT_BASE_URL,
    DEFAULT_MODEL,
};
pub use prompt::strip_code_fences;

/// Rewrites an HTML fragment before the tree passes run.
pub trait SemanticRewriter: Send + Sync {
    fn rewrite<'a>(&'a self, html: &'a str) -> BoxFuture<'a, Result<String, OptimizeError>>;
}
