// ABOUTME: Error types for the optimization engine including ErrorCode enum and OptimizeError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing different categories of optimization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidInput,
    TooLarge,
    Pass,
    Codec,
    Remote,
    Timeout,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidInput => "invalid input",
            ErrorCode::TooLarge => "input too large",
            ErrorCode::Pass => "pass failure",
            ErrorCode::Codec => "payload codec error",
            ErrorCode::Remote => "remote service error",
            ErrorCode::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub struct OptimizeError {
    pub code: ErrorCode,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leanpost: {}: {}", self.op, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl OptimizeError {
    fn new(code: ErrorCode, op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code,
            op: op.into(),
            source,
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::InvalidInput, op, source)
    }

    /// Create a TooLarge error.
    pub fn too_large(op: impl Into<String>, size: usize, limit: usize) -> Self {
        Self::new(
            ErrorCode::TooLarge,
            op,
            Some(anyhow::anyhow!("{} bytes exceeds limit of {} bytes", size, limit)),
        )
    }

    /// Create a Pass error.
    pub fn pass(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Pass, op, source)
    }

    /// Create a Codec error.
    pub fn codec(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Codec, op, source)
    }

    /// Create a Remote error.
    pub fn remote(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Remote, op, source)
    }

    /// Create a Timeout error.
    pub fn timeout(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Timeout, op, source)
    }

    /// Returns true if this is an InvalidInput error.
    pub fn is_invalid_input(&self) -> bool {
        self.code == ErrorCode::InvalidInput
    }

    /// Returns true if this is a TooLarge error.
    pub fn is_too_large(&self) -> bool {
        self.code == ErrorCode::TooLarge
    }

    /// Returns true if this is a Pass error.
    pub fn is_pass(&self) -> bool {
        self.code == ErrorCode::Pass
    }

    /// Returns true if this is a Codec error.
    pub fn is_codec(&self) -> bool {
        self.code == ErrorCode::Codec
    }

    /// Returns true if this is a Remote error.
    pub fn is_remote(&self) -> bool {
        self.code == ErrorCode::Remote
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_op_code_and_source() {
        let err = OptimizeError::remote("SemanticRewrite", Some(anyhow::anyhow!("HTTP 500")));
        assert_eq!(
            err.to_string(),
            "leanpost: SemanticRewrite: remote service error: HTTP 500"
        );
        assert!(err.is_remote());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_too_large_message() {
        let err = OptimizeError::too_large("Run", 20, 10);
        assert!(err.is_too_large());
        assert!(err.to_string().contains("20 bytes exceeds limit of 10 bytes"));
    }
}
