//! Central error handling for the tile compiler
//!
//! Ordinary control flow (skipped declarations, deferred labels, pending
//! resources) never produces an error. `CompileError` is reserved for caller
//! contract violations: bad configuration, malformed input geometry, style
//! documents that cannot be decoded, and misuse of a finished compile task.

/// Centralized error type for all compiler operations
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Style error: {0}")]
    Style(String),

    #[error("State error: {0}")]
    State(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Short category tag, used as a log prefix.
    pub fn category(&self) -> &'static str {
        match self {
            CompileError::Config(_) => "Config",
            CompileError::Geometry(_) => "Geometry",
            CompileError::Style(_) => "Style",
            CompileError::State(_) => "State",
            CompileError::Json(_) => "JSON",
        }
    }

    /// Convenience constructors for common error types
    pub fn config<T: ToString>(msg: T) -> Self {
        CompileError::Config(msg.to_string())
    }

    pub fn geometry<T: ToString>(msg: T) -> Self {
        CompileError::Geometry(msg.to_string())
    }

    pub fn style<T: ToString>(msg: T) -> Self {
        CompileError::Style(msg.to_string())
    }

    pub fn state<T: ToString>(msg: T) -> Self {
        CompileError::State(msg.to_string())
    }
}

/// Result type alias for compiler operations
pub type CompileResult<T> = Result<T, CompileError>;
