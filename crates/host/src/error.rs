//! Tool host error types.

use thiserror::Error;

/// Errors that can occur during a tool call.
///
/// `NotFound` and `InvalidArguments` are faults in the call itself; the
/// other variants are execution outcomes the model gets to see.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Whether the call was rejected before the tool ran.
    pub fn is_call_fault(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidArguments { .. })
    }
}

/// Errors from assembling a tool host.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
