use thiserror::Error;

use crate::model::ModelError;

/// Turn-level failures. The `Display` text is what the user sees.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("model endpoint failed: {0}")]
    ModelEndpoint(#[from] ModelError),

    #[error("model requested unknown tool: {0}")]
    ToolNotFound(String),

    #[error("model sent invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("model kept requesting tools after {rounds} rounds")]
    RunawayLoop { rounds: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
