//! The boundary between the model loop and tool side effects.

mod empty;
mod local;

use std::future::Future;

use mcp::ProgressToken;

use crate::model::{ToolCall, ToolSpec};

pub use empty::EmptyToolHost;
pub use host::ToolError;
pub use local::LocalToolHost;

/// Text produced by a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// The tool ran but reported a failure the model should see.
    pub is_error: bool,
}

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute tool calls.
pub trait ToolHost: Send + Sync {
    /// Get available tool specifications.
    fn specs(&self) -> &[ToolSpec];

    /// Execute a tool call on behalf of the Turn identified by `token`.
    fn execute(
        &self,
        call: &ToolCall,
        token: &ProgressToken,
    ) -> impl Future<Output = Result<ToolOutput, ToolError>> + Send;

    /// The Turn identified by `token` is over.
    fn release(&self, _token: &ProgressToken) {}
}
