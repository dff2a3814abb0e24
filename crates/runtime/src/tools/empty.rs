//! Empty tool host implementation.

use mcp::ProgressToken;

use crate::model::{ToolCall, ToolSpec};
use crate::tools::{ToolError, ToolHost, ToolOutput};

/// A tool host with no tools.
#[derive(Debug, Default)]
pub struct EmptyToolHost;

impl ToolHost for EmptyToolHost {
    fn specs(&self) -> &[ToolSpec] {
        &[]
    }

    async fn execute(&self, call: &ToolCall, _token: &ProgressToken) -> Result<ToolOutput, ToolError> {
        Err(ToolError::NotFound(call.name.clone()))
    }
}
