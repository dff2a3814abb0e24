//! In-process connection to a tool server.

use host::ServerSession;
use mcp::{CallToolParams, ProgressToken};
use tracing::debug;

use crate::model::{ToolCall, ToolSpec};
use crate::tools::{ToolError, ToolHost, ToolOutput};

/// Tool host backed by a [`ServerSession`] in the same process.
pub struct LocalToolHost {
    session: ServerSession,
    specs: Vec<ToolSpec>,
}

impl LocalToolHost {
    /// Wrap a session and cache its tool catalog.
    pub fn new(session: ServerSession) -> Self {
        let specs = session.tools().into_iter().map(ToolSpec::from).collect();
        Self { session, specs }
    }

    pub fn session(&self) -> &ServerSession {
        &self.session
    }
}

impl ToolHost for LocalToolHost {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, call: &ToolCall, token: &ProgressToken) -> Result<ToolOutput, ToolError> {
        let params = CallToolParams::new(&call.name, call.input.clone())
            .map_err(|e| ToolError::invalid_arguments(&call.name, e.to_string()))?
            .with_progress_token(token.clone());

        debug!(%token, tool = %call.name, id = %call.id, "calling tool");
        let result = self.session.call_tool(params).await?;

        Ok(ToolOutput {
            text: result.joined_text(),
            is_error: result.is_error,
        })
    }

    fn release(&self, token: &ProgressToken) {
        self.session.release(token);
    }
}
