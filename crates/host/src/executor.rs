//! Resolves and runs tool calls.

use mcp::ProgressToken;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::ToolError;
use crate::notify::{NotificationSink, Notifier, ProgressLedger};
use crate::registry::ToolRegistry;
use crate::sampling::SamplingBridge;

/// What a handler gets besides its arguments.
pub struct ToolContext<'a> {
    pub token: &'a ProgressToken,
    pub notifier: Notifier<'a>,
    pub sampler: &'a SamplingBridge,
}

/// Runs registered tools against validated arguments.
#[derive(Debug)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    progress: ProgressLedger,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            progress: ProgressLedger::default(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute tool `name` on behalf of the Turn identified by `token`.
    pub async fn execute(
        &self,
        name: &str,
        args: &Map<String, Value>,
        token: &ProgressToken,
        sink: &dyn NotificationSink,
        sampler: &SamplingBridge,
    ) -> Result<String, ToolError> {
        let tool = self.registry.get(name).ok_or_else(|| {
            warn!(%token, tool = name, "unknown tool requested");
            ToolError::NotFound(name.to_string())
        })?;

        let arguments = tool.declaration.validate(args).inspect_err(|e| {
            warn!(%token, tool = name, error = %e, "rejected tool arguments");
        })?;

        info!(%token, tool = name, "executing tool");
        let ctx = ToolContext {
            token,
            notifier: Notifier::new(sink, &self.progress, token, name),
            sampler,
        };

        match tool.handler.call(arguments, &ctx).await {
            Ok(output) => {
                debug!(%token, tool = name, bytes = output.len(), "tool finished");
                Ok(output)
            }
            Err(e) => {
                warn!(%token, tool = name, error = %e, "tool failed");
                Err(e)
            }
        }
    }

    /// Forget per-Turn state for `token`.
    pub fn release(&self, token: &ProgressToken) {
        self.progress.release(token);
    }

    /// Tokens with progress still on record.
    pub fn tracked_tokens(&self) -> usize {
        self.progress.tracked()
    }
}
