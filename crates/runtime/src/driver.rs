//! The model round-trip loop.

use std::sync::Arc;
use std::time::Duration;

use mcp::ProgressToken;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{Backend, Message, ModelError, ModelRequest, ToolCall, ToolResult};
use crate::tools::{ToolError, ToolHost};
use crate::turn::{ToolPhase, Turn, TurnState};
use crate::{Error, Result};

pub const DEFAULT_MAX_ROUNDS: u32 = 8;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// What to do when the model names an unknown tool or sends bad arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedCallPolicy {
    /// Abort the Turn.
    #[default]
    FailTurn,
    /// Hand the fault back to the model as an error result.
    ReportToModel,
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Model calls allowed per Turn.
    pub max_rounds: u32,
    pub model_timeout: Duration,
    pub malformed_calls: MalformedCallPolicy,
    pub system: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            malformed_calls: MalformedCallPolicy::default(),
            system: None,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::Config("max_rounds must be at least 1".into()));
        }
        if self.model_timeout.is_zero() {
            return Err(Error::Config("model timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Alternates model calls and tool calls until the model answers in text.
pub struct Driver<B, H> {
    backend: Arc<B>,
    tools: H,
    config: DriverConfig,
}

impl<B: Backend, H: ToolHost> Driver<B, H> {
    pub fn new(backend: Arc<B>, tools: H, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            tools,
            config,
        })
    }

    pub fn tools(&self) -> &H {
        &self.tools
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Drive `turn` to a final answer, recording every transition.
    pub async fn run(&self, turn: &mut Turn) -> Result<String> {
        let result = self.drive(turn).await;
        match &result {
            Ok(_) => turn.record(TurnState::Done),
            Err(e) => {
                warn!(token = %turn.token, error = %e, "turn failed");
                turn.record(TurnState::Failed);
            }
        }
        result
    }

    /// Forget tool-side state kept for `token`.
    pub fn release(&self, token: &ProgressToken) {
        self.tools.release(token);
    }

    async fn drive(&self, turn: &mut Turn) -> Result<String> {
        let specs = self.tools.specs();
        let mut rounds = 0;

        loop {
            rounds += 1;

            turn.record(TurnState::ModelPending);
            let request = ModelRequest {
                system: self.config.system.as_deref(),
                ..ModelRequest::new(&turn.messages, specs)
            };
            let response = tokio::time::timeout(self.config.model_timeout, self.backend.call(request))
                .await
                .map_err(|_| ModelError::Timeout(self.config.model_timeout))??;
            debug!(
                token = %turn.token,
                round = rounds,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "model responded"
            );

            let calls = response.message.tool_calls();
            if calls.is_empty() {
                let text = response.message.text();
                turn.messages.push(response.message);
                return Ok(text);
            }

            turn.messages.push(response.message);
            // No round is left to show the model these results.
            if rounds >= self.config.max_rounds {
                return Err(Error::RunawayLoop { rounds });
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                turn.record(TurnState::ToolPending(ToolPhase::Executing));
                let result = self.call_tool(call, &turn.token).await?;
                turn.record(TurnState::ToolPending(ToolPhase::Completed));
                results.push(result);
            }
            turn.messages.push(Message::tool_results(results));
        }
    }

    async fn call_tool(&self, call: &ToolCall, token: &ProgressToken) -> Result<ToolResult> {
        info!(%token, tool = %call.name, id = %call.id, "model requested tool");
        let tool_call_id = call.id.clone();

        match self.tools.execute(call, token).await {
            Ok(output) if output.is_error => Ok(ToolResult::Failure {
                tool_call_id,
                error: output.text,
            }),
            Ok(output) => Ok(ToolResult::Success {
                tool_call_id,
                output: output.text,
            }),
            Err(e) if e.is_call_fault() => match self.config.malformed_calls {
                MalformedCallPolicy::ReportToModel => Ok(ToolResult::Failure {
                    tool_call_id,
                    error: e.to_string(),
                }),
                MalformedCallPolicy::FailTurn => Err(match e {
                    ToolError::NotFound(name) => Error::ToolNotFound(name),
                    ToolError::InvalidArguments { tool, reason } => {
                        Error::InvalidArguments { tool, reason }
                    }
                    other => Error::InvalidArguments {
                        tool: call.name.clone(),
                        reason: other.to_string(),
                    },
                }),
            },
            // Execution failures are the model's to explain.
            Err(e) => Ok(ToolResult::Failure {
                tool_call_id,
                error: e.to_string(),
            }),
        }
    }
}
