//! Caller-side handlers for requests and notifications from the tool host.

use std::sync::Arc;

use async_trait::async_trait;
use host::{SamplingClient, SamplingError};
use mcp::{
    CreateMessageParams, CreateMessageResult, LoggingLevel, ProgressToken, Role as SamplingRole,
    ServerNotification,
};
use tracing::{debug, error, info, warn};

use crate::model::{Backend, Message, ModelRequest};
use crate::turn::{ActiveTurns, ToolPhase, TurnState};

/// Serves `sampling/createMessage` with the caller's own model.
///
/// The nested request goes out without a tool catalog, so a poem request
/// can never trigger another tool call.
pub struct ModelSampler<B> {
    backend: Arc<B>,
    turns: ActiveTurns,
}

impl<B: Backend> ModelSampler<B> {
    pub fn new(backend: Arc<B>, turns: ActiveTurns) -> Self {
        Self { backend, turns }
    }
}

#[async_trait]
impl<B: Backend> SamplingClient for ModelSampler<B> {
    async fn create_message(
        &self,
        params: CreateMessageParams,
    ) -> Result<CreateMessageResult, SamplingError> {
        if let Some(token) = params.progress_token() {
            if !self
                .turns
                .mark(token, TurnState::ToolPending(ToolPhase::SamplingPending))
            {
                debug!(%token, "sampling request for a turn that is not running");
            }
        }

        let messages = params
            .messages
            .iter()
            .map(|m| {
                let text = m.content.as_text().ok_or_else(|| {
                    SamplingError::UnexpectedContent("only text sampling messages are supported".into())
                })?;
                Ok(match m.role {
                    SamplingRole::User => Message::user(text),
                    SamplingRole::Assistant => Message::assistant(text),
                })
            })
            .collect::<Result<Vec<_>, SamplingError>>()?;

        let request = ModelRequest {
            system: params.system_prompt.as_deref(),
            max_tokens: Some(params.max_tokens),
            ..ModelRequest::new(&messages, &[])
        };
        let response = self
            .backend
            .call(request)
            .await
            .map_err(|e| SamplingError::Failed(e.to_string()))?;

        Ok(CreateMessageResult::assistant_text(
            self.backend.model(),
            response.message.text(),
        ))
    }
}

/// Renders tool host notifications into the caller's log.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationLogger;

impl NotificationLogger {
    pub fn log(&self, notification: &ServerNotification) {
        match notification {
            ServerNotification::Progress(p) => {
                let line = progress_line(&p.progress_token, p.progress, p.message.as_deref());
                info!("{line}");
            }
            ServerNotification::LoggingMessage(m) => {
                let data = match m.data.as_str() {
                    Some(text) => text.to_string(),
                    None => m.data.to_string(),
                };
                let token = notification.progress_token();
                let logger = m.logger.as_deref().unwrap_or("server");
                match m.level {
                    LoggingLevel::Debug => debug!(?token, logger, "MCP Server log: [{}] {data}", m.level),
                    LoggingLevel::Info | LoggingLevel::Notice => {
                        info!(?token, logger, "MCP Server log: [{}] {data}", m.level)
                    }
                    LoggingLevel::Warning => warn!(?token, logger, "MCP Server log: [{}] {data}", m.level),
                    _ => error!(?token, logger, "MCP Server log: [{}] {data}", m.level),
                }
            }
        }
    }
}

/// `"[token] 50% done | message"`.
pub fn progress_line(token: &ProgressToken, progress: f64, message: Option<&str>) -> String {
    let percent = (progress * 100.0).round();
    match message {
        Some(message) => format!("[{token}] {percent}% done | {message}"),
        None => format!("[{token}] {percent}% done"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use crate::turn::Turn;

    #[test]
    fn formats_progress() {
        let token = ProgressToken::from("token-1");
        assert_eq!(
            progress_line(&token, 0.5, Some("Start sampling")),
            "[token-1] 50% done | Start sampling"
        );
        assert_eq!(progress_line(&token, 1.0, None), "[token-1] 100% done");
    }

    #[tokio::test]
    async fn samples_without_tools_and_marks_turn() {
        let backend = Arc::new(ScriptedBackend::new(vec![Message::assistant("Hark!")]));
        let turns = ActiveTurns::default();
        let turn = Turn::with_token("t1".into(), "weather?");
        turns.register(&turn);

        let sampler = ModelSampler::new(backend.clone(), turns.clone());
        let params = CreateMessageParams::new("You are a poet!", "Weather forecast: 10.4°C", 100)
            .with_progress_token("t1".into());
        let result = sampler.create_message(params).await.unwrap();

        assert_eq!(result.as_text().unwrap(), "Hark!");
        assert_eq!(result.model, "scripted");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[0].system.as_deref(), Some("You are a poet!"));
        assert_eq!(requests[0].max_tokens, Some(100));

        assert_eq!(
            turn.state(),
            Some(TurnState::ToolPending(ToolPhase::SamplingPending))
        );
    }

    #[tokio::test]
    async fn backend_failure_is_sampling_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let sampler = ModelSampler::new(backend, ActiveTurns::default());
        let err = sampler
            .create_message(CreateMessageParams::new("s", "u", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, SamplingError::Failed(_)));
    }
}
