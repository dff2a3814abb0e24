//! Test doubles shared by the runtime's unit tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, Usage,
};

/// What a backend was asked.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
}

/// Backend that replays a fixed list of replies in order and records every
/// request. Fails with an API error once the script runs out.
///
/// Replies registered with [`ScriptedBackend::per_prompt`] are served only to
/// conversations that opened with that prompt, so concurrent Turns each get
/// their own script.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Message>>,
    by_prompt: Mutex<HashMap<String, VecDeque<Message>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Message>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn per_prompt(scripts: impl IntoIterator<Item = (&'static str, Vec<Message>)>) -> Self {
        let by_prompt = scripts
            .into_iter()
            .map(|(prompt, replies)| (prompt.to_string(), replies.into()))
            .collect();
        Self {
            by_prompt: Mutex::new(by_prompt),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Requests that offered tools, i.e. top-level rounds rather than
    /// sampling calls.
    pub fn rounds(&self) -> usize {
        self.requests().iter().filter(|r| !r.tools.is_empty()).count()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            system: request.system.map(str::to_string),
            max_tokens: request.max_tokens,
        });
        // Let other Turns run between request and reply.
        tokio::task::yield_now().await;

        let prompt = request.messages.first().map(Message::text);
        let keyed = prompt.and_then(|p| self.by_prompt.lock().get_mut(&p).map(VecDeque::pop_front));
        let message = match keyed {
            Some(reply) => reply,
            None => self.script.lock().pop_front(),
        }
        .ok_or_else(|| ModelError::Api("script exhausted".into()))?;
        Ok(ModelResponse {
            message,
            usage: Usage::default(),
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Backend that never answers in time.
#[derive(Debug, Default)]
pub struct StalledBackend;

impl Backend for StalledBackend {
    async fn call(&self, _request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ModelError::Network("stalled".into()))
    }

    fn model(&self) -> &str {
        "stalled"
    }
}

/// An assistant message requesting one tool call.
pub fn tool_call(id: &str, name: &str, input: Value) -> Message {
    Message {
        role: Role::Assistant,
        parts: vec![Part::ToolCall(ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        })],
    }
}
