//! Ollama native chat backend (`/api/chat`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolSpec,
    Usage,
};

pub const OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_predict: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ChatFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Builder for an [`OllamaBackend`].
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
    system: Option<String>,
}

impl OllamaBackendBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: OLLAMA_URL.to_string(),
            max_tokens: None,
            system: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn build(self) -> OllamaBackend {
        OllamaBackend {
            client: reqwest::Client::new(),
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            max_tokens: self.max_tokens,
            system: self.system,
        }
    }
}

/// A local model served by Ollama.
pub struct OllamaBackend {
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
    system: Option<String>,
}

impl OllamaBackend {
    pub fn builder(model: impl Into<String>) -> OllamaBackendBuilder {
        OllamaBackendBuilder::new(model)
    }

    fn messages_to_api(system: Option<&str>, messages: &[Message]) -> Vec<ChatMessage> {
        // Tool results only carry the call id; Ollama wants the tool name.
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        let mut out = Vec::with_capacity(messages.len() + 1);

        if let Some(system) = system {
            out.push(ChatMessage {
                role: "system".into(),
                content: system.to_string(),
                ..Default::default()
            });
        }

        for msg in messages {
            match msg.role {
                Role::Tool => {
                    for result in msg.results() {
                        out.push(ChatMessage {
                            role: "tool".into(),
                            content: result.content().to_string(),
                            tool_name: call_names
                                .get(result.tool_call_id())
                                .map(|name| name.to_string()),
                            ..Default::default()
                        });
                    }
                }
                role => {
                    let tool_calls = msg
                        .parts
                        .iter()
                        .filter_map(|part| match part {
                            Part::ToolCall(call) => {
                                call_names.insert(&call.id, &call.name);
                                Some(ChatToolCall {
                                    id: Some(call.id.clone()),
                                    function: ChatFunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.input.clone(),
                                    },
                                })
                            }
                            _ => None,
                        })
                        .collect();
                    out.push(ChatMessage {
                        role: match role {
                            Role::System => "system",
                            Role::Assistant => "assistant",
                            _ => "user",
                        }
                        .into(),
                        content: msg.text(),
                        tool_calls,
                        tool_name: None,
                    });
                }
            }
        }
        out
    }

    fn tool_to_api(spec: &ToolSpec) -> ChatTool<'_> {
        ChatTool {
            kind: "function",
            function: ChatFunction {
                name: &spec.name,
                description: &spec.description,
                parameters: &spec.schema,
            },
        }
    }

    fn response_to_message(message: ChatMessage) -> Message {
        let mut parts = Vec::new();
        if !message.content.is_empty() {
            parts.push(Part::Text(message.content));
        }
        for call in message.tool_calls {
            parts.push(Part::ToolCall(ToolCall {
                id: call.id.unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple())),
                name: call.function.name,
                input: call.function.arguments,
            }));
        }
        Message {
            role: Role::Assistant,
            parts,
        }
    }
}

impl std::fmt::Display for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ollama({}, {})", self.model, self.base_url)
    }
}

impl Backend for OllamaBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: Self::messages_to_api(
                request.system.or(self.system.as_deref()),
                request.messages,
            ),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            stream: false,
            options: request
                .max_tokens
                .or(self.max_tokens)
                .map(|num_predict| ChatOptions { num_predict }),
        };
        debug!(model = %self.model, messages = body.messages.len(), "calling ollama");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, base_url = %self.base_url, "failed to reach ollama");
                ModelError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(ModelError::Api(format!("{status}: {detail}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(ModelResponse {
            message: Self::response_to_message(chat.message),
            usage: Usage {
                input_tokens: chat.prompt_eval_count.unwrap_or_default(),
                output_tokens: chat.eval_count.unwrap_or_default(),
            },
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
