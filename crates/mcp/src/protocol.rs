//! MCP protocol types (tools, progress, logging, sampling).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const METHOD_PROGRESS: &str = "notifications/progress";
pub const METHOD_LOGGING_MESSAGE: &str = "notifications/message";

/// Progress token (can be string or number).
///
/// Ties progress and log notifications, and nested sampling requests, to the
/// request that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

impl ProgressToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self::String(format!("token-{}", Uuid::new_v4()))
    }
}

impl std::fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for ProgressToken {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for ProgressToken {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ProgressToken {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// The `_meta` object attached to requests and notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_token: Option<ProgressToken>,
}

impl Meta {
    pub fn with_progress_token(token: ProgressToken) -> Self {
        Self {
            progress_token: Some(token),
        }
    }
}

// --- Handshake ---

/// Name and version of a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Capabilities a client declares during initialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
}

impl ClientCapabilities {
    /// Capabilities of a client that can serve `sampling/createMessage`.
    pub fn with_sampling() -> Self {
        Self {
            sampling: Some(SamplingCapability::default()),
        }
    }

    pub fn supports_sampling(&self) -> bool {
        self.sampling.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingCapability {}

/// MCP initialize request params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

impl InitializeParams {
    pub fn new(client_info: Implementation, capabilities: ClientCapabilities) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities,
            client_info,
        }
    }
}

// --- Tools ---

/// Tool definition returned by tools/list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Params for tools/call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl CallToolParams {
    /// Build params from a JSON value, which must be an object or null.
    pub fn new(name: impl Into<String>, arguments: Value) -> Result<Self> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::InvalidArguments(format!(
                    "expected an object, got {other}"
                )));
            }
        };
        Ok(Self {
            name: name.into(),
            arguments,
            meta: None,
        })
    }

    pub fn with_progress_token(mut self, token: ProgressToken) -> Self {
        self.meta = Some(Meta::with_progress_token(token));
        self
    }

    pub fn progress_token(&self) -> Option<&ProgressToken> {
        self.meta.as_ref().and_then(|m| m.progress_token.as_ref())
    }
}

/// Result of tools/call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }

    /// Concatenated text of all text blocks.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(Content::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content block carried by tool results and sampling messages.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Get text content if this is a text content block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Content::Text { .. } => "text",
            Content::Image { .. } => "image",
        }
    }

    fn expect_text(&self) -> Result<&str> {
        self.as_text().ok_or(Error::UnexpectedContent {
            expected: "text",
            actual: self.kind(),
        })
    }
}

// --- Notifications ---

/// Severity of a `notifications/message` event (syslog levels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl std::fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotificationParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingMessageNotificationParams {
    pub level: LoggingLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// A notification pushed from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ServerNotification {
    #[serde(rename = "notifications/progress")]
    Progress(ProgressNotificationParams),
    #[serde(rename = "notifications/message")]
    LoggingMessage(LoggingMessageNotificationParams),
}

impl ServerNotification {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Progress(_) => METHOD_PROGRESS,
            Self::LoggingMessage(_) => METHOD_LOGGING_MESSAGE,
        }
    }

    /// The token this notification is correlated with, if any.
    pub fn progress_token(&self) -> Option<&ProgressToken> {
        match self {
            Self::Progress(p) => Some(&p.progress_token),
            Self::LoggingMessage(m) => m.meta.as_ref().and_then(|m| m.progress_token.as_ref()),
        }
    }

    /// Progress fraction, for progress notifications.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Progress(p) => Some(p.progress),
            Self::LoggingMessage(_) => None,
        }
    }
}

// --- Sampling ---

/// Role of a sampling message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingMessage {
    pub role: Role,
    pub content: Content,
}

/// Params for sampling/createMessage (server asks the client's model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageParams {
    pub messages: Vec<SamplingMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl CreateMessageParams {
    /// A single-user-message request with a system prompt.
    pub fn new(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            messages: vec![SamplingMessage {
                role: Role::User,
                content: Content::text(user),
            }],
            system_prompt: Some(system_prompt.into()),
            max_tokens,
            meta: None,
        }
    }

    pub fn with_progress_token(mut self, token: ProgressToken) -> Self {
        self.meta = Some(Meta::with_progress_token(token));
        self
    }

    pub fn progress_token(&self) -> Option<&ProgressToken> {
        self.meta.as_ref().and_then(|m| m.progress_token.as_ref())
    }

    /// Text of the first user message.
    pub fn user_text(&self) -> Result<&str> {
        let message = self
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .ok_or(Error::UnexpectedContent {
                expected: "user message",
                actual: "none",
            })?;
        message.content.expect_text()
    }
}

/// Result of sampling/createMessage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageResult {
    pub role: Role,
    pub content: Content,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl CreateMessageResult {
    pub fn assistant_text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
            model: model.into(),
            stop_reason: Some("endTurn".to_string()),
        }
    }

    pub fn as_text(&self) -> Result<&str> {
        self.content.expect_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_params_carry_progress_token_in_meta() {
        let params = CallToolParams::new("getTemperature", json!({"latitude": 40.6}))
            .unwrap()
            .with_progress_token("token-1".into());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["_meta"]["progressToken"], "token-1");
        assert_eq!(json["arguments"]["latitude"], 40.6);
    }

    #[test]
    fn call_params_reject_non_object_arguments() {
        let err = CallToolParams::new("getTemperature", json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
        let params = CallToolParams::new("getTemperature", Value::Null).unwrap();
        assert!(params.arguments.is_empty());
    }

    #[test]
    fn deserialize_tool() {
        let json = r#"{
            "name": "getTemperature",
            "description": "Get the temperature",
            "inputSchema": {"type": "object", "properties": {"latitude": {"type": "number"}}}
        }"#;
        let tool: Tool = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "getTemperature");
    }

    #[test]
    fn progress_notification_wire_shape() {
        let json = r#"{
            "method": "notifications/progress",
            "params": {"progressToken": 7, "progress": 0.5, "total": 1.0, "message": "Start sampling"}
        }"#;
        let notification: ServerNotification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.method(), METHOD_PROGRESS);
        assert_eq!(notification.progress_token(), Some(&ProgressToken::Number(7)));
        assert_eq!(notification.progress(), Some(0.5));
    }

    #[test]
    fn logging_notification_correlates_through_meta() {
        let notification = ServerNotification::LoggingMessage(LoggingMessageNotificationParams {
            level: LoggingLevel::Warning,
            logger: None,
            data: json!("no sampling"),
            meta: Some(Meta::with_progress_token("token-9".into())),
        });
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["method"], "notifications/message");
        assert_eq!(json["params"]["level"], "warning");
        assert_eq!(json["params"]["_meta"]["progressToken"], "token-9");
        assert_eq!(
            notification.progress_token(),
            Some(&ProgressToken::from("token-9"))
        );
    }

    #[test]
    fn logging_levels_are_ordered() {
        assert!(LoggingLevel::Info < LoggingLevel::Warning);
        assert!(LoggingLevel::Error > LoggingLevel::Notice);
        assert_eq!(LoggingLevel::Warning.to_string(), "warning");
    }

    #[test]
    fn generated_tokens_differ() {
        let a = ProgressToken::generate();
        let b = ProgressToken::generate();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("token-"));
    }

    #[test]
    fn sampling_text_accessors() {
        let params = CreateMessageParams::new("You are a poet!", "Write a poem", 100)
            .with_progress_token(ProgressToken::Number(3));
        assert_eq!(params.user_text().unwrap(), "Write a poem");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["systemPrompt"], "You are a poet!");
        assert_eq!(json["maxTokens"], 100);
        assert_eq!(json["_meta"]["progressToken"], 3);

        let result = CreateMessageResult {
            role: Role::Assistant,
            content: Content::Image {
                data: "AAAA".into(),
                mime_type: "image/png".into(),
            },
            model: "m".into(),
            stop_reason: None,
        };
        assert!(matches!(
            result.as_text(),
            Err(Error::UnexpectedContent { actual: "image", .. })
        ));
    }

    #[test]
    fn capabilities_sampling_flag() {
        assert!(!ClientCapabilities::default().supports_sampling());
        let caps = ClientCapabilities::with_sampling();
        assert!(caps.supports_sampling());
        assert_eq!(serde_json::to_value(&caps).unwrap(), json!({"sampling": {}}));
    }
}
