//! MCP (Model Context Protocol) schema shared by the caller and the tool host.
//!
//! This crate holds the wire-ready types both peers exchange: tool
//! declarations and calls, progress tokens, progress and logging
//! notifications, and the nested `sampling/createMessage` request a tool
//! host sends back to the caller's model.
//!
//! # Example
//!
//! ```
//! use mcp::{CallToolParams, ProgressToken};
//!
//! let token = ProgressToken::generate();
//! let params = CallToolParams::new(
//!     "getTemperature",
//!     serde_json::json!({"latitude": 40.6317, "longitude": 22.9353}),
//! )?
//! .with_progress_token(token.clone());
//!
//! assert_eq!(params.progress_token(), Some(&token));
//! # Ok::<(), mcp::Error>(())
//! ```

mod error;
mod protocol;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, ClientCapabilities, Content, CreateMessageParams,
    CreateMessageResult, Implementation, InitializeParams, LoggingLevel,
    LoggingMessageNotificationParams, METHOD_LOGGING_MESSAGE, METHOD_PROGRESS, Meta,
    PROTOCOL_VERSION, ProgressNotificationParams, ProgressToken, Role, SamplingCapability,
    SamplingMessage, ServerNotification, Tool,
};
