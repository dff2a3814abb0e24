//! The tool host side of an MCP connection.
//!
//! A [`ToolServer`] owns a [`ToolRegistry`] of typed tools. Each caller gets
//! a [`ServerSession`] that remembers the capabilities it declared, pushes
//! progress and log notifications tagged with the caller's progress token,
//! and lets tools ask the caller's model for completions through a
//! [`SamplingBridge`].

mod error;
mod executor;
mod notify;
mod registry;
mod sampling;
mod schema;
mod server;
pub mod weather;

pub use error::{Error, Result, ToolError};
pub use executor::{ToolContext, ToolExecutor};
pub use notify::{NotificationChannel, NotificationSink, Notifier, ProgressLedger, Subscription};
pub use registry::{RegisteredTool, ToolHandler, ToolRegistry};
pub use sampling::{
    DEFAULT_SAMPLING_TIMEOUT, Sampled, SamplingBridge, SamplingClient, SamplingError,
};
pub use schema::{Arguments, ParamSchema, ParamType, ToolDeclaration};
pub use server::{ServerSession, ToolServer};
