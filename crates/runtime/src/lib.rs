//! The calling side of a weatherbot conversation.
//!
//! A user request becomes a [`Turn`] with its own progress token. The
//! [`Driver`] alternates between the model and the tool host until the
//! model answers in plain text; the [`Orchestrator`] wraps that with
//! notification routing and Turn bookkeeping. While a tool runs it may ask
//! the caller's model for text through [`ModelSampler`].
//!
//! # Overview
//!
//! - **Backend**: a model endpoint (Anthropic, Ollama).
//! - **ToolHost**: where tool calls go; [`LocalToolHost`] talks to an
//!   in-process `host::ServerSession`.
//! - **Turn**: history plus an ordered trace of [`TurnState`]s.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use runtime::{ActiveTurns, Driver, DriverConfig, LocalToolHost, ModelSampler, Orchestrator};
//!
//! # async fn example(backend: Arc<runtime::OllamaBackend>, server: Arc<host::ToolServer>) -> runtime::Result<()> {
//! let channel = host::NotificationChannel::new();
//! let turns = ActiveTurns::default();
//! let sampler = Arc::new(ModelSampler::new(backend.clone(), turns.clone()));
//! let init = mcp::InitializeParams::new(
//!     mcp::Implementation::new("weatherbot", "0.1.0"),
//!     mcp::ClientCapabilities::with_sampling(),
//! );
//! let session = server.connect(init, Some(sampler), Arc::new(channel.clone()));
//!
//! let driver = Driver::new(backend, LocalToolHost::new(session), DriverConfig::default())?;
//! let orchestrator = Orchestrator::new(driver, channel, turns);
//! println!("{}", orchestrator.handle("What's the weather in Thessaloniki?").await?);
//! # Ok(())
//! # }
//! ```

mod client;
mod driver;
mod error;
pub mod model;
mod orchestrator;
pub mod tools;
mod turn;

#[cfg(test)]
mod testing;

pub use client::{ModelSampler, NotificationLogger, progress_line};
pub use driver::{
    DEFAULT_MAX_ROUNDS, DEFAULT_MODEL_TIMEOUT, Driver, DriverConfig, MalformedCallPolicy,
};
pub use error::{Error, Result};
pub use model::backend::{
    AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder, OllamaBackend, OllamaBackendBuilder,
};
pub use model::{Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolSpec};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use tools::{EmptyToolHost, LocalToolHost, ToolHost, ToolOutput};
pub use turn::{ActiveTurns, StateTrace, ToolPhase, Turn, TurnState};
