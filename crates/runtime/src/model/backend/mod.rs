//! Model endpoint backends.

mod anthropic;
mod ollama;

pub use anthropic::{ANTHROPIC_API_URL, AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder};
pub use ollama::{OLLAMA_URL, OllamaBackend, OllamaBackendBuilder};
