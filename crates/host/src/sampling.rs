//! Nested model requests from a tool back to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp::{ClientCapabilities, CreateMessageParams, CreateMessageResult, ProgressToken};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_SAMPLING_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport for `sampling/createMessage` to the caller's model.
#[async_trait]
pub trait SamplingClient: Send + Sync {
    async fn create_message(
        &self,
        params: CreateMessageParams,
    ) -> Result<CreateMessageResult, SamplingError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SamplingError {
    #[error("sampling failed: {0}")]
    Failed(String),

    #[error("sampling timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected sampling content: {0}")]
    UnexpectedContent(String),
}

/// Outcome of a sampling attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampled {
    Text(String),
    /// The caller never declared the sampling capability.
    Declined,
}

/// Gate between tools and the caller's model.
///
/// Built once per connection from the capabilities the caller declared.
pub struct SamplingBridge {
    capabilities: ClientCapabilities,
    client: Option<Arc<dyn SamplingClient>>,
    timeout: Duration,
}

impl SamplingBridge {
    pub fn new(capabilities: ClientCapabilities, client: Option<Arc<dyn SamplingClient>>) -> Self {
        Self {
            capabilities,
            client,
            timeout: DEFAULT_SAMPLING_TIMEOUT,
        }
    }

    /// A bridge that always declines.
    pub fn disabled() -> Self {
        Self::new(ClientCapabilities::default(), None)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn capabilities(&self) -> &ClientCapabilities {
        &self.capabilities
    }

    /// True only if the caller declared sampling and supplied a client.
    pub fn is_supported(&self) -> bool {
        self.capabilities.supports_sampling() && self.client.is_some()
    }

    /// Ask the caller's model for a completion, tagged with `token`.
    pub async fn request(
        &self,
        token: &ProgressToken,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<Sampled, SamplingError> {
        let client = match &self.client {
            Some(client) if self.capabilities.supports_sampling() => client,
            _ => {
                info!(%token, "caller does not support sampling, skipping");
                return Ok(Sampled::Declined);
            }
        };

        let params =
            CreateMessageParams::new(system, user, max_tokens).with_progress_token(token.clone());
        debug!(%token, max_tokens, "sending sampling request");

        let result = tokio::time::timeout(self.timeout, client.create_message(params))
            .await
            .map_err(|_| SamplingError::Timeout(self.timeout))??;

        let text = result
            .as_text()
            .map_err(|e| SamplingError::UnexpectedContent(e.to_string()))?;
        Ok(Sampled::Text(text.to_string()))
    }
}

impl std::fmt::Debug for SamplingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingBridge")
            .field("capabilities", &self.capabilities)
            .field("client", &self.client.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Sampling client answering every request with the same text.
    #[derive(Default)]
    pub struct FixedSampler {
        pub reply: String,
        pub requests: Mutex<Vec<CreateMessageParams>>,
    }

    impl FixedSampler {
        pub fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                requests: Mutex::default(),
            }
        }

        pub fn requests(&self) -> Vec<CreateMessageParams> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl SamplingClient for FixedSampler {
        async fn create_message(
            &self,
            params: CreateMessageParams,
        ) -> Result<CreateMessageResult, SamplingError> {
            self.requests.lock().push(params);
            Ok(CreateMessageResult::assistant_text("fixed", &self.reply))
        }
    }

    /// Sampling client that always fails.
    pub struct FailingSampler;

    #[async_trait]
    impl SamplingClient for FailingSampler {
        async fn create_message(
            &self,
            _params: CreateMessageParams,
        ) -> Result<CreateMessageResult, SamplingError> {
            Err(SamplingError::Failed("model offline".into()))
        }
    }
}
