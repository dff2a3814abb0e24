//! Model backend selected by configuration.

use runtime::{AnthropicBackend, Backend, ModelError, ModelRequest, ModelResponse, OllamaBackend};

use crate::config::{Config, ConfigError, Provider};

/// One of the supported model endpoints.
pub enum ConfiguredBackend {
    Ollama(OllamaBackend),
    Anthropic(AnthropicBackend),
}

impl ConfiguredBackend {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let model = config.model();
        let backend = &config.backend;

        Ok(match backend.provider {
            Provider::Ollama => {
                let mut builder = OllamaBackend::builder(model);
                if let Some(url) = &backend.base_url {
                    builder = builder.base_url(url);
                }
                if let Some(max_tokens) = backend.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                Self::Ollama(builder.build())
            }
            Provider::Anthropic => {
                let mut builder = AnthropicBackend::builder(config.auth()?, model);
                if let Some(url) = &backend.base_url {
                    builder = builder.base_url(url);
                }
                if let Some(max_tokens) = backend.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                Self::Anthropic(builder.build())
            }
        })
    }
}

impl std::fmt::Display for ConfiguredBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama(backend) => std::fmt::Display::fmt(backend, f),
            Self::Anthropic(backend) => std::fmt::Display::fmt(backend, f),
        }
    }
}

impl Backend for ConfiguredBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        match self {
            Self::Ollama(backend) => backend.call(request).await,
            Self::Anthropic(backend) => backend.call(request).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::Ollama(backend) => backend.model(),
            Self::Anthropic(backend) => backend.model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_ollama() {
        let backend = ConfiguredBackend::from_config(&Config::default()).unwrap();
        assert!(matches!(backend, ConfiguredBackend::Ollama(_)));
        assert_eq!(backend.model(), "llama3.2");
    }

    #[test]
    fn anthropic_needs_credentials() {
        let mut config = Config::default();
        config.backend.provider = Provider::Anthropic;
        assert!(matches!(
            ConfiguredBackend::from_config(&config),
            Err(ConfigError::MissingAuth)
        ));

        config.backend.oauth_token = Some("oat".into());
        let backend = ConfiguredBackend::from_config(&config).unwrap();
        assert!(matches!(backend, ConfiguredBackend::Anthropic(_)));
    }
}
