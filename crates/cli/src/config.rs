//! Configuration loading from weatherbot.toml.

use std::path::Path;
use std::time::Duration;

use host::DEFAULT_SAMPLING_TIMEOUT;
use host::weather::{DEFAULT_POEM_MAX_TOKENS, DEFAULT_TIMEOUT, OPEN_METEO_URL};
use runtime::{AnthropicAuth, DriverConfig, MalformedCallPolicy};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "weatherbot.toml";

const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub turn: TurnConfig,
    pub client: ClientConfig,
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    Anthropic,
}

/// Model endpoint configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub provider: Provider,

    /// Model to use. Defaults per provider.
    pub model: Option<String>,

    /// Anthropic API key. Mutually exclusive with oauth_token.
    pub api_key: Option<String>,

    /// Anthropic OAuth token. Mutually exclusive with api_key.
    pub oauth_token: Option<String>,

    pub base_url: Option<String>,

    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TurnConfig {
    pub max_rounds: u32,
    pub model_timeout_secs: u64,
    pub malformed_calls: MalformedCallPolicy,
    pub system: Option<String>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        let defaults = DriverConfig::default();
        Self {
            max_rounds: defaults.max_rounds,
            model_timeout_secs: defaults.model_timeout.as_secs(),
            malformed_calls: defaults.malformed_calls,
            system: None,
        }
    }
}

/// What the caller offers the tool host.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Declare the sampling capability.
    pub sampling: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { sampling: true }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Ask the caller's model for a poem about the weather.
    pub poem: bool,
    pub poem_max_tokens: u32,
    pub sampling_timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            poem: true,
            poem_max_tokens: DEFAULT_POEM_MAX_TOKENS,
            sampling_timeout_secs: DEFAULT_SAMPLING_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Fill gaps from `ANTHROPIC_API_KEY` and `WEATHERBOT_MODEL`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("ANTHROPIC_API_KEY").ok(),
            std::env::var("WEATHERBOT_MODEL").ok(),
        );
    }

    fn apply_overrides(&mut self, api_key: Option<String>, model: Option<String>) {
        if self.backend.api_key.is_none() && self.backend.oauth_token.is_none() {
            self.backend.api_key = api_key;
        }
        if let Some(model) = model {
            self.backend.model = Some(model);
        }
    }

    pub fn model(&self) -> &str {
        match (&self.backend.model, self.backend.provider) {
            (Some(model), _) => model,
            (None, Provider::Ollama) => DEFAULT_OLLAMA_MODEL,
            (None, Provider::Anthropic) => DEFAULT_ANTHROPIC_MODEL,
        }
    }

    /// Build the Anthropic authentication from config.
    ///
    /// Requires exactly one of api_key or oauth_token to be set.
    pub fn auth(&self) -> Result<AnthropicAuth, ConfigError> {
        match (&self.backend.api_key, &self.backend.oauth_token) {
            (Some(key), None) => Ok(AnthropicAuth::ApiKey(key.clone())),
            (None, Some(token)) => Ok(AnthropicAuth::Oauth(token.clone())),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousAuth),
            (None, None) => Err(ConfigError::MissingAuth),
        }
    }

    /// Reject values that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weather.timeout_secs == 0 {
            return Err(ConfigError::Invalid("weather.timeout_secs must be non-zero".into()));
        }
        if self.weather.sampling_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "weather.sampling_timeout_secs must be non-zero".into(),
            ));
        }
        if self.weather.poem_max_tokens == 0 {
            return Err(ConfigError::Invalid("weather.poem_max_tokens must be non-zero".into()));
        }
        Ok(())
    }

    pub fn driver(&self) -> DriverConfig {
        DriverConfig {
            max_rounds: self.turn.max_rounds,
            model_timeout: Duration::from_secs(self.turn.model_timeout_secs),
            malformed_calls: self.turn.malformed_calls,
            system: self.turn.system.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(
        "authentication not configured: set backend.api_key, backend.oauth_token or ANTHROPIC_API_KEY"
    )]
    MissingAuth,

    #[error(
        "ambiguous authentication: set either backend.api_key OR backend.oauth_token, not both"
    )]
    AmbiguousAuth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.provider, Provider::Ollama);
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.turn.max_rounds, 8);
        assert!(config.client.sampling);
        assert_eq!(config.weather.base_url, OPEN_METEO_URL);
        assert_eq!(config.weather.poem_max_tokens, 100);
    }

    #[test]
    fn parses_full_file() {
        let config = Config::parse(
            r#"
            [backend]
            provider = "anthropic"
            model = "claude-haiku"
            api_key = "sk-test"
            max_tokens = 512

            [turn]
            max_rounds = 3
            model_timeout_secs = 30
            malformed_calls = "report_to_model"
            system = "Be brief."

            [client]
            sampling = false

            [weather]
            base_url = "http://localhost:9999"
            poem = false
            "#,
        )
        .unwrap();

        assert_eq!(config.model(), "claude-haiku");
        assert!(matches!(config.auth(), Ok(AnthropicAuth::ApiKey(ref k)) if k == "sk-test"));
        assert!(!config.client.sampling);
        assert!(!config.weather.poem);

        let driver = config.driver();
        assert_eq!(driver.max_rounds, 3);
        assert_eq!(driver.model_timeout, Duration::from_secs(30));
        assert_eq!(driver.malformed_calls, MalformedCallPolicy::ReportToModel);
        assert_eq!(driver.system.as_deref(), Some("Be brief."));
    }

    #[test]
    fn zero_timeouts_are_invalid() {
        assert!(Config::default().validate().is_ok());

        let config = Config::parse("[weather]\nsampling_timeout_secs = 0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(ref m)) if m.contains("sampling_timeout_secs")
        ));

        let config = Config::parse("[weather]\ntimeout_secs = 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            Config::parse("[weather]\ncity = \"Athens\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn auth_requires_exactly_one_credential() {
        let mut config = Config::default();
        assert!(matches!(config.auth(), Err(ConfigError::MissingAuth)));

        config.backend.api_key = Some("a".into());
        config.backend.oauth_token = Some("b".into());
        assert!(matches!(config.auth(), Err(ConfigError::AmbiguousAuth)));
    }

    #[test]
    fn env_fills_gaps_only() {
        let mut config = Config::default();
        config.backend.oauth_token = Some("oat".into());
        config.apply_overrides(Some("sk-env".into()), Some("qwen2.5".into()));

        assert!(config.backend.api_key.is_none());
        assert_eq!(config.model(), "qwen2.5");
    }
}
