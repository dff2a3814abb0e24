//! Weather poems written by the caller's model.

use mcp::LoggingLevel;
use tracing::{info, warn};

use super::WeatherInfo;
use crate::executor::ToolContext;
use crate::sampling::Sampled;

pub const POET_SYSTEM_PROMPT: &str = "You are a poet!";
pub const DEFAULT_POEM_MAX_TOKENS: u32 = 100;

pub const SAMPLING_UNAVAILABLE: &str =
    "MCP Server cannot perform sampling, because MCP Client doesn't provide sampling capability";

/// Optional augmentation step of the weather tool.
#[derive(Debug, Clone, Copy)]
pub struct PoemWriter {
    max_tokens: u32,
}

impl Default for PoemWriter {
    fn default() -> Self {
        Self::new(DEFAULT_POEM_MAX_TOKENS)
    }
}

impl PoemWriter {
    pub fn new(max_tokens: u32) -> Self {
        Self { max_tokens }
    }

    pub fn prompt(weather: &WeatherInfo) -> String {
        format!(
            "Weather forecast: {}°C\nLocation: ({}, {})\nPlease write an epic Shakespearean-style poem about this weather.\n",
            weather.temperature, weather.latitude, weather.longitude
        )
    }

    /// Ask for a poem. Returns `None` when sampling is unavailable, fails
    /// or comes back empty; never fails the tool call.
    pub async fn write(&self, weather: &WeatherInfo, ctx: &ToolContext<'_>) -> Option<String> {
        if ctx.sampler.is_supported() {
            ctx.notifier.progress(0.5, "Start sampling");
        }

        let sampled = ctx
            .sampler
            .request(ctx.token, POET_SYSTEM_PROMPT, &Self::prompt(weather), self.max_tokens)
            .await;

        match sampled {
            Ok(Sampled::Text(text)) if !text.trim().is_empty() => Some(text),
            Ok(Sampled::Text(_)) => {
                info!(token = %ctx.token, "sampling returned an empty poem");
                None
            }
            Ok(Sampled::Declined) => {
                ctx.notifier.log(LoggingLevel::Warning, SAMPLING_UNAVAILABLE);
                None
            }
            Err(e) => {
                warn!(token = %ctx.token, error = %e, "poem sampling failed");
                ctx.notifier
                    .log(LoggingLevel::Warning, format!("Poem sampling failed: {e}"));
                None
            }
        }
    }
}
