//! Weather lookup tool with an optional sampled poem.

mod gateway;
mod poem;
mod tool;

use std::sync::Arc;

pub use gateway::{DEFAULT_TIMEOUT, OPEN_METEO_URL, OpenMeteoGateway, WeatherGateway, WeatherInfo};
pub use poem::{DEFAULT_POEM_MAX_TOKENS, POET_SYSTEM_PROMPT, PoemWriter, SAMPLING_UNAVAILABLE};
pub use tool::{GetTemperature, TOOL_NAME, format_report};

use crate::Result;
use crate::registry::ToolRegistry;

/// A registry holding just the weather tool.
pub fn registry(gateway: Arc<dyn WeatherGateway>, poem: Option<PoemWriter>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(GetTemperature::declaration(), GetTemperature::new(gateway, poem))?;
    Ok(registry)
}
