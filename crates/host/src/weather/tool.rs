//! The `getTemperature` tool.

use std::sync::Arc;

use async_trait::async_trait;
use mcp::LoggingLevel;

use super::{PoemWriter, WeatherGateway, WeatherInfo};
use crate::ToolError;
use crate::executor::ToolContext;
use crate::registry::ToolHandler;
use crate::schema::{Arguments, ParamSchema, ParamType, ToolDeclaration};

pub const TOOL_NAME: &str = "getTemperature";

/// Current temperature at a coordinate, optionally with a poem about it.
pub struct GetTemperature {
    gateway: Arc<dyn WeatherGateway>,
    poem: Option<PoemWriter>,
}

impl GetTemperature {
    pub fn new(gateway: Arc<dyn WeatherGateway>, poem: Option<PoemWriter>) -> Self {
        Self { gateway, poem }
    }

    pub fn declaration() -> ToolDeclaration {
        ToolDeclaration::new(
            TOOL_NAME,
            "Get the temperature (in celsius) for a specific location",
        )
        .param(ParamSchema::required(
            "latitude",
            ParamType::Number,
            "The location latitude",
        ))
        .param(ParamSchema::required(
            "longitude",
            ParamType::Number,
            "The location longitude",
        ))
    }
}

fn coordinate(args: &Arguments, name: &str, limit: f64) -> Result<f64, ToolError> {
    let value = args.require_number(name)?;
    if !(-limit..=limit).contains(&value) {
        return Err(ToolError::invalid_arguments(
            TOOL_NAME,
            format!("{name} {value} out of range [-{limit}, {limit}]"),
        ));
    }
    Ok(value)
}

#[async_trait]
impl ToolHandler for GetTemperature {
    async fn call(&self, args: Arguments, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let latitude = coordinate(&args, "latitude", 90.0)?;
        let longitude = coordinate(&args, "longitude", 180.0)?;

        ctx.notifier.log(
            LoggingLevel::Info,
            format!("getTemperature called with latitude={latitude}, longitude={longitude}"),
        );
        ctx.notifier
            .progress(0.0, "Start getting temperature from open meteo");

        let weather = match self.gateway.current(latitude, longitude).await {
            Ok(weather) => weather,
            Err(e) => {
                ctx.notifier.log(LoggingLevel::Error, e.to_string());
                ctx.notifier.progress(1.0, "Weather lookup failed");
                return Err(e);
            }
        };

        let poem = match &self.poem {
            Some(writer) => writer.write(&weather, ctx).await,
            None => None,
        };

        ctx.notifier.progress(1.0, "Task completed");
        Ok(format_report(poem.as_deref(), &weather))
    }
}

/// Tool result text: the poem (when there is one) then the raw reading.
pub fn format_report(poem: Option<&str>, weather: &WeatherInfo) -> String {
    let details = format!(
        "Weather details: {:.2}°C at ({:.4}, {:.4})",
        weather.temperature, weather.latitude, weather.longitude
    );
    match poem {
        Some(poem) => format!("Weather Poem:\n{poem}\n{details}"),
        None => details,
    }
}
