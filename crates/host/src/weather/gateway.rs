//! Current-conditions lookup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use crate::{Result, ToolError};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Current conditions at a location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherInfo {
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub observed_at: Option<NaiveDateTime>,
}

#[async_trait]
pub trait WeatherGateway: Send + Sync {
    async fn current(&self, latitude: f64, longitude: f64) -> std::result::Result<WeatherInfo, ToolError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    #[serde(default)]
    time: Option<String>,
    temperature_2m: f64,
}

/// Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoGateway {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherGateway for OpenMeteoGateway {
    async fn current(&self, latitude: f64, longitude: f64) -> std::result::Result<WeatherInfo, ToolError> {
        let url = format!("{}/v1/forecast", self.base_url);
        debug!(%url, latitude, longitude, "fetching current weather");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "temperature_2m".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::UpstreamUnavailable(format!("{status}: {body}")));
        }

        let forecast: ForecastResponse = response
            .json()
            .await
            .map_err(|e| ToolError::UpstreamUnavailable(format!("malformed forecast: {e}")))?;

        let observed_at = forecast
            .current
            .time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok());

        Ok(WeatherInfo {
            latitude,
            longitude,
            temperature: forecast.current.temperature_2m,
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_current_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "40.6317"))
            .and(query_param("longitude", "22.9353"))
            .and(query_param("current", "temperature_2m"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "latitude": 40.625,
                "longitude": 22.9375,
                "current": {"time": "2025-01-14T09:15", "interval": 900, "temperature_2m": 10.4}
            })))
            .mount(&server)
            .await;

        let gateway = OpenMeteoGateway::new(server.uri(), DEFAULT_TIMEOUT).unwrap();
        let info = gateway.current(40.6317, 22.9353).await.unwrap();

        assert_eq!(info.temperature, 10.4);
        assert_eq!(info.latitude, 40.6317);
        assert_eq!(
            info.observed_at,
            NaiveDate::from_ymd_opt(2025, 1, 14).and_then(|d| d.and_hms_opt(9, 15, 0))
        );
    }

    #[tokio::test]
    async fn server_error_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let gateway = OpenMeteoGateway::new(server.uri(), DEFAULT_TIMEOUT).unwrap();
        let err = gateway.current(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, ToolError::UpstreamUnavailable(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn malformed_body_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hourly": {}})))
            .mount(&server)
            .await;

        let gateway = OpenMeteoGateway::new(server.uri(), DEFAULT_TIMEOUT).unwrap();
        let err = gateway.current(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, ToolError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"current": {"temperature_2m": 1.0}})),
            )
            .mount(&server)
            .await;

        let gateway = OpenMeteoGateway::new(server.uri(), Duration::from_millis(100)).unwrap();
        let err = gateway.current(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, ToolError::UpstreamUnavailable(_)));
    }
}
