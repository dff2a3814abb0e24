//! Tool server and per-connection sessions.

use std::sync::Arc;
use std::time::Duration;

use mcp::{
    CallToolParams, CallToolResult, ClientCapabilities, Implementation, InitializeParams,
    ProgressToken, Tool,
};
use tracing::{debug, info};

use crate::ToolError;
use crate::executor::ToolExecutor;
use crate::notify::NotificationSink;
use crate::sampling::{SamplingBridge, SamplingClient};

/// The tool host peer: a named set of tools.
#[derive(Debug)]
pub struct ToolServer {
    info: Implementation,
    executor: ToolExecutor,
}

impl ToolServer {
    pub fn new(info: Implementation, executor: ToolExecutor) -> Self {
        Self { info, executor }
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.executor.registry().tools()
    }

    /// Accept a caller. Sampling is only offered back to callers that
    /// declared the capability during initialization.
    pub fn connect(
        self: &Arc<Self>,
        init: InitializeParams,
        sampling: Option<Arc<dyn SamplingClient>>,
        sink: Arc<dyn NotificationSink>,
    ) -> ServerSession {
        info!(
            client = %init.client_info.name,
            version = %init.client_info.version,
            sampling = init.capabilities.supports_sampling(),
            "client connected"
        );
        let bridge = SamplingBridge::new(init.capabilities.clone(), sampling);
        ServerSession {
            server: Arc::clone(self),
            client_info: init.client_info,
            bridge,
            sink,
        }
    }
}

/// One caller's connection to a [`ToolServer`].
pub struct ServerSession {
    server: Arc<ToolServer>,
    client_info: Implementation,
    bridge: SamplingBridge,
    sink: Arc<dyn NotificationSink>,
}

impl ServerSession {
    pub fn server(&self) -> &ToolServer {
        &self.server
    }

    pub fn client_info(&self) -> &Implementation {
        &self.client_info
    }

    pub fn capabilities(&self) -> &ClientCapabilities {
        self.bridge.capabilities()
    }

    pub fn with_sampling_timeout(mut self, timeout: Duration) -> Self {
        self.bridge = self.bridge.with_timeout(timeout);
        self
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.server.tools()
    }

    /// Handle `tools/call`.
    ///
    /// Unknown tools and bad arguments come back as `Err`; failures while
    /// the tool ran come back as an `is_error` result.
    pub async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, ToolError> {
        let (token, generated) = match params.progress_token() {
            Some(token) => (token.clone(), false),
            None => {
                let token = ProgressToken::generate();
                debug!(%token, tool = %params.name, "call without progress token, generated one");
                (token, true)
            }
        };

        let outcome = self
            .server
            .executor
            .execute(
                &params.name,
                &params.arguments,
                &token,
                self.sink.as_ref(),
                &self.bridge,
            )
            .await;

        // Nobody else knows a generated token, so nobody would release it.
        if generated {
            self.release(&token);
        }

        match outcome {
            Ok(text) => Ok(CallToolResult::text(text)),
            Err(e) if e.is_call_fault() => Err(e),
            Err(e) => Ok(CallToolResult::error(e.to_string())),
        }
    }

    /// Drop per-Turn state held for `token`.
    pub fn release(&self, token: &ProgressToken) {
        self.server.executor.release(token);
    }
}

impl std::fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSession")
            .field("server", &self.server.info)
            .field("client_info", &self.client_info)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::sampling::testing::FixedSampler;
    use crate::weather::{self, PoemWriter, WeatherGateway, WeatherInfo};

    struct FixedWeather;

    #[async_trait]
    impl WeatherGateway for FixedWeather {
        async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherInfo, ToolError> {
            Ok(WeatherInfo {
                latitude,
                longitude,
                temperature: 10.4,
                observed_at: None,
            })
        }
    }

    struct Offline;

    #[async_trait]
    impl WeatherGateway for Offline {
        async fn current(&self, _latitude: f64, _longitude: f64) -> Result<WeatherInfo, ToolError> {
            Err(ToolError::UpstreamUnavailable("dns failure".into()))
        }
    }

    fn server(gateway: impl WeatherGateway + 'static) -> Arc<ToolServer> {
        let registry = weather::registry(Arc::new(gateway), Some(PoemWriter::default())).unwrap();
        Arc::new(ToolServer::new(
            Implementation::new("weather-server", "0.1.0"),
            ToolExecutor::new(registry),
        ))
    }

    fn init(capabilities: ClientCapabilities) -> InitializeParams {
        InitializeParams::new(Implementation::new("test-client", "0.0.1"), capabilities)
    }

    fn call(token: &str) -> CallToolParams {
        CallToolParams::new(
            weather::TOOL_NAME,
            json!({"latitude": 40.6317, "longitude": 22.9353}),
        )
        .unwrap()
        .with_progress_token(token.into())
    }

    #[test]
    fn lists_catalog() {
        let tools = server(FixedWeather).tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "getTemperature");
        assert_eq!(tools[0].input_schema["required"], json!(["latitude", "longitude"]));
    }

    #[tokio::test]
    async fn sampling_requires_declared_capability() {
        let sampler = Arc::new(FixedSampler::new("A poem"));
        let sink = Arc::new(RecordingSink::default());
        let session = server(FixedWeather).connect(
            init(ClientCapabilities::default()),
            Some(sampler.clone()),
            sink.clone(),
        );

        let result = session.call_tool(call("t")).await.unwrap();
        assert!(!result.is_error);
        assert!(!result.joined_text().contains("Weather Poem"));
        assert!(sampler.requests().is_empty());
    }

    #[tokio::test]
    async fn notifications_carry_callers_token() {
        let sink = Arc::new(RecordingSink::default());
        let session = server(FixedWeather).connect(
            init(ClientCapabilities::with_sampling()),
            Some(Arc::new(FixedSampler::new("A poem"))),
            sink.clone(),
        );

        let result = session.call_tool(call("token-abc")).await.unwrap();
        assert!(result.joined_text().starts_with("Weather Poem:\nA poem\n"));

        let token = ProgressToken::from("token-abc");
        let events = sink.events();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.progress_token() == Some(&token)));
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error_result() {
        let session = server(Offline).connect(
            init(ClientCapabilities::default()),
            None,
            Arc::new(RecordingSink::default()),
        );
        let result = session.call_tool(call("t")).await.unwrap();
        assert!(result.is_error);
        assert!(result.joined_text().contains("dns failure"));
    }

    #[tokio::test]
    async fn call_faults_are_errors() {
        let session = server(FixedWeather).connect(
            init(ClientCapabilities::default()),
            None,
            Arc::new(RecordingSink::default()),
        );
        let err = session
            .call_tool(CallToolParams::new("getHumidity", json!({})).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::NotFound("getHumidity".into()));
    }

    #[tokio::test]
    async fn missing_token_is_generated() {
        let sink = Arc::new(RecordingSink::default());
        let session = server(FixedWeather).connect(
            init(ClientCapabilities::default()),
            None,
            sink.clone(),
        );
        let params = CallToolParams::new(
            weather::TOOL_NAME,
            json!({"latitude": 1.0, "longitude": 2.0}),
        )
        .unwrap();
        session.call_tool(params).await.unwrap();

        let tokens: Vec<_> = sink
            .events()
            .iter()
            .filter_map(|e| e.progress_token().cloned())
            .collect();
        assert!(!tokens.is_empty());
        assert!(tokens.iter().all(|t| *t == tokens[0]));
        assert!(tokens[0].to_string().starts_with("token-"));
    }

    #[tokio::test]
    async fn generated_tokens_are_released() {
        let server = server(FixedWeather);
        let session = server.connect(
            init(ClientCapabilities::default()),
            None,
            Arc::new(RecordingSink::default()),
        );
        for _ in 0..3 {
            let params = CallToolParams::new(
                weather::TOOL_NAME,
                json!({"latitude": 1.0, "longitude": 2.0}),
            )
            .unwrap();
            session.call_tool(params).await.unwrap();
        }
        assert_eq!(server.executor().tracked_tokens(), 0);

        // A caller-supplied token stays until the caller releases it.
        session.call_tool(call("token-kept")).await.unwrap();
        assert_eq!(server.executor().tracked_tokens(), 1);
        session.release(&ProgressToken::from("token-kept"));
        assert_eq!(server.executor().tracked_tokens(), 0);
    }
}
