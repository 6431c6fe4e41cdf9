use async_trait::async_trait;
use gold_core::{ChatConfig, ChatMessage, MonitorError, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::{fmt::Debug, time::Duration};
use tracing::{debug, error};

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync + Debug {
    /// Send one completion request and return the provider's raw JSON
    /// response.
    async fn complete(&self, request: &CompletionRequest) -> Result<Value>;

    fn name(&self) -> &str;
}

/// Any endpoint speaking the OpenAI `/chat/completions` protocol.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(client: Client, config: &ChatConfig) -> Self {
        Self {
            client,
            endpoint: config.completions_url(),
            api_key: config.api_key.clone().unwrap_or_default(),
            timeout: config.timeout(),
        }
    }
}

impl Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let exchange = async {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| MonitorError::Upstream(format!("{} API error: {}", self.name(), e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), %body, "chat provider rejected request");
                return Err(MonitorError::UpstreamHttp {
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| MonitorError::UpstreamParse(e.to_string()))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| MonitorError::UpstreamTimeout(self.timeout))?
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}
