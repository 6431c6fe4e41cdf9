use gold_chat::{ChatProvider, ChatRelay, OpenAiProvider};
use gold_core::{MonitorConfig, MonitorError, Result};
use gold_feed::{HttpFetcher, JsonFetcher, OkxMarketClient};
use reqwest::Client;
use std::sync::Arc;

/// Everything a request handler needs. Nothing in here is mutated after
/// startup, so clones are shared freely across concurrent requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<MonitorConfig>,
    pub market: OkxMarketClient,
    pub chat: ChatRelay,
}

impl AppState {
    pub fn new(
        config: MonitorConfig,
        fetcher: Arc<dyn JsonFetcher>,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            market: OkxMarketClient::new(fetcher, config.exchange.clone()),
            chat: ChatRelay::new(provider, &config.chat),
            config: Arc::new(config),
        }
    }

    /// Production wiring: one pooled reqwest client shared by the OKX
    /// fetcher and the language-model provider.
    pub fn from_config(config: MonitorConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| MonitorError::Configuration(format!("HTTP client: {}", e)))?;

        let fetcher = Arc::new(HttpFetcher::new(client.clone()));
        let provider = Arc::new(OpenAiProvider::new(client, &config.chat));

        Ok(Self::new(config, fetcher, provider))
    }

    pub fn chat_enabled(&self) -> bool {
        self.config.chat.api_key.is_some()
    }
}
