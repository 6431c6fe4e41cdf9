pub mod model;
pub mod numeric;

pub use model::*;

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Upstream returned HTTP {status}")]
    UpstreamHttp { status: u16, body: String },

    #[error("Upstream body is not valid JSON: {0}")]
    UpstreamParse(String),

    #[error("Unexpected upstream payload: {0}")]
    UpstreamShape(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl MonitorError {
    /// True for failures caused by a third party rather than the caller or
    /// this server's configuration.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            MonitorError::UpstreamTimeout(_)
                | MonitorError::UpstreamHttp { .. }
                | MonitorError::UpstreamParse(_)
                | MonitorError::UpstreamShape(_)
                | MonitorError::Upstream(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

pub const DEFAULT_HTTPS_PORT: u16 = 3443;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_INSTRUMENT: &str = "XAUT-USDT";
pub const DEFAULT_OKX_BASE_URL: &str = "https://www.okx.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub server: ServerConfig,
    pub exchange: ExchangeConfig,
    pub chat: ChatConfig,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Plain HTTP listener, only when a positive port was configured.
    pub http_port: Option<u16>,
    pub https_port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: None,
            https_port: DEFAULT_HTTPS_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub instrument: String,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ExchangeConfig {
    pub fn ticker_url(&self) -> String {
        format!("{}/api/v5/market/ticker", self.base_url)
    }

    pub fn candle_url(&self) -> String {
        format!("{}/api/v5/market/candles", self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            instrument: DEFAULT_INSTRUMENT.to_string(),
            base_url: DEFAULT_OKX_BASE_URL.to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_ms: u64,
}

impl ChatConfig {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_ms: 60_000,
        }
    }
}

// Keeps the provider key out of logs.
impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub key_file: PathBuf,
    pub cert_file: PathBuf,
    pub passphrase: Option<String>,
    pub ca_files: Vec<PathBuf>,
}
