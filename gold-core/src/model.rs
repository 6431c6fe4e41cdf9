use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EXCHANGE_NAME: &str = "OKX";
pub const QUOTE_CURRENCY: &str = "USDT";
pub const DISPLAY_CURRENCY: &str = "USD";

/// Current price and 24h statistics for one instrument.
///
/// Numeric fields are `None` when the upstream value was missing or did not
/// parse to a finite number; they serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub price: Option<f64>,
    pub open_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub currency: String,
    pub quote_currency: String,
    pub symbol: String,
    pub exchange: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Epoch milliseconds of the bucket start.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMeta {
    pub currency: String,
    pub symbol: String,
    pub exchange: String,
    /// Upstream bar code, e.g. `1H`.
    pub interval: String,
    pub range_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub meta: HistoryMeta,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn. Fields beyond `role` and `content` (such as
/// `name`) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Client chart context after whitelisting, at most the newest candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartContext {
    pub meta: ChartMeta,
    pub candles: Vec<ContextCandle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_count: Option<serde_json::Number>,
    pub candles_provided: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextCandle {
    /// ISO-8601 UTC, millisecond precision.
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// What `/api/chat` returns: the provider's first choice and its usage block,
/// both untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: serde_json::Value,
    pub usage: serde_json::Value,
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
