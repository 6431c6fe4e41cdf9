use crate::{
    fetcher::JsonFetcher,
    interval::HistoryQuery,
    okx::{normalize_candles, normalize_ticker},
};
use gold_core::{
    now_millis, ExchangeConfig, HistoryMeta, HistoryResponse, MonitorError, PriceSnapshot, Result,
    EXCHANGE_NAME, QUOTE_CURRENCY,
};
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; GoldMonitor/1.0)";

/// Public OKX market data for the configured instrument.
#[derive(Debug, Clone)]
pub struct OkxMarketClient {
    fetcher: Arc<dyn JsonFetcher>,
    config: ExchangeConfig,
}

impl OkxMarketClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: ExchangeConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn instrument(&self) -> &str {
        &self.config.instrument
    }

    pub async fn ticker(&self) -> Result<PriceSnapshot> {
        let url = build_url(&self.config.ticker_url(), &[("instId", self.instrument())])?;
        let payload = self.get(&url).await?;
        normalize_ticker(&payload, self.instrument(), now_millis())
    }

    pub async fn history(&self, query: &HistoryQuery) -> Result<HistoryResponse> {
        let limit = query.limit().to_string();
        let url = build_url(
            &self.config.candle_url(),
            &[
                ("instId", self.instrument()),
                ("bar", query.interval.bar()),
                ("limit", limit.as_str()),
            ],
        )?;

        let payload = self.get(&url).await?;
        let candles = normalize_candles(&payload)?;
        debug!(count = candles.len(), bar = query.interval.bar(), "normalized candles");

        Ok(HistoryResponse {
            meta: HistoryMeta {
                currency: QUOTE_CURRENCY.to_string(),
                symbol: self.instrument().to_string(),
                exchange: EXCHANGE_NAME.to_string(),
                interval: query.interval.bar().to_string(),
                range_days: query.range.days(),
            },
            candles,
        })
    }

    async fn get(&self, url: &Url) -> Result<serde_json::Value> {
        self.fetcher
            .get_json(
                url.as_str(),
                &[("User-Agent", USER_AGENT), ("Accept", "application/json")],
                self.config.timeout(),
            )
            .await
    }
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<Url> {
    Url::parse_with_params(base, params)
        .map_err(|e| MonitorError::Configuration(format!("invalid upstream URL {}: {}", base, e)))
}
