//! Upstream market data: fetching OKX endpoints and normalizing their payloads.

pub mod client;
pub mod fetcher;
pub mod interval;
pub mod okx;

pub use client::OkxMarketClient;
pub use fetcher::{HttpFetcher, JsonFetcher};
pub use interval::{HistoryQuery, Interval, Range};
