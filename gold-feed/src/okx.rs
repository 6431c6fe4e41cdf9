//! Mapping of OKX v5 market payloads into the internal schema.
//!
//! OKX encodes every numeric as a JSON string (`"2345.67"`), wraps results in
//! a `{code, msg, data}` envelope, and returns candles as positional arrays
//! `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`, newest first.

use gold_core::{
    numeric::parse_number, Candle, MonitorError, PriceSnapshot, Result, DISPLAY_CURRENCY,
    EXCHANGE_NAME, QUOTE_CURRENCY,
};
use serde_json::Value;

fn field(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(parse_number)
}

/// Build a [`PriceSnapshot`] from a `/api/v5/market/ticker` response.
///
/// `now_ms` is used when the ticker carries no usable `ts`.
pub fn normalize_ticker(payload: &Value, instrument: &str, now_ms: i64) -> Result<PriceSnapshot> {
    let ticker = payload
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .filter(|record| record.is_object())
        .ok_or_else(|| MonitorError::UpstreamShape(format!("no ticker record in {}", payload)))?;

    let price = field(ticker, "last");
    let open_24h = field(ticker, "open24h");
    let high_24h = field(ticker, "high24h");
    let low_24h = field(ticker, "low24h");

    let volume_24h = match ticker.get("volCcy24h") {
        Some(value) if !value.is_null() => parse_number(value),
        _ => field(ticker, "vol24h"),
    };

    let change = match (price, open_24h) {
        (Some(last), Some(open)) => Some(last - open),
        _ => None,
    };

    let change_percent = match (change, open_24h) {
        (Some(change), Some(open)) if open != 0.0 => Some(change / open * 100.0),
        _ => None,
    };

    let timestamp = field(ticker, "ts")
        .map(|ts| ts as i64)
        .filter(|ts| *ts != 0)
        .unwrap_or(now_ms);

    Ok(PriceSnapshot {
        price,
        open_24h,
        high_24h,
        low_24h,
        volume_24h,
        change,
        change_percent,
        currency: DISPLAY_CURRENCY.to_string(),
        quote_currency: QUOTE_CURRENCY.to_string(),
        symbol: instrument.to_string(),
        exchange: EXCHANGE_NAME.to_string(),
        timestamp,
    })
}

fn normalize_candle(entry: &Value) -> Option<Candle> {
    let tuple = entry.as_array()?;
    let position = |index: usize| tuple.get(index).and_then(parse_number);

    Some(Candle {
        time: position(0)? as i64,
        open: position(1)?,
        high: position(2)?,
        low: position(3)?,
        close: position(4)?,
        volume: position(5),
    })
}

/// Build an ascending candle series from a `/api/v5/market/candles` response.
///
/// A tuple missing any of time/open/high/low/close is dropped whole; a bad
/// volume only blanks that field.
pub fn normalize_candles(payload: &Value) -> Result<Vec<Candle>> {
    let code_ok = payload.get("code").and_then(Value::as_str) == Some("0");
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .filter(|_| code_ok)
        .ok_or_else(|| MonitorError::UpstreamShape(format!("unexpected candle payload {}", payload)))?;

    let mut candles: Vec<Candle> = data.iter().filter_map(normalize_candle).collect();
    candles.sort_by_key(|candle| candle.time);

    Ok(candles)
}
