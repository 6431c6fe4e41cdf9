use gold_core::MonitorError;
use std::str::FromStr;

pub const MIN_CANDLE_LIMIT: u32 = 50;
pub const MAX_CANDLE_LIMIT: u32 = 300;

const MINUTES_PER_DAY: u32 = 1440;

/// Candle granularity the dashboard may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    FiveMinutes,
    #[default]
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
}

impl Interval {
    /// OKX `bar` parameter.
    pub fn bar(&self) -> &'static str {
        match self {
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1H",
            Interval::OneDay => "1D",
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            Interval::FiveMinutes => 5,
            Interval::FifteenMinutes => 15,
            Interval::ThirtyMinutes => 30,
            Interval::OneHour => 60,
            Interval::OneDay => MINUTES_PER_DAY,
        }
    }
}

impl FromStr for Interval {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "1h" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            _ => Err(MonitorError::UnsupportedInterval(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Range {
    OneDay,
    #[default]
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
}

impl Range {
    pub fn days(&self) -> u32 {
        match self {
            Range::OneDay => 1,
            Range::FiveDays => 5,
            Range::OneMonth => 30,
            Range::ThreeMonths => 90,
            Range::SixMonths => 180,
        }
    }

    /// Unknown or missing ranges fall back to the default instead of failing.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("1d") => Range::OneDay,
            Some("5d") => Range::FiveDays,
            Some("1mo") => Range::OneMonth,
            Some("3mo") => Range::ThreeMonths,
            Some("6mo") => Range::SixMonths,
            _ => Range::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub range: Range,
    pub interval: Interval,
}

impl HistoryQuery {
    /// Resolve raw query parameters. Only the interval can fail; a blank
    /// interval counts as missing.
    pub fn parse(range: Option<&str>, interval: Option<&str>) -> Result<Self, MonitorError> {
        let interval = match interval.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => raw.parse()?,
            None => Interval::default(),
        };

        Ok(Self {
            range: Range::parse_or_default(range),
            interval,
        })
    }

    /// Number of bars to request: enough to cover the range, within the
    /// bounds OKX accepts.
    pub fn limit(&self) -> u32 {
        let estimated = (self.range.days() * MINUTES_PER_DAY).div_ceil(self.interval.minutes());
        estimated.clamp(MIN_CANDLE_LIMIT, MAX_CANDLE_LIMIT)
    }
}
