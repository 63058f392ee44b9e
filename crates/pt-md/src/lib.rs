//! pt-md
//!
//! Quote retrieval for the paper-trading ledger.
//!
//! This crate owns the provider abstraction, the Yahoo chart-API provider, a
//! fixed-price provider for offline runs, and the short-lived `QuoteCache`
//! used by read-only market endpoints. It does **not** touch the ledger; the
//! reconciliation engine asks for a fresh quote on every trade.

mod cache;
mod fixed;
pub mod provider;
mod yahoo;

pub use cache::QuoteCache;
pub use fixed::FixedQuoteProvider;
pub use provider::{
    fetch_last_price_bounded, fetch_series_bounded, PricePoint, ProviderError, QuoteProvider,
};
pub use yahoo::YahooChartProvider;

use serde::{Deserialize, Serialize};

/// Bar interval requested from a provider.
///
/// Canonical values: `1m`, `5m`, `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProviderError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::M1),
            "5m" | "5min" => Ok(Timeframe::M5),
            "1d" | "1day" => Ok(Timeframe::D1),
            other => Err(ProviderError::Config(format!(
                "invalid interval '{other}'. expected one of: 1m | 5m | 1d"
            ))),
        }
    }
}

/// How far back a quote request looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Range {
    D1,
    D5,
    Mo1,
}

impl Range {
    pub fn as_str(&self) -> &'static str {
        match self {
            Range::D1 => "1d",
            Range::D5 => "5d",
            Range::Mo1 => "1mo",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProviderError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Range::D1),
            "5d" => Ok(Range::D5),
            "1mo" => Ok(Range::Mo1),
            other => Err(ProviderError::Config(format!(
                "invalid range '{other}'. expected one of: 1d | 5d | 1mo"
            ))),
        }
    }
}

/// Window + bar size of a quote request. Defaults to one day of 5-minute bars,
/// the window trades are priced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lookback {
    pub range: Range,
    pub interval: Timeframe,
}

impl Default for Lookback {
    fn default() -> Self {
        Self {
            range: Range::D1,
            interval: Timeframe::M5,
        }
    }
}

impl Lookback {
    pub fn parse(range: &str, interval: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            range: Range::parse(range)?,
            interval: Timeframe::parse(interval)?,
        })
    }
}
