//! Provider boundary for quote retrieval.
//!
//! This module defines the price point type, the provider trait, and the
//! time-bounded fetch helpers. Concrete HTTP providers live elsewhere.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::Lookback;

// ---------------------------------------------------------------------------
// Price point
// ---------------------------------------------------------------------------

/// One close from a provider series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    /// Bar timestamp (UTC).
    pub ts: DateTime<Utc>,
    pub close: Decimal,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a [`QuoteProvider`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value is missing or invalid.
    Config(String),
    /// The fetch did not complete within the allowed time.
    Timeout { after_ms: u64 },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api {
                code: Some(c),
                message,
            } => {
                write!(f, "provider api error code={c}: {message}")
            }
            ProviderError::Api {
                code: None,
                message,
            } => {
                write!(f, "provider api error: {message}")
            }
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
            ProviderError::Timeout { after_ms } => {
                write!(f, "quote fetch timed out after {after_ms}ms")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Upstream quote provider contract.
///
/// Implementations must be object-safe and `Send + Sync` so the engine and the
/// daemon can share one `Arc<dyn QuoteProvider>`.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name identifying this provider (e.g. `"yahoo"`).
    fn name(&self) -> &'static str;

    /// Closes for `symbol` over `lookback`, oldest first. Bars without a close
    /// are omitted. An unknown symbol yields an empty series, not an error.
    async fn get_series(
        &self,
        symbol: &str,
        lookback: &Lookback,
    ) -> Result<Vec<PricePoint>, ProviderError>;

    /// Most recent close in the window, or `None` when the window is empty.
    async fn get_last_price(
        &self,
        symbol: &str,
        lookback: &Lookback,
    ) -> Result<Option<Decimal>, ProviderError> {
        let series = self.get_series(symbol, lookback).await?;
        Ok(series.last().map(|p| p.close))
    }
}

// ---------------------------------------------------------------------------
// Time-bounded fetch
// ---------------------------------------------------------------------------

fn timeout_error(timeout: Duration) -> ProviderError {
    ProviderError::Timeout {
        after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// [`QuoteProvider::get_last_price`] bounded by `timeout`.
pub async fn fetch_last_price_bounded(
    provider: &dyn QuoteProvider,
    symbol: &str,
    lookback: &Lookback,
    timeout: Duration,
) -> Result<Option<Decimal>, ProviderError> {
    match tokio::time::timeout(timeout, provider.get_last_price(symbol, lookback)).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(provider = provider.name(), symbol, "quote fetch timed out");
            Err(timeout_error(timeout))
        }
    }
}

/// [`QuoteProvider::get_series`] bounded by `timeout`.
pub async fn fetch_series_bounded(
    provider: &dyn QuoteProvider,
    symbol: &str,
    lookback: &Lookback,
    timeout: Duration,
) -> Result<Vec<PricePoint>, ProviderError> {
    match tokio::time::timeout(timeout, provider.get_series(symbol, lookback)).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(provider = provider.name(), symbol, "series fetch timed out");
            Err(timeout_error(timeout))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
