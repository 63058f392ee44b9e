//! Request and response types for all pt-daemon HTTP endpoints.
//!
//! Trade and account request bodies are the lenient payloads from
//! `pt_reconcile::request`; the types here cover everything else. No business
//! logic lives here.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health  /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    /// sha256 of the canonical config this process booted with.
    pub config_hash: String,
    pub ledger_backend: &'static str,
    pub quote_provider: &'static str,
    pub quote_cache_entries: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response. The numeric fields are present only for
/// the rejection they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<Decimal>,
}

impl ErrorResponse {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            balance: None,
            required: None,
            owned: None,
            requested: None,
        }
    }
}

// ---------------------------------------------------------------------------
// /v1/trade/*  /v1/accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyResponse {
    pub trade_id: Uuid,
    pub balance: Decimal,
    pub total_cost: Decimal,
    pub live_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellResponse {
    pub trade_id: Uuid,
    pub balance: Decimal,
    pub sale_value: Decimal,
    pub live_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account_id: String,
    pub balance: Decimal,
}

/// `?account_id=` (or the legacy `?uid=`). Optional so a missing parameter
/// surfaces as `Missing required field` instead of a query rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountQuery {
    #[serde(default, alias = "uid")]
    pub account_id: Option<String>,
}

// ---------------------------------------------------------------------------
// /v1/portfolio/*
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingsResponse {
    pub holdings: BTreeMap<String, Decimal>,
}

// ---------------------------------------------------------------------------
// /v1/market/*
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LivePricesRequest {
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

/// `price` is `null` when the quote could not be fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivePrice {
    pub symbol: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesQuery {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub symbol: String,
    /// `%H:%M`, UTC.
    pub labels: Vec<String>,
    pub prices: Vec<Decimal>,
}
