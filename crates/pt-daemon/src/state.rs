//! Shared runtime state for pt-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The engine owns the
//! ledger store and the quote provider; the quote cache sits beside it and is
//! only consulted by the read-only market routes.

use std::sync::Arc;
use std::time::Duration;

use pt_md::{Lookback, QuoteCache, QuoteProvider};
use pt_reconcile::ReconcileEngine;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub build: BuildInfo,
    pub engine: Arc<ReconcileEngine>,
    /// Market-route cache. Never used for trade pricing.
    pub quote_cache: Arc<QuoteCache>,
    pub config_hash: String,
}

impl AppState {
    pub fn new(engine: Arc<ReconcileEngine>, quote_cache: Arc<QuoteCache>, config_hash: String) -> Self {
        // Start the uptime clock with the state, not with the first request.
        let _ = uptime_secs();
        Self {
            build: BuildInfo {
                service: "pt-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            engine,
            quote_cache,
            config_hash,
        }
    }

    pub fn quotes(&self) -> &dyn QuoteProvider {
        self.engine.quotes().as_ref()
    }

    pub fn lookback(&self) -> &Lookback {
        &self.engine.config().lookback
    }

    pub fn quote_timeout(&self) -> Duration {
        self.engine.config().quote_timeout
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
