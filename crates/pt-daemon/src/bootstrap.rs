//! Wiring from `ServiceConfig` to a ready `AppState`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use pt_config::secrets::ResolvedSecrets;
use pt_config::{LedgerBackend, LedgerConfig, QuoteProviderKind, QuotesConfig, ServiceConfig};
use pt_db::{LedgerStore, MemoryStore, PgLedgerStore};
use pt_md::{FixedQuoteProvider, QuoteCache, QuoteProvider, YahooChartProvider};
use pt_reconcile::{EngineConfig, ReconcileEngine};
use tracing::info;

use crate::state::AppState;

pub fn engine_config(cfg: &ServiceConfig) -> Result<EngineConfig> {
    Ok(EngineConfig {
        lookback: cfg.quotes.lookback()?,
        quote_timeout: cfg.quotes.timeout(),
        pnl_policy: cfg.ledger.pnl_policy,
        max_commit_retries: cfg.ledger.max_commit_retries,
        starting_balance: cfg.ledger.starting_balance,
    })
}

pub fn quote_provider(cfg: &QuotesConfig) -> Result<Arc<dyn QuoteProvider>> {
    match cfg.provider {
        QuoteProviderKind::Yahoo => {
            let p = match &cfg.base_url {
                Some(url) => YahooChartProvider::new_with_base_url(url.clone(), cfg.timeout()),
                None => YahooChartProvider::new(cfg.timeout()),
            }
            .context("yahoo quote provider init failed")?;
            Ok(Arc::new(p))
        }
        QuoteProviderKind::Fixed => {
            let prices: HashMap<String, _> = cfg
                .fixed_prices
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            Ok(Arc::new(FixedQuoteProvider::from_map(prices)))
        }
    }
}

pub async fn ledger_store(
    cfg: &LedgerConfig,
    secrets: &ResolvedSecrets,
) -> Result<Arc<dyn LedgerStore>> {
    match cfg.backend {
        LedgerBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        LedgerBackend::Postgres => {
            let url = secrets.database_url.as_deref().with_context(|| {
                format!(
                    "SECRETS_MISSING ledger.backend=postgres requires env var {}",
                    cfg.postgres.url_env
                )
            })?;
            let store = PgLedgerStore::connect_and_migrate(url, cfg.postgres.max_connections)
                .await
                .context("postgres ledger store init failed")?;
            Ok(Arc::new(store))
        }
    }
}

/// Build the daemon state. Connects and migrates the database when the
/// postgres backend is configured.
pub async fn build_state(
    cfg: &ServiceConfig,
    secrets: &ResolvedSecrets,
    config_hash: String,
) -> Result<AppState> {
    let engine_cfg = engine_config(cfg)?;
    let quotes = quote_provider(&cfg.quotes)?;
    let store = ledger_store(&cfg.ledger, secrets).await?;
    info!(
        ledger_backend = store.backend(),
        quote_provider = quotes.name(),
        pnl_policy = engine_cfg.pnl_policy.as_str(),
        "engine wired"
    );

    let engine = Arc::new(ReconcileEngine::new(store, quotes, engine_cfg));
    let cache = Arc::new(QuoteCache::new(
        cfg.quotes.cache_ttl(),
        cfg.quotes.cache_max_entries,
    ));
    Ok(AppState::new(engine, cache, config_hash))
}
