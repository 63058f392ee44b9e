use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use pt_md::Lookback;
use pt_portfolio::PnlPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LoadedConfig, UnusedKeyPolicy};

/// Typed view of the merged config. Every key has a default, so an empty
/// config is a runnable in-memory service on localhost.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub config: ConfigLints,
    pub server: ServerConfig,
    pub quotes: QuotesConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLints {
    pub unused_keys: UnusedKeyPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Exact origins allowed by CORS. Empty disables cross-origin access.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
            cors_allowed_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteProviderKind {
    #[default]
    Yahoo,
    /// Static price table from `quotes.fixed_prices`.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    pub provider: QuoteProviderKind,
    /// Override of the provider's API host (tests, proxies).
    pub base_url: Option<String>,
    pub range: String,
    pub interval: String,
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub fixed_prices: BTreeMap<String, Decimal>,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            provider: QuoteProviderKind::Yahoo,
            base_url: None,
            range: "1d".to_string(),
            interval: "5m".to_string(),
            timeout_ms: 3000,
            cache_ttl_secs: 30,
            cache_max_entries: 512,
            fixed_prices: BTreeMap::new(),
        }
    }
}

impl QuotesConfig {
    pub fn lookback(&self) -> Result<Lookback> {
        Lookback::parse(&self.range, &self.interval).map_err(|e| anyhow::anyhow!("quotes: {e}"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub starting_balance: Decimal,
    pub pnl_policy: PnlPolicy,
    pub max_commit_retries: u32,
    pub postgres: PostgresConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            starting_balance: Decimal::from(10_000),
            pnl_policy: PnlPolicy::Replace,
            max_commit_retries: 5,
            postgres: PostgresConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Name of the env var holding the connection URL. Never the URL itself.
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url_env: "PT_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}

impl ServiceConfig {
    /// Deserialize and validate the merged config.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: ServiceConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the service schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.quotes.lookback()?;
        if self.quotes.timeout_ms == 0 {
            bail!("quotes.timeout_ms must be > 0");
        }
        if self.quotes.provider == QuoteProviderKind::Fixed && self.quotes.fixed_prices.is_empty() {
            bail!("quotes.provider=fixed requires quotes.fixed_prices");
        }
        if let Some((sym, p)) = self
            .quotes
            .fixed_prices
            .iter()
            .find(|(_, p)| **p <= Decimal::ZERO)
        {
            bail!("quotes.fixed_prices.{sym} must be > 0, got {p}");
        }
        if self.ledger.starting_balance < Decimal::ZERO {
            bail!("ledger.starting_balance must be >= 0");
        }
        if self.ledger.postgres.url_env.trim().is_empty() {
            bail!("ledger.postgres.url_env must name an env var");
        }
        if self.ledger.postgres.max_connections == 0 {
            bail!("ledger.postgres.max_connections must be > 0");
        }
        Ok(())
    }
}
