//! pt-db
//!
//! Ledger persistence for the paper-trading service.
//! - `LedgerStore`: the store contract the reconciliation engine depends on
//! - `MemoryStore`: process-local store (tests, `ledger.backend: memory`)
//! - `PgLedgerStore`: Postgres store with embedded migrations
//!
//! Account update + trade append is a single atomic commit guarded by the
//! account's `revision` (compare-and-swap).

mod error;
mod memory;
mod pg;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg::PgLedgerStore;
pub use store::LedgerStore;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Default env var holding the Postgres URL (see `ledger.postgres.url_env`).
pub const ENV_DB_URL: &str = "PT_DATABASE_URL";

/// Connect to Postgres at `url`.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}
