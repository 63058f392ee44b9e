use anyhow::Result;
use chrono::{DateTime, Utc};
use pt_schemas::{Account, AccountUpdate, NewAccount, StoredTrade, TradeRecord};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{LedgerStore, StoreError};

/// Postgres-backed ledger store.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run migrations.
    pub async fn connect_and_migrate(url: &str, max_connections: u32) -> Result<Self> {
        let pool = crate::connect(url, max_connections).await?;
        crate::migrate(&pool).await?;
        Ok(Self { pool })
    }
}

/// Detect a Postgres unique-constraint violation (SQLSTATE 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn revision_to_db(rev: u64) -> Result<i64, StoreError> {
    i64::try_from(rev).map_err(|_| StoreError::Backend(format!("revision out of range: {rev}")))
}

fn revision_from_db(rev: i64) -> Result<u64, StoreError> {
    u64::try_from(rev).map_err(|_| StoreError::Backend(format!("negative revision in db: {rev}")))
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Result<Account, StoreError> {
    let decode = |e: sqlx::Error| StoreError::backend("account row decode failed", e);
    Ok(Account {
        account_id: row.try_get("account_id").map_err(decode)?,
        name: row.try_get::<Option<String>, _>("name").map_err(decode)?,
        email: row.try_get::<Option<String>, _>("email").map_err(decode)?,
        balance: row.try_get::<Option<Decimal>, _>("balance").map_err(decode)?,
        profit: row.try_get::<Option<Decimal>, _>("profit").map_err(decode)?,
        loss: row.try_get::<Option<Decimal>, _>("loss").map_err(decode)?,
        revision: revision_from_db(row.try_get::<i64, _>("revision").map_err(decode)?)?,
    })
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn read_account(&self, account_id: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            select account_id, name, email, balance, profit, loss, revision
            from accounts
            where account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend("read_account failed", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let acct = new.into_account();
        let res = sqlx::query(
            r#"
            insert into accounts (account_id, name, email, balance, profit, loss, revision)
            values ($1, $2, $3, $4, $5, $6, 0)
            "#,
        )
        .bind(&acct.account_id)
        .bind(&acct.name)
        .bind(&acct.email)
        .bind(acct.balance)
        .bind(acct.profit)
        .bind(acct.loss)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(acct),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(account_id = %acct.account_id, "account already exists");
                Err(StoreError::AlreadyExists {
                    account_id: acct.account_id,
                })
            }
            Err(e) => {
                tracing::warn!(account_id = %acct.account_id, error = %e, "create_account failed");
                Err(StoreError::backend("create_account failed", e))
            }
        }
    }

    async fn commit_trade(
        &self,
        account_id: &str,
        expected_revision: u64,
        update: &AccountUpdate,
        trade: &TradeRecord,
    ) -> Result<StoredTrade, StoreError> {
        let doc = trade
            .to_doc()
            .map_err(|e| StoreError::backend("trade doc encode failed", e))?;
        let expected = revision_to_db(expected_revision)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend("begin tx failed", e))?;

        let res = sqlx::query(
            r#"
            update accounts
            set balance  = coalesce($3, balance),
                profit   = coalesce($4, profit),
                loss     = coalesce($5, loss),
                revision = revision + 1
            where account_id = $1
              and revision = $2
            "#,
        )
        .bind(account_id)
        .bind(expected)
        .bind(update.balance)
        .bind(update.profit)
        .bind(update.loss)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::warn!(account_id, error = %e, "account update failed");
            StoreError::backend("account update failed", e)
        })?;

        if res.rows_affected() == 0 {
            let current: Option<(i64,)> =
                sqlx::query_as("select revision from accounts where account_id = $1")
                    .bind(account_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| StoreError::backend("revision probe failed", e))?;
            tx.rollback()
                .await
                .map_err(|e| StoreError::backend("rollback failed", e))?;
            return Err(match current {
                None => StoreError::NotFound {
                    account_id: account_id.to_string(),
                },
                Some((actual,)) => {
                    let actual = revision_from_db(actual)?;
                    tracing::debug!(account_id, expected = expected_revision, actual, "stale revision");
                    StoreError::Conflict {
                        expected: expected_revision,
                        actual,
                    }
                }
            });
        }

        let trade_id = Uuid::new_v4();
        let (recorded_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            insert into trades (trade_id, account_id, symbol, recorded_at_utc, doc)
            values ($1, $2, $3, clock_timestamp(), $4)
            returning recorded_at_utc
            "#,
        )
        .bind(trade_id)
        .bind(account_id)
        .bind(&trade.symbol)
        .bind(&doc)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::warn!(account_id, symbol = %trade.symbol, error = %e, "trade insert failed");
            StoreError::backend("trade insert failed", e)
        })?;

        tx.commit()
            .await
            .map_err(|e| StoreError::backend("commit failed", e))?;

        Ok(StoredTrade {
            trade_id,
            symbol: trade.symbol.clone(),
            recorded_at,
            doc,
        })
    }

    async fn stream_trades(
        &self,
        account_id: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<StoredTrade>, StoreError> {
        let rows = sqlx::query(
            r#"
            select trade_id, symbol, recorded_at_utc, doc
            from trades
            where account_id = $1
              and ($2::text is null or symbol = $2)
            order by recorded_at_utc asc, seq asc
            "#,
        )
        .bind(account_id)
        .bind(symbol)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend("stream_trades failed", e))?;

        let decode = |e: sqlx::Error| StoreError::backend("trade row decode failed", e);
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(StoredTrade {
                trade_id: row.try_get::<Uuid, _>("trade_id").map_err(decode)?,
                symbol: row.try_get::<String, _>("symbol").map_err(decode)?,
                recorded_at: row
                    .try_get::<DateTime<Utc>, _>("recorded_at_utc")
                    .map_err(decode)?,
                doc: row.try_get::<Value, _>("doc").map_err(decode)?,
            });
        }
        Ok(out)
    }
}
