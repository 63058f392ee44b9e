use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use pt_schemas::{Account, AccountUpdate, NewAccount, StoredTrade, TradeRecord};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{LedgerStore, StoreError};

/// Process-local ledger store.
///
/// A single write lock covers both the account table and the trade log, so a
/// commit is atomic with respect to every other reader and writer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    /// Number of upcoming commits that fail with a backend error.
    injected_failures: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    trades: HashMap<String, Vec<StoredTrade>>,
    last_recorded_at: Option<DateTime<Utc>>,
}

impl Inner {
    /// Strictly increasing server timestamp.
    fn next_recorded_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_recorded_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_recorded_at = Some(ts);
        ts
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account document verbatim, including absent
    /// numeric fields. For importing legacy data and for tests.
    pub async fn seed_account(&self, account: Account) {
        let mut g = self.inner.write().await;
        g.accounts.insert(account.account_id.clone(), account);
    }

    /// Append a raw trade document without touching the account. The symbol
    /// is taken from the document's `symbol` field.
    pub async fn seed_trade_doc(&self, account_id: &str, doc: Value) -> StoredTrade {
        let mut g = self.inner.write().await;
        let recorded_at = g.next_recorded_at();
        let stored = StoredTrade {
            trade_id: Uuid::new_v4(),
            symbol: doc
                .get("symbol")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            recorded_at,
            doc,
        };
        g.trades
            .entry(account_id.to_string())
            .or_default()
            .push(stored.clone());
        stored
    }

    /// Make the next `n` commits fail with [`StoreError::Backend`] before
    /// anything is written.
    pub fn fail_next_commits(&self, n: usize) {
        self.injected_failures.store(n, Ordering::SeqCst);
    }

    pub async fn trade_count(&self, account_id: &str) -> usize {
        let g = self.inner.read().await;
        g.trades.get(account_id).map(Vec::len).unwrap_or(0)
    }

    fn take_injected_failure(&self) -> bool {
        self.injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn read_account(&self, account_id: &str) -> Result<Option<Account>, StoreError> {
        let g = self.inner.read().await;
        Ok(g.accounts.get(account_id).cloned())
    }

    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut g = self.inner.write().await;
        if g.accounts.contains_key(&new.account_id) {
            tracing::debug!(account_id = %new.account_id, "account already exists");
            return Err(StoreError::AlreadyExists {
                account_id: new.account_id,
            });
        }
        let acct = new.into_account();
        g.accounts.insert(acct.account_id.clone(), acct.clone());
        Ok(acct)
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

        let mut g = self.inner.write().await;

        if self.take_injected_failure() {
            tracing::warn!(account_id, "injected commit failure");
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }

        let actual = match g.accounts.get(account_id) {
            Some(a) => a.revision,
            None => {
                return Err(StoreError::NotFound {
                    account_id: account_id.to_string(),
                })
            }
        };
        if actual != expected_revision {
            tracing::debug!(account_id, expected = expected_revision, actual, "stale revision");
            return Err(StoreError::Conflict {
                expected: expected_revision,
                actual,
            });
        }

        let recorded_at = g.next_recorded_at();
        let stored = StoredTrade {
            trade_id: Uuid::new_v4(),
            symbol: trade.symbol.clone(),
            recorded_at,
            doc,
        };

        if let Some(acct) = g.accounts.get_mut(account_id) {
            update.apply_to(acct);
            acct.revision += 1;
        }
        g.trades
            .entry(account_id.to_string())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn stream_trades(
        &self,
        account_id: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<StoredTrade>, StoreError> {
        let g = self.inner.read().await;
        // Appends carry strictly increasing timestamps, so log order is time order.
        Ok(g.trades
            .get(account_id)
            .map(|ts| {
                ts.iter()
                    .filter(|t| symbol.map_or(true, |s| t.symbol == s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn alice() -> NewAccount {
        NewAccount {
            account_id: "alice".to_string(),
            name: "Alice".to_string(),
            email: None,
            starting_balance: dec!(10000),
        }
    }

    #[tokio::test]
    async fn create_then_read() {
        let s = MemoryStore::new();
        s.create_account(alice()).await.unwrap();
        let a = s.read_account("alice").await.unwrap().unwrap();
        assert_eq!(a.balance, Some(dec!(10000)));
        assert_eq!(a.revision, 0);
        assert!(s.read_account("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let s = MemoryStore::new();
        s.create_account(alice()).await.unwrap();
        let err = s.create_account(alice()).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::AlreadyExists {
                account_id: "alice".to_string()
            }
        );
    }

    #[tokio::test]
    async fn seeded_trades_keep_append_order() {
        let s = MemoryStore::new();
        let a = s.seed_trade_doc("alice", json!({"symbol": "A", "buy": true, "quantity": 1})).await;
        let b = s.seed_trade_doc("alice", json!({"symbol": "B", "buy": true, "quantity": 1})).await;
        assert!(a.recorded_at < b.recorded_at);

        let all = s.stream_trades("alice", None).await.unwrap();
        assert_eq!(all.len(), 2);
        let only_b = s.stream_trades("alice", Some("B")).await.unwrap();
        assert_eq!(only_b.len(), 1);
        assert!(s.stream_trades("nobody", None).await.unwrap().is_empty());
    }

    #[test]
    fn injected_failures_count_down() {
        let s = MemoryStore::new();
        s.fail_next_commits(2);
        assert!(s.take_injected_failure());
        assert!(s.take_injected_failure());
        assert!(!s.take_injected_failure());
    }
}
