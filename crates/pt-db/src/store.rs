use pt_schemas::{Account, AccountUpdate, NewAccount, StoredTrade, TradeRecord};

use crate::StoreError;

/// Ledger store contract.
///
/// Implementations must be object-safe and `Send + Sync` so the engine can
/// hold an `Arc<dyn LedgerStore>`.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend name for logs (`"memory"`, `"postgres"`).
    fn backend(&self) -> &'static str;

    async fn read_account(&self, account_id: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a fresh account. `AlreadyExists` if the id is taken.
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError>;

    /// Apply `update` to the account and append `trade`, atomically.
    ///
    /// Succeeds only if the account's revision still equals
    /// `expected_revision`; the revision is then bumped by one. On any error
    /// neither the account nor the trade log changes.
    async fn commit_trade(
        &self,
        account_id: &str,
        expected_revision: u64,
        update: &AccountUpdate,
        trade: &TradeRecord,
    ) -> Result<StoredTrade, StoreError>;

    /// The account's trades ordered by `recorded_at` (append order on ties),
    /// optionally restricted to one symbol. Unknown accounts have no trades.
    async fn stream_trades(
        &self,
        account_id: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<StoredTrade>, StoreError>;
}
