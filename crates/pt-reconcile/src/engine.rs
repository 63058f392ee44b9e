use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pt_db::{LedgerStore, StoreError};
use pt_md::{fetch_last_price_bounded, Lookback, QuoteProvider};
use pt_portfolio::{
    buy_pnl, chart_series, held_quantity, holdings, validate_buy, validate_sell, ChartSeries,
    PnlPolicy,
};
use pt_schemas::money::round2;
use pt_schemas::{
    Account, AccountSummary, AccountUpdate, NewAccount, SellContext, StoredTrade, TradeRecord,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::request::{BuyOrder, RegisterOrder, SellOrder};
use crate::TradeError;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window the execution quote is taken from.
    pub lookback: Lookback,
    /// Upper bound on a single quote fetch.
    pub quote_timeout: Duration,
    pub pnl_policy: PnlPolicy,
    /// Extra read-validate-commit cycles after a revision conflict.
    pub max_commit_retries: u32,
    /// Cash credited to a newly registered account.
    pub starting_balance: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback: Lookback::default(),
            quote_timeout: Duration::from_millis(3000),
            pnl_policy: PnlPolicy::Replace,
            max_commit_retries: 5,
            starting_balance: Decimal::from(10_000),
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyReceipt {
    pub trade_id: Uuid,
    /// Cash after the trade.
    pub balance: Decimal,
    /// `live_price × quantity`, rounded to cents.
    pub total_cost: Decimal,
    pub live_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellReceipt {
    pub trade_id: Uuid,
    pub balance: Decimal,
    /// `live_price × quantity`, rounded to cents.
    pub sale_value: Decimal,
    pub live_price: Decimal,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Executes buys and sells against the ledger store.
///
/// Each trade reads the account (and, for sells, the symbol's trade history),
/// validates against that state, and commits the account update and trade
/// record together conditioned on the revision it read. A revision conflict
/// re-runs the whole cycle. The execution quote is fetched once per request.
pub struct ReconcileEngine {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteProvider>,
    cfg: EngineConfig,
}

impl ReconcileEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteProvider>,
        cfg: EngineConfig,
    ) -> Self {
        Self { store, quotes, cfg }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn quotes(&self) -> &Arc<dyn QuoteProvider> {
        &self.quotes
    }

    // -- accounts ----------------------------------------------------------

    pub async fn register(&self, order: RegisterOrder) -> Result<Account, TradeError> {
        let acct = self
            .store
            .create_account(NewAccount {
                account_id: order.account_id,
                name: order.name,
                email: order.email,
                starting_balance: self.cfg.starting_balance,
            })
            .await?;
        tracing::info!(account_id = %acct.account_id, "account registered");
        Ok(acct)
    }

    /// Name, cash and profit/loss, with absent numeric fields reported as 0.
    pub async fn balance(&self, account_id: &str) -> Result<AccountSummary, TradeError> {
        Ok(self.load_account(account_id).await?.summary())
    }

    async fn load_account(&self, account_id: &str) -> Result<Account, TradeError> {
        self.store
            .read_account(account_id)
            .await?
            .ok_or_else(|| TradeError::NotFound {
                account_id: account_id.to_string(),
            })
    }

    // -- positions ---------------------------------------------------------

    /// Held quantity of `symbol`, replayed from the trade log.
    pub async fn held_quantity(&self, account_id: &str, symbol: &str) -> Result<Decimal, TradeError> {
        let trades = self.store.stream_trades(account_id, Some(symbol)).await?;
        Ok(held_quantity(&trades, symbol))
    }

    pub async fn trades(&self, account_id: &str) -> Result<Vec<StoredTrade>, TradeError> {
        Ok(self.store.stream_trades(account_id, None).await?)
    }

    pub async fn holdings(&self, account_id: &str) -> Result<BTreeMap<String, Decimal>, TradeError> {
        let trades = self.store.stream_trades(account_id, None).await?;
        Ok(holdings(&trades))
    }

    pub async fn chart(&self, account_id: &str) -> Result<ChartSeries, TradeError> {
        let trades = self.store.stream_trades(account_id, None).await?;
        Ok(chart_series(&trades))
    }

    // -- quotes ------------------------------------------------------------

    /// Fresh execution quote. Never cached.
    pub async fn execution_quote(&self, symbol: &str) -> Result<Decimal, TradeError> {
        let unavailable = |reason: String| TradeError::QuoteUnavailable {
            symbol: symbol.to_string(),
            reason,
        };
        match fetch_last_price_bounded(
            self.quotes.as_ref(),
            symbol,
            &self.cfg.lookback,
            self.cfg.quote_timeout,
        )
        .await
        {
            Ok(Some(p)) if p > Decimal::ZERO => Ok(p),
            Ok(Some(p)) => Err(unavailable(format!("non-positive quote {p}"))),
            Ok(None) => Err(unavailable("no price data".to_string())),
            Err(e) => {
                tracing::warn!(symbol, provider = self.quotes.name(), error = %e, "quote fetch failed");
                Err(unavailable(e.to_string()))
            }
        }
    }

    // -- trades ------------------------------------------------------------

    pub async fn buy(&self, order: &BuyOrder) -> Result<BuyReceipt, TradeError> {
        let mut acct = self.load_account(&order.account_id).await?;
        let live = self.execution_quote(&order.symbol).await?;
        let reference = order.reference_price.unwrap_or(live);

        let mut conflicts = 0u32;
        loop {
            let approval = validate_buy(acct.balance_or_zero(), live, order.quantity)?;
            // The cost fits, so only an outsized reference price can overflow.
            let pnl = buy_pnl(live, reference, order.quantity)
                .ok_or(TradeError::MissingField("reference_price"))?;
            let new_balance = round2(acct.balance_or_zero() - approval.total_cost);
            let folded = self
                .cfg
                .pnl_policy
                .fold(acct.profit_or_zero(), acct.loss_or_zero(), pnl)
                .ok_or_else(|| TradeError::StoreFailure("profit/loss overflow".to_string()))?;

            let update = AccountUpdate {
                balance: Some(new_balance),
                profit: Some(folded.profit),
                loss: Some(folded.loss),
            };
            let record = TradeRecord::buy(
                order.symbol.clone(),
                order.quantity,
                live,
                reference,
                pnl.profit,
                pnl.loss,
            );

            match self
                .store
                .commit_trade(&order.account_id, acct.revision, &update, &record)
                .await
            {
                Ok(stored) => {
                    tracing::info!(
                        account_id = %order.account_id,
                        symbol = %order.symbol,
                        qty = %order.quantity,
                        price = %live,
                        balance = %new_balance,
                        "buy committed"
                    );
                    return Ok(BuyReceipt {
                        trade_id: stored.trade_id,
                        balance: new_balance,
                        total_cost: round2(approval.total_cost),
                        live_price: live,
                    });
                }
                Err(StoreError::Conflict { expected, actual }) => {
                    conflicts += 1;
                    self.check_retry_budget(&order.account_id, conflicts, expected, actual)?;
                    acct = self.load_account(&order.account_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn sell(&self, order: &SellOrder) -> Result<SellReceipt, TradeError> {
        let mut acct = self.load_account(&order.account_id).await?;
        let live = self.execution_quote(&order.symbol).await?;

        let mut conflicts = 0u32;
        loop {
            // Read after the account so a trade committed in between surfaces
            // as a revision conflict rather than a stale position.
            let owned = self
                .held_quantity(&order.account_id, &order.symbol)
                .await?;
            validate_sell(owned, order.quantity)?;

            let sale_value = live
                .checked_mul(order.quantity)
                .ok_or_else(|| TradeError::StoreFailure("sale value overflow".to_string()))?;
            let new_balance = acct
                .balance_or_zero()
                .checked_add(sale_value)
                .map(round2)
                .ok_or_else(|| TradeError::StoreFailure("balance overflow".to_string()))?;

            let record = TradeRecord::sell(
                order.symbol.clone(),
                order.quantity,
                live,
                SellContext {
                    requested_quantity: order.quantity,
                    client_price: order.client_price,
                    total_value: order.total_value,
                    client_timestamp: order.client_timestamp.clone(),
                },
            );

            match self
                .store
                .commit_trade(
                    &order.account_id,
                    acct.revision,
                    &AccountUpdate::balance_only(new_balance),
                    &record,
                )
                .await
            {
                Ok(stored) => {
                    tracing::info!(
                        account_id = %order.account_id,
                        symbol = %order.symbol,
                        qty = %order.quantity,
                        price = %live,
                        balance = %new_balance,
                        "sell committed"
                    );
                    return Ok(SellReceipt {
                        trade_id: stored.trade_id,
                        balance: new_balance,
                        sale_value: round2(sale_value),
                        live_price: live,
                    });
                }
                Err(StoreError::Conflict { expected, actual }) => {
                    conflicts += 1;
                    self.check_retry_budget(&order.account_id, conflicts, expected, actual)?;
                    acct = self.load_account(&order.account_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn check_retry_budget(
        &self,
        account_id: &str,
        conflicts: u32,
        expected: u64,
        actual: u64,
    ) -> Result<(), TradeError> {
        if conflicts > self.cfg.max_commit_retries {
            tracing::warn!(account_id, conflicts, "commit retries exhausted");
            return Err(TradeError::StoreFailure(format!(
                "account {account_id} kept changing; gave up after {conflicts} conflicting commits"
            )));
        }
        tracing::debug!(account_id, expected, actual, attempt = conflicts, "revision conflict, retrying");
        Ok(())
    }
}
