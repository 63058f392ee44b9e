use pt_schemas::money::round2;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Profit/loss attributed to a single buy. At most one side is non-zero and
/// both are floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TradePnl {
    pub profit: Decimal,
    pub loss: Decimal,
}

impl TradePnl {
    pub fn pl(&self) -> Decimal {
        self.profit - self.loss
    }
}

/// Profit/loss of buying `quantity` at `live` when the client believed the
/// price was `reference`. Rounded to cents. `None` if the difference times
/// the quantity does not fit in a `Decimal`.
pub fn buy_pnl(live: Decimal, reference: Decimal, quantity: Decimal) -> Option<TradePnl> {
    if live > reference {
        let profit = live.checked_sub(reference)?.checked_mul(quantity)?;
        Some(TradePnl {
            profit: round2(profit),
            loss: Decimal::ZERO,
        })
    } else if reference > live {
        let loss = reference.checked_sub(live)?.checked_mul(quantity)?;
        Some(TradePnl {
            profit: Decimal::ZERO,
            loss: round2(loss),
        })
    } else {
        Some(TradePnl::default())
    }
}

/// How a trade's profit/loss folds into the account's stored fields.
///
/// `Replace` is the long-standing behavior: the account shows the last buy's
/// profit/loss. `Accumulate` keeps running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlPolicy {
    #[default]
    Replace,
    Accumulate,
}

impl PnlPolicy {
    /// New `(profit, loss)` account fields after applying `trade`. `None` if
    /// a running total would overflow.
    pub fn fold(
        &self,
        prev_profit: Decimal,
        prev_loss: Decimal,
        trade: TradePnl,
    ) -> Option<TradePnl> {
        match self {
            PnlPolicy::Replace => Some(trade),
            PnlPolicy::Accumulate => Some(TradePnl {
                profit: round2(prev_profit.checked_add(trade.profit)?),
                loss: round2(prev_loss.checked_add(trade.loss)?),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PnlPolicy::Replace => "replace",
            PnlPolicy::Accumulate => "accumulate",
        }
    }
}
