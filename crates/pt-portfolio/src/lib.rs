//! pt-portfolio
//!
//! Trade-history accounting for the paper-trading ledger.
//! - Positions are derived by replaying the trade log (never stored)
//! - Buy/sell validation against cash and held quantity
//! - Per-trade profit/loss attribution and how it folds into the account
//! - Cumulative buy/sell series for the portfolio chart
//! - Pure deterministic logic (no IO, no clock, no store wiring)

mod chart;
mod pnl;
mod position;
mod validate;

pub use chart::{chart_series, ChartSeries, CHART_LABEL_FORMAT};
pub use pnl::{buy_pnl, PnlPolicy, TradePnl};
pub use position::{held_quantity, holdings, sort_by_recorded_at};
pub use validate::{validate_buy, validate_quantity, validate_sell, BuyApproval, Rejection};
