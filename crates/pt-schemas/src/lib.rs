//! pt-schemas
//!
//! Shared record types for the paper-trading ledger: the per-user account
//! document, the immutable trade record written on every executed trade, and
//! the lenient view of stored trade documents used when replaying history.
//!
//! No IO lives here. Stores, engines and the HTTP layer all speak these types.

mod account;
pub mod money;
mod trade;

pub use account::{Account, AccountSummary, AccountUpdate, NewAccount};
pub use trade::{SellContext, Side, StoredTrade, TradeRecord};
