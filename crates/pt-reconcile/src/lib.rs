//! pt-reconcile
//!
//! The trade path of the paper-trading ledger.
//! - Typed buy / sell / register requests (lenient wire payloads → validated orders)
//! - `ReconcileEngine`: fresh quote, validation against re-read state, atomic commit
//! - Revision-conflict retry, bounded by config
//! - `TradeError`: the single error taxonomy the HTTP layer maps to statuses

mod engine;
mod error;
pub mod request;

pub use engine::{BuyReceipt, EngineConfig, ReconcileEngine, SellReceipt};
pub use error::TradeError;
pub use request::{BuyOrder, BuyPayload, RegisterOrder, RegisterPayload, SellOrder, SellPayload};
