use std::collections::BTreeMap;

use pt_schemas::{Side, StoredTrade};
use rust_decimal::Decimal;

/// Held quantity of `symbol`: buys minus sells across `trades`.
///
/// Documents without a usable side or quantity are skipped. The result is
/// not clamped; an inconsistent history can produce a negative value and
/// callers must not assume otherwise.
pub fn held_quantity(trades: &[StoredTrade], symbol: &str) -> Decimal {
    trades
        .iter()
        .filter(|t| t.symbol == symbol)
        .fold(Decimal::ZERO, |acc, t| acc + signed_quantity(t))
}

/// Held quantity for every symbol with a non-zero position.
pub fn holdings(trades: &[StoredTrade]) -> BTreeMap<String, Decimal> {
    let mut out: BTreeMap<String, Decimal> = BTreeMap::new();
    for t in trades {
        let q = signed_quantity(t);
        if q.is_zero() {
            continue;
        }
        *out.entry(t.symbol.clone()).or_insert(Decimal::ZERO) += q;
    }
    out.retain(|_, q| !q.is_zero());
    out
}

/// Stable sort by server timestamp (ties keep store order).
pub fn sort_by_recorded_at(trades: &mut [StoredTrade]) {
    trades.sort_by_key(|t| t.recorded_at);
}

fn signed_quantity(t: &StoredTrade) -> Decimal {
    match (t.side(), t.quantity()) {
        (Some(Side::Buy), Some(q)) => q,
        (Some(Side::Sell), Some(q)) => -q,
        _ => Decimal::ZERO,
    }
}
