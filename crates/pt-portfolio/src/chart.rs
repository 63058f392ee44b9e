use pt_schemas::{Side, StoredTrade};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::position::sort_by_recorded_at;

/// Label format for chart points (UTC, minute resolution).
pub const CHART_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Running buy and sell totals, one point per usable trade, in time order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub buy_data: Vec<Decimal>,
    pub sell_data: Vec<Decimal>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn chart_series(trades: &[StoredTrade]) -> ChartSeries {
    let mut ordered = trades.to_vec();
    sort_by_recorded_at(&mut ordered);

    let mut out = ChartSeries::default();
    let mut cum_buy = Decimal::ZERO;
    let mut cum_sell = Decimal::ZERO;

    for t in &ordered {
        let (Some(side), Some(q)) = (t.side(), t.quantity()) else {
            continue;
        };
        match side {
            Side::Buy => cum_buy += q,
            Side::Sell => cum_sell += q,
        }
        out.labels
            .push(t.recorded_at.format(CHART_LABEL_FORMAT).to_string());
        out.buy_data.push(cum_buy);
        out.sell_data.push(cum_sell);
    }
    out
}
