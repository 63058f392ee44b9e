use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::provider::{PricePoint, ProviderError, QuoteProvider};
use crate::Lookback;

/// Provider serving a fixed price table. Used for offline runs
/// (`quotes.provider: fixed`) and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedQuoteProvider {
    prices: HashMap<String, Decimal>,
}

impl FixedQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: impl Into<String>, price: Decimal) -> Self {
        self.prices.insert(symbol.into(), price);
        self
    }

    pub fn from_map(prices: HashMap<String, Decimal>) -> Self {
        Self { prices }
    }
}

#[async_trait::async_trait]
impl QuoteProvider for FixedQuoteProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn get_series(
        &self,
        symbol: &str,
        _lookback: &Lookback,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        Ok(self
            .prices
            .get(symbol)
            .map(|close| {
                vec![PricePoint {
                    ts: Utc::now(),
                    close: *close,
                }]
            })
            .unwrap_or_default())
    }
}
