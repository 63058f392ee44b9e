use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::provider::{fetch_last_price_bounded, ProviderError, QuoteProvider};
use crate::Lookback;

/// Short-lived last-price cache for read-only market endpoints.
///
/// Owned by whoever constructs it and passed in explicitly; there is no
/// process-wide instance. Trades never read from it. The lock is never held
/// across an await.
#[derive(Debug)]
pub struct QuoteCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    stored_at: Instant,
    price: Decimal,
}

impl QuoteCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cached price if present and younger than the TTL.
    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        let map = self.lock();
        map.get(symbol)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.price)
    }

    pub fn put(&self, symbol: &str, price: Decimal) {
        let mut map = self.lock();
        if map.len() >= self.max_entries && !map.contains_key(symbol) {
            let ttl = self.ttl;
            map.retain(|_, e| e.stored_at.elapsed() < ttl);
            if map.len() >= self.max_entries {
                let oldest = map
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone());
                if let Some(k) = oldest {
                    map.remove(&k);
                }
            }
        }
        map.insert(
            symbol.to_string(),
            Entry {
                stored_at: Instant::now(),
                price,
            },
        );
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cached price, or a bounded fetch from `provider` that populates the
    /// cache on success. Misses (`None`) are not cached.
    pub async fn get_or_fetch(
        &self,
        provider: &dyn QuoteProvider,
        symbol: &str,
        lookback: &Lookback,
        timeout: Duration,
    ) -> Result<Option<Decimal>, ProviderError> {
        if let Some(p) = self.get(symbol) {
            return Ok(Some(p));
        }
        let fetched = fetch_last_price_bounded(provider, symbol, lookback, timeout).await?;
        if let Some(p) = fetched {
            self.put(symbol, p);
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PricePoint;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        price: Option<Decimal>,
    }

    #[async_trait::async_trait]
    impl QuoteProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn get_series(
            &self,
            _symbol: &str,
            _lookback: &Lookback,
        ) -> Result<Vec<PricePoint>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .price
                .map(|close| vec![PricePoint { ts: Utc::now(), close }])
                .unwrap_or_default())
        }
    }

    #[test]
    fn entries_expire_after_ttl() {
        let c = QuoteCache::new(Duration::ZERO, 10);
        c.put("AAPL", dec!(1));
        assert_eq!(c.get("AAPL"), None);

        let c = QuoteCache::new(Duration::from_secs(60), 10);
        c.put("AAPL", dec!(1));
        assert_eq!(c.get("AAPL"), Some(dec!(1)));
    }

    #[test]
    fn capacity_is_bounded() {
        let c = QuoteCache::new(Duration::from_secs(60), 2);
        c.put("A", dec!(1));
        c.put("B", dec!(2));
        c.put("C", dec!(3));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("C"), Some(dec!(3)));
    }

    #[test]
    fn clear_empties_the_cache() {
        let c = QuoteCache::new(Duration::from_secs(60), 4);
        c.put("A", dec!(1));
        c.clear();
        assert!(c.is_empty());
    }

    #[tokio::test]
    async fn hit_skips_provider() {
        let p = CountingProvider {
            calls: AtomicUsize::new(0),
            price: Some(dec!(42)),
        };
        let c = QuoteCache::new(Duration::from_secs(60), 4);
        let lb = Lookback::default();
        let t = Duration::from_secs(1);

        assert_eq!(c.get_or_fetch(&p, "X", &lb, t).await.unwrap(), Some(dec!(42)));
        assert_eq!(c.get_or_fetch(&p, "X", &lb, t).await.unwrap(), Some(dec!(42)));
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let p = CountingProvider {
            calls: AtomicUsize::new(0),
            price: None,
        };
        let c = QuoteCache::new(Duration::from_secs(60), 4);
        let lb = Lookback::default();
        let t = Duration::from_secs(1);

        assert_eq!(c.get_or_fetch(&p, "X", &lb, t).await.unwrap(), None);
        assert_eq!(c.get_or_fetch(&p, "X", &lb, t).await.unwrap(), None);
        assert_eq!(p.calls.load(Ordering::SeqCst), 2);
        assert!(c.is_empty());
    }
}
