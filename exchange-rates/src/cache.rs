//! Rate caches with time-to-live.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use balance_types::CurrencyCode;

use crate::rate::ExchangeRate;

/// Error type for cache backends.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Storage for quotes that expire after a while.
///
/// A cache is an accelerator only: callers must treat every error as a miss.
#[async_trait::async_trait]
pub trait RateCache: Send + Sync + 'static {
    /// Returns the cached rate, or `None` if absent or expired.
    async fn get(&self, currency: CurrencyCode) -> Result<Option<ExchangeRate>, CacheError>;

    /// Stores a rate for the cache's time-to-live.
    async fn set(&self, currency: CurrencyCode, rate: ExchangeRate) -> Result<(), CacheError>;
}

#[async_trait::async_trait]
impl<T: RateCache + ?Sized> RateCache for Arc<T> {
    async fn get(&self, currency: CurrencyCode) -> Result<Option<ExchangeRate>, CacheError> {
        (**self).get(currency).await
    }

    async fn set(&self, currency: CurrencyCode, rate: ExchangeRate) -> Result<(), CacheError> {
        (**self).set(currency, rate).await
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: ExchangeRate,
    expires_at: Instant,
}

/// In-process rate cache backed by a concurrent map.
pub struct InMemoryRateCache {
    entries: DashMap<CurrencyCode, CachedRate>,
    ttl: Duration,
}

impl InMemoryRateCache {
    /// Default lifetime of a quote.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryRateCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

#[async_trait::async_trait]
impl RateCache for InMemoryRateCache {
    async fn get(&self, currency: CurrencyCode) -> Result<Option<ExchangeRate>, CacheError> {
        let now = Instant::now();
        // Copy out so no shard guard is held while removing.
        let cached = self.entries.get(&currency).map(|entry| *entry.value());

        match cached {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.rate)),
            Some(_) => {
                self.entries
                    .remove_if(&currency, |_, entry| entry.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, currency: CurrencyCode, rate: ExchangeRate) -> Result<(), CacheError> {
        self.entries.insert(
            currency,
            CachedRate {
                rate,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    fn rate(value: rust_decimal::Decimal) -> ExchangeRate {
        ExchangeRate::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = InMemoryRateCache::default();
        assert_eq!(cache.get(usd()).await.unwrap(), None);

        cache.set(usd(), rate(dec!(91.2))).await.unwrap();
        assert_eq!(cache.get(usd()).await.unwrap(), Some(rate(dec!(91.2))));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryRateCache::default();
        cache.set(usd(), rate(dec!(90))).await.unwrap();
        cache.set(usd(), rate(dec!(95))).await.unwrap();
        assert_eq!(cache.get(usd()).await.unwrap(), Some(rate(dec!(95))));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = InMemoryRateCache::new(Duration::from_secs(60));
        cache.set(usd(), rate(dec!(90))).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(usd()).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(usd()).await.unwrap(), None);
        assert!(cache.is_empty());
    }
}
