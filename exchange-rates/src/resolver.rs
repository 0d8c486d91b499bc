//! Cache-aside rate resolution.

use std::time::Duration;

use balance_types::{CurrencyCode, ExchangeError};

use crate::cache::RateCache;
use crate::rate::ExchangeRate;
use crate::source::RateSource;

/// Resolves rates from a cache, falling back to a slower source.
///
/// The cache never decides correctness: read errors count as misses and
/// write-back errors are logged and dropped. Source calls are bounded by
/// `source_timeout` regardless of what the source does internally.
pub struct RateResolver<S: RateSource, C: RateCache> {
    source: S,
    cache: C,
    source_timeout: Duration,
}

impl<S: RateSource, C: RateCache> RateResolver<S, C> {
    pub fn new(source: S, cache: C, source_timeout: Duration) -> Self {
        Self {
            source,
            cache,
            source_timeout,
        }
    }

    /// Returns a reference to the underlying cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait::async_trait]
impl<S: RateSource, C: RateCache> RateSource for RateResolver<S, C> {
    #[tracing::instrument(skip(self), fields(currency = %currency))]
    async fn get_rate(&self, currency: CurrencyCode) -> Result<ExchangeRate, ExchangeError> {
        match self.cache.get(currency).await {
            Ok(Some(rate)) => {
                tracing::debug!(%rate, "rate cache hit");
                return Ok(rate);
            }
            Ok(None) => tracing::debug!("rate cache miss"),
            Err(e) => tracing::warn!(error = %e, "rate cache read failed, asking source"),
        }

        let rate = tokio::time::timeout(self.source_timeout, self.source.get_rate(currency))
            .await
            .map_err(|_| ExchangeError::Timeout(currency))??;

        if let Err(e) = self.cache.set(currency, rate).await {
            tracing::warn!(error = %e, "failed to cache rate");
        }

        Ok(rate)
    }
}
