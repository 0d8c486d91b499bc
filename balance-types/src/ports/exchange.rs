//! Currency conversion port.
//!
//! This trait defines the interface the balance service uses to present a
//! base-currency amount in another currency. Implementations resolve rates
//! from caches, HTTP providers, mocks, etc.

use crate::domain::{CurrencyCode, Money};

/// Error type for exchange rate operations.
///
/// Every variant means the same thing to callers: the rate could not be
/// obtained, so no conversion happened.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    #[error("Rate unavailable for {currency}: {reason}")]
    RateUnavailable {
        currency: CurrencyCode,
        reason: String,
    },

    #[error("Rate source timed out for {0}")]
    Timeout(CurrencyCode),

    #[error("Cannot convert {from} amounts, expected {expected}")]
    NotBaseCurrency {
        from: CurrencyCode,
        expected: CurrencyCode,
    },

    #[error("Converted amount out of range")]
    Overflow,
}

impl ExchangeError {
    pub fn unavailable(currency: CurrencyCode, reason: impl ToString) -> Self {
        ExchangeError::RateUnavailable {
            currency,
            reason: reason.to_string(),
        }
    }
}

/// Port trait for currency conversion.
#[async_trait::async_trait]
pub trait Exchanger: Send + Sync + 'static {
    /// Converts a base-currency amount into `currency`.
    ///
    /// The result is in minor units of `currency`, rounded to the nearest unit.
    /// Conversion into the base currency itself is the identity.
    async fn convert_from_base(
        &self,
        amount: Money,
        currency: CurrencyCode,
    ) -> Result<Money, ExchangeError>;
}
