//! Base-currency to display-currency conversion.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use balance_types::{BASE_CURRENCY, CurrencyCode, ExchangeError, Exchanger, Money};

use crate::rate::ExchangeRate;
use crate::source::RateSource;

/// Presents base-currency amounts in other currencies.
///
/// `converted = amount / rate`, computed in exact decimal arithmetic and
/// rounded to the nearest minor unit, halves away from zero. Both currencies
/// are assumed to have two decimal places.
pub struct CurrencyConverter<R: RateSource> {
    rates: R,
}

impl<R: RateSource> CurrencyConverter<R> {
    pub fn new(rates: R) -> Self {
        Self { rates }
    }

    /// Returns a reference to the rate source.
    pub fn rates(&self) -> &R {
        &self.rates
    }
}

/// Divides a minor-unit amount by a rate and rounds to whole minor units.
fn apply_rate(amount: i64, rate: ExchangeRate) -> Option<i64> {
    Decimal::from(amount)
        .checked_div(rate.value())?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[async_trait::async_trait]
impl<R: RateSource> Exchanger for CurrencyConverter<R> {
    #[tracing::instrument(skip(self), fields(amount = %amount, currency = %currency))]
    async fn convert_from_base(
        &self,
        amount: Money,
        currency: CurrencyCode,
    ) -> Result<Money, ExchangeError> {
        if !amount.currency().is_base() {
            return Err(ExchangeError::NotBaseCurrency {
                from: amount.currency(),
                expected: BASE_CURRENCY,
            });
        }
        if currency.is_base() {
            return Ok(amount);
        }

        let rate = self.rates.get_rate(currency).await?;
        let converted = apply_rate(amount.amount(), rate).ok_or(ExchangeError::Overflow)?;
        Ok(Money::new(converted, currency))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::resolver::tests::{StubSource, usd};

    fn rate(value: Decimal) -> ExchangeRate {
        ExchangeRate::new(value).unwrap()
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // 125 / 10 = 12.5 -> 13
        assert_eq!(apply_rate(125, rate(dec!(10))), Some(13));
        // 124 / 10 = 12.4 -> 12
        assert_eq!(apply_rate(124, rate(dec!(10))), Some(12));
        // 100 / 3 = 33.33.. -> 33
        assert_eq!(apply_rate(100, rate(dec!(3))), Some(33));
        assert_eq!(apply_rate(-125, rate(dec!(10))), Some(-13));
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(apply_rate(i64::MAX, rate(dec!(0.0001))), None);
    }

    #[tokio::test]
    async fn test_hundred_rubles_at_ten() {
        let converter = CurrencyConverter::new(StubSource::ok(rate(dec!(10))));
        // 100.00 RUB at 10 RUB per USD is 10.00 USD
        let converted = converter
            .convert_from_base(Money::base(10_000), usd())
            .await
            .unwrap();
        assert_eq!(converted, Money::new(1_000, usd()));
        assert_eq!(converted.to_string(), "10.00 USD");
    }

    #[tokio::test]
    async fn test_fractional_rate() {
        let converter = CurrencyConverter::new(StubSource::ok(rate(dec!(92.37))));
        let converted = converter
            .convert_from_base(Money::base(1_000_000), usd())
            .await
            .unwrap();
        // 10000.00 / 92.37 = 108.2602...
        assert_eq!(converted.amount(), 10_826);
    }

    #[tokio::test]
    async fn test_base_currency_is_identity() {
        let source = Arc::new(StubSource::failing());
        let converter = CurrencyConverter::new(source.clone());
        let amount = Money::base(4_321);

        assert_eq!(
            converter.convert_from_base(amount, BASE_CURRENCY).await.unwrap(),
            amount
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let converter = CurrencyConverter::new(StubSource::failing());
        let err = converter
            .convert_from_base(Money::base(100), usd())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::RateUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_rejects_non_base_input() {
        let converter = CurrencyConverter::new(StubSource::ok(rate(dec!(10))));
        let err = converter
            .convert_from_base(Money::new(100, usd()), usd())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::NotBaseCurrency { .. }));
    }
}
