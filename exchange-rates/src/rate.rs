use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// How many base-currency units (RUB) one unit of a currency is worth.
///
/// Always strictly positive, so dividing by it is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub const ONE: ExchangeRate = ExchangeRate(Decimal::ONE);

    /// Returns `None` for zero or negative rates.
    pub fn new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO).then_some(Self(value))
    }

    /// Converts a provider float, rejecting NaN, infinities and non-positive values.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).and_then(Self::new)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
