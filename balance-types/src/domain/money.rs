//! Fixed-point monetary value tagged with its currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Currency the ledger stores every balance in.
pub const BASE_CURRENCY: CurrencyCode = CurrencyCode(*b"RUB");

/// ISO-4217 style currency code: three ASCII letters, always uppercase.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }

    /// Returns true for the ledger's base currency.
    pub fn is_base(&self) -> bool {
        *self == BASE_CURRENCY
    }
}

impl FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(DomainError::ValidationError(format!(
                "Invalid currency code: {:?}",
                s
            )));
        }
        let mut code = [0u8; 3];
        for (dst, src) in code.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

/// Money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (kopecks, cents)
/// to avoid floating-point precision issues. It is signed so that debit
/// entries in the transaction log can share the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: CurrencyCode,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: i64, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Creates an amount in the base currency.
    pub fn base(amount: i64) -> Self {
        Self::new(amount, BASE_CURRENCY)
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    /// Checked addition - returns error if currencies don't match or the sum overflows.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(DomainError::AmountOverflow)?;
        Ok(Money::new(amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(f, "{}{}.{:02} {}", sign, abs / 100, abs % 100, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    #[test]
    fn test_currency_code_parse_normalizes_case() {
        let code: CurrencyCode = "eur".parse().unwrap();
        assert_eq!(code.as_str(), "EUR");
        assert_eq!(code.to_string(), "EUR");
    }

    #[test]
    fn test_currency_code_rejects_garbage() {
        for bad in ["", "US", "USDT", "U$D", "12A"] {
            assert!(matches!(
                bad.parse::<CurrencyCode>(),
                Err(DomainError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_base_currency_is_rub() {
        assert!("rub".parse::<CurrencyCode>().unwrap().is_base());
        assert!(!usd().is_base());
    }

    #[test]
    fn test_currency_code_serde_as_string() {
        let json = serde_json::to_string(&usd()).unwrap();
        assert_eq!(json, "\"USD\"");
        let back: CurrencyCode = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(back.as_str(), "GBP");
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }

    #[test]
    fn test_money_addition() {
        let a = Money::base(100);
        let b = Money::base(-50);
        assert_eq!(a.checked_add(b).unwrap().amount(), 50);
    }

    #[test]
    fn test_currency_mismatch() {
        let result = Money::base(100).checked_add(Money::new(50, usd()));
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let result = Money::base(i64::MAX).checked_add(Money::base(1));
        assert!(matches!(result, Err(DomainError::AmountOverflow)));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::base(1050).to_string(), "10.50 RUB");
        assert_eq!(Money::new(-5, usd()).to_string(), "-0.05 USD");
    }
}
