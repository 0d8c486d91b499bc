//! Account domain model.

use serde::{Deserialize, Serialize};

use super::money::{BASE_CURRENCY, Money};
use crate::error::DomainError;

/// Identifier of a ledger account; one account per user.
///
/// Always strictly positive: `0` is reserved as the refill target sentinel
/// in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Creates a UserId, rejecting zero and negative values.
    pub fn new(id: i64) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::ValidationError(format!(
                "User id must be positive, got {}",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Returns the raw identifier.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .parse()
            .map_err(|_| DomainError::ValidationError(format!("Invalid user id: {:?}", s)))?;
        Self::new(raw)
    }
}

/// A ledger account as read under lock inside a store transaction.
///
/// The store loads the current balance (zero when the row does not exist yet),
/// applies the requested delta here and only writes if this succeeds, so the
/// non-negative invariant is decided in one place for every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub balance: Money,
}

impl Account {
    /// Creates an account with zero balance.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            balance: Money::zero(BASE_CURRENCY),
        }
    }

    /// Reconstructs an account from a stored balance.
    pub fn from_parts(id: UserId, balance: i64) -> Self {
        Self {
            id,
            balance: Money::base(balance),
        }
    }

    /// Applies a signed change to the balance.
    ///
    /// Fails with `InsufficientFunds` if the result would be negative; the
    /// account is left untouched in that case.
    pub fn apply(&mut self, delta: i64) -> Result<(), DomainError> {
        let next = self.balance.checked_add(Money::base(delta))?;
        if next.is_negative() {
            return Err(DomainError::InsufficientFunds {
                available: self.balance.amount(),
                requested: delta.saturating_neg(),
            });
        }
        self.balance = next;
        Ok(())
    }
}

/// Balance as reported to callers, possibly converted to a display currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub user_id: UserId,
    /// Amount in minor units of `amount.currency()`.
    pub amount: Money,
    /// Set when conversion was requested but could not be completed; `amount`
    /// is then expressed in the base currency.
    pub conversion_error: Option<String>,
}

impl Balance {
    pub fn new(user_id: UserId, amount: Money) -> Self {
        Self {
            user_id,
            amount,
            conversion_error: None,
        }
    }

    /// Builds the degraded answer returned when the rate provider is unusable.
    pub fn unconverted(user_id: UserId, base_amount: Money, reason: impl Into<String>) -> Self {
        Self {
            user_id,
            amount: base_amount,
            conversion_error: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.conversion_error.is_some()
    }
}
