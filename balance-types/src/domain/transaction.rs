//! Transaction log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::UserId;
use crate::error::DomainError;

/// `target_id` recorded for plain credits that have no counterparty.
pub const REFILL_TARGET: i64 = 0;

/// The kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money credited to an account from outside the ledger
    Refill,
    /// Money debited from an account, usually to pay for a product
    Withdraw,
    /// One leg of a movement between two accounts
    Transfer,
}

impl TransactionKind {
    /// Classifies a single-party balance change by its sign.
    pub fn for_change(amount: i64) -> Self {
        if amount < 0 {
            TransactionKind::Withdraw
        } else {
            TransactionKind::Refill
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Refill => "REFILL",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::Transfer => "TRANSFER",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REFILL" => Ok(TransactionKind::Refill),
            "WITHDRAW" => Ok(TransactionKind::Withdraw),
            "TRANSFER" => Ok(TransactionKind::Transfer),
            other => Err(DomainError::ValidationError(format!(
                "Unknown transaction type: {}",
                other
            ))),
        }
    }
}

/// An entry of the audit log.
///
/// Records are immutable once written; `date` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    /// Store-assigned sequence number
    pub id: i64,
    #[schema(value_type = i64, example = 1)]
    pub user_id: UserId,
    /// Signed amount in kopecks; negative for debits
    #[schema(example = -1500)]
    pub amount: i64,
    /// Counterparty user, product identifier, or `0` for refills
    pub target_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: DateTime<Utc>,
}

/// The two mirrored entries written by a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferReceipt {
    /// Entry on the source account (negative amount)
    pub debit: TransactionRecord,
    /// Entry on the destination account (positive amount)
    pub credit: TransactionRecord,
}
