//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Balance, HistoryQuery, SortKey, UserId};
use crate::error::DomainError;

// ─────────────────────────────────────────────────────────────────────────────
// Balance DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query string of a balance lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceParams {
    /// Display currency; defaults to the ledger's base currency (RUB)
    #[param(example = "USD")]
    pub currency: Option<String>,
}

/// Balance of a user, possibly converted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(example = 1)]
    pub id: i64,
    /// Amount in smallest units of `currency`
    #[schema(example = 10050)]
    pub amount: i64,
    #[schema(example = "USD")]
    pub currency: String,
    /// Present when the requested conversion failed and `amount` is in RUB
    pub error: Option<String>,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            id: balance.user_id.get(),
            amount: balance.amount.amount(),
            currency: balance.amount.currency().to_string(),
            error: balance.conversion_error,
        }
    }
}

/// Body of a balance change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeBalanceBody {
    /// Signed amount in kopecks: positive credits, negative debits
    #[schema(example = 15000)]
    pub amount: i64,
    /// Product paid for by a debit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 42)]
    pub product_id: Option<i64>,
}

/// A balance change as handed to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeBalanceRequest {
    pub user_id: UserId,
    pub amount: i64,
    pub product_id: Option<i64>,
}

impl ChangeBalanceRequest {
    pub fn new(user_id: UserId, body: ChangeBalanceBody) -> Self {
        Self {
            user_id,
            amount: body.amount,
            product_id: body.product_id,
        }
    }

    /// Boundary checks that do not need the store.
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(product_id) = self.product_id {
            if product_id < 0 {
                return Err(DomainError::ValidationError(
                    "product_id cannot be negative".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Request to move money between two users.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Source user
    #[schema(value_type = i64, example = 1)]
    pub src: UserId,
    /// Destination user
    #[schema(value_type = i64, example = 2)]
    pub dst: UserId,
    /// Amount to transfer in kopecks
    #[schema(example = 500)]
    pub amount: i64,
}

impl TransferRequest {
    /// Boundary checks that do not need the store.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount < 0 {
            return Err(DomainError::ValidationError(
                "Transfer amount cannot be negative".into(),
            ));
        }
        if self.src == self.dst {
            return Err(DomainError::ValidationError(
                "Cannot transfer to the same account".into(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// History DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Sort direction of a history page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query string of a history lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// 1-based page number (default 1)
    pub page: Option<u32>,
    /// Page size (default 10, at most 1000)
    pub per_page: Option<u32>,
    /// `date` (default) or `amount`
    pub sort: Option<SortKey>,
    /// `asc` (default) or `desc`
    pub order: Option<SortOrder>,
}

impl HistoryParams {
    pub const DEFAULT_PER_PAGE: u32 = 10;

    pub fn into_query(self) -> Result<HistoryQuery, DomainError> {
        HistoryQuery::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(Self::DEFAULT_PER_PAGE),
            self.sort.unwrap_or_default(),
            self.order.unwrap_or_default() == SortOrder::Desc,
        )
    }
}
