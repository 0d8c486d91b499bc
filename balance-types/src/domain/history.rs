//! Paging and ordering of the transaction log.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Column a history page is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Amount,
}

impl SortKey {
    /// Column name in the `transactions` table. Only these two values are
    /// ever spliced into SQL.
    pub fn column(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Amount => "amount",
        }
    }
}

/// A validated request for one page of a user's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    page: u32,
    per_page: u32,
    pub sort: SortKey,
    pub descending: bool,
}

impl HistoryQuery {
    /// Largest page size a caller may ask for.
    pub const MAX_PER_PAGE: u32 = 1000;

    /// Creates a query; `page` and `per_page` are 1-based and must be positive.
    pub fn new(page: u32, per_page: u32, sort: SortKey, descending: bool) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::ValidationError("page must be at least 1".into()));
        }
        if per_page == 0 || per_page > Self::MAX_PER_PAGE {
            return Err(DomainError::ValidationError(format!(
                "per_page must be between 1 and {}",
                Self::MAX_PER_PAGE
            )));
        }
        if i64::from(page - 1)
            .checked_mul(i64::from(per_page))
            .is_none()
        {
            return Err(DomainError::ValidationError("page is out of range".into()));
        }
        Ok(Self {
            page,
            per_page,
            sort,
            descending,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of rows to return.
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// Number of rows to skip: `(page - 1) * per_page`. Checked in `new`.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// `ORDER BY` clause for this query, with the record id as tie-breaker.
    pub fn order_by(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!(
            "{} {}, id {}",
            self.sort.column(),
            direction,
            direction
        )
    }
}

impl Default for HistoryQuery {
    /// First page of ten, oldest first.
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            sort: SortKey::Date,
            descending: false,
        }
    }
}
