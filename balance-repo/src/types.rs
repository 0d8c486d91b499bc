//! Database row types shared by the SQL adapters.
//!
//! Each backend gets its own transaction-row struct so that both adapters
//! can be compiled into the same binary.

use sqlx::FromRow;

use balance_types::{
    ChangeBalanceRequest, REFILL_TARGET, RepoError, TransactionKind, TransactionRecord, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Balance-only row for queries.
#[derive(FromRow)]
pub struct DbBalance {
    pub amount: i64,
}

/// Transaction row from PostgreSQL.
#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct DbTransactionRecord {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub target_id: i64,
    pub kind: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// Transaction row from SQLite, where dates are RFC 3339 text.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct DbSqliteTransactionRecord {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub target_id: i64,
    pub kind: String,
    pub date: String,
}

/// Column list used by every query returning transaction rows.
pub const RECORD_COLUMNS: &str = "id, user_id, amount, target_id, type AS kind, date";

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(e.to_string())
}

pub fn tx_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Transaction(e.to_string())
}

fn parse_user_id(raw: i64) -> Result<UserId, RepoError> {
    UserId::new(raw).map_err(|e| RepoError::Database(format!("Corrupt user_id: {}", e)))
}

fn parse_kind(raw: &str) -> Result<TransactionKind, RepoError> {
    raw.parse()
        .map_err(|e| RepoError::Database(format!("Corrupt transaction type: {}", e)))
}

/// Kind and `target_id` of the log entry for a single-party change.
pub fn change_entry(req: &ChangeBalanceRequest) -> (TransactionKind, i64) {
    let kind = TransactionKind::for_change(req.amount);
    let target = match kind {
        TransactionKind::Withdraw => req.product_id.unwrap_or(REFILL_TARGET),
        _ => REFILL_TARGET,
    };
    (kind, target)
}

/// Orders two accounts for lock acquisition: smaller id first.
pub fn lock_order(a: UserId, b: UserId) -> [UserId; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

/// Splits a migration file into individual statements.
pub fn migration_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
impl DbTransactionRecord {
    /// Convert database row to domain record.
    pub fn into_domain(self) -> Result<TransactionRecord, RepoError> {
        Ok(TransactionRecord {
            id: self.id,
            user_id: parse_user_id(self.user_id)?,
            amount: self.amount,
            target_id: self.target_id,
            kind: parse_kind(&self.kind)?,
            date: self.date,
        })
    }
}

#[cfg(feature = "sqlite")]
impl DbSqliteTransactionRecord {
    /// Convert database row to domain record.
    pub fn into_domain(self) -> Result<TransactionRecord, RepoError> {
        let date = chrono::DateTime::parse_from_rfc3339(&self.date)
            .map_err(db_err)?
            .with_timezone(&chrono::Utc);

        Ok(TransactionRecord {
            id: self.id,
            user_id: parse_user_id(self.user_id)?,
            amount: self.amount,
            target_id: self.target_id,
            kind: parse_kind(&self.kind)?,
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_refill_targets_sentinel() {
        let req = ChangeBalanceRequest {
            user_id: user(1),
            amount: 500,
            product_id: Some(9),
        };
        assert_eq!(change_entry(&req), (TransactionKind::Refill, REFILL_TARGET));
    }

    #[test]
    fn test_debit_targets_product() {
        let req = ChangeBalanceRequest {
            user_id: user(1),
            amount: -500,
            product_id: Some(9),
        };
        assert_eq!(change_entry(&req), (TransactionKind::Withdraw, 9));

        let req = ChangeBalanceRequest {
            product_id: None,
            ..req
        };
        assert_eq!(change_entry(&req), (TransactionKind::Withdraw, REFILL_TARGET));
    }

    #[test]
    fn test_lock_order_is_ascending() {
        assert_eq!(lock_order(user(7), user(3)), [user(3), user(7)]);
        assert_eq!(lock_order(user(3), user(7)), [user(3), user(7)]);
    }

    #[test]
    fn test_migration_statements() {
        let sql = "CREATE TABLE a (x INT);\n\n CREATE INDEX i ON a (x);\n";
        let statements: Vec<_> = migration_statements(sql).collect();
        assert_eq!(statements, vec!["CREATE TABLE a (x INT)", "CREATE INDEX i ON a (x)"]);
    }
}
