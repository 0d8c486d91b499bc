//! SQLite repository adapter.
//!
//! SQLite has no row locks. The pool holds exactly one connection, so every
//! ledger transaction runs alone; that also keeps `sqlite::memory:` databases
//! alive for the lifetime of the repository.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;

use balance_types::{
    Account, ChangeBalanceRequest, HistoryQuery, LedgerRepository, Money, RepoError,
    TransactionKind, TransactionRecord, TransferReceipt, TransferRequest, UserId,
};

use crate::types::{
    DbBalance, DbSqliteTransactionRecord, RECORD_COLUMNS, change_entry, db_err,
    migration_statements, tx_err,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite ledger for development and tests.
pub struct SqliteRepo {
    pool: SqlitePool,
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), anyhow::Error> {
    let sql = include_str!("../migrations/0001_create_ledger.sql");
    for stmt in migration_statements(sql) {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration 0001 failed: {}", e))?;
    }
    Ok(())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statement helpers (run inside an open transaction)
// ─────────────────────────────────────────────────────────────────────────────

async fn load_account(conn: &mut SqliteConnection, id: UserId) -> Result<Account, RepoError> {
    let row: Option<DbBalance> = sqlx::query_as(r#"SELECT amount FROM balances WHERE id = ?"#)
        .bind(id.get())
        .fetch_optional(conn)
        .await
        .map_err(db_err)?;

    Ok(row.map_or_else(
        || Account::empty(id),
        |r| Account::from_parts(id, r.amount),
    ))
}

async fn upsert_balance(
    conn: &mut SqliteConnection,
    id: UserId,
    delta: i64,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO balances (id, amount) VALUES (?, ?)
           ON CONFLICT (id) DO UPDATE SET amount = balances.amount + excluded.amount"#,
    )
    .bind(id.get())
    .bind(delta)
    .execute(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_record(
    conn: &mut SqliteConnection,
    user_id: UserId,
    amount: i64,
    target_id: i64,
    kind: TransactionKind,
) -> Result<TransactionRecord, RepoError> {
    let sql = format!(
        "INSERT INTO transactions (user_id, amount, target_id, type) VALUES (?, ?, ?, ?) RETURNING {}",
        RECORD_COLUMNS
    );
    let row: DbSqliteTransactionRecord = sqlx::query_as(&sql)
        .bind(user_id.get())
        .bind(amount)
        .bind(target_id)
        .bind(kind.as_str())
        .fetch_one(conn)
        .await
        .map_err(db_err)?;

    row.into_domain()
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteRepo {
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn get_balance(&self, user_id: UserId) -> Result<Money, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(r#"SELECT amount FROM balances WHERE id = ?"#)
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Money::base(row.map_or(0, |r| r.amount)))
    }

    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id, amount = req.amount))]
    async fn change_balance(&self, req: ChangeBalanceRequest) -> Result<TransactionRecord, RepoError> {
        req.validate()?;

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        let mut account = load_account(&mut db_tx, req.user_id).await?;
        account.apply(req.amount)?;

        upsert_balance(&mut db_tx, req.user_id, req.amount).await?;

        let (kind, target) = change_entry(&req);
        let record = insert_record(&mut db_tx, req.user_id, req.amount, target, kind).await?;

        db_tx.commit().await.map_err(tx_err)?;

        tracing::debug!(balance = %account.balance, record_id = record.id, "balance changed");
        Ok(record)
    }

    #[tracing::instrument(skip(self, req), fields(src = %req.src, dst = %req.dst, amount = req.amount))]
    async fn transfer_money(&self, req: TransferRequest) -> Result<TransferReceipt, RepoError> {
        req.validate()?;

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        let mut source = load_account(&mut db_tx, req.src).await?;
        let mut target = load_account(&mut db_tx, req.dst).await?;
        source.apply(-req.amount)?;
        target.apply(req.amount)?;

        upsert_balance(&mut db_tx, req.src, -req.amount).await?;
        upsert_balance(&mut db_tx, req.dst, req.amount).await?;

        let debit = insert_record(
            &mut db_tx,
            req.src,
            -req.amount,
            req.dst.get(),
            TransactionKind::Transfer,
        )
        .await?;
        let credit = insert_record(
            &mut db_tx,
            req.dst,
            req.amount,
            req.src.get(),
            TransactionKind::Transfer,
        )
        .await?;

        db_tx.commit().await.map_err(tx_err)?;

        Ok(TransferReceipt { debit, credit })
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn get_history(
        &self,
        user_id: UserId,
        query: HistoryQuery,
    ) -> Result<Vec<TransactionRecord>, RepoError> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY {} LIMIT ? OFFSET ?",
            RECORD_COLUMNS,
            query.order_by()
        );
        let rows: Vec<DbSqliteTransactionRecord> = sqlx::query_as(&sql)
            .bind(user_id.get())
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(DbSqliteTransactionRecord::into_domain)
            .collect()
    }
}
