//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

use balance_types::{
    Account, ChangeBalanceRequest, HistoryQuery, LedgerRepository, Money, RepoError,
    TransactionKind, TransactionRecord, TransferReceipt, TransferRequest, UserId,
};

use crate::types::{
    DbBalance, DbTransactionRecord, RECORD_COLUMNS, change_entry, db_err, lock_order,
    migration_statements, tx_err,
};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL ledger with row-level locking.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    let sql = include_str!("../migrations/0001_create_ledger_pg.sql");
    for stmt in migration_statements(sql) {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration 0001 failed: {}", e))?;
    }
    Ok(())
}

impl PostgresRepo {
    /// Connects, migrates and returns a ready repository.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool; the schema is expected to exist.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool).await.map_err(db_err)
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statement helpers (run inside an open transaction)
// ─────────────────────────────────────────────────────────────────────────────

/// Locks the account row and returns its balance; absent rows read as zero.
async fn lock_account(conn: &mut PgConnection, id: UserId) -> Result<Account, RepoError> {
    let row: Option<DbBalance> =
        sqlx::query_as(r#"SELECT amount FROM balances WHERE id = $1 FOR UPDATE"#)
            .bind(id.get())
            .fetch_optional(conn)
            .await
            .map_err(db_err)?;

    Ok(row.map_or_else(
        || Account::empty(id),
        |r| Account::from_parts(id, r.amount),
    ))
}

async fn upsert_balance(conn: &mut PgConnection, id: UserId, delta: i64) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO balances (id, amount) VALUES ($1, $2)
           ON CONFLICT (id) DO UPDATE SET amount = balances.amount + EXCLUDED.amount"#,
    )
    .bind(id.get())
    .bind(delta)
    .execute(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_record(
    conn: &mut PgConnection,
    user_id: UserId,
    amount: i64,
    target_id: i64,
    kind: TransactionKind,
) -> Result<TransactionRecord, RepoError> {
    let sql = format!(
        "INSERT INTO transactions (user_id, amount, target_id, type) VALUES ($1, $2, $3, $4) RETURNING {}",
        RECORD_COLUMNS
    );
    let row: DbTransactionRecord = sqlx::query_as(&sql)
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
impl LedgerRepository for PostgresRepo {
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn get_balance(&self, user_id: UserId) -> Result<Money, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(r#"SELECT amount FROM balances WHERE id = $1"#)
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

        let mut account = lock_account(&mut db_tx, req.user_id).await?;
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

        // Lock accounts in consistent order to prevent deadlocks
        let [first, second] = lock_order(req.src, req.dst);
        let first = lock_account(&mut db_tx, first).await?;
        let second = lock_account(&mut db_tx, second).await?;

        let (mut source, mut target) = if first.id == req.src {
            (first, second)
        } else {
            (second, first)
        };
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
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY {} LIMIT $2 OFFSET $3",
            RECORD_COLUMNS,
            query.order_by()
        );
        let rows: Vec<DbTransactionRecord> = sqlx::query_as(&sql)
            .bind(user_id.get())
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(DbTransactionRecord::into_domain).collect()
    }
}
