//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite) implement this trait.

use crate::domain::{HistoryQuery, Money, TransactionRecord, TransferReceipt, UserId};
use crate::dto::{ChangeBalanceRequest, TransferRequest};
use crate::error::RepoError;

/// The ledger port.
///
/// All operations that modify balances MUST be atomic: the balance rows and
/// the transaction log entries commit together or not at all. Implementations
/// serialize concurrent mutations of the same account (row lock or stronger)
/// and never let a committed balance go below zero.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    /// Current balance in the base currency.
    ///
    /// An account that was never credited has a zero balance; this is not an
    /// error and does not create the account.
    async fn get_balance(&self, user_id: UserId) -> Result<Money, RepoError>;

    /// Adds a signed amount to a balance, creating the account on first credit.
    ///
    /// Fails with `DomainError::InsufficientFunds` (state unchanged) if the
    /// balance would become negative.
    async fn change_balance(&self, req: ChangeBalanceRequest) -> Result<TransactionRecord, RepoError>;

    /// Moves a non-negative amount between two distinct accounts.
    async fn transfer_money(&self, req: TransferRequest) -> Result<TransferReceipt, RepoError>;

    /// One page of the user's transaction log.
    ///
    /// Pages past the end are empty, not an error.
    async fn get_history(
        &self,
        user_id: UserId,
        query: HistoryQuery,
    ) -> Result<Vec<TransactionRecord>, RepoError>;
}
