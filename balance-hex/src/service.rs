//! Balance Application Service
//!
//! Orchestrates ledger operations through the repository port and presents
//! balances through the exchange port.
//! Contains NO infrastructure logic - pure business orchestration.

use std::future::Future;
use std::sync::Arc;

use balance_types::{
    AppError, Balance, ChangeBalanceRequest, CurrencyCode, Exchanger, HistoryQuery,
    LedgerRepository, TransactionRecord, TransferReceipt, TransferRequest, UserId,
};

/// Message attached to a balance that could not be converted.
pub const CONVERSION_UNAVAILABLE: &str = "conversion unavailable, amount returned in RUB";

/// Application service for balance operations.
///
/// Generic over `R: LedgerRepository` and `X: Exchanger` - the adapters are
/// injected at compile time.
pub struct BalanceService<R: LedgerRepository, X: Exchanger> {
    repo: Arc<R>,
    exchanger: X,
}

impl<R: LedgerRepository, X: Exchanger> BalanceService<R, X> {
    /// Creates a new balance service with the given adapters.
    pub fn new(repo: R, exchanger: X) -> Self {
        Self::from_shared(Arc::new(repo), exchanger)
    }

    /// Creates a service over a repository that is also used elsewhere.
    pub fn from_shared(repo: Arc<R>, exchanger: X) -> Self {
        Self { repo, exchanger }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns a reference to the exchange adapter.
    pub fn exchanger(&self) -> &X {
        &self.exchanger
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Balance
    // ─────────────────────────────────────────────────────────────────────────────

    /// Current balance, optionally presented in another currency.
    ///
    /// The ledger read completes before any rate is resolved. A failed
    /// conversion does not fail the call: the base-currency amount comes back
    /// with `conversion_error` set.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_balance(
        &self,
        user_id: UserId,
        currency: Option<CurrencyCode>,
    ) -> Result<Balance, AppError> {
        let amount = self.repo.get_balance(user_id).await?;

        let currency = match currency {
            Some(c) if !c.is_base() => c,
            _ => return Ok(Balance::new(user_id, amount)),
        };

        match self.exchanger.convert_from_base(amount, currency).await {
            Ok(converted) => Ok(Balance::new(user_id, converted)),
            Err(e) => {
                tracing::warn!(error = %e, %currency, "serving unconverted balance");
                Ok(Balance::unconverted(user_id, amount, CONVERSION_UNAVAILABLE))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Ledger mutations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Credits (positive) or debits (negative) a user's balance.
    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id, amount = req.amount))]
    pub async fn change_balance(
        &self,
        req: ChangeBalanceRequest,
    ) -> Result<TransactionRecord, AppError> {
        req.validate()?;

        let repo = self.repo.clone();
        run_detached(async move { repo.change_balance(req).await }).await
    }

    /// Moves money from `src` to `dst`.
    #[tracing::instrument(skip(self, req), fields(src = %req.src, dst = %req.dst, amount = req.amount))]
    pub async fn transfer_money(&self, req: TransferRequest) -> Result<TransferReceipt, AppError> {
        req.validate()?;

        let repo = self.repo.clone();
        run_detached(async move { repo.transfer_money(req).await }).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    /// One page of a user's transaction log.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_history(
        &self,
        user_id: UserId,
        query: HistoryQuery,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        self.repo
            .get_history(user_id, query)
            .await
            .map_err(Into::into)
    }
}

/// Runs a ledger mutation on its own task so that dropping the caller
/// (client disconnect) cannot abort it between statements.
async fn run_detached<T, F>(fut: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, balance_types::RepoError>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(e) => {
            tracing::error!(error = %e, "ledger task failed");
            Err(AppError::Internal("ledger task failed".into()))
        }
    }
}
