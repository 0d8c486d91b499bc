//! Domain models for the balance service.

pub mod account;
pub mod history;
pub mod money;
pub mod transaction;

pub use account::{Account, Balance, UserId};
pub use history::{HistoryQuery, SortKey};
pub use money::{BASE_CURRENCY, CurrencyCode, Money};
pub use transaction::{REFILL_TARGET, TransactionKind, TransactionRecord, TransferReceipt};
