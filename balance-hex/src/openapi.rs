//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use balance_types::domain::{SortKey, TransactionKind, TransactionRecord, TransferReceipt};
use balance_types::dto::{
    BalanceParams, BalanceResponse, ChangeBalanceBody, HistoryParams, SortOrder, TransferRequest,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Get a user's balance
///
/// Unknown users have a zero balance. If the requested currency cannot be
/// resolved the amount is returned in RUB and `error` is set.
#[utoipa::path(
    get,
    path = "/api/v1/balance/{id}",
    tag = "balance",
    params(
        ("id" = i64, Path, description = "User ID (positive)"),
        BalanceParams
    ),
    responses(
        (status = 200, description = "Balance in minor units of `currency`", body = BalanceResponse),
        (status = 400, description = "Invalid user ID or currency code"),
        (status = 500, description = "Ledger unavailable")
    )
)]
async fn get_balance() {}

/// Credit or debit a user's balance
#[utoipa::path(
    post,
    path = "/api/v1/balance/{id}",
    tag = "balance",
    params(
        ("id" = i64, Path, description = "User ID (positive)")
    ),
    request_body = ChangeBalanceBody,
    responses(
        (status = 200, description = "Balance changed", body = TransactionRecord),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Insufficient funds"),
        (status = 500, description = "Ledger unavailable")
    )
)]
async fn change_balance() {}

/// Page through a user's transactions
#[utoipa::path(
    get,
    path = "/api/v1/balance/{id}/history",
    tag = "balance",
    params(
        ("id" = i64, Path, description = "User ID (positive)"),
        HistoryParams
    ),
    responses(
        (status = 200, description = "One page of records, empty past the end", body = Vec<TransactionRecord>),
        (status = 400, description = "Invalid paging or sort parameters")
    )
)]
async fn get_history() {}

/// Transfer money between users
#[utoipa::path(
    post,
    path = "/api/v1/transfer",
    tag = "transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = TransferReceipt),
        (status = 400, description = "Negative amount or same source and destination"),
        (status = 409, description = "Insufficient funds"),
        (status = 500, description = "Ledger unavailable")
    )
)]
async fn transfer_money() {}

/// OpenAPI documentation for the Balance API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Balance Service API",
        version = "1.0.0",
        description = "User balances in RUB with transfers, transaction history and on-the-fly currency conversion.\n\nAll amounts are integers in minor units (kopecks for RUB, cents for USD).",
        license(name = "MIT"),
    ),
    paths(health, get_balance, change_balance, get_history, transfer_money),
    components(
        schemas(
            BalanceResponse,
            ChangeBalanceBody,
            TransferRequest,
            TransactionRecord,
            TransactionKind,
            TransferReceipt,
            SortKey,
            SortOrder,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "balance", description = "Balance reads, changes and history"),
        (name = "transfer", description = "Transfers between users"),
    )
)]
pub struct ApiDoc;
