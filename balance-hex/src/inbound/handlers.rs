//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use balance_types::{
    AppError, BalanceParams, BalanceResponse, ChangeBalanceBody, ChangeBalanceRequest,
    CurrencyCode, Exchanger, HistoryParams, LedgerRepository, TransferRequest, UserId,
};

use crate::BalanceService;

/// Application state shared across handlers.
pub struct AppState<R: LedgerRepository, X: Exchanger> {
    pub service: BalanceService<R, X>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::BadRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(AppError::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InsufficientFunds {
                available,
                requested,
            } => (
                StatusCode::CONFLICT,
                format!(
                    "Insufficient funds: available {}, requested {}",
                    available, requested
                ),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid user id: {:?}", raw)))
}

fn parse_currency(raw: Option<&str>) -> Result<Option<CurrencyCode>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => code.parse::<CurrencyCode>().map(Some).map_err(AppError::from),
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Get a user's balance, optionally converted.
#[tracing::instrument(skip(state, params), fields(user_id = %id))]
pub async fn get_balance<R: LedgerRepository, X: Exchanger>(
    State(state): State<Arc<AppState<R, X>>>,
    Path(id): Path<String>,
    params: Result<Query<BalanceParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let Query(params) = params?;
    let currency = parse_currency(params.currency.as_deref())?;

    let balance = state.service.get_balance(user_id, currency).await?;
    Ok(Json(BalanceResponse::from(balance)))
}

/// Credit or debit a user's balance.
#[tracing::instrument(skip(state, body), fields(user_id = %id))]
pub async fn change_balance<R: LedgerRepository, X: Exchanger>(
    State(state): State<Arc<AppState<R, X>>>,
    Path(id): Path<String>,
    body: Result<Json<ChangeBalanceBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let Json(body) = body?;

    let record = state
        .service
        .change_balance(ChangeBalanceRequest::new(user_id, body))
        .await?;
    Ok(Json(record))
}

/// Transfer money between users.
#[tracing::instrument(skip(state, req))]
pub async fn transfer_money<R: LedgerRepository, X: Exchanger>(
    State(state): State<Arc<AppState<R, X>>>,
    req: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;

    let receipt = state.service.transfer_money(req).await?;
    Ok(Json(receipt))
}

/// Page through a user's transaction history.
#[tracing::instrument(skip(state, params), fields(user_id = %id))]
pub async fn get_history<R: LedgerRepository, X: Exchanger>(
    State(state): State<Arc<AppState<R, X>>>,
    Path(id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let Query(params) = params?;
    let query = params.into_query().map_err(AppError::from)?;

    let records = state.service.get_history(user_id, query).await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency(None).unwrap(), None);
        assert_eq!(parse_currency(Some(" ")).unwrap(), None);
        assert_eq!(
            parse_currency(Some("usd")).unwrap().unwrap().as_str(),
            "USD"
        );
        assert!(matches!(
            parse_currency(Some("dollars")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("7").unwrap().get(), 7);
        assert!(parse_user_id("0").is_err());
        assert!(parse_user_id("abc").is_err());
    }
}
