//! HTTP-level tests of the balance API.
//!
//! The router is driven in-process with `oneshot` against an in-memory
//! SQLite ledger and a stubbed rate source behind the real cache and
//! converter.

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

use balance_hex::{BalanceService, inbound::HttpServer};
use balance_repo::SqliteRepo;
use balance_types::{CurrencyCode, ExchangeError};
use exchange_rates::{CurrencyConverter, ExchangeRate, InMemoryRateCache, RateResolver, RateSource};

/// Quotes 10 RUB per USD and nothing else.
struct UsdOnly;

#[async_trait::async_trait]
impl RateSource for UsdOnly {
    async fn get_rate(&self, currency: CurrencyCode) -> Result<ExchangeRate, ExchangeError> {
        if currency.as_str() == "USD" {
            Ok(ExchangeRate::new(dec!(10)).unwrap())
        } else {
            Err(ExchangeError::unavailable(currency, "not quoted"))
        }
    }
}

async fn app() -> Router {
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    let rates = RateResolver::new(UsdOnly, InMemoryRateCache::default(), Duration::from_secs(1));
    let service = BalanceService::new(repo, CurrencyConverter::new(rates));
    HttpServer::new(service).router()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_unknown_user_balance_is_zero() {
    let app = app().await;

    let (status, body) = send(&app, get("/api/v1/balance/5")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 5);
    assert_eq!(body["amount"], 0);
    assert_eq!(body["currency"], "RUB");
    assert_eq!(body["error"], Value::Null);
}

#[tokio::test]
async fn test_refill_then_converted_balance() {
    let app = app().await;

    let (status, record) = send(&app, post("/api/v1/balance/1", json!({"amount": 10_000}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["type"], "REFILL");
    assert_eq!(record["target_id"], 0);
    assert_eq!(record["amount"], 10_000);

    let (status, body) = send(&app, get("/api/v1/balance/1?currency=USD")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 1_000);
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["error"], Value::Null);
}

#[tokio::test]
async fn test_unquoted_currency_degrades_to_rub() {
    let app = app().await;
    send(&app, post("/api/v1/balance/1", json!({"amount": 700}))).await;

    let (status, body) = send(&app, get("/api/v1/balance/1?currency=EUR")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 700);
    assert_eq!(body["currency"], "RUB");
    assert_eq!(body["error"], "conversion unavailable, amount returned in RUB");
}

#[tokio::test]
async fn test_overdraw_is_conflict() {
    let app = app().await;
    send(&app, post("/api/v1/balance/1", json!({"amount": 100}))).await;

    let (status, body) = send(
        &app,
        post("/api/v1/balance/1", json!({"amount": -500, "product_id": 3})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    let (_, balance) = send(&app, get("/api/v1/balance/1")).await;
    assert_eq!(balance["amount"], 100);
}

#[tokio::test]
async fn test_withdraw_records_product() {
    let app = app().await;
    send(&app, post("/api/v1/balance/1", json!({"amount": 100}))).await;

    let (status, record) = send(
        &app,
        post("/api/v1/balance/1", json!({"amount": -40, "product_id": 12})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["type"], "WITHDRAW");
    assert_eq!(record["target_id"], 12);
}

#[tokio::test]
async fn test_transfer_and_mirrored_records() {
    let app = app().await;
    send(&app, post("/api/v1/balance/1", json!({"amount": 1_000}))).await;

    let (status, receipt) = send(
        &app,
        post("/api/v1/transfer", json!({"src": 1, "dst": 2, "amount": 300})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["debit"]["amount"], -300);
    assert_eq!(receipt["debit"]["target_id"], 2);
    assert_eq!(receipt["credit"]["amount"], 300);
    assert_eq!(receipt["credit"]["target_id"], 1);

    let (_, src) = send(&app, get("/api/v1/balance/1")).await;
    let (_, dst) = send(&app, get("/api/v1/balance/2")).await;
    assert_eq!(src["amount"], 700);
    assert_eq!(dst["amount"], 300);
}

#[tokio::test]
async fn test_transfer_validation() {
    let app = app().await;

    let (status, _) = send(
        &app,
        post("/api/v1/transfer", json!({"src": 1, "dst": 1, "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post("/api/v1/transfer", json!({"src": 1, "dst": 2, "amount": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post("/api/v1/transfer", json!({"src": 0, "dst": 2, "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_transfer_insufficient_funds() {
    let app = app().await;

    let (status, _) = send(
        &app,
        post("/api/v1/transfer", json!({"src": 1, "dst": 2, "amount": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_transfer_overflowing_destination_is_bad_request() {
    let app = app().await;
    send(&app, post("/api/v1/balance/1", json!({"amount": 100}))).await;
    send(&app, post("/api/v1/balance/2", json!({"amount": i64::MAX}))).await;

    let (status, body) = send(
        &app,
        post("/api/v1/transfer", json!({"src": 1, "dst": 2, "amount": 100})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    let (_, src) = send(&app, get("/api/v1/balance/1")).await;
    assert_eq!(src["amount"], 100);
}

#[tokio::test]
async fn test_invalid_inputs_are_bad_requests() {
    let app = app().await;

    let (status, _) = send(&app, get("/api/v1/balance/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/v1/balance/-3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/v1/balance/1?currency=DOLLARS")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/v1/balance/1/history?page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/v1/balance/1/history?sort=size")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        get("/api/v1/balance/1/history?page=4294967295&per_page=4294967295"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = send(&app, post("/api/v1/balance/1", json!({"amount": "ten"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_history_paging_and_sorting() {
    let app = app().await;
    for amount in [1, 5, 3] {
        send(&app, post("/api/v1/balance/1", json!({"amount": amount}))).await;
    }

    let (status, page) = send(
        &app,
        get("/api/v1/balance/1/history?page=1&per_page=2&sort=amount&order=desc"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<i64> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["amount"].as_i64().unwrap())
        .collect();
    assert_eq!(amounts, vec![5, 3]);

    let (status, page) = send(&app, get("/api/v1/balance/1/history?page=9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page, json!([]));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app().await;

    let (status, doc) = send(&app, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/transfer"].is_object());
}
