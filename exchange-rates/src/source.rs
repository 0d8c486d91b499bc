//! Remote rate providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use balance_types::{BASE_CURRENCY, CurrencyCode, ExchangeError};

use crate::rate::ExchangeRate;

/// Port for anything that can quote a currency against the base currency.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync + 'static {
    /// Base-currency units per one unit of `currency`.
    async fn get_rate(&self, currency: CurrencyCode) -> Result<ExchangeRate, ExchangeError>;
}

#[async_trait::async_trait]
impl<T: RateSource + ?Sized> RateSource for Arc<T> {
    async fn get_rate(&self, currency: CurrencyCode) -> Result<ExchangeRate, ExchangeError> {
        (**self).get_rate(currency).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// exchangeratesapi.io
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default)]
    error: Option<ApiError>,
}

/// Client for the exchangeratesapi.io `latest` endpoint.
///
/// The free plan only quotes against EUR, so the base-currency rate is
/// derived from two quotes: `rates[RUB] / rates[currency]`.
pub struct ExchangeRatesApiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRatesApiSource {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn map_transport_error(currency: CurrencyCode, err: reqwest::Error) -> ExchangeError {
        if err.is_timeout() {
            ExchangeError::Timeout(currency)
        } else {
            ExchangeError::unavailable(currency, err)
        }
    }
}

/// Extracts the base-currency rate for `currency` from a provider payload.
fn rate_from_response(
    response: ApiResponse,
    currency: CurrencyCode,
) -> Result<ExchangeRate, ExchangeError> {
    if !response.success {
        let reason = match response.error {
            Some(ApiError {
                info: Some(info), ..
            }) => info,
            Some(ApiError {
                code: Some(code), ..
            }) => format!("provider error code {}", code),
            _ => "provider reported failure".to_string(),
        };
        return Err(ExchangeError::unavailable(currency, reason));
    }

    let quote = |code: &str| {
        response
            .rates
            .get(code)
            .copied()
            .and_then(ExchangeRate::from_f64)
            .ok_or_else(|| {
                ExchangeError::unavailable(currency, format!("missing or invalid {} quote", code))
            })
    };

    let base_quote = quote(BASE_CURRENCY.as_str())?;
    let currency_quote = quote(currency.as_str())?;

    base_quote
        .value()
        .checked_div(currency_quote.value())
        .and_then(ExchangeRate::new)
        .ok_or_else(|| ExchangeError::unavailable(currency, "rate out of range"))
}

#[async_trait::async_trait]
impl RateSource for ExchangeRatesApiSource {
    #[tracing::instrument(skip(self), fields(currency = %currency))]
    async fn get_rate(&self, currency: CurrencyCode) -> Result<ExchangeRate, ExchangeError> {
        if currency.is_base() {
            return Ok(ExchangeRate::ONE);
        }

        let symbols = format!("{},{}", BASE_CURRENCY, currency);
        let response = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("symbols", symbols.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Self::map_transport_error(currency, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::unavailable(
                currency,
                format!("provider responded with HTTP {}", status),
            ));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| Self::map_transport_error(currency, e))?;

        let rate = rate_from_response(body, currency)?;
        tracing::debug!(%rate, "fetched rate from provider");
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::get};
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    fn parse(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_rate_is_derived_from_eur_quotes() {
        let body = parse(r#"{"success": true, "base": "EUR", "rates": {"RUB": 100.0, "USD": 1.25}}"#);
        let rate = rate_from_response(body, usd()).unwrap();
        assert_eq!(rate.value(), dec!(80));
    }

    #[test]
    fn test_provider_failure_is_unavailable() {
        let body = parse(
            r#"{"success": false, "error": {"code": 101, "info": "invalid access key"}}"#,
        );
        let err = rate_from_response(body, usd()).unwrap_err();
        assert!(
            matches!(err, ExchangeError::RateUnavailable { ref reason, .. } if reason == "invalid access key")
        );
    }

    #[test]
    fn test_missing_or_zero_quote_is_unavailable() {
        let body = parse(r#"{"success": true, "rates": {"RUB": 100.0}}"#);
        assert!(matches!(
            rate_from_response(body, usd()),
            Err(ExchangeError::RateUnavailable { .. })
        ));

        let body = parse(r#"{"success": true, "rates": {"RUB": 100.0, "USD": 0.0}}"#);
        assert!(matches!(
            rate_from_response(body, usd()),
            Err(ExchangeError::RateUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetches_over_http() {
        let router = Router::new().route(
            "/latest",
            get(|| async {
                Json(serde_json::json!({
                    "success": true,
                    "base": "EUR",
                    "rates": {"RUB": 90.0, "USD": 1.125}
                }))
            }),
        );
        let url = serve(router).await;

        let source = ExchangeRatesApiSource::new(url, "key", Duration::from_secs(2)).unwrap();
        let rate = source.get_rate(usd()).await.unwrap();
        assert_eq!(rate.value(), dec!(80));
    }

    #[tokio::test]
    async fn test_base_currency_needs_no_request() {
        let source =
            ExchangeRatesApiSource::new("http://127.0.0.1:9", "key", Duration::from_millis(50))
                .unwrap();
        let rate = source.get_rate(BASE_CURRENCY).await.unwrap();
        assert_eq!(rate, ExchangeRate::ONE);
    }

    #[tokio::test]
    async fn test_http_error_status_is_unavailable() {
        let router = Router::new().route(
            "/latest",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let url = serve(router).await;

        let source = ExchangeRatesApiSource::new(url, "key", Duration::from_secs(2)).unwrap();
        let err = source.get_rate(usd()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::RateUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_unavailable() {
        let router = Router::new().route("/latest", get(|| async { "not json" }));
        let url = serve(router).await;

        let source = ExchangeRatesApiSource::new(url, "key", Duration::from_secs(2)).unwrap();
        let err = source.get_rate(usd()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::RateUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let router = Router::new().route(
            "/latest",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let url = serve(router).await;

        let source = ExchangeRatesApiSource::new(url, "key", Duration::from_millis(100)).unwrap();
        let err = source.get_rate(usd()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout(_)));
    }
}
