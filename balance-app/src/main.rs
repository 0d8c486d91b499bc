//! # Balance Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the ledger store adapter
//! - Build the rate source, cache and converter
//! - Create the balance service
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use balance_hex::{BalanceService, inbound::HttpServer};
use balance_repo::build_repo;
use exchange_rates::{
    CurrencyConverter, ExchangeRatesApiSource, InMemoryRateCache, RateCache, RateResolver,
    RedisRateCache,
};

use config::{Config, LogFormat};

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("balance-service"), provider))
}

/// Installs the global subscriber; returns the OTLP provider when exporting.
fn init_tracing(config: &Config) -> anyhow::Result<Option<sdktrace::SdkTracerProvider>> {
    let (telemetry, provider) = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let (tracer, provider) = init_tracer(endpoint)?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,balance_app=debug,balance_hex=debug".into()),
        )
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with(telemetry)
        .init();

    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let otel_provider = init_tracing(&config)?;

    tracing::info!("Starting balance server on port {}", config.port);
    if config.exchange_key.is_empty() {
        tracing::warn!("EXCHANGE_KEY is not set; conversions will fall back to RUB");
    }

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!(backend = repo.backend(), "Ledger store ready");
    let repo = Arc::new(repo);

    // Rates: provider behind a TTL cache
    let source = ExchangeRatesApiSource::new(
        config.exchange_api_url.clone(),
        config.exchange_key.clone(),
        config.rate_source_timeout,
    )?;
    let cache: Arc<dyn RateCache> = match config.redis_url.as_deref() {
        Some(url) => {
            let cache = RedisRateCache::connect(url, config.rate_cache_ttl).await?;
            tracing::info!("Rate cache: redis");
            Arc::new(cache)
        }
        None => {
            tracing::info!("Rate cache: in-process");
            Arc::new(InMemoryRateCache::new(config.rate_cache_ttl))
        }
    };
    let rates = RateResolver::new(source, cache, config.rate_source_timeout);

    let service = BalanceService::from_shared(repo.clone(), CurrencyConverter::new(rates));

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    let result = server.run(&addr).await;

    repo.close().await;
    tracing::info!("Connection pool closed");

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    result
}
