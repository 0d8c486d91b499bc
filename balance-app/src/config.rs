//! Configuration loading from environment.

use std::env;
use std::time::Duration;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub exchange_api_url: String,
    pub exchange_key: String,
    /// Shared rate cache; the in-process cache is used when unset.
    pub redis_url: Option<String>,
    pub rate_cache_ttl: Duration,
    pub rate_source_timeout: Duration,
    pub log_format: LogFormat,
    /// OTLP collector; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub const DEFAULT_EXCHANGE_API_URL: &'static str = "http://api.exchangeratesapi.io/v1";

    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a port number: {}", e))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let exchange_api_url = lookup("EXCHANGE_API_URL")
            .unwrap_or_else(|| Self::DEFAULT_EXCHANGE_API_URL.to_string());
        let exchange_key = lookup("EXCHANGE_KEY").unwrap_or_default();

        let redis_url = lookup("REDIS_URL").filter(|s| !s.is_empty());
        let rate_cache_ttl = Duration::from_secs(parse_or(&lookup, "RATE_CACHE_TTL_SECS", 3600)?);
        let rate_source_timeout =
            Duration::from_millis(parse_or(&lookup, "RATE_SOURCE_TIMEOUT_MS", 2000)?);

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            None => LogFormat::Text,
            Some(f) if f == "text" => LogFormat::Text,
            Some(f) if f == "json" => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be `text` or `json`, got {:?}", other),
        };

        let otlp_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|s| !s.is_empty());

        Ok(Self {
            port,
            database_url,
            exchange_api_url,
            exchange_key,
            redis_url,
            rate_cache_ttl,
            rate_source_timeout,
            log_format,
            otlp_endpoint,
        })
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> anyhow::Result<u64> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a non-negative integer: {}", key, e)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.exchange_api_url, Config::DEFAULT_EXCHANGE_API_URL);
        assert_eq!(config.rate_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.rate_source_timeout, Duration::from_millis(2000));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn test_database_url_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/balance"),
            ("PORT", "8080"),
            ("RATE_CACHE_TTL_SECS", "60"),
            ("RATE_SOURCE_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "JSON"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
            ("REDIS_URL", "redis://cache:6379/0"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.rate_source_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379/0"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(load(&[("DATABASE_URL", "x"), ("PORT", "http")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("RATE_CACHE_TTL_SECS", "-1")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("LOG_FORMAT", "xml")]).is_err());
    }
}
