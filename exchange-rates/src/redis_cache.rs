//! Rate cache kept in Redis so every service instance shares quotes.
//!
//! Each rate is one string key, `<prefix><CODE>`, holding the decimal rate and
//! written with `SET key value EX ttl`; Redis drops it on expiry.

use std::str::FromStr;
use std::time::Duration;

use redis::aio::ConnectionManager;
use rust_decimal::Decimal;

use balance_types::CurrencyCode;

use crate::cache::{CacheError, RateCache};
use crate::rate::ExchangeRate;

/// Networked rate cache backed by a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisRateCache {
    conn: ConnectionManager,
    prefix: String,
    ttl_secs: u64,
}

impl RedisRateCache {
    pub const DEFAULT_PREFIX: &'static str = "rate:";

    /// Connects to `url` (`redis://host:port/db`).
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = ConnectionManager::new(client).await.map_err(backend)?;
        Ok(Self::from_connection(conn, ttl))
    }

    pub fn from_connection(conn: ConnectionManager, ttl: Duration) -> Self {
        Self {
            conn,
            prefix: Self::DEFAULT_PREFIX.to_string(),
            // EX rejects zero
            ttl_secs: ttl.as_secs().max(1),
        }
    }

    /// Namespaces keys, e.g. to share one Redis between deployments.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    fn key(&self, currency: CurrencyCode) -> String {
        format!("{}{}", self.prefix, currency.as_str())
    }
}

fn backend(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

fn encode_rate(rate: ExchangeRate) -> String {
    rate.value().normalize().to_string()
}

fn decode_rate(raw: &str) -> Result<ExchangeRate, CacheError> {
    Decimal::from_str(raw.trim())
        .ok()
        .and_then(ExchangeRate::new)
        .ok_or_else(|| CacheError::Backend(format!("unreadable cached rate {:?}", raw)))
}

#[async_trait::async_trait]
impl RateCache for RedisRateCache {
    async fn get(&self, currency: CurrencyCode) -> Result<Option<ExchangeRate>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(currency))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        raw.as_deref().map(decode_rate).transpose()
    }

    async fn set(&self, currency: CurrencyCode, rate: ExchangeRate) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(self.key(currency))
            .arg(encode_rate(rate))
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
