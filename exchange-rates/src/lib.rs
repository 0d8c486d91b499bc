//! Exchange rates for balance display.
//!
//! The ledger stores every balance in the base currency (RUB). This crate
//! turns such amounts into other currencies for presentation only, layered
//! leaves first:
//!
//! - [`RateSource`] - anything that can quote "RUB per one unit of X";
//!   [`ExchangeRatesApiSource`] is the HTTP provider.
//! - [`RateCache`] - TTL storage for quotes; [`InMemoryRateCache`] keeps them
//!   in a concurrent map, [`RedisRateCache`] shares them across instances.
//! - [`RateResolver`] - cache-aside: cache first, then the source, then
//!   best-effort write-back. It is itself a [`RateSource`].
//! - [`CurrencyConverter`] - applies a rate with half-away-from-zero rounding
//!   and implements the [`balance_types::Exchanger`] port.
//!
//! # Example
//! ```ignore
//! use std::time::Duration;
//! use exchange_rates::{CurrencyConverter, ExchangeRatesApiSource, InMemoryRateCache, RateResolver};
//!
//! let source = ExchangeRatesApiSource::new(url, key, Duration::from_secs(2))?;
//! let cache = InMemoryRateCache::new(Duration::from_secs(3600));
//! let converter = CurrencyConverter::new(RateResolver::new(source, cache, Duration::from_secs(2)));
//! let usd = converter.convert_from_base(Money::base(10_000), "USD".parse()?).await?;
//! ```

mod cache;
mod converter;
mod rate;
mod redis_cache;
mod resolver;
mod source;

pub use cache::{CacheError, InMemoryRateCache, RateCache};
pub use converter::CurrencyConverter;
pub use rate::ExchangeRate;
pub use redis_cache::RedisRateCache;
pub use resolver::RateResolver;
pub use source::{ExchangeRatesApiSource, RateSource};
