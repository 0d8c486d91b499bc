//! # Balance Hex
//!
//! Application service layer and HTTP adapter for the balance service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (orchestrates ledger and conversion)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `openapi/` - OpenAPI document served at `/api-docs/openapi.json`
//!
//! The service is generic over `R: LedgerRepository` and `X: Exchanger`,
//! allowing different adapters to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::{BalanceService, CONVERSION_UNAVAILABLE};
