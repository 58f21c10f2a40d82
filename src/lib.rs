//! Money Transfer - Idempotent, deadlock-free transfers between accounts
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (AccountId, Currency, Amount)
//! - [`money`] - Decimal string <-> minor unit conversion
//! - [`account`] - Account model and the `AccountStore` port (memory, SQLite)
//! - [`transfer`] - Lock manager, transfer log and the transfer engine
//! - [`db`] - SQLite pool and schema
//! - [`gateway`] - HTTP API (axum)
//! - [`config`] / [`logging`] - YAML configuration and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod account;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod money;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountStore, InMemoryAccountStore, SqliteAccountStore, StoreError};
pub use core_types::{AccountId, Amount, Currency};
pub use db::Database;
pub use transfer::{
    InMemoryTransferLog, SqliteTransferLog, TransferEngine, TransferError, TransferLog,
    TransferRecord, TransferRequest, TransferResult, TransferStatus,
};
