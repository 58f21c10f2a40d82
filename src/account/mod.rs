//! Account management module
//!
//! Ledger accounts and the [`AccountStore`] port, with an in-memory backend
//! and a SQLite backend.

pub mod db;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use db::SqliteAccountStore;
pub use models::{Account, StoreError};
pub use store::{AccountStore, InMemoryAccountStore};
