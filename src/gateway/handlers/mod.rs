//! HTTP handlers

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{get_account, get_account_transfers, open_account};
pub use health::health_check;
pub use transfer::create_transfer;
