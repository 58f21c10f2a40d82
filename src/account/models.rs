//! Data models for ledger accounts

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core_types::{AccountId, Amount, Currency};

/// A ledger account.
///
/// `balance` is in minor units of `currency` and unsigned, so the no-overdraft
/// invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Amount,
    pub currency: Currency,
}

impl Account {
    pub fn new(id: AccountId, balance: Amount, currency: Currency) -> Self {
        Self {
            id,
            balance,
            currency,
        }
    }

    /// Whether `amount` can be debited without going below zero.
    #[inline]
    pub fn can_debit(&self, amount: Amount) -> bool {
        self.balance >= amount
    }
}

/// Account store errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Balance conflict on account {id}: expected {expected}, found {actual}")]
    Conflict {
        id: AccountId,
        expected: Amount,
        actual: Amount,
    },

    #[error("Stored balance out of range on account {0}")]
    InvalidBalance(AccountId),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_debit() {
        let account = Account::new(AccountId::new(1), 100, Currency::new("EUR").unwrap());
        assert!(account.can_debit(100));
        assert!(account.can_debit(0));
        assert!(!account.can_debit(101));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict {
            id: AccountId::new(7),
            expected: 10,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "Balance conflict on account 7: expected 10, found 12"
        );
    }
}
