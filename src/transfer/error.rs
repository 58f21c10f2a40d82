//! Transfer Error Types

use thiserror::Error;

use crate::account::StoreError;
use crate::core_types::{AccountId, Amount, Currency};

/// Transfer error types
///
/// Every variant is recoverable and returned as a value from the engine.
/// `code()` is stable and safe to expose to API clients.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Idempotency key must be 1-{max} characters", max = super::types::MAX_IDEMPOTENCY_KEY_LEN)]
    InvalidIdempotencyKey,

    #[error("Invalid currency code: '{0}' (expected 3 uppercase letters)")]
    InvalidCurrency(String),

    // === Account Errors ===
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Currency mismatch on account {account_id}: account holds {expected}, request uses {actual}")]
    CurrencyMismatch {
        account_id: AccountId,
        expected: Currency,
        actual: Currency,
    },

    #[error("Insufficient funds on account {account_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        available: Amount,
        requested: Amount,
    },

    #[error("Balance of account {0} would overflow")]
    Overflow(AccountId),

    // === Contention ===
    #[error("Accounts busy: locks not acquired within {0} ms")]
    Busy(u64),

    /// Recorded FAILED under its key; only a new key can try again.
    #[error("Balance of account {0} changed concurrently")]
    BalanceConflict(AccountId),

    // === Idempotency ===
    #[error("Idempotency key '{0}' was already used for a different request")]
    DuplicateRequest(String),

    #[error("Outcome of transfer '{0}' is indeterminate; do not retry before reconciliation")]
    IndeterminateOutcome(String),

    // === System Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Internal system error: {0}")]
    SystemError(String),
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
            TransferError::InvalidCurrency(_) => "INVALID_CURRENCY",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::Overflow(_) => "OVERFLOW",
            TransferError::Busy(_) => "BUSY",
            TransferError::BalanceConflict(_) => "BALANCE_CONFLICT",
            TransferError::DuplicateRequest(_) => "DUPLICATE_REQUEST",
            TransferError::IndeterminateOutcome(_) => "INDETERMINATE_OUTCOME",
            TransferError::DatabaseError(_) => "DATABASE_ERROR",
            TransferError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            TransferError::SystemError(_) => "SYSTEM_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::SameAccount
            | TransferError::InvalidAmount
            | TransferError::InvalidIdempotencyKey
            | TransferError::InvalidCurrency(_)
            | TransferError::CurrencyMismatch { .. } => 400,
            TransferError::AccountNotFound(_) => 404,
            TransferError::DuplicateRequest(_) | TransferError::BalanceConflict(_) => 409,
            TransferError::InsufficientFunds { .. } | TransferError::Overflow(_) => 422,
            TransferError::Busy(_) => 503,
            TransferError::IndeterminateOutcome(_)
            | TransferError::DatabaseError(_)
            | TransferError::InvalidStateTransition(_)
            | TransferError::SystemError(_) => 500,
        }
    }

    /// Same request may succeed if simply sent again.
    ///
    /// Only `Busy` qualifies: it is returned before anything is recorded.
    /// Every other outcome under a key is final for that key.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Busy(_))
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => TransferError::AccountNotFound(id),
            StoreError::Conflict { id, .. } => TransferError::BalanceConflict(id),
            StoreError::InvalidBalance(id) => TransferError::Overflow(id),
            StoreError::Database(msg) => TransferError::DatabaseError(msg),
        }
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(e: serde_json::Error) -> Self {
        TransferError::SystemError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::SameAccount.code(), "SAME_ACCOUNT");
        assert_eq!(
            TransferError::InsufficientFunds {
                account_id: AccountId::new(1),
                available: 10,
                requested: 50
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            TransferError::IndeterminateOutcome("k".into()).code(),
            "INDETERMINATE_OUTCOME"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(
            TransferError::AccountNotFound(AccountId::new(1)).http_status(),
            404
        );
        assert_eq!(TransferError::DuplicateRequest("k".into()).http_status(), 409);
        assert_eq!(TransferError::Busy(2000).http_status(), 503);
        assert_eq!(
            TransferError::BalanceConflict(AccountId::new(1)).http_status(),
            409
        );
        assert_eq!(
            TransferError::IndeterminateOutcome("k".into()).http_status(),
            500
        );
    }

    #[test]
    fn test_classification() {
        assert!(!TransferError::SameAccount.is_retryable());
        assert!(TransferError::Busy(10).is_retryable());
        assert!(!TransferError::BalanceConflict(AccountId::new(1)).is_retryable());
        assert!(!TransferError::DatabaseError("io".into()).is_retryable());
        assert!(!TransferError::IndeterminateOutcome("k".into()).is_retryable());
    }

    #[test]
    fn test_from_store_error() {
        let id = AccountId::new(5);
        assert_eq!(
            TransferError::from(StoreError::NotFound(id)),
            TransferError::AccountNotFound(id)
        );
        assert_eq!(
            TransferError::from(StoreError::Conflict {
                id,
                expected: 1,
                actual: 2
            }),
            TransferError::BalanceConflict(id)
        );
    }

    #[test]
    fn test_display() {
        let err = TransferError::InsufficientFunds {
            account_id: AccountId::new(1),
            available: 10,
            requested: 50,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds on account 1: available 10, requested 50"
        );
    }
}
