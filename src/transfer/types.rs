//! Transfer Core Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::TransferError;
use super::state::TransferStatus;
use crate::core_types::{AccountId, Amount, Currency};

/// Upper bound on client idempotency keys
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Current time truncated to milliseconds, the precision the SQL log keeps.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// A request to move `amount` from `source` to `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Client token; retries carry the same key
    pub idempotency_key: String,
    pub source: AccountId,
    pub destination: AccountId,
    /// Minor units of `currency`
    pub amount: Amount,
    pub currency: Currency,
}

impl TransferRequest {
    pub fn new(
        idempotency_key: impl Into<String>,
        source: AccountId,
        destination: AccountId,
        amount: Amount,
        currency: Currency,
    ) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            source,
            destination,
            amount,
            currency,
        }
    }

    /// Shape checks that need no account data.
    pub fn validate(&self) -> Result<(), TransferError> {
        let key_len = self.idempotency_key.len();
        if key_len == 0 || key_len > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(TransferError::InvalidIdempotencyKey);
        }
        if self.amount == 0 {
            return Err(TransferError::InvalidAmount);
        }
        if self.source == self.destination {
            return Err(TransferError::SameAccount);
        }
        Ok(())
    }

    /// Whether this request touches `account`
    pub fn involves(&self, account: AccountId) -> bool {
        self.source == account || self.destination == account
    }
}

/// Why a recorded transfer ended FAILED
///
/// Only failures detected after the PENDING record exists are stored; each
/// one guarantees that no balance changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    InsufficientFunds {
        account_id: AccountId,
        available: Amount,
        requested: Amount,
    },
    BalanceOverflow {
        account_id: AccountId,
    },
    BalanceConflict {
        account_id: AccountId,
    },
    StoreUnavailable {
        message: String,
    },
}

impl FailureReason {
    /// The error a caller sees for this failure, first time and on replay.
    pub fn to_error(&self) -> TransferError {
        match self {
            FailureReason::InsufficientFunds {
                account_id,
                available,
                requested,
            } => TransferError::InsufficientFunds {
                account_id: *account_id,
                available: *available,
                requested: *requested,
            },
            FailureReason::BalanceOverflow { account_id } => TransferError::Overflow(*account_id),
            FailureReason::BalanceConflict { account_id } => {
                TransferError::BalanceConflict(*account_id)
            }
            FailureReason::StoreUnavailable { message } => {
                TransferError::DatabaseError(message.clone())
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Balances of both accounts right after a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub source: Amount,
    pub destination: Amount,
}

/// Transfer log entry, keyed by idempotency key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub idempotency_key: String,
    pub request: TransferRequest,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balances: Option<Balances>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Fresh PENDING record for `request`
    pub fn pending(request: TransferRequest) -> Self {
        let now = now_millis();
        Self {
            idempotency_key: request.idempotency_key.clone(),
            request,
            status: TransferStatus::Pending,
            failure_reason: None,
            balances: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The caller-visible outcome of a resolved record, `None` while PENDING.
    pub fn outcome(&self) -> Option<Result<TransferResult, TransferError>> {
        match self.status {
            TransferStatus::Pending => None,
            TransferStatus::Completed => Some(match self.balances {
                Some(balances) => Ok(TransferResult::from_record(self, balances)),
                None => Err(TransferError::SystemError(format!(
                    "completed transfer '{}' has no balances",
                    self.idempotency_key
                ))),
            }),
            TransferStatus::Failed => Some(Err(match &self.failure_reason {
                Some(reason) => reason.to_error(),
                None => TransferError::SystemError(format!(
                    "failed transfer '{}' has no reason",
                    self.idempotency_key
                )),
            })),
        }
    }
}

/// Result of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub idempotency_key: String,
    pub status: TransferStatus,
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Amount,
    pub currency: Currency,
    pub source_balance: Amount,
    pub destination_balance: Amount,
    pub timestamp: DateTime<Utc>,
}

impl TransferResult {
    fn from_record(record: &TransferRecord, balances: Balances) -> Self {
        Self {
            idempotency_key: record.idempotency_key.clone(),
            status: record.status,
            source: record.request.source,
            destination: record.request.destination,
            amount: record.request.amount,
            currency: record.request.currency.clone(),
            source_balance: balances.source,
            destination_balance: balances.destination,
            timestamp: record.updated_at,
        }
    }
}

/// Outcome of `TransferLog::record_pending`
#[derive(Debug, Clone, PartialEq)]
pub enum PendingEntry {
    /// No record existed; this one was inserted
    Created(TransferRecord),
    /// A record with the same key was already there (untouched)
    Existing(TransferRecord),
}
