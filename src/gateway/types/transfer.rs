//! Request and response bodies for accounts and transfers
//!
//! Amounts cross the wire as decimal strings ("30.00"); inside the engine
//! they are minor units. Conversion goes through [`crate::money`] with the
//! configured number of decimals.

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::core_types::{AccountId, Currency};
use crate::money;
use crate::transfer::{TransferRecord, TransferRequest, TransferResult};

use super::response::ApiError;

/// POST /api/v1/accounts
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAccountRequest {
    pub currency: String,
    /// Initial balance, e.g. "100.00"
    pub balance: String,
}

impl OpenAccountRequest {
    pub fn parse(&self, decimals: u32) -> Result<(Currency, u64), ApiError> {
        let currency = Currency::new(&self.currency)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        let balance = money::parse_amount(&self.balance, decimals)
            .map_err(|e| ApiError::bad_request(format!("balance: {e}")))?;
        Ok((currency, balance))
    }
}

/// POST /api/v1/transfers
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransferRequest {
    /// Generated when absent; a client that wants safe retries must send one
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub from_account: u64,
    pub to_account: u64,
    pub amount: String,
    pub currency: String,
}

impl CreateTransferRequest {
    pub fn into_request(self, decimals: u32) -> Result<TransferRequest, ApiError> {
        let currency = Currency::new(&self.currency)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        let amount = money::parse_amount(&self.amount, decimals)
            .map_err(|e| ApiError::bad_request(format!("amount: {e}")))?;
        let key = self
            .idempotency_key
            .unwrap_or_else(|| ulid::Ulid::new().to_string());

        Ok(TransferRequest::new(
            key,
            AccountId::new(self.from_account),
            AccountId::new(self.to_account),
            amount,
            currency,
        ))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountData {
    pub account_id: u64,
    pub currency: String,
    pub balance: String,
}

impl AccountData {
    pub fn from_account(account: &Account, decimals: u32) -> Self {
        Self {
            account_id: account.id.get(),
            currency: account.currency.to_string(),
            balance: money::format_amount(account.balance, decimals),
        }
    }
}

/// Result of a completed transfer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransferData {
    pub idempotency_key: String,
    pub status: String,
    pub from_account: u64,
    pub to_account: u64,
    pub amount: String,
    pub currency: String,
    pub from_balance: String,
    pub to_balance: String,
    pub timestamp_ms: i64,
}

impl TransferData {
    pub fn from_result(result: &TransferResult, decimals: u32) -> Self {
        Self {
            idempotency_key: result.idempotency_key.clone(),
            status: result.status.to_string(),
            from_account: result.source.get(),
            to_account: result.destination.get(),
            amount: money::format_amount(result.amount, decimals),
            currency: result.currency.to_string(),
            from_balance: money::format_amount(result.source_balance, decimals),
            to_balance: money::format_amount(result.destination_balance, decimals),
            timestamp_ms: result.timestamp.timestamp_millis(),
        }
    }
}

/// One entry of an account's transfer history
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransferRecordData {
    pub idempotency_key: String,
    pub status: String,
    pub from_account: u64,
    pub to_account: u64,
    pub amount: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl TransferRecordData {
    pub fn from_record(record: &TransferRecord, decimals: u32) -> Self {
        Self {
            idempotency_key: record.idempotency_key.clone(),
            status: record.status.to_string(),
            from_account: record.request.source.get(),
            to_account: record.request.destination.get(),
            amount: money::format_amount(record.request.amount, decimals),
            currency: record.request.currency.to_string(),
            failure_reason: record.failure_reason.as_ref().map(|r| r.to_string()),
            created_at_ms: record.created_at.timestamp_millis(),
            updated_at_ms: record.updated_at.timestamp_millis(),
        }
    }
}
