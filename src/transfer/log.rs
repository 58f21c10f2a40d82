//! Transfer Log port and its in-memory backend
//!
//! One record per idempotency key. A record is inserted PENDING and can be
//! resolved exactly once, to COMPLETED or FAILED; afterwards it never changes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::TransferError;
use super::state::TransferStatus;
use super::types::{Balances, FailureReason, PendingEntry, TransferRecord, TransferRequest, now_millis};
use crate::core_types::AccountId;

/// Storage interface for transfer records
#[async_trait]
pub trait TransferLog: Send + Sync {
    /// Insert a PENDING record unless one already exists for the key.
    ///
    /// Must be atomic: of two concurrent calls with the same key, exactly one
    /// gets `PendingEntry::Created`.
    async fn record_pending(&self, request: &TransferRequest)
    -> Result<PendingEntry, TransferError>;

    /// Resolve a PENDING record as COMPLETED.
    async fn record_completed(
        &self,
        key: &str,
        balances: Balances,
    ) -> Result<TransferRecord, TransferError>;

    /// Resolve a PENDING record as FAILED.
    async fn record_failed(
        &self,
        key: &str,
        reason: FailureReason,
    ) -> Result<TransferRecord, TransferError>;

    /// Find the record for a key
    async fn lookup(&self, key: &str) -> Result<Option<TransferRecord>, TransferError>;

    /// All records touching `account`, oldest first
    async fn list_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<TransferRecord>, TransferError>;
}

#[derive(Default)]
struct LogInner {
    records: HashMap<String, TransferRecord>,
    /// Keys in insertion order
    order: Vec<String>,
}

/// Transfer log kept in process memory
///
/// Records live as long as the log; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryTransferLog {
    inner: Mutex<LogInner>,
}

impl InMemoryTransferLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LogInner>, TransferError> {
        self.inner
            .lock()
            .map_err(|_| TransferError::SystemError("transfer log lock poisoned".into()))
    }

    fn resolve(
        &self,
        key: &str,
        status: TransferStatus,
        balances: Option<Balances>,
        reason: Option<FailureReason>,
    ) -> Result<TransferRecord, TransferError> {
        let mut inner = self.lock()?;
        let record = inner.records.get_mut(key).ok_or_else(|| {
            TransferError::InvalidStateTransition(format!("no transfer recorded for '{key}'"))
        })?;

        if record.status.is_terminal() {
            return Err(TransferError::InvalidStateTransition(format!(
                "transfer '{key}' is already {}",
                record.status
            )));
        }

        record.status = status;
        record.balances = balances;
        record.failure_reason = reason;
        record.updated_at = now_millis();
        Ok(record.clone())
    }
}

#[async_trait]
impl TransferLog for InMemoryTransferLog {
    async fn record_pending(
        &self,
        request: &TransferRequest,
    ) -> Result<PendingEntry, TransferError> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.records.get(&request.idempotency_key) {
            return Ok(PendingEntry::Existing(existing.clone()));
        }

        let record = TransferRecord::pending(request.clone());
        inner.order.push(record.idempotency_key.clone());
        inner
            .records
            .insert(record.idempotency_key.clone(), record.clone());
        Ok(PendingEntry::Created(record))
    }

    async fn record_completed(
        &self,
        key: &str,
        balances: Balances,
    ) -> Result<TransferRecord, TransferError> {
        self.resolve(key, TransferStatus::Completed, Some(balances), None)
    }

    async fn record_failed(
        &self,
        key: &str,
        reason: FailureReason,
    ) -> Result<TransferRecord, TransferError> {
        self.resolve(key, TransferStatus::Failed, None, Some(reason))
    }

    async fn lookup(&self, key: &str) -> Result<Option<TransferRecord>, TransferError> {
        Ok(self.lock()?.records.get(key).cloned())
    }

    async fn list_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        let inner = self.lock()?;
        Ok(inner
            .order
            .iter()
            .filter_map(|key| inner.records.get(key))
            .filter(|record| record.request.involves(account))
            .cloned()
            .collect())
    }
}
