//! Transfer Engine
//!
//! Executes transfers between two accounts: idempotency check, validation,
//! ordered locking, funds check, conditional balance updates and recording,
//! in that order.
//!
//! Once the account locks are held, the rest of the transfer runs on a
//! spawned task. A caller that gives up (timeout, disconnect) therefore never
//! leaves a transfer half-applied; the task finishes it and the result can be
//! fetched by sending the same request again.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::lock::LockManager;
use super::log::{InMemoryTransferLog, TransferLog};
use super::types::{
    Balances, FailureReason, PendingEntry, TransferRecord, TransferRequest, TransferResult,
};
use crate::account::{Account, AccountStore, InMemoryAccountStore, StoreError};
use crate::core_types::{AccountId, Amount, Currency};

/// Transfer Engine
///
/// Cheap to clone; clones share the store, the log and the locks.
#[derive(Clone)]
pub struct TransferEngine {
    accounts: Arc<dyn AccountStore>,
    log: Arc<dyn TransferLog>,
    locks: Arc<LockManager>,
}

impl TransferEngine {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        log: Arc<dyn TransferLog>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            log,
            locks: Arc::new(LockManager::new(lock_timeout)),
        }
    }

    /// Engine over in-memory store and log
    pub fn in_memory(lock_timeout: Duration) -> Self {
        Self::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryTransferLog::new()),
            lock_timeout,
        )
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    /// Move `request.amount` from `request.source` to `request.destination`.
    ///
    /// Sending the same request again (same idempotency key) returns the
    /// recorded outcome without touching any balance.
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferResult, TransferError> {
        if let Some(record) = self.log.lookup(&request.idempotency_key).await? {
            if let Some(outcome) = replay(&record, &request) {
                return outcome;
            }
        }

        request.validate()?;
        let source = self.accounts.get(request.source).await?;
        let destination = self.accounts.get(request.destination).await?;
        check_currency(&source, &request.currency)?;
        check_currency(&destination, &request.currency)?;

        let handle = self
            .locks
            .acquire_pair(request.source, request.destination)
            .await?;

        let key = request.idempotency_key.clone();
        let engine = self.clone();
        let task = tokio::spawn(async move {
            let outcome = engine.execute_locked(&request).await;
            engine.locks.release(handle);
            outcome
        });

        task.await.unwrap_or_else(|e| {
            error!(key = %key, error = %e, "Transfer task aborted");
            Err(TransferError::IndeterminateOutcome(key))
        })
    }

    /// Runs with both account locks held.
    async fn execute_locked(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferResult, TransferError> {
        let key = request.idempotency_key.as_str();

        if let PendingEntry::Existing(record) = self.log.record_pending(request).await? {
            return replay(&record, request).unwrap_or_else(|| {
                error!(key, "Earlier attempt left transfer PENDING");
                Err(TransferError::IndeterminateOutcome(key.to_string()))
            });
        }

        let (source, destination) = match self.read_pair(request).await {
            Ok(pair) => pair,
            Err(e) => {
                return self
                    .fail(key, FailureReason::StoreUnavailable {
                        message: e.to_string(),
                    })
                    .await;
            }
        };

        if !source.can_debit(request.amount) {
            return self
                .fail(key, FailureReason::InsufficientFunds {
                    account_id: source.id,
                    available: source.balance,
                    requested: request.amount,
                })
                .await;
        }
        let new_source = source.balance - request.amount;
        let Some(new_destination) = destination.balance.checked_add(request.amount) else {
            return self
                .fail(key, FailureReason::BalanceOverflow {
                    account_id: destination.id,
                })
                .await;
        };

        if let Err(e) = self
            .accounts
            .compare_and_swap_balance(source.id, source.balance, new_source)
            .await
        {
            return self.fail(key, failure_reason(e)).await;
        }

        if let Err(e) = self
            .accounts
            .compare_and_swap_balance(destination.id, destination.balance, new_destination)
            .await
        {
            warn!(key, account = %destination.id, error = %e, "Destination update failed, reverting source");
            return match self
                .compensate(source.id, new_source, source.balance)
                .await
            {
                Ok(()) => self.fail(key, failure_reason(e)).await,
                Err(comp) => {
                    error!(
                        key,
                        account = %source.id,
                        debited = request.amount,
                        error = %comp,
                        "Source compensation failed; transfer left PENDING"
                    );
                    Err(TransferError::IndeterminateOutcome(key.to_string()))
                }
            };
        }

        let balances = Balances {
            source: new_source,
            destination: new_destination,
        };
        let record = self
            .log
            .record_completed(key, balances)
            .await
            .map_err(|e| {
                error!(key, error = %e, "Balances updated but completion not recorded");
                TransferError::IndeterminateOutcome(key.to_string())
            })?;

        info!(
            key,
            source = %request.source,
            destination = %request.destination,
            amount = request.amount,
            "Transfer completed"
        );
        record.outcome().unwrap_or_else(|| {
            Err(TransferError::SystemError(format!(
                "transfer '{key}' recorded without outcome"
            )))
        })
    }

    async fn read_pair(
        &self,
        request: &TransferRequest,
    ) -> Result<(Account, Account), TransferError> {
        let source = self.accounts.get(request.source).await?;
        let destination = self.accounts.get(request.destination).await?;
        Ok((source, destination))
    }

    async fn compensate(
        &self,
        account: AccountId,
        current: Amount,
        restore: Amount,
    ) -> Result<(), StoreError> {
        self.accounts
            .compare_and_swap_balance(account, current, restore)
            .await?;
        debug!(account = %account, balance = restore, "Source balance restored");
        Ok(())
    }

    /// Record a failure that changed no balance and return its error.
    async fn fail(
        &self,
        key: &str,
        reason: FailureReason,
    ) -> Result<TransferResult, TransferError> {
        let err = reason.to_error();
        match &reason {
            FailureReason::InsufficientFunds { .. } => info!(key, reason = %reason, "Transfer rejected"),
            _ => warn!(key, reason = %reason, "Transfer failed"),
        }

        // No balance moved, so the error stands even if the log write fails.
        if let Err(e) = self.log.record_failed(key, reason).await {
            error!(key, error = %e, "Failure not recorded; transfer stays PENDING");
        }
        Err(err)
    }

    /// Open an account holding `initial_balance` minor units of `currency`.
    pub async fn open_account(
        &self,
        currency: Currency,
        initial_balance: Amount,
    ) -> Result<Account, TransferError> {
        let account = self.accounts.open(currency, initial_balance).await?;
        info!(account = %account.id, currency = %account.currency, balance = account.balance, "Account opened");
        Ok(account)
    }

    /// Balance inquiry. Waits for any transfer on the account to finish.
    pub async fn account(&self, id: AccountId) -> Result<Account, TransferError> {
        let handle = self.locks.acquire(id).await?;
        let account = self.accounts.get(id).await;
        self.locks.release(handle);
        Ok(account?)
    }

    /// Transfer history of an account, oldest first
    pub async fn transfers(&self, id: AccountId) -> Result<Vec<TransferRecord>, TransferError> {
        self.accounts.get(id).await?;
        self.log.list_by_account(id).await
    }
}

/// Outcome of an existing record for `request`, `None` while still PENDING.
fn replay(
    record: &TransferRecord,
    request: &TransferRequest,
) -> Option<Result<TransferResult, TransferError>> {
    if record.request != *request {
        warn!(key = %request.idempotency_key, "Idempotency key reused for a different transfer");
        return Some(Err(TransferError::DuplicateRequest(
            request.idempotency_key.clone(),
        )));
    }

    let outcome = record.outcome()?;
    debug!(key = %request.idempotency_key, status = %record.status, "Replaying recorded transfer");
    Some(outcome)
}

fn check_currency(account: &Account, currency: &Currency) -> Result<(), TransferError> {
    if account.currency != *currency {
        return Err(TransferError::CurrencyMismatch {
            account_id: account.id,
            expected: account.currency.clone(),
            actual: currency.clone(),
        });
    }
    Ok(())
}

fn failure_reason(e: StoreError) -> FailureReason {
    match e {
        StoreError::Conflict { id, .. } => FailureReason::BalanceConflict { account_id: id },
        StoreError::InvalidBalance(id) => FailureReason::BalanceOverflow { account_id: id },
        other => FailureReason::StoreUnavailable {
            message: other.to_string(),
        },
    }
}
