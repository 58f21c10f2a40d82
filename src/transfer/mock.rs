//! Store and log doubles with switchable failures

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::error::TransferError;
use super::log::{InMemoryTransferLog, TransferLog};
use super::types::{Balances, FailureReason, PendingEntry, TransferRecord, TransferRequest};
use crate::account::{Account, AccountStore, InMemoryAccountStore, StoreError};
use crate::core_types::{AccountId, Amount, Currency};

/// In-memory account store whose balance writes can be made to fail or stall
#[derive(Default)]
pub struct FlakyAccountStore {
    inner: InMemoryAccountStore,
    /// Every write to this account fails
    fail_account: Mutex<Option<AccountId>>,
    /// Writes after the first N fail
    fail_writes_after: Mutex<Option<usize>>,
    /// Next write to this account reports a concurrent change
    conflict_once: Mutex<Option<AccountId>>,
    write_delay: Mutex<Option<Duration>>,
    writes: AtomicUsize,
}

impl FlakyAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_account(&self, account: Option<AccountId>) {
        *self.fail_account.lock().unwrap() = account;
    }

    pub fn set_fail_writes_after(&self, writes: Option<usize>) {
        *self.fail_writes_after.lock().unwrap() = writes;
    }

    pub fn set_conflict_once(&self, account: Option<AccountId>) {
        *self.conflict_once.lock().unwrap() = account;
    }

    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock().unwrap() = delay;
    }

    /// Balance writes attempted so far, failed ones included
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for FlakyAccountStore {
    async fn open(
        &self,
        currency: Currency,
        initial_balance: Amount,
    ) -> Result<Account, StoreError> {
        self.inner.open(currency, initial_balance).await
    }

    async fn get(&self, id: AccountId) -> Result<Account, StoreError> {
        self.inner.get(id).await
    }

    async fn compare_and_swap_balance(
        &self,
        id: AccountId,
        expected: Amount,
        new_balance: Amount,
    ) -> Result<(), StoreError> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        let limit = *self.fail_writes_after.lock().unwrap();
        if limit.is_some_and(|n| attempt >= n) {
            return Err(StoreError::Database("injected write failure".into()));
        }
        let conflict = {
            let mut target = self.conflict_once.lock().unwrap();
            target.take_if(|account| *account == id)
        };
        if conflict.is_some() {
            let actual = self.inner.get(id).await?.balance;
            return Err(StoreError::Conflict {
                id,
                expected,
                actual,
            });
        }
        if *self.fail_account.lock().unwrap() == Some(id) {
            return Err(StoreError::Database(format!(
                "injected write failure on account {id}"
            )));
        }

        self.inner
            .compare_and_swap_balance(id, expected, new_balance)
            .await
    }
}

/// In-memory transfer log whose writes can be made to fail
#[derive(Default)]
pub struct FlakyTransferLog {
    inner: InMemoryTransferLog,
    fail_completed: AtomicBool,
    fail_failed: AtomicBool,
}

impl FlakyTransferLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_completed(&self, fail: bool) {
        self.fail_completed.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_failed(&self, fail: bool) {
        self.fail_failed.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransferLog for FlakyTransferLog {
    async fn record_pending(
        &self,
        request: &TransferRequest,
    ) -> Result<PendingEntry, TransferError> {
        self.inner.record_pending(request).await
    }

    async fn record_completed(
        &self,
        key: &str,
        balances: Balances,
    ) -> Result<TransferRecord, TransferError> {
        if self.fail_completed.load(Ordering::SeqCst) {
            return Err(TransferError::DatabaseError("injected log failure".into()));
        }
        self.inner.record_completed(key, balances).await
    }

    async fn record_failed(
        &self,
        key: &str,
        reason: FailureReason,
    ) -> Result<TransferRecord, TransferError> {
        if self.fail_failed.load(Ordering::SeqCst) {
            return Err(TransferError::DatabaseError("injected log failure".into()));
        }
        self.inner.record_failed(key, reason).await
    }

    async fn lookup(&self, key: &str) -> Result<Option<TransferRecord>, TransferError> {
        self.inner.lookup(key).await
    }

    async fn list_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        self.inner.list_by_account(account).await
    }
}
