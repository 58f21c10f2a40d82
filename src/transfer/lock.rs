//! Lock Manager
//!
//! Per-account mutual exclusion. A caller that needs two accounts always
//! takes them in ascending [`AccountId`] order, so two transfers over the same
//! pair (in either direction) can never wait on each other in a cycle.
//!
//! Every acquisition is bounded: past the deadline the caller gets
//! [`TransferError::Busy`] and holds nothing.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::error::TransferError;
use crate::core_types::AccountId;

/// Held account locks. Dropping the handle releases them.
#[must_use = "locks are released as soon as the handle is dropped"]
pub struct LockHandle {
    accounts: Vec<AccountId>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockHandle {
    /// Locked accounts, in the order they were acquired
    pub fn accounts(&self) -> &[AccountId] {
        &self.accounts
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("accounts", &self.accounts)
            .finish()
    }
}

/// Grants per-account locks with a global acquisition order
pub struct LockManager {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Lock a single account (balance inquiry, history).
    pub async fn acquire(&self, account: AccountId) -> Result<LockHandle, TransferError> {
        let deadline = Instant::now() + self.timeout;
        let guard = self.lock_before(account, deadline).await?;
        Ok(LockHandle {
            accounts: vec![account],
            _guards: vec![guard],
        })
    }

    /// Lock two accounts, lower ID first.
    ///
    /// Both acquisitions share one deadline. If the second lock times out the
    /// first is released before returning.
    pub async fn acquire_pair(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> Result<LockHandle, TransferError> {
        if a == b {
            return self.acquire(a).await;
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let deadline = Instant::now() + self.timeout;

        let first_guard = self.lock_before(first, deadline).await?;
        let second_guard = self.lock_before(second, deadline).await?;

        debug!(first = %first, second = %second, "Account pair locked");
        Ok(LockHandle {
            accounts: vec![first, second],
            _guards: vec![first_guard, second_guard],
        })
    }

    /// Release a handle explicitly. Equivalent to dropping it.
    pub fn release(&self, handle: LockHandle) {
        debug!(accounts = ?handle.accounts, "Account locks released");
        drop(handle);
    }

    /// Whether some caller currently holds `account`
    pub fn is_locked(&self, account: AccountId) -> bool {
        self.locks
            .get(&account)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    async fn lock_before(
        &self,
        account: AccountId,
        deadline: Instant,
    ) -> Result<OwnedMutexGuard<()>, TransferError> {
        // Clone the Arc out so no map shard stays locked across the await.
        let lock = Arc::clone(
            self.locks
                .entry(account)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        timeout_at(deadline, lock.lock_owned()).await.map_err(|_| {
            let waited_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(account = %account, waited_ms, "Account lock wait timed out");
            TransferError::Busy(waited_ms)
        })
    }
}
