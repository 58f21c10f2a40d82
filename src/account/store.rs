//! Account Store port and its in-memory backend
//!
//! The store knows nothing about transfers. It offers reads and an atomic
//! conditional balance update; the transfer engine is the only writer.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::models::{Account, StoreError};
use crate::core_types::{AccountId, Amount, Currency};

/// Storage interface for account balances.
///
/// Implementations must make a successful `compare_and_swap_balance` visible
/// to every later `get` on the same account.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Open a new account with an initial balance.
    async fn open(&self, currency: Currency, initial_balance: Amount)
    -> Result<Account, StoreError>;

    /// Read the current state of an account.
    async fn get(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Set the balance to `new_balance` only if it currently equals `expected`.
    ///
    /// Returns `StoreError::Conflict` (and changes nothing) on mismatch.
    async fn compare_and_swap_balance(
        &self,
        id: AccountId,
        expected: Amount,
        new_balance: Amount,
    ) -> Result<(), StoreError>;
}

/// Account store backed by a concurrent map.
///
/// The conditional update runs under the map's entry lock, which makes it
/// atomic with respect to every other reader and writer of that account.
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
    next_id: AtomicU64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of open accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn open(
        &self,
        currency: Currency,
        initial_balance: Amount,
    ) -> Result<Account, StoreError> {
        let id = AccountId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let account = Account::new(id, initial_balance, currency);
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Account, StoreError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn compare_and_swap_balance(
        &self,
        id: AccountId,
        expected: Amount,
        new_balance: Amount,
    ) -> Result<(), StoreError> {
        let mut entry = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if entry.balance != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual: entry.balance,
            });
        }
        entry.balance = new_balance;
        Ok(())
    }
}
