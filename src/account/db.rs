//! SQLite-backed Account Store
//!
//! The conditional update is a single `UPDATE ... WHERE balance = ?`, so the
//! check and the write are one statement for the database.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::models::{Account, StoreError};
use super::store::AccountStore;
use crate::core_types::{AccountId, Amount, Currency};
use crate::db::Database;

/// Account store over the `accounts` table
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

// SQLite integers are i64; balances and ids are u64 in the ledger.
fn to_sql(id: AccountId, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidBalance(id))
}

// An id past i64::MAX was never handed out by SQLite.
fn id_to_sql(id: AccountId) -> Result<i64, StoreError> {
    i64::try_from(id.get()).map_err(|_| StoreError::NotFound(id))
}

fn from_sql(id: AccountId, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::InvalidBalance(id))
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn open(
        &self,
        currency: Currency,
        initial_balance: Amount,
    ) -> Result<Account, StoreError> {
        let balance = i64::try_from(initial_balance)
            .map_err(|_| StoreError::InvalidBalance(AccountId::new(0)))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (currency, balance) VALUES (?, ?) RETURNING id",
        )
        .bind(currency.as_str())
        .bind(balance)
        .fetch_one(&self.pool)
        .await?;

        let id = AccountId::new(id as u64);
        tracing::debug!(
            account_id = %id,
            currency = %currency,
            balance = initial_balance,
            "Account opened"
        );
        Ok(Account::new(id, initial_balance, currency))
    }

    async fn get(&self, id: AccountId) -> Result<Account, StoreError> {
        let row = sqlx::query("SELECT id, currency, balance FROM accounts WHERE id = ?")
            .bind(id_to_sql(id)?)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let currency: String = row.try_get("currency")?;
        let currency = Currency::new(&currency)
            .map_err(|e| StoreError::Database(format!("account {id}: {e}")))?;
        let balance = from_sql(id, row.try_get("balance")?)?;

        Ok(Account::new(id, balance, currency))
    }

    async fn compare_and_swap_balance(
        &self,
        id: AccountId,
        expected: Amount,
        new_balance: Amount,
    ) -> Result<(), StoreError> {
        let sql_id = id_to_sql(id)?;
        let result = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ? AND balance = ?")
            .bind(to_sql(id, new_balance)?)
            .bind(sql_id)
            .bind(to_sql(id, expected)?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing updated: either the account is gone or the balance moved.
        let current = self.get(id).await?;
        Err(StoreError::Conflict {
            id,
            expected,
            actual: current.balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteAccountStore {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        SqliteAccountStore::new(&db)
    }

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    #[tokio::test]
    async fn test_open_and_get() {
        let store = store().await;
        let opened = store.open(usd(), 5_000).await.unwrap();

        let fetched = store.get(opened.id).await.unwrap();
        assert_eq!(fetched, opened);
        assert_eq!(fetched.balance, 5_000);
        assert_eq!(fetched.currency, usd());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = store().await;
        assert_eq!(
            store.get(AccountId::new(404)).await,
            Err(StoreError::NotFound(AccountId::new(404)))
        );
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = store().await;
        let account = store.open(usd(), 100).await.unwrap();

        store
            .compare_and_swap_balance(account.id, 100, 40)
            .await
            .unwrap();
        assert_eq!(store.get(account.id).await.unwrap().balance, 40);

        let err = store
            .compare_and_swap_balance(account.id, 100, 0)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                id: account.id,
                expected: 100,
                actual: 40
            }
        );
    }

    #[tokio::test]
    async fn test_compare_and_swap_missing_account() {
        let store = store().await;
        let err = store
            .compare_and_swap_balance(AccountId::new(3), 0, 1)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(AccountId::new(3)));
    }

    #[tokio::test]
    async fn test_id_beyond_i64_is_not_found() {
        let store = store().await;
        let id = AccountId::new(u64::MAX);
        assert_eq!(store.get(id).await, Err(StoreError::NotFound(id)));
        assert_eq!(
            store.compare_and_swap_balance(id, 0, 1).await,
            Err(StoreError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn test_rejects_balance_beyond_i64() {
        let store = store().await;
        let account = store.open(usd(), 1).await.unwrap();
        let err = store
            .compare_and_swap_balance(account.id, 1, u64::MAX)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidBalance(account.id));
    }
}
