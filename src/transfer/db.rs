//! Transfer Database Layer
//!
//! SQLite persistence for transfer records. Status changes are conditional
//! updates (`WHERE status = PENDING`), so a resolved record can never be
//! overwritten, and records survive restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::error::TransferError;
use super::log::TransferLog;
use super::state::TransferStatus;
use super::types::{
    Balances, FailureReason, PendingEntry, TransferRecord, TransferRequest, now_millis,
};
use crate::core_types::{AccountId, Currency};
use crate::db::Database;

const SELECT_COLUMNS: &str = r#"
    SELECT idempotency_key, source_account_id, destination_account_id, amount, currency,
           status, failure_reason, source_balance, destination_balance, created_at, updated_at
    FROM transfers
"#;

/// Transfer log over the `transfers` table
pub struct SqliteTransferLog {
    pool: SqlitePool,
}

impl SqliteTransferLog {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn update_if_pending(
        &self,
        key: &str,
        status: TransferStatus,
        balances: Option<Balances>,
        reason: Option<&FailureReason>,
    ) -> Result<TransferRecord, TransferError> {
        let reason_json = reason.map(serde_json::to_string).transpose()?;
        let (source_balance, destination_balance) = match balances {
            Some(b) => (Some(to_i64(b.source)?), Some(to_i64(b.destination)?)),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET status = ?, failure_reason = ?, source_balance = ?, destination_balance = ?,
                updated_at = ?
            WHERE idempotency_key = ? AND status = ?
            "#,
        )
        .bind(status.id())
        .bind(reason_json)
        .bind(source_balance)
        .bind(destination_balance)
        .bind(now_millis().timestamp_millis())
        .bind(key)
        .bind(TransferStatus::Pending.id())
        .execute(&self.pool)
        .await?;

        let current = self.lookup(key).await?;
        match current {
            Some(record) if result.rows_affected() > 0 => Ok(record),
            Some(record) => Err(TransferError::InvalidStateTransition(format!(
                "transfer '{key}' is already {}",
                record.status
            ))),
            None => Err(TransferError::InvalidStateTransition(format!(
                "no transfer recorded for '{key}'"
            ))),
        }
    }
}

fn to_i64(value: u64) -> Result<i64, TransferError> {
    i64::try_from(value)
        .map_err(|_| TransferError::DatabaseError(format!("value {value} exceeds INTEGER range")))
}

fn to_u64(value: i64, column: &str) -> Result<u64, TransferError> {
    u64::try_from(value)
        .map_err(|_| TransferError::DatabaseError(format!("negative value in column '{column}'")))
}

fn to_timestamp(millis: i64) -> Result<DateTime<Utc>, TransferError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| TransferError::DatabaseError(format!("invalid timestamp {millis}")))
}

fn row_to_record(row: &SqliteRow) -> Result<TransferRecord, TransferError> {
    let status: i16 = row.try_get("status")?;
    let status = TransferStatus::from_id(status)
        .ok_or_else(|| TransferError::DatabaseError(format!("unknown transfer status {status}")))?;

    let currency: String = row.try_get("currency")?;
    let request = TransferRequest {
        idempotency_key: row.try_get("idempotency_key")?,
        source: AccountId::new(to_u64(row.try_get("source_account_id")?, "source_account_id")?),
        destination: AccountId::new(to_u64(
            row.try_get("destination_account_id")?,
            "destination_account_id",
        )?),
        amount: to_u64(row.try_get("amount")?, "amount")?,
        currency: Currency::new(&currency)?,
    };

    let failure_reason = row
        .try_get::<Option<String>, _>("failure_reason")?
        .map(|json| serde_json::from_str::<FailureReason>(&json))
        .transpose()?;

    let source_balance: Option<i64> = row.try_get("source_balance")?;
    let destination_balance: Option<i64> = row.try_get("destination_balance")?;
    let balances = match (source_balance, destination_balance) {
        (Some(source), Some(destination)) => Some(Balances {
            source: to_u64(source, "source_balance")?,
            destination: to_u64(destination, "destination_balance")?,
        }),
        _ => None,
    };

    Ok(TransferRecord {
        idempotency_key: request.idempotency_key.clone(),
        request,
        status,
        failure_reason,
        balances,
        created_at: to_timestamp(row.try_get("created_at")?)?,
        updated_at: to_timestamp(row.try_get("updated_at")?)?,
    })
}

#[async_trait]
impl TransferLog for SqliteTransferLog {
    async fn record_pending(
        &self,
        request: &TransferRequest,
    ) -> Result<PendingEntry, TransferError> {
        let record = TransferRecord::pending(request.clone());
        let now = record.created_at.timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO transfers
                (idempotency_key, source_account_id, destination_account_id, amount, currency,
                 status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(idempotency_key) DO NOTHING
            "#,
        )
        .bind(&request.idempotency_key)
        .bind(to_i64(request.source.get())?)
        .bind(to_i64(request.destination.get())?)
        .bind(to_i64(request.amount)?)
        .bind(request.currency.as_str())
        .bind(TransferStatus::Pending.id())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(PendingEntry::Created(record));
        }

        match self.lookup(&request.idempotency_key).await? {
            Some(existing) => {
                tracing::debug!(key = %request.idempotency_key, status = %existing.status, "Transfer key already recorded");
                Ok(PendingEntry::Existing(existing))
            }
            None => Err(TransferError::DatabaseError(format!(
                "insert of '{}' ignored but no record found",
                request.idempotency_key
            ))),
        }
    }

    async fn record_completed(
        &self,
        key: &str,
        balances: Balances,
    ) -> Result<TransferRecord, TransferError> {
        self.update_if_pending(key, TransferStatus::Completed, Some(balances), None)
            .await
    }

    async fn record_failed(
        &self,
        key: &str,
        reason: FailureReason,
    ) -> Result<TransferRecord, TransferError> {
        self.update_if_pending(key, TransferStatus::Failed, None, Some(&reason))
            .await
    }

    async fn lookup(&self, key: &str) -> Result<Option<TransferRecord>, TransferError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE idempotency_key = ?"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        let id = to_i64(account.get())?;
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE source_account_id = ? OR destination_account_id = ? ORDER BY id"
        ))
        .bind(id)
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
