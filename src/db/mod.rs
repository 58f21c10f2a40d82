//! Database connection management
//!
//! SQLite pool shared by the account store and the transfer log.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

const CREATE_ACCOUNTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        currency TEXT    NOT NULL,
        balance  INTEGER NOT NULL CHECK (balance >= 0)
    )
"#;

const CREATE_TRANSFERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS transfers (
        id                     INTEGER PRIMARY KEY AUTOINCREMENT,
        idempotency_key        TEXT    NOT NULL UNIQUE,
        source_account_id      INTEGER NOT NULL REFERENCES accounts(id),
        destination_account_id INTEGER NOT NULL REFERENCES accounts(id),
        amount                 INTEGER NOT NULL,
        currency               TEXT    NOT NULL,
        status                 INTEGER NOT NULL,
        failure_reason         TEXT,
        source_balance         INTEGER,
        destination_balance    INTEGER,
        created_at             INTEGER NOT NULL,
        updated_at             INTEGER NOT NULL
    )
"#;

const CREATE_TRANSFERS_SOURCE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_transfers_source \
     ON transfers(source_account_id)";

const CREATE_TRANSFERS_DESTINATION_INDEX: &str = "CREATE INDEX IF NOT EXISTS \
     idx_transfers_destination ON transfers(destination_account_id)";

/// SQLite database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool and make sure the schema exists.
    ///
    /// `sqlite::memory:` gives every connection its own database, so in-memory
    /// URLs are always opened with a single connection.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let options = if in_memory {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        };

        let pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
        // Closing the only connection would drop an in-memory database.
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };
        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.init_schema().await?;

        tracing::info!(url = %database_url, "SQLite connection pool established");
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in [
            CREATE_ACCOUNTS_TABLE,
            CREATE_TRANSFERS_TABLE,
            CREATE_TRANSFERS_SOURCE_INDEX,
            CREATE_TRANSFERS_DESTINATION_INDEX,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("SQLite schema ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_creates_schema() {
        let db = Database::connect("sqlite::memory:", 8).await.unwrap();
        db.health_check().await.unwrap();

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert!(tables.contains(&"accounts".to_string()));
        assert!(tables.contains(&"transfers".to_string()));
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.init_schema().await.unwrap();
        db.health_check().await.unwrap();
    }
}
