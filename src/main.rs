//! Money Transfer - HTTP service entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌─────────────────┐
//! │  Config  │───▶│ Gateway  │───▶│ Transfer     │───▶│ AccountStore +  │
//! │  (YAML)  │    │ (axum)   │    │ Engine       │    │ TransferLog     │
//! └──────────┘    └──────────┘    │ (ordered     │    │ (memory/SQLite) │
//!                                 │  locks)      │    └─────────────────┘
//!                                 └──────────────┘
//! ```
//!
//! Usage: `money_transfer [--env dev] [--port 8080]`

use std::sync::Arc;

use money_transfer::account::{AccountStore, InMemoryAccountStore, SqliteAccountStore};
use money_transfer::config::{AppConfig, StorageBackend};
use money_transfer::db::Database;
use money_transfer::gateway::{self, state::AppState};
use money_transfer::transfer::{
    InMemoryTransferLog, SqliteTransferLog, TransferEngine, TransferLog,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

type Backends = (Arc<dyn AccountStore>, Arc<dyn TransferLog>, Option<Database>);

async fn open_backends(config: &AppConfig) -> anyhow::Result<Backends> {
    match config.storage.backend {
        StorageBackend::Memory => Ok((
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryTransferLog::new()),
            None,
        )),
        StorageBackend::Sqlite => {
            let db = Database::connect(
                &config.storage.database_url,
                config.storage.max_connections,
            )
            .await?;
            Ok((
                Arc::new(SqliteAccountStore::new(&db)),
                Arc::new(SqliteTransferLog::new(&db)),
                Some(db),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = money_transfer::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        version = env!("GIT_HASH"),
        backend = ?app_config.storage.backend,
        "Starting money transfer service"
    );

    let (accounts, log, db) = open_backends(&app_config).await?;
    let engine = TransferEngine::new(accounts, log, app_config.engine.lock_timeout());
    let state = Arc::new(AppState::new(
        engine,
        db,
        app_config.engine.amount_decimals,
    ));

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, state).await
}
