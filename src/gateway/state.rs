use crate::db::Database;
use crate::transfer::TransferEngine;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    pub engine: TransferEngine,
    /// Present when the SQLite backend is in use (health check)
    pub db: Option<Database>,
    /// Decimal places of wire amounts
    pub amount_decimals: u32,
}

impl AppState {
    pub fn new(engine: TransferEngine, db: Option<Database>, amount_decimals: u32) -> Self {
        Self {
            engine,
            db,
            amount_decimals,
        }
    }
}
