//! Transfer Engine
//!
//! Moves money between two accounts of the same currency, exactly once per
//! idempotency key.
//!
//! # Flow
//!
//! ```text
//! lookup(key) → validate → lock pair (ascending id) → record PENDING
//!     → funds check → debit source → credit destination → record COMPLETED
//!                  ↓             ↓                 ↓
//!               FAILED        FAILED      revert source → FAILED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Ordered locking**: two accounts are always locked lower id first
//! 2. **Record under lock**: PENDING is written before any balance changes and
//!    the outcome is written before the locks are released
//! 3. **Immutable outcomes**: a COMPLETED or FAILED record never changes; a
//!    retry replays it
//! 4. **No guessing**: a mutation that cannot be confirmed or reverted is
//!    reported as `IndeterminateOutcome`, never as success or failure

pub mod db;
pub mod engine;
pub mod error;
pub mod lock;
pub mod log;
#[cfg(test)]
pub(crate) mod mock;
pub mod state;
pub mod types;

pub use db::SqliteTransferLog;
pub use engine::TransferEngine;
pub use error::TransferError;
pub use lock::{LockHandle, LockManager};
pub use log::{InMemoryTransferLog, TransferLog};
pub use state::TransferStatus;
pub use types::{
    Balances, FailureReason, PendingEntry, TransferRecord, TransferRequest, TransferResult,
};
