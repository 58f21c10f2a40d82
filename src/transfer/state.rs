//! Transfer Status Definitions
//!
//! Status IDs are stored as SMALLINT-sized integers in the `transfers` table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a transfer record
///
/// ```text
/// PENDING → COMPLETED
///    ↓
///  FAILED
/// ```
///
/// Terminal: COMPLETED (10), FAILED (-10). A terminal record never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TransferStatus {
    /// Recorded under lock, outcome not yet confirmed
    Pending = 0,

    /// Terminal: both balances updated
    Completed = 10,

    /// Terminal: no balance changed
    Failed = -10,
}

impl TransferStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    /// Get the numeric status ID for storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from storage ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferStatus::Pending),
            10 => Some(TransferStatus::Completed),
            -10 => Some(TransferStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_ids() {
        assert_eq!(TransferStatus::from_id(10), Some(TransferStatus::Completed));
        assert_eq!(TransferStatus::from_id(-10), Some(TransferStatus::Failed));
        assert_eq!(TransferStatus::from_id(0), Some(TransferStatus::Pending));
        assert!(TransferStatus::from_id(40).is_none());
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(TransferStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(
            serde_json::to_string(&TransferStatus::Pending).unwrap(),
            "\"PENDING\""
        );
    }
}
