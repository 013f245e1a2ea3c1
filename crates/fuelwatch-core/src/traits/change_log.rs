// # Change Log Trait
//
// Defines the interface for the append-only change log.
//
// ## Purpose
//
// The change log is the only durable state of the system. Every detected
// change is appended as one row, and the last-known state per station is
// rebuilt on startup by replaying the rows in file order.
//
// ## Implementations
//
// - File-based: semicolon-delimited rows (`changelog::file`)
// - In-memory: tests and ephemeral runs (`changelog::memory`)
//
// ## Usage
//
// ```rust,ignore
// use fuelwatch_core::traits::{ChangeLog, ChangeRecord};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let log = /* ChangeLog implementation */;
//
//     // Rebuild state
//     let rows = log.replay().await?;
//
//     // Record a change
//     log.append(&ChangeRecord::new(now, "1 rue A", true)).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Timestamp layout of the change log's first column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted availability change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// When the availability was observed
    pub timestamp: NaiveDateTime,
    /// Station address
    pub address: String,
    /// Whether the monitored fuel is available
    pub available: bool,
}

impl ChangeRecord {
    /// Create a new change record
    pub fn new(timestamp: NaiveDateTime, address: impl Into<String>, available: bool) -> Self {
        Self {
            timestamp,
            address: address.into(),
            available,
        }
    }

    /// First column, formatted as `YYYY-MM-DD HH:MM:SS`
    pub fn timestamp_field(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Third column, the literal `True` or `False`
    pub fn availability_field(&self) -> &'static str {
        if self.available { "True" } else { "False" }
    }
}

/// Parse the timestamp column
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

/// Parse the availability column
pub fn parse_availability(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

/// Trait for change log implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Drop a torn trailing row left by a crash mid-write
///
/// ## Forbidden Capabilities
/// - ❌ Rewrite or reorder complete rows (file order is chronological order)
/// - ❌ Decide what counts as a change (owned by the reconciler)
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Read every well-formed row, in file order
    ///
    /// Malformed rows and a torn trailing row are skipped. A log that does
    /// not exist yet yields no rows.
    async fn replay(&self) -> Result<Vec<ChangeRecord>, crate::Error>;

    /// Durably append one row
    ///
    /// Returns only after the row is complete and flushed.
    async fn append(&self, record: &ChangeRecord) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn fields_use_log_layout() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let record = ChangeRecord::new(ts, "X", true);
        assert_eq!(record.timestamp_field(), "2024-01-01 10:00:00");
        assert_eq!(record.availability_field(), "True");
        assert_eq!(ChangeRecord::new(ts, "X", false).availability_field(), "False");
    }

    #[test]
    fn parsers_reject_partial_values() {
        assert!(parse_timestamp("2024-01-01 10:00:00").is_some());
        assert!(parse_timestamp("2024-01-01 10:0").is_none());
        assert_eq!(parse_availability("True"), Some(true));
        assert_eq!(parse_availability("False"), Some(false));
        assert_eq!(parse_availability("Tr"), None);
        assert_eq!(parse_availability("true"), None);
    }
}
