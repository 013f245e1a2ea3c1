// # File Change Log
//
// File-based implementation of ChangeLog with crash recovery.
//
// ## Purpose
//
// Provides the durable, append-only record of every availability change.
// The last known state of each station is rebuilt from it on restart.
//
// ## Crash Recovery
//
// - One write per row: each row is encoded up front and written with a
//   single `write_all`, then flushed and synced
// - Torn rows: bytes after the last newline are a crashed write; replay skips
//   them and cuts them off so the next row starts on a clean line
// - Failed writes: the file is truncated back to its length before the write
// - Malformed rows: each line is decoded on its own and a bad one is skipped
//   with a warning, never fatal
//
// ## File Format
//
// ```text
// 2024-01-01 10:00:00;12 Rue de la Paix;True
// 2024-01-01 11:42:07;"Route de Lyon; Zone Nord";False
// ```
//
// Semicolon-delimited, newline-terminated, no header. Fields containing the
// delimiter or a quote are quoted CSV-style.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::Error;
use crate::traits::change_log::{parse_availability, parse_timestamp, ChangeLog, ChangeRecord};

const DELIMITER: u8 = b';';

/// File-based change log with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use fuelwatch_core::changelog::FileChangeLog;
/// use fuelwatch_core::traits::{ChangeLog, ChangeRecord};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let log = FileChangeLog::new("data/75001_e10_gas_availability_log.csv").await?;
///
///     let now = chrono::Local::now().naive_local();
///     log.append(&ChangeRecord::new(now, "12 Rue de la Paix", true)).await?;
///
///     let rows = log.replay().await?;
///     assert!(!rows.is_empty());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileChangeLog {
    path: PathBuf,
    file: Mutex<Option<fs::File>>,
    /// A partial row could not be rolled back; the next row starts a new line
    unterminated: AtomicBool,
}

impl FileChangeLog {
    /// Create a change log at `path`
    ///
    /// Creates parent directories if needed. The file itself is only created
    /// by the first append.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create data directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            path,
            file: Mutex::new(None),
            unterminated: AtomicBool::new(false),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_for_append(&self) -> Result<fs::File, Error> {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::change_log(format!(
                    "Failed to open change log {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    /// Cut the file back to `len` bytes
    async fn truncate(&self, len: u64) -> Result<(), Error> {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::change_log(format!(
                    "Failed to open change log {} for truncation: {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.set_len(len).await.map_err(|e| {
            Error::change_log(format!(
                "Failed to truncate change log {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.sync_all().await?;
        Ok(())
    }
}

/// Encode one row, terminator included
///
/// Addresses containing a line break are rejected so that every row stays on
/// exactly one line.
pub fn encode(record: &ChangeRecord) -> Result<Vec<u8>, Error> {
    if record.address.contains(['\n', '\r']) {
        return Err(Error::change_log(format!(
            "Refusing to encode address with a line break: {:?}",
            record.address
        )));
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let timestamp = record.timestamp_field();
    writer
        .write_record([
            timestamp.as_str(),
            record.address.as_str(),
            record.availability_field(),
        ])
        .map_err(|e| Error::change_log(format!("Failed to encode change record: {}", e)))?;

    writer
        .into_inner()
        .map_err(|e| Error::change_log(format!("Failed to encode change record: {}", e)))
}

/// Decode one line into a record
fn decode_line(line: &[u8]) -> Result<Option<ChangeRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(DELIMITER)
        .flexible(true)
        .from_reader(line);

    let mut row = csv::StringRecord::new();
    match reader.read_record(&mut row) {
        Ok(false) => return Ok(None),
        Ok(true) => {}
        Err(e) => return Err(e.to_string()),
    }

    if row.len() == 1 && row[0].trim().is_empty() {
        return Ok(None);
    }

    // An unclosed quote swallows the rest of the line into one field
    let trailing = reader.read_record(&mut csv::StringRecord::new());
    if !matches!(trailing, Ok(false)) {
        return Err(format!("{:?}", row));
    }

    if row.len() != 3 || row[1].is_empty() {
        return Err(format!("{:?}", row));
    }

    parse_timestamp(&row[0])
        .zip(parse_availability(&row[2]))
        .map(|(timestamp, available)| Some(ChangeRecord::new(timestamp, &row[1], available)))
        .ok_or_else(|| format!("{:?}", row))
}

/// Decode complete rows, returning the records and the number of rows skipped
///
/// Each line is decoded on its own, so a damaged row never affects the rows
/// after it.
pub fn decode(bytes: &[u8]) -> (Vec<ChangeRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0;

    for (index, line) in bytes.split(|&b| b == b'\n').enumerate() {
        match decode_line(line) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(row) => {
                tracing::warn!("Skipping malformed change log row {}: {}", index + 1, row);
                skipped += 1;
            }
        }
    }

    (records, skipped)
}

#[async_trait]
impl ChangeLog for FileChangeLog {
    async fn replay(&self) -> Result<Vec<ChangeRecord>, Error> {
        if !self.path.exists() {
            tracing::debug!("Change log does not exist yet: {}", self.path.display());
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path).await.map_err(|e| {
            Error::change_log(format!(
                "Failed to read change log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let complete = bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |last| last + 1);

        if complete < bytes.len() {
            tracing::warn!(
                "Change log {} ends with a torn row ({} bytes), dropping it",
                self.path.display(),
                bytes.len() - complete
            );
            self.truncate(complete as u64).await?;
        }

        let (records, skipped) = decode(&bytes[..complete]);
        if skipped > 0 {
            tracing::warn!(
                "Skipped {} malformed row(s) in {}",
                skipped,
                self.path.display()
            );
        }

        tracing::debug!(
            "Replayed {} row(s) from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    async fn append(&self, record: &ChangeRecord) -> Result<(), Error> {
        let mut row = encode(record)?;

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_for_append().await?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(Error::change_log("Change log handle unavailable"));
        };

        let len_before = file.metadata().await?.len();
        let unterminated = self.unterminated.load(Ordering::Relaxed);
        if unterminated {
            row.insert(0, b'\n');
        }

        let written = async {
            file.write_all(&row).await?;
            file.flush().await?;
            file.sync_data().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = written {
            // Reopen on the next attempt, without the partial row
            *guard = None;
            if let Err(rollback) = self.truncate(len_before).await {
                tracing::error!("Failed to roll back partial change log row: {}", rollback);
                self.unterminated.store(true, Ordering::Relaxed);
            }
            return Err(Error::change_log(format!(
                "Failed to append to change log {}: {}",
                self.path.display(),
                e
            )));
        }

        if unterminated {
            self.unterminated.store(false, Ordering::Relaxed);
        }
        tracing::trace!("Appended change for {} to {}", record.address, self.path.display());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let mut guard = self.file.lock().await;
        if let Some(file) = guard.as_mut() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}
