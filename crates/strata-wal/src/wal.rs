use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::WalResult;
use crate::record::WalRecord;

/// Flush/sync strategy for the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append. The append is only reported successful
    /// once the record is on stable storage; this is the mode the write
    /// path's durability guarantee depends on.
    #[default]
    EveryWrite,
    /// Flush to the OS page cache only. Weakens crash safety; intended
    /// for bulk loads and tests.
    Buffered,
}

/// Configuration for the write-ahead log.
#[derive(Clone, Copy, Debug, Default)]
pub struct WalConfig {
    /// Sync/flush strategy.
    pub sync_mode: SyncMode,
}

/// Crash-recoverable, append-only mutation log.
///
/// Records are framed one per line (see [`WalRecord::to_line`]) and
/// appended under a mutex. On recovery the file is read front-to-back;
/// lines that fail to parse or fail their CRC check are skipped with a
/// warning; they represent torn writes from a crash.
pub struct WriteAheadLog {
    /// Path to the log file.
    path: PathBuf,
    /// Writer state behind a mutex for thread safety.
    writer: Mutex<BufWriter<File>>,
    /// Configuration.
    config: WalConfig,
}

impl WriteAheadLog {
    /// Open (or create) the log file at the given path.
    pub fn open(path: &Path, config: WalConfig) -> WalResult<Self> {
        // Ensure parent directory exists.
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
            config,
        })
    }

    /// Append a single record.
    ///
    /// Returns only after the record has reached stable storage (under
    /// [`SyncMode::EveryWrite`]); a successful return is the durability
    /// point for the mutation the record describes.
    pub fn append(&self, record: &WalRecord) -> WalResult<()> {
        let line = record.to_line()?;

        let mut w = self.writer.lock().expect("WAL mutex poisoned");
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
        w.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            w.get_ref().sync_all()?;
        }

        debug!(
            timestamp = record.timestamp.as_nanos(),
            kind = %record.kind,
            key = %record.key,
            "WAL append"
        );
        Ok(())
    }

    /// Replay all recoverable records in append order.
    ///
    /// Lines that fail parsing or CRC validation are logged and skipped;
    /// recovery never aborts on a torn tail.
    pub fn replay(&self) -> WalResult<Vec<WalRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match WalRecord::from_line(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping unrecoverable WAL line");
                    skipped += 1;
                }
            }
        }

        info!(
            recovered = records.len(),
            skipped,
            path = %self.path.display(),
            "WAL replay complete"
        );
        Ok(records)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}
