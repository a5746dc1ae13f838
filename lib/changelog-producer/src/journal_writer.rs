//! C4: append-only writer to the current CHANGELOG file; rollover; HTIME
//! index maintenance (spec.md §4.4).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Datelike, Utc};
use snafu::ResultExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use changelog_core::{header, ChangelogConfig, Encoding};

use crate::error::{CreateDirSnafu, JournalWriterError, OpenSnafu, RenameSnafu, WriteSnafu};
use crate::events::RolloverEvents;
use crate::htime::HtimeIndex;

const ACTIVE_FILE_NAME: &str = "CHANGELOG";

/// Operations the writer accepts, in the order they must land on disk.
/// `Fsync` is a first-class operation rather than a raw syscall issued from
/// a timer task, because `changelog-helpers.c` posts fsync as a synthetic
/// record through the same per-fop pipeline the recorder uses (SPEC_FULL.md
/// §6) — ordering it here against `Append`/`Rollover` preserves that.
pub enum JournalOp {
    Append(Vec<u8>),
    Fsync,
    Rollover { ts: i64 },
}

pub struct JournalWriter {
    dir: PathBuf,
    encoding: Encoding,
    file: Mutex<Option<fs::File>>,
    empty: AtomicBool,
    record_count: AtomicUsize,
    htime: HtimeIndex,
}

impl JournalWriter {
    /// spec.md §4.4 "Open": creates/opens `CHANGELOG` with `O_CREAT|O_RDWR`
    /// and writes the header line. `O_SYNC` (config's zero-fsync-interval
    /// case) is approximated by an explicit `sync_data` after every write
    /// in `append`, since `tokio::fs` has no portable `O_SYNC` open flag.
    pub async fn open(
        config: &ChangelogConfig,
        htime: HtimeIndex,
    ) -> Result<Self, JournalWriterError> {
        fs::create_dir_all(&config.changelog_dir)
            .await
            .context(CreateDirSnafu { path: config.changelog_dir.clone() })?;
        let writer = JournalWriter {
            dir: config.changelog_dir.clone(),
            encoding: config.encoding,
            file: Mutex::new(None),
            empty: AtomicBool::new(true),
            record_count: AtomicUsize::new(0),
            htime,
        };
        writer.open_active_file().await?;
        Ok(writer)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_FILE_NAME)
    }

    async fn open_active_file(&self) -> Result<(), JournalWriterError> {
        let path = self.active_path();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .context(OpenSnafu { path: path.clone() })?;
        let header_line = format!("{}\0", header::render(self.encoding));
        file.write_all(header_line.as_bytes())
            .await
            .context(WriteSnafu)?;
        file.flush().await.context(WriteSnafu)?;
        self.empty.store(true, Ordering::Release);
        self.record_count.store(0, Ordering::Release);
        *self.file.lock().await = Some(file);
        Ok(())
    }

    /// spec.md §4.4 "Append": writes one already-encoded record.
    /// `AsyncWriteExt::write_all` loops internally on short writes, which is
    /// exactly the retry-until-flushed behavior spec.md §4.2/§7 requires and
    /// never surfaces as an error (transient I/O is not a reportable kind).
    pub async fn append(&self, record: &[u8]) -> Result<(), JournalWriterError> {
        let mut guard = self.file.lock().await;
        let file = guard.as_mut().expect("append before open()");
        file.write_all(record).await.context(WriteSnafu)?;
        self.empty.store(false, Ordering::Release);
        self.record_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub async fn fsync(&self) -> Result<(), JournalWriterError> {
        let guard = self.file.lock().await;
        if let Some(file) = guard.as_ref() {
            file.sync_data().await.context(WriteSnafu)?;
        }
        Ok(())
    }

    /// spec.md §4.4 "Append" steps 1-6: fsync, close, build the dated
    /// target path, rename (or unlink, for an empty rollover), append to
    /// HTIME, reopen for the next slice. Returns the published path only
    /// for a non-empty rollover — an empty rollover (spec.md §8 invariant
    /// 10) has nothing for the dispatcher to publish.
    pub async fn rollover(&self, ts: i64) -> Result<Option<PathBuf>, JournalWriterError> {
        self.fsync().await?;
        let was_empty = self.empty.load(Ordering::Acquire);
        let records = self.record_count.load(Ordering::Acquire);

        let source = self.active_path();
        *self.file.lock().await = None;

        let dt: DateTime<Utc> = DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now);
        let dated_dir = self
            .dir
            .join(format!("{:04}", dt.year()))
            .join(format!("{:02}", dt.month()))
            .join(format!("{:02}", dt.day()));

        if was_empty {
            let _ = fs::remove_file(&source).await;
            fs::create_dir_all(&dated_dir)
                .await
                .context(CreateDirSnafu { path: dated_dir.clone() })?;
            let lowercase_target = dated_dir.join(format!("changelog.{ts}"));
            self.htime.append(&lowercase_target, ts).await?;
            RolloverEvents::emit_rollover_empty(&source);
            self.open_active_file().await?;
            return Ok(None);
        }

        fs::create_dir_all(&dated_dir)
            .await
            .context(CreateDirSnafu { path: dated_dir.clone() })?;
        let target = dated_dir.join(format!("CHANGELOG.{ts}"));
        fs::rename(&source, &target).await.context(RenameSnafu {
            from: source.clone(),
            to: target.clone(),
        })?;

        self.htime.append(&target, ts).await?;
        self.open_active_file().await?;

        RolloverEvents::emit_rollover_complete(&target, records);
        Ok(Some(target))
    }

    /// Dispatches one queued operation; the producer's writer task drives
    /// this from a single-consumer channel so `Append`/`Fsync`/`Rollover`
    /// are always strictly ordered with respect to each other.
    pub async fn apply(&self, op: JournalOp) -> Result<Option<PathBuf>, JournalWriterError> {
        match op {
            JournalOp::Append(bytes) => {
                self.append(&bytes).await?;
                Ok(None)
            }
            JournalOp::Fsync => {
                self.fsync().await?;
                Ok(None)
            }
            JournalOp::Rollover { ts } => self.rollover(ts).await,
        }
    }

    pub fn htime(&self) -> &HtimeIndex {
        &self.htime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_config(dir: &std::path::Path) -> ChangelogConfig {
        let mut cfg = ChangelogConfig::default();
        cfg.changelog = true;
        cfg.changelog_dir = dir.to_path_buf();
        cfg.encoding = Encoding::Ascii;
        cfg
    }

    #[tokio::test]
    async fn header_written_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let htime = HtimeIndex::open(&dir.path().join("htime"), 1).await.unwrap();
        let cfg = test_config(dir.path()).await;
        let _writer = JournalWriter::open(&cfg, htime).await.unwrap();
        let contents = fs::read(dir.path().join("CHANGELOG")).await.unwrap();
        assert!(contents.starts_with(b"GlusterFS Changelog"));
        assert!(contents.ends_with(b"\0"));
    }

    #[tokio::test]
    async fn empty_rollover_unlinks_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let htime = HtimeIndex::open(&dir.path().join("htime"), 1).await.unwrap();
        let cfg = test_config(dir.path()).await;
        let writer = JournalWriter::open(&cfg, htime).await.unwrap();

        let result = writer.rollover(100).await.unwrap();
        assert_eq!(result, None);
        // the active file must have been recreated for the next slice
        assert!(fs::metadata(dir.path().join("CHANGELOG")).await.is_ok());
        assert_eq!(writer.htime().max_ts(), 100);
        let htime_contents = fs::read_to_string(dir.path().join("htime").join("HTIME.1"))
            .await
            .unwrap();
        assert!(htime_contents.trim_end().ends_with("changelog.100"));
    }

    #[tokio::test]
    async fn non_empty_rollover_renames_into_dated_directory() {
        let dir = tempfile::tempdir().unwrap();
        let htime = HtimeIndex::open(&dir.path().join("htime"), 1).await.unwrap();
        let cfg = test_config(dir.path()).await;
        let writer = JournalWriter::open(&cfg, htime).await.unwrap();

        writer.append(b"D somefakebytes\0").await.unwrap();
        let target = writer.rollover(1_700_000_000).await.unwrap().unwrap();
        assert!(target.to_string_lossy().contains("CHANGELOG.1700000000"));
        assert!(fs::metadata(&target).await.is_ok());
        assert_eq!(writer.htime().max_ts(), 1_700_000_000);
    }
}
