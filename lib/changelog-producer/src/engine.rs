//! The brick-facing façade spec.md §9's "explicit `Engine` handle" design
//! note calls for, replacing the original's implicit process-wide
//! "current translator" pointer: callers own an `Engine` value and pass it
//! by reference, with no global singleton behind it.

use std::path::PathBuf;
use std::sync::Arc;

use changelog_core::record::ChangeRecord;
use changelog_core::{ChangeType, ChangelogConfig, FopCode, Gfid};

use crate::barrier::Barrier;
use crate::error::JournalWriterError;
use crate::htime::HtimeIndex;
use crate::journal_writer::JournalWriter;
use crate::recorder::Recorder;
use crate::slicer::{Slice, Slicer};

pub struct Engine {
    recorder: Recorder,
    slicer: Slicer,
    writer: JournalWriter,
    barrier: Arc<Barrier>,
}

impl Engine {
    pub async fn open(config: &ChangelogConfig, start_ts: i64) -> Result<Self, JournalWriterError> {
        let htime = HtimeIndex::open(&config.changelog_dir.join("htime"), start_ts).await?;
        let writer = JournalWriter::open(config, htime).await?;
        Ok(Engine {
            recorder: Recorder::new(config.encoding),
            slicer: Slicer::new(Arc::new(Slice::default())),
            writer,
            barrier: Arc::new(Barrier::new(config.changelog_barrier_timeout)),
        })
    }

    pub fn barrier(&self) -> &Arc<Barrier> {
        &self.barrier
    }

    /// spec.md §4.3 applied to a DATA-type fop: records iff the inode's
    /// DATA counter differs from the current slice's.
    pub async fn record_data(&self, gfid: Gfid) -> Result<(), JournalWriterError> {
        if !self.slicer.should_emit(gfid, ChangeType::Data) {
            return Ok(());
        }
        self.emit(&ChangeRecord::Data { gfid }).await
    }

    /// spec.md §4.3 applied to a METADATA-type fop.
    pub async fn record_metadata(&self, gfid: Gfid, fop: FopCode) -> Result<(), JournalWriterError> {
        if !self.slicer.should_emit(gfid, ChangeType::Metadata) {
            return Ok(());
        }
        self.emit(&ChangeRecord::Metadata { gfid, fop }).await
    }

    /// ENTRY-type fops are never sliced (spec.md §4.3 step 1): always
    /// emitted. If the barrier is up, the caller is expected to have
    /// parked via `barrier().park()` before calling this — `Engine` itself
    /// does not gate entry on barrier state, matching spec.md §4.5's
    /// "parked... rather than descending to the lower filesystem": the
    /// parking happens above this layer, at the fop dispatch site.
    pub async fn record_entry(&self, record: ChangeRecord) -> Result<(), JournalWriterError> {
        self.emit(&record).await
    }

    async fn emit(&self, record: &ChangeRecord) -> Result<(), JournalWriterError> {
        let bytes = self
            .recorder
            .encode(record)
            .expect("canonical ChangeRecord values always encode");
        self.writer.append(&bytes).await
    }

    /// spec.md §4.4's rollover sequence plus the slice-version bump
    /// (`SLICE_VERSION_UPDATE`, step 6) that makes the first post-rollover
    /// fop on any inode always record again.
    pub async fn rollover(&self, ts: i64) -> Result<Option<PathBuf>, JournalWriterError> {
        let result = self.writer.rollover(ts).await?;
        self.slicer.slice().advance();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changelog_core::record::{EntryLink, ModeOwnership};
    use changelog_core::Encoding;
    use tokio::fs;

    fn gfid(b: u8) -> Gfid {
        Gfid::from_bytes([b; 16])
    }

    async fn open_engine(dir: &std::path::Path) -> Engine {
        let mut cfg = ChangelogConfig::default();
        cfg.changelog = true;
        cfg.changelog_dir = dir.to_path_buf();
        cfg.encoding = Encoding::Ascii;
        Engine::open(&cfg, 1).await.unwrap()
    }

    async fn active_contents(dir: &std::path::Path) -> String {
        let bytes = fs::read(dir.join("CHANGELOG")).await.unwrap();
        String::from_utf8(bytes).unwrap()
    }

    /// spec.md §8 S1: mkdir, then create, then two writes in the same
    /// slice collapse to one `D` line.
    #[tokio::test]
    async fn s1_mkdir_create_write_collapses_to_one_data_line() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(dir.path()).await;

        let g0 = gfid(0);
        let g1 = gfid(1);
        let g2 = gfid(2);

        engine
            .record_entry(ChangeRecord::Entry {
                parent: g0,
                fop: FopCode::Mkdir,
                ownership: Some(ModeOwnership { mode: 0o755, uid: 1000, gid: 1000 }),
                deleted_gfid: None,
                links: vec![EntryLink { gfid: g1, basename: "d".to_string() }],
                deleted_path: None,
            })
            .await
            .unwrap();

        engine
            .record_entry(ChangeRecord::Entry {
                parent: g1,
                fop: FopCode::Create,
                ownership: Some(ModeOwnership { mode: 0o100644, uid: 1000, gid: 1000 }),
                deleted_gfid: None,
                links: vec![EntryLink { gfid: g2, basename: "f".to_string() }],
                deleted_path: None,
            })
            .await
            .unwrap();

        engine.record_data(g2).await.unwrap();
        engine.record_data(g2).await.unwrap();

        let contents = active_contents(dir.path()).await;
        let lines: Vec<&str> = contents.split('\0').filter(|s| !s.is_empty()).collect();
        // line 0 is the header; records follow
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], format!("E {g0} MKDIR 493 1000 1000 {g1}%2Fd"));
        assert_eq!(lines[2], format!("E {g1} CREATE 33188 1000 1000 {g2}%2Ff"));
        assert_eq!(lines[3], format!("D {g2}"));
    }

    /// spec.md §8 S2: a second setxattr in the same slice adds no new line.
    #[tokio::test]
    async fn s2_duplicate_setxattr_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(dir.path()).await;
        let g2 = gfid(2);

        engine.record_metadata(g2, FopCode::Setxattr).await.unwrap();
        engine.record_metadata(g2, FopCode::Setxattr).await.unwrap();

        let contents = active_contents(dir.path()).await;
        let lines: Vec<&str> = contents.split('\0').filter(|s| !s.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], format!("M {g2} SETXATTR"));
    }

    /// spec.md §8 S3: rename produces exactly one ENTRY record.
    #[tokio::test]
    async fn s3_rename_produces_single_entry_record() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(dir.path()).await;
        let g1 = gfid(1);

        engine
            .record_entry(ChangeRecord::Entry {
                parent: g1,
                fop: FopCode::Rename,
                ownership: None,
                deleted_gfid: None,
                links: vec![
                    EntryLink { gfid: g1, basename: "a".to_string() },
                    EntryLink { gfid: g1, basename: "b".to_string() },
                ],
                deleted_path: None,
            })
            .await
            .unwrap();

        let contents = active_contents(dir.path()).await;
        let lines: Vec<&str> = contents.split('\0').filter(|s| !s.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], format!("E {g1} RENAME {g1}%2Fa {g1}%2Fb"));
    }

    /// spec.md §8 S4: unlink with and without `capture_del_path`.
    #[tokio::test]
    async fn s4_unlink_with_and_without_capture_del_path() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(dir.path()).await;
        let g1 = gfid(1);
        let g2 = gfid(2);

        engine
            .record_entry(ChangeRecord::Entry {
                parent: g1,
                fop: FopCode::Unlink,
                ownership: None,
                deleted_gfid: Some(g2),
                links: vec![EntryLink { gfid: g1, basename: "f".to_string() }],
                deleted_path: Some("/d/f".to_string()),
            })
            .await
            .unwrap();

        let contents = active_contents(dir.path()).await;
        let lines: Vec<&str> = contents.split('\0').filter(|s| !s.is_empty()).collect();
        assert_eq!(lines[1], format!("E {g1} UNLINK {g2} {g1}%2Ff /d/f"));
    }

    /// spec.md §8 S5 (producer half): a rename parked while the barrier is
    /// on is released, and only then recorded, by turn_off.
    #[tokio::test]
    async fn s5_barrier_parks_rename_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(dir.path()).await;
        let g1 = gfid(1);

        engine.barrier().turn_on().unwrap();
        let parked = engine.barrier().park();

        // the rename has not been recorded yet: it is parked above the
        // engine, waiting for release.
        let contents_before = active_contents(dir.path()).await;
        assert_eq!(contents_before.split('\0').filter(|s| !s.is_empty()).count(), 1);

        engine.barrier().turn_off().unwrap();
        parked.wait().await;

        engine
            .record_entry(ChangeRecord::Entry {
                parent: g1,
                fop: FopCode::Rename,
                ownership: None,
                deleted_gfid: None,
                links: vec![
                    EntryLink { gfid: g1, basename: "a".to_string() },
                    EntryLink { gfid: g1, basename: "b".to_string() },
                ],
                deleted_path: None,
            })
            .await
            .unwrap();

        let contents_after = active_contents(dir.path()).await;
        assert_eq!(contents_after.split('\0').filter(|s| !s.is_empty()).count(), 2);
    }

    #[tokio::test]
    async fn rollover_advances_slice_so_repeat_writes_record_again() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(dir.path()).await;
        let g = gfid(5);

        engine.record_data(g).await.unwrap();
        engine.record_data(g).await.unwrap();
        engine.rollover(100).await.unwrap();
        engine.record_data(g).await.unwrap();

        let contents = active_contents(dir.path()).await;
        let lines: Vec<&str> = contents.split('\0').filter(|s| !s.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], format!("D {g}"));
    }
}
