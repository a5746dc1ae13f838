//! C5: barrier queue, CSNAP side-journal, watchdog (spec.md §4.5).

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use snafu::ResultExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

use changelog_core::header;
use changelog_core::record::Encoding;

use crate::error::{BarrierError, JournalWriterError, OpenSnafu, WriteSnafu};
use crate::events::BarrierEvents;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarrierState {
    Off,
    On,
}

/// A parked ENTRY-type fop continuation (spec.md §3 BarrierQueue): the fop
/// thread awaits this until the barrier lifts, by release or watchdog
/// timeout — both simply drop or fire the paired sender.
pub struct Parked {
    receiver: oneshot::Receiver<()>,
}

impl Parked {
    pub async fn wait(self) {
        let _ = self.receiver.await;
    }
}

struct Inner {
    state: BarrierState,
    queue: VecDeque<oneshot::Sender<()>>,
}

/// Suspends ENTRY-type fops during a snapshot barrier (spec.md §4.5).
pub struct Barrier {
    inner: Mutex<Inner>,
    timeout: Duration,
}

impl Barrier {
    pub fn new(timeout: Duration) -> Self {
        Barrier {
            inner: Mutex::new(Inner {
                state: BarrierState::Off,
                queue: VecDeque::new(),
            }),
            timeout,
        }
    }

    pub fn is_on(&self) -> bool {
        self.inner.lock().state == BarrierState::On
    }

    /// spec.md §4.5/§7: barrier ON while already ON is a protocol error,
    /// rejected without changing state. Spawns the watchdog timer that
    /// forces OFF if no explicit barrier-off arrives within `timeout`.
    pub fn turn_on(self: &Arc<Self>) -> Result<(), BarrierError> {
        {
            let mut inner = self.inner.lock();
            if inner.state == BarrierState::On {
                return Err(BarrierError::AlreadyOn);
            }
            inner.state = BarrierState::On;
        }
        BarrierEvents::emit_barrier_on();

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.timeout).await;
            if this.is_on() {
                BarrierEvents::emit_watchdog_fired();
                let _ = this.turn_off();
            }
        });
        Ok(())
    }

    /// spec.md §4.5/§7: barrier OFF while already OFF is rejected.
    /// Otherwise drains and resumes every parked continuation.
    pub fn turn_off(&self) -> Result<usize, BarrierError> {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock();
            if inner.state == BarrierState::Off {
                return Err(BarrierError::AlreadyOff);
            }
            inner.state = BarrierState::Off;
            inner.queue.drain(..).collect()
        };
        let count = drained.len();
        for sender in drained {
            let _ = sender.send(());
        }
        BarrierEvents::emit_barrier_off(count);
        Ok(count)
    }

    /// Parks an ENTRY-type fop (spec.md §4.5). The caller is responsible
    /// for the color-tag-and-count-increment atomicity spec.md §4.5's race
    /// rule demands; this only owns the queue.
    pub fn park(&self) -> Parked {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().queue.push_back(tx);
        Parked { receiver: rx }
    }
}

/// CSNAP side-journal (SPEC_FULL.md §6 supplemented feature): a cut-down
/// writer sharing the encoder but not the rollover/HTIME machinery, active
/// only while the barrier is up (spec.md §4.5, §6 on-disk layout).
pub struct SnapJournal {
    path: PathBuf,
    file: tokio::sync::Mutex<Option<fs::File>>,
    encoding: Encoding,
}

impl SnapJournal {
    pub fn new(csnap_dir: PathBuf, encoding: Encoding) -> Self {
        SnapJournal {
            path: csnap_dir.join("CHANGELOG.SNAP"),
            file: tokio::sync::Mutex::new(None),
            encoding,
        }
    }

    pub async fn open(&self) -> Result<(), JournalWriterError> {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent).await;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await
            .context(OpenSnafu { path: self.path.clone() })?;
        let header_line = format!("{}\0", header::render(self.encoding));
        file.write_all(header_line.as_bytes())
            .await
            .context(WriteSnafu)?;
        *self.file.lock().await = Some(file);
        Ok(())
    }

    pub async fn append(&self, record: &[u8]) -> Result<(), JournalWriterError> {
        let mut guard = self.file.lock().await;
        if let Some(file) = guard.as_mut() {
            file.write_all(record).await.context(WriteSnafu)?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        *self.file.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_on_is_rejected() {
        let barrier = Arc::new(Barrier::new(Duration::from_secs(60)));
        assert!(barrier.turn_on().is_ok());
        assert_eq!(barrier.turn_on(), Err(BarrierError::AlreadyOn));
    }

    #[test]
    fn double_off_is_rejected() {
        let barrier = Barrier::new(Duration::from_secs(60));
        assert_eq!(barrier.turn_off(), Err(BarrierError::AlreadyOff));
    }

    #[tokio::test]
    async fn park_releases_on_turn_off() {
        let barrier = Arc::new(Barrier::new(Duration::from_secs(60)));
        barrier.turn_on().unwrap();
        let parked = barrier.park();
        assert_eq!(barrier.turn_off().unwrap(), 1);
        parked.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_forces_off_after_timeout() {
        let barrier = Arc::new(Barrier::new(Duration::from_millis(10)));
        barrier.turn_on().unwrap();
        let parked = barrier.park();
        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
        parked.wait().await;
        assert!(!barrier.is_on());
    }

    #[tokio::test]
    async fn snap_journal_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snap = SnapJournal::new(dir.path().to_path_buf(), Encoding::Ascii);
        snap.open().await.unwrap();
        snap.append(b"D somegfid\0").await.unwrap();
        snap.close().await;
        let contents = fs::read(dir.path().join("CHANGELOG.SNAP")).await.unwrap();
        assert!(contents.starts_with(b"GlusterFS Changelog"));
    }
}
