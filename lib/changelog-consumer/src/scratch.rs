//! The `.current`/`.processing`/`.processed` scratch-directory lifecycle and
//! tracker file (spec.md §3 ConsumerJournal, §4.7 `register`/`scan`/
//! `next_change`/`done`).
//!
//! Grounded on `file-source::checkpointer`'s long-lived tracker file with
//! atomic rewrite-then-rename and directory creation on register, and on
//! `gf-changelog.c`'s `gf_changelog_register`. spec.md's `next_change`
//! describes "a thread-local line-buffered reader": this crate instead loads
//! the tracker into an in-memory queue once per `scan()`, which is simpler
//! and behaves identically from the caller's side (`next_change` still
//! returns one path per call, in tracker order, until exhausted).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::ConsumerError;
use crate::events::ScratchEvents;

const CURRENT_DIR: &str = ".current";
const PROCESSING_DIR: &str = ".processing";
const PROCESSED_DIR: &str = ".processed";
const TRACKER_FILE: &str = ".tracker";

/// The three scratch subdirectories plus tracker file under one
/// `scratch_dir`, as spec.md §3 describes.
pub struct Scratch {
    root: PathBuf,
    connected: AtomicBool,
    queue: Mutex<VecDeque<String>>,
}

impl Scratch {
    pub fn current_dir(&self) -> PathBuf {
        self.root.join(CURRENT_DIR)
    }

    pub fn processing_dir(&self) -> PathBuf {
        self.root.join(PROCESSING_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    fn tracker_path(&self) -> PathBuf {
        self.root.join(TRACKER_FILE)
    }

    /// spec.md §4.7 `register`: creates `scratch_dir` and its three
    /// subdirectories and an empty tracker file.
    pub async fn register(scratch_dir: PathBuf) -> Result<Self, ConsumerError> {
        let scratch = Scratch {
            root: scratch_dir,
            connected: AtomicBool::new(true),
            queue: Mutex::new(VecDeque::new()),
        };
        for dir in [
            scratch.current_dir(),
            scratch.processing_dir(),
            scratch.processed_dir(),
        ] {
            fs::create_dir_all(&dir).await.map_err(ConsumerError::io)?;
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(scratch.tracker_path())
            .await
            .map_err(ConsumerError::io)?;
        ScratchEvents::emit_registered(&scratch.root);
        Ok(scratch)
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn require_connected(&self) -> Result<(), ConsumerError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ConsumerError::NotConnected)
        }
    }

    /// spec.md §4.7 `scan()`: truncates the tracker, walks `.processing/`
    /// skipping `.`/`..`, writes one path per line, rewinds, returns count.
    pub async fn scan(&self) -> Result<usize, ConsumerError> {
        self.require_connected()?;
        let mut entries = fs::read_dir(self.processing_dir())
            .await
            .map_err(ConsumerError::io)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ConsumerError::io)? {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            paths.push(entry.path().to_string_lossy().into_owned());
        }
        paths.sort();

        let mut tracker = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.tracker_path())
            .await
            .map_err(ConsumerError::io)?;
        for path in &paths {
            tracker
                .write_all(format!("{path}\n").as_bytes())
                .await
                .map_err(ConsumerError::io)?;
        }
        tracker.flush().await.map_err(ConsumerError::io)?;

        let count = paths.len();
        *self.queue.lock().await = paths.into_iter().collect();
        Ok(count)
    }

    /// spec.md §4.7 `next_change`: one path per call, in tracker order;
    /// `None` once exhausted (invariant 7: right after `start_fresh`, the
    /// first call returns nothing).
    pub async fn next_change(&self) -> Result<Option<String>, ConsumerError> {
        self.require_connected()?;
        Ok(self.queue.lock().await.pop_front())
    }

    /// spec.md §4.7 `done`: resolves `path`, asserts it lies inside
    /// `.processing/`, renames into `.processed/`. Invariant 6: the first
    /// call succeeds, the second fails with `EINVAL` because the source no
    /// longer exists under `.processing/`.
    pub async fn done(&self, path: &str) -> Result<(), ConsumerError> {
        self.require_connected()?;
        let path = Path::new(path);
        let processing = self.processing_dir();
        if path.parent() != Some(processing.as_path()) {
            return Err(ConsumerError::InvalidArgument {
                detail: format!("{} is not inside the working directory", path.display()),
            });
        }
        let basename = path
            .file_name()
            .ok_or_else(|| ConsumerError::InvalidArgument {
                detail: "path has no basename".to_string(),
            })?;
        let target = self.processed_dir().join(basename);
        fs::rename(path, &target).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConsumerError::InvalidArgument {
                    detail: format!("{} was already processed", path.display()),
                }
            } else {
                ConsumerError::io(source)
            }
        })
    }

    /// spec.md §3: ".current and .processing are recursively removed and
    /// re-created; .processed is preserved."
    pub async fn start_fresh(&self) -> Result<(), ConsumerError> {
        self.require_connected()?;
        for dir in [self.current_dir(), self.processing_dir()] {
            let _ = fs::remove_dir_all(&dir).await;
            fs::create_dir_all(&dir).await.map_err(ConsumerError::io)?;
        }
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.tracker_path())
            .await
            .map_err(ConsumerError::io)?;
        self.queue.lock().await.clear();
        ScratchEvents::emit_start_fresh(&self.root);
        Ok(())
    }
}
