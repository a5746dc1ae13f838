//! HTIME range replay (spec.md §4.7 `history`, §6 `history_scan`/
//! `history_done`).
//!
//! Grounded on `gf-history-changelog.c`: `history_scan`/`history_done`
//! mirror the live `scan`/`done` calls but operate on a second scratch root,
//! so [`HistoryJournal`] reuses [`crate::journal::process_into_scratch`] and
//! [`Scratch`] instead of re-implementing the lifecycle (SPEC_FULL.md §6).
//!
//! DESIGN.md Open Question 2 resolution: the original's historical walk
//! constructs HTIME paths from what the source shows as an uninitialized
//! directory handle. This crate instead enumerates every `HTIME.<start_ts>`
//! file under the HTIME directory and selects the one with the largest
//! `start_ts <= range_start` — "the index that was current at the requested
//! start of the range" — which is the only reading consistent with
//! `HtimeIndex`'s own naming scheme (`changelog-producer::htime`).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Semaphore;

use crate::error::ConsumerError;
use crate::events::HistoryEvents;
use crate::journal::{process_into_scratch, ProcessOutcome};
use crate::parser::ParserKind;
use crate::scratch::Scratch;

/// Per spec.md §4.7: "Dispatches parse workers in groups of
/// `min(parallelism, MAX_PARALLELS=10)`."
const MAX_PARALLELS: usize = 10;

/// spec.md §4.7 `history`'s four-way return.
#[derive(Debug, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Every selected journal parsed successfully.
    Success { actual_end: i64 },
    /// At least one journal in range could not be parsed.
    Error { failed: PathBuf },
    /// No HTIME index covers `range_start`.
    Unavailable,
}

async fn htime_candidates(htime_dir: &std::path::Path) -> Result<Vec<(i64, PathBuf)>, ConsumerError> {
    let mut entries = fs::read_dir(htime_dir).await.map_err(ConsumerError::io)?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ConsumerError::io)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(ts_text) = name.strip_prefix("HTIME.") {
            if let Ok(ts) = ts_text.parse::<i64>() {
                out.push((ts, entry.path()));
            }
        }
    }
    out.sort_by_key(|(ts, _)| *ts);
    Ok(out)
}

/// Parses the `<ts>` suffix out of a `CHANGELOG.<ts>` or `changelog.<ts>`
/// (empty-rollover, spec.md §8 invariant 10) basename.
fn journal_timestamp(path: &std::path::Path) -> Option<i64> {
    let name = path.file_name()?.to_string_lossy();
    let (_, ts_text) = name.rsplit_once('.')?;
    ts_text.parse().ok()
}

/// The historical-replay half of C7, reusing [`Scratch`]'s lifecycle with
/// its own root so a concurrent live `ConsumerJournal` never contends with
/// it (spec.md §6: `history_scan`/`next_change`/`done` mirror the live
/// calls but operate on the history scratch dir).
pub struct HistoryJournal {
    scratch: Arc<Scratch>,
    parser: ParserKind,
}

impl HistoryJournal {
    pub async fn register(history_scratch_dir: PathBuf) -> Result<Self, ConsumerError> {
        Ok(HistoryJournal {
            scratch: Arc::new(Scratch::register(history_scratch_dir).await?),
            parser: ParserKind::default(),
        })
    }

    pub fn with_parser(mut self, parser: ParserKind) -> Self {
        self.parser = parser;
        self
    }

    pub async fn history_scan(&self) -> Result<usize, ConsumerError> {
        self.scratch.scan().await
    }

    pub async fn history_next_change(&self) -> Result<Option<String>, ConsumerError> {
        self.scratch.next_change().await
    }

    pub async fn history_done(&self, path: &str) -> Result<(), ConsumerError> {
        self.scratch.done(path).await
    }

    /// spec.md §4.7 `history(range_start, range_end, parallelism,
    /// out_actual_end)`. Locates the covering HTIME index, reads its journal
    /// paths, keeps those whose embedded timestamp falls in
    /// `[range_start, range_end]`, and fans parse workers out across at most
    /// `min(parallelism, MAX_PARALLELS)` concurrent tasks. Every path is
    /// written into the history scratch's `.processing/` only if every
    /// worker succeeds.
    pub async fn history(
        &self,
        htime_dir: &std::path::Path,
        range_start: i64,
        range_end: i64,
        parallelism: usize,
    ) -> Result<HistoryOutcome, ConsumerError> {
        let candidates = htime_candidates(htime_dir).await?;
        let covering = candidates
            .into_iter()
            .filter(|(ts, _)| *ts <= range_start)
            .next_back();
        let Some((_, htime_path)) = covering else {
            HistoryEvents::emit_range_unavailable(range_start);
            return Ok(HistoryOutcome::Unavailable);
        };

        let contents = fs::read_to_string(&htime_path)
            .await
            .map_err(ConsumerError::io)?;
        let mut journals: Vec<PathBuf> = contents
            .lines()
            .map(PathBuf::from)
            .filter(|p| {
                journal_timestamp(p)
                    .map(|ts| ts >= range_start && ts <= range_end)
                    .unwrap_or(false)
            })
            .collect();
        journals.sort_by_key(|p| journal_timestamp(p).unwrap_or(0));

        let permits = parallelism.clamp(1, MAX_PARALLELS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut tasks = Vec::with_capacity(journals.len());
        for path in journals.iter().cloned() {
            let semaphore = semaphore.clone();
            let scratch = self.scratch.clone();
            let parser = self.parser;
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                process_into_scratch(&path, &scratch, parser)
                    .await
                    .map_err(|_| path.clone())
            }));
        }

        let mut actual_end = range_start;
        for (path, task) in journals.iter().zip(tasks) {
            match task.await.expect("history worker panicked") {
                Ok(ProcessOutcome::Published(_) | ProcessOutcome::Empty) => {
                    if let Some(ts) = journal_timestamp(path) {
                        actual_end = actual_end.max(ts);
                    }
                }
                Err(failed) => {
                    HistoryEvents::emit_worker_failed(&failed, &std::io::Error::other("parse failed"));
                    return Ok(HistoryOutcome::Error { failed });
                }
            }
        }

        Ok(HistoryOutcome::Success { actual_end })
    }
}
