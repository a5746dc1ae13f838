//! C7's live-journal half: `register`/`scan`/`next_change`/`done`/
//! `start_fresh` plus the processor that turns JOURNAL events into files
//! under `.processing/` (spec.md §4.7).
//!
//! Grounded on `gf-changelog.c` for the public API shape and on
//! `file-source::file_server`'s "processor task consumes a queue of paths"
//! pattern for [`ConsumerJournal::run`]. This crate has no dependency on
//! `changelog-rpc`: the reverse-RPC endpoint (C8) is expected to push
//! JOURNAL-event paths into the channel `run` drains, the mirror image of
//! `changelog-producer::dispatcher`'s `EventSink` trait — here the producer
//! side of that relationship lives in the other crate, not this one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::ResultExt;
use tokio::fs;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ConsumerError, NotRegularFileSnafu, OpenSnafu, ParseError, WriteSnafu};
use crate::events::ParseEvents;
use crate::parser::{self, ParserKind};
use crate::scratch::Scratch;

/// What happened to one source journal after processing.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The source had only a header; its `.current/` copy was discarded
    /// (spec.md §4.7 step 4, the `zerob` case).
    Empty,
    /// The reconstructed copy was published to `.processing/<basename>`.
    Published(PathBuf),
}

/// Runs the per-file steps of spec.md §4.7's journal processor against one
/// `scratch` root, independent of whether it is the live or history tree —
/// `history.rs` reuses this with a different [`Scratch`] instead of
/// duplicating the logic (SPEC_FULL.md §6).
pub async fn process_into_scratch(
    source: &Path,
    scratch: &Scratch,
    parser: ParserKind,
) -> Result<ProcessOutcome, ParseError> {
    let meta = fs::metadata(source).await.context(OpenSnafu {
        path: source.to_path_buf(),
    })?;
    if !meta.is_file() {
        return NotRegularFileSnafu {
            path: source.to_path_buf(),
        }
        .fail();
    }

    let basename = source.file_name().expect("journal path has a basename");
    let current_path = scratch.current_dir().join(basename);
    fs::File::create(&current_path).await.context(OpenSnafu {
        path: current_path.clone(),
    })?;

    let parsed = parser.parse(source).await?;
    if parsed.record_count == 0 {
        let _ = fs::remove_file(&current_path).await;
        ParseEvents::emit_empty(source);
        return Ok(ProcessOutcome::Empty);
    }

    parser::write_reconstructed(&current_path, &parsed.body).await?;
    let target = scratch.processing_dir().join(basename);
    fs::rename(&current_path, &target)
        .await
        .context(WriteSnafu {
            path: target.clone(),
        })?;
    ParseEvents::emit_parsed(source, parsed.record_count);
    Ok(ProcessOutcome::Published(target))
}

/// The live-journal consumer handle (spec.md §3 ConsumerJournal, §4.7).
pub struct ConsumerJournal {
    scratch: Scratch,
    parser: ParserKind,
    /// Accepted for API parity, never read (DESIGN.md Open Question 3).
    #[allow(dead_code)]
    max_reconnects: u32,
}

impl ConsumerJournal {
    /// spec.md §4.7 `register(brick, scratch_dir, log_file, log_level,
    /// max_reconnects)`. `log_file`/`log_level` are accepted for API parity
    /// with the documented control interface but are no-ops here: this
    /// crate's own diagnostics go through `tracing`, configured once by the
    /// host process rather than per registration.
    pub async fn register(
        _brick: PathBuf,
        scratch_dir: PathBuf,
        _log_file: Option<PathBuf>,
        _log_level: tracing::Level,
        max_reconnects: u32,
    ) -> Result<Self, ConsumerError> {
        let scratch = Scratch::register(scratch_dir).await?;
        Ok(ConsumerJournal {
            scratch,
            parser: ParserKind::default(),
            max_reconnects,
        })
    }

    pub fn with_parser(mut self, parser: ParserKind) -> Self {
        self.parser = parser;
        self
    }

    pub async fn scan(&self) -> Result<usize, ConsumerError> {
        self.scratch.scan().await
    }

    pub async fn next_change(&self) -> Result<Option<String>, ConsumerError> {
        self.scratch.next_change().await
    }

    pub async fn done(&self, path: &str) -> Result<(), ConsumerError> {
        self.scratch.done(path).await
    }

    pub async fn start_fresh(&self) -> Result<(), ConsumerError> {
        self.scratch.start_fresh().await
    }

    /// Handles one JOURNAL event (spec.md §4.7 processor steps 1-5).
    pub async fn handle_journal_event(&self, source: &Path) -> Result<ProcessOutcome, ParseError> {
        process_into_scratch(source, &self.scratch, self.parser).await
    }

    /// Drains `events` until cancelled, calling [`Self::handle_journal_event`]
    /// for each. A parse failure logs and moves on to the next event rather
    /// than tearing down the task (spec.md §7: "ceases further publication
    /// for that worker", not the process).
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<PathBuf>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                maybe_path = events.recv() => {
                    let Some(path) = maybe_path else { return };
                    if let Err(error) = self.handle_journal_event(&path).await {
                        ParseEvents::emit_parse_error(&path, &error);
                    }
                }
            }
        }
    }
}
