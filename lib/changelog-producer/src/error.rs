//! Error types for the producer pipeline (spec.md §7).
//!
//! Transient I/O (short writes, `EINTR`) is retried in a loop inside the
//! journal writer and never surfaces here, per spec.md §7; everything below
//! is a condition the spec classifies as fatal, structural, or protocol.

use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JournalWriterError {
    #[snafu(display("failed to open journal at {}: {source}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write record: {source}"))]
    Write { source: std::io::Error },

    #[snafu(display("failed to create directory {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to rename {} to {}: {source}", from.display(), to.display()))]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to append to HTIME index: {source}"))]
    Htime { source: std::io::Error },
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum RotBufError {
    #[snafu(display(
        "buffer ring is starved: every list is either active or not yet consumed"
    ))]
    WouldStarve,
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum BarrierError {
    #[snafu(display("barrier is already ON"))]
    AlreadyOn,
    #[snafu(display("barrier is already OFF"))]
    AlreadyOff,
}
