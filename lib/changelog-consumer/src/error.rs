//! Error types for the consumer journal (spec.md §6, §7).
//!
//! `ConsumerError` carries an `errno()` accessor because spec.md §6 documents
//! this API's failure modes as the errno values a C caller would see
//! (`ENOTCONN`, `EINVAL`, `ENAMETOOLONG`); callers embedding this crate
//! behind a C-compatible boundary can map `errno()` straight through instead
//! of inventing their own mapping from `snafu`'s variants.

use std::path::PathBuf;

use snafu::Snafu;

use changelog_core::DecodeError;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum ConsumerError {
    #[snafu(display("consumer journal is not registered"))]
    NotConnected,

    #[snafu(display("invalid argument: {detail}"))]
    InvalidArgument { detail: String },

    #[snafu(display("path exceeds the maximum journal path length: {}", path.display()))]
    NameTooLong { path: PathBuf },

    #[snafu(display("I/O error: {message}"))]
    Io { message: String },
}

impl ConsumerError {
    /// The `errno` value spec.md §6 documents for this failure, for callers
    /// that need to hand a C-compatible return code to an older caller.
    pub fn errno(&self) -> i32 {
        match self {
            ConsumerError::NotConnected => libc::ENOTCONN,
            ConsumerError::InvalidArgument { .. } => libc::EINVAL,
            ConsumerError::NameTooLong { .. } => libc::ENAMETOOLONG,
            ConsumerError::Io { .. } => libc::EIO,
        }
    }

    pub(crate) fn io(err: std::io::Error) -> Self {
        ConsumerError::Io {
            message: err.to_string(),
        }
    }
}

/// Structural journal corruption (spec.md §7): the parser aborts the current
/// file and stops publishing for that worker, but never panics on untrusted
/// on-disk bytes.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParseError {
    #[snafu(display("failed to open journal {}: {source}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to read journal {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write reconstructed journal {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("journal has no header line"))]
    MissingHeader,

    #[snafu(display("malformed record: {source}"))]
    BadRecord { source: DecodeError },

    #[snafu(display("source {} is not a regular file", path.display()))]
    NotRegularFile { path: PathBuf },
}

impl From<DecodeError> for ParseError {
    fn from(source: DecodeError) -> Self {
        ParseError::BadRecord { source }
    }
}
