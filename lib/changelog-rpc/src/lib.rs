//! The reverse-RPC transport between the brick-side event dispatcher (C6,
//! `changelog-producer::dispatcher`) and the consumer-side journal processor
//! (C7, `changelog-consumer::journal`).
//!
//! Consult spec.md §4.8 for the endpoint's state machine and reorder
//! disciplines, and §2's data-flow line ("publishes a journal-path event
//! through C1 → C6 → RPC → C8") for how the two halves this crate depends on
//! meet here. [`endpoint::RpcClientHandle`] is the dispatcher-facing
//! [`changelog_producer::dispatcher::EventSink`] that serializes batches
//! onto the wire; [`endpoint::ReverseConnection`] is the C8-side object that
//! reorders and delivers them, feeding `PathBuf`s into a
//! [`changelog_consumer::journal::ConsumerJournal::run`] channel.

pub mod endpoint;
pub mod reorder;
pub mod wire;

pub use endpoint::{ConnectionState, ReverseConnection, RpcClientHandle};
pub use reorder::ReorderDiscipline;
pub use wire::{Event, RpcMessage, WireError};

use changelog_producer::error::RotBufError;
use changelog_producer::RotBuf;

/// Bridges a rolled-over journal path (spec.md §4.4's rollover return value)
/// into the RotBuf ring C6's dispatcher drains, completing the C1 → C6 leg
/// of the data-flow line in spec.md §2. Call this with the `Some(path)`
/// `Engine::rollover` returns; an empty rollover (`None`) has nothing to
/// publish.
pub fn publish_rollover(rotbuf: &RotBuf, path: &std::path::Path) -> Result<(), RotBufError> {
    let handle = rotbuf.reserve_write(path.to_string_lossy().into_owned().into_bytes())?;
    rotbuf.write_complete(handle);
    Ok(())
}
