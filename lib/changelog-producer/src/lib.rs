//! The brick-side changelog pipeline: recording, slicing, journaling,
//! barrier/snapshot coordination, and the reverse-RPC event dispatcher.
//!
//! Consult spec.md §2 for the data-flow picture: a mutating fop is decided
//! on by [`slicer`], turned into bytes by [`recorder`], appended by
//! [`journal_writer`], and — on rollover — published through [`rotbuf`]
//! to [`dispatcher`], which fans it out to reverse-connected consumers.
//! [`barrier`] intercepts ENTRY-type fops and mirrors DATA/METADATA writes
//! into a side-journal while a snapshot barrier is up.

pub mod barrier;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod htime;
pub mod journal_writer;
pub mod recorder;
pub mod rotbuf;
pub mod slicer;

pub use barrier::{Barrier, SnapJournal};
pub use dispatcher::{Dispatcher, EventSink};
pub use engine::Engine;
pub use journal_writer::{JournalOp, JournalWriter};
pub use recorder::Recorder;
pub use rotbuf::RotBuf;
pub use slicer::{Slice, Slicer};
