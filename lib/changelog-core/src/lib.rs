//! Shared data model for the brick changelog subsystem.
//!
//! This crate has no knowledge of how records are produced (the brick side,
//! `changelog-producer`) or how they are consumed (`changelog-consumer`); it
//! only defines the on-disk/on-wire vocabulary both sides agree on: gfids,
//! change records, the two record encodings, the fop tables that drive
//! ENTRY-record shape, and the handful of configuration knobs spec.md §6
//! recognizes.

pub mod config;
pub mod encoding;
pub mod error;
pub mod fop;
pub mod gfid;
pub mod header;
pub mod record;
pub mod rfc3986;

pub use config::ChangelogConfig;
pub use error::{DecodeError, EncodeError};
pub use fop::FopCode;
pub use gfid::Gfid;
pub use record::{ChangeRecord, ChangeType, Encoding};
