//! `tracing`-backed event emitters, one unit struct per subsystem, mirroring
//! `changelog-producer::events` and ultimately `file-source`'s
//! `FileSourceInternalEvents` convention.

use std::path::Path;

pub struct ScratchEvents;

impl ScratchEvents {
    pub fn emit_registered(root: &Path) {
        tracing::info!(root = %root.display(), "consumer journal registered");
    }

    pub fn emit_start_fresh(root: &Path) {
        tracing::info!(root = %root.display(), "scratch directories reset for start_fresh");
    }
}

pub struct ParseEvents;

impl ParseEvents {
    pub fn emit_parsed(source: &Path, records: usize) {
        tracing::debug!(source = %source.display(), records, "journal parsed");
    }

    pub fn emit_empty(source: &Path) {
        tracing::debug!(source = %source.display(), "journal had no records, discarding");
    }

    pub fn emit_parse_error(source: &Path, error: &dyn std::error::Error) {
        tracing::warn!(source = %source.display(), %error, "journal parse aborted, ceasing publication for this worker");
    }
}

pub struct HistoryEvents;

impl HistoryEvents {
    pub fn emit_range_unavailable(range_start: i64) {
        tracing::warn!(range_start, "no HTIME index covers the requested range start");
    }

    pub fn emit_worker_failed(path: &Path, error: &dyn std::error::Error) {
        tracing::warn!(path = %path.display(), %error, "history worker failed");
    }
}
