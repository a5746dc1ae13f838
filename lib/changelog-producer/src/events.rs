//! Structured logging for the producer pipeline.
//!
//! One unit struct per subsystem, each exposing `emit_*` associated
//! functions — the same shape as `file-source`'s `FileSourceInternalEvents`
//! trait, minus the trait indirection, since this crate has exactly one
//! implementation and no need to swap it out in tests.

use std::path::Path;

pub struct RolloverEvents;

impl RolloverEvents {
    pub fn emit_rollover_complete(path: &Path, records: usize) {
        tracing::info!(journal = %path.display(), records, "rollover complete");
    }

    pub fn emit_rollover_empty(path: &Path) {
        tracing::debug!(journal = %path.display(), "rollover produced no records, discarding");
    }

    pub fn emit_rollover_failed(error: &dyn std::error::Error) {
        tracing::error!(%error, "rollover failed");
    }
}

pub struct BarrierEvents;

impl BarrierEvents {
    pub fn emit_barrier_on() {
        tracing::info!("barrier ON");
    }

    pub fn emit_barrier_off(drained: usize) {
        tracing::info!(drained, "barrier OFF, queue drained");
    }

    pub fn emit_watchdog_fired() {
        tracing::warn!("barrier watchdog fired, forcing OFF");
    }

    pub fn emit_protocol_error(message: &str) {
        tracing::warn!(message, "barrier protocol error");
    }
}

pub struct DispatchEvents;

impl DispatchEvents {
    pub fn emit_batch_dispatched(clients: usize, records: usize, seq_start: u64) {
        tracing::debug!(clients, records, seq_start, "dispatched batch to reverse connections");
    }

    pub fn emit_dispatch_dropped(reason: &str) {
        tracing::warn!(reason, "dropped a dispatch batch");
    }
}
