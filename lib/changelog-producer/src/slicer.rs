//! C3: inode-version vs. slice-version comparison that suppresses
//! redundant METADATA/DATA records inside one slice (spec.md §4.3).
//!
//! The inode table is a `DashMap<Gfid, InodeVersion>` rather than a lock
//! guarding a hash table, matching `file-source::checkpointer`'s
//! `CheckpointsView` — concurrent fop threads update disjoint inodes far
//! more often than they contend on the same one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use changelog_core::{ChangeType, Gfid};

/// Per-inode triple of monotonic counters, one per `ChangeType` (spec.md
/// §3 InodeVersion). `ENTRY`'s slot exists for symmetry but `Slicer` never
/// consults it — ENTRY fops are always emitted (spec.md §4.3 step 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct InodeVersion {
    data: u64,
    metadata: u64,
    entry: u64,
}

impl InodeVersion {
    fn get(&self, t: ChangeType) -> u64 {
        match t {
            ChangeType::Data => self.data,
            ChangeType::Metadata => self.metadata,
            ChangeType::Entry => self.entry,
        }
    }

    fn set(&mut self, t: ChangeType, v: u64) {
        match t {
            ChangeType::Data => self.data = v,
            ChangeType::Metadata => self.metadata = v,
            ChangeType::Entry => self.entry = v,
        }
    }
}

/// Process-wide triple of slice counters (spec.md §3 Slice), mutated only
/// by the rollover thread. Invariant: monotonically increasing.
#[derive(Debug, Default)]
pub struct Slice {
    data: AtomicU64,
    metadata: AtomicU64,
    entry: AtomicU64,
}

impl Slice {
    fn get(&self, t: ChangeType) -> u64 {
        match t {
            ChangeType::Data => self.data.load(Ordering::Acquire),
            ChangeType::Metadata => self.metadata.load(Ordering::Acquire),
            ChangeType::Entry => self.entry.load(Ordering::Acquire),
        }
    }

    /// Rollover's `SLICE_VERSION_UPDATE` (spec.md §4.4 step 6): bumps all
    /// three counters, which is also why the first post-rollover fop on any
    /// inode always records (its stale version can never match the new
    /// slice version).
    pub fn advance(&self) {
        self.data.fetch_add(1, Ordering::AcqRel);
        self.metadata.fetch_add(1, Ordering::AcqRel);
        self.entry.fetch_add(1, Ordering::AcqRel);
    }
}

/// Implements spec.md §4.3 steps 2-4 for DATA/METADATA fops. ENTRY-type
/// fops must bypass this entirely (step 1) — callers should check
/// `change_type` before ever reaching here.
pub struct Slicer {
    inodes: DashMap<Gfid, InodeVersion>,
    slice: Arc<Slice>,
}

impl Slicer {
    pub fn new(slice: Arc<Slice>) -> Self {
        Slicer {
            inodes: DashMap::new(),
            slice,
        }
    }

    pub fn slice(&self) -> &Arc<Slice> {
        &self.slice
    }

    /// Returns `true` if a record for `(gfid, change_type)` should be
    /// emitted, and if so, stamps the inode's counter to the current slice
    /// version (step 4) so a second fop of the same type in this slice is
    /// suppressed.
    pub fn should_emit(&self, gfid: Gfid, change_type: ChangeType) -> bool {
        debug_assert!(
            change_type != ChangeType::Entry,
            "ENTRY fops are never sliced; they are always emitted"
        );
        let slice_version = self.slice.get(change_type);
        let mut inode = self.inodes.entry(gfid).or_default();
        if inode.get(change_type) == slice_version {
            false
        } else {
            inode.set(change_type, slice_version);
            true
        }
    }
}
