//! C1: fixed ring of buffer lists with writer reservation and completion
//! counting (spec.md §4.1).
//!
//! The C implementation reserves a contiguous byte range inside a shared
//! buffer and hands back a raw pointer. In owned, GC-free Rust there is no
//! benefit to chasing that: a writer instead hands ownership of its
//! already-encoded `Vec<u8>` straight to the current list. What does carry
//! over unchanged is the reservation/completion bookkeeping — it is what
//! lets the rollover thread know a list is safe to drain even while a
//! writer that reserved a slot hasn't finished yet.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::RotBufError;

pub const ROT_BUFF_ALLOC_SIZE: usize = 128 * 1024;
pub const DEFAULT_RING_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    Active,
    Retired,
    Waiting,
}

struct BufferList {
    state: ListState,
    records: Vec<Vec<u8>>,
    used: usize,
    pending_writers: u64,
    completed_writers: u64,
    seq_start: u64,
    seq_len: u64,
}

impl BufferList {
    fn new() -> Self {
        BufferList {
            state: ListState::Active,
            records: Vec::new(),
            used: 0,
            pending_writers: 0,
            completed_writers: 0,
            seq_start: 0,
            seq_len: 0,
        }
    }

    /// spec.md §3 RotBuf invariant: "a list is consumable iff
    /// `pending == completed ∧ used > 0 ∧ ¬ACTIVE`".
    fn is_consumable(&self) -> bool {
        self.state != ListState::Active
            && self.pending_writers == self.completed_writers
            && self.used > 0
    }

    fn reset(&mut self) {
        self.state = ListState::Active;
        self.records.clear();
        self.used = 0;
        self.pending_writers = 0;
        self.completed_writers = 0;
    }
}

/// Returned by `reserve_write`; must be passed to `write_complete` once the
/// record has been durably recorded.
#[derive(Debug, PartialEq, Eq)]
pub struct WriteHandle {
    list_index: usize,
}

/// A retired list handed to the caller by `get_buffer`, ready to be drained
/// with `wait_for_completion`.
pub struct ConsumableList {
    index: usize,
    pub seq_start: u64,
    pub seq_len: u64,
}

pub enum GetBufferOutcome {
    Consumable(ConsumableList),
    Busy,
    Empty,
    WouldStarve,
}

/// Ring of `N` buffer lists (spec.md §3 RotBuf, default `N = 4`).
pub struct RotBuf {
    lists: Mutex<Vec<BufferList>>,
    current: Mutex<usize>,
    notifies: Vec<Arc<Notify>>,
}

impl Default for RotBuf {
    fn default() -> Self {
        Self::with_ring_size(DEFAULT_RING_SIZE)
    }
}

impl RotBuf {
    pub fn with_ring_size(n: usize) -> Self {
        assert!(n >= 2, "a ring needs at least a current and a next list");
        RotBuf {
            lists: Mutex::new((0..n).map(|_| BufferList::new()).collect()),
            current: Mutex::new(0),
            notifies: (0..n).map(|_| Arc::new(Notify::new())).collect(),
        }
    }

    /// spec.md §4.1 `reserve_write`: reserves room for one already-encoded
    /// record in the current list, bumping `pending_writers`.
    pub fn reserve_write(&self, record: Vec<u8>) -> Result<WriteHandle, RotBufError> {
        if record.len() > ROT_BUFF_ALLOC_SIZE {
            return Err(RotBufError::WouldStarve);
        }
        let mut lists = self.lists.lock();
        let idx = *self.current.lock();
        let list = &mut lists[idx];
        if list.used + record.len() > ROT_BUFF_ALLOC_SIZE {
            return Err(RotBufError::WouldStarve);
        }
        list.used += record.len();
        list.pending_writers += 1;
        list.records.push(record);
        Ok(WriteHandle { list_index: idx })
    }

    /// spec.md §4.1 `write_complete`: bumps `completed_writers`; wakes the
    /// consumer if it is already `Waiting` on this list and this was the
    /// last outstanding writer.
    pub fn write_complete(&self, handle: WriteHandle) {
        let mut lists = self.lists.lock();
        let list = &mut lists[handle.list_index];
        list.completed_writers += 1;
        if list.state == ListState::Waiting && list.pending_writers == list.completed_writers {
            self.notifies[handle.list_index].notify_one();
        }
    }

    /// spec.md §4.1 `get_buffer`: rotates `current` to the next list,
    /// assigning the retiring list its `[seq_start, seq_len]` range via
    /// `sequence_fn`. Refuses to rotate (`Busy`) while the next list is
    /// still active or has not yet been drained by a prior
    /// `wait_for_completion`.
    pub fn get_buffer(&self, sequence_fn: impl FnOnce(usize) -> (u64, u64)) -> GetBufferOutcome {
        let mut lists = self.lists.lock();
        let mut current = self.current.lock();
        let retiring = *current;
        let next = (retiring + 1) % lists.len();

        if lists[next].state == ListState::Active && !lists[next].records.is_empty() {
            return GetBufferOutcome::Busy;
        }
        if lists[next].state != ListState::Active {
            return GetBufferOutcome::Busy;
        }

        if lists[retiring].used == 0 {
            return GetBufferOutcome::Empty;
        }

        lists[retiring].state = ListState::Retired;
        let (seq_start, seq_len) = sequence_fn(lists[retiring].records.len());
        lists[retiring].seq_start = seq_start;
        lists[retiring].seq_len = seq_len;
        *current = next;

        if lists[retiring].is_consumable() {
            GetBufferOutcome::Consumable(ConsumableList {
                index: retiring,
                seq_start,
                seq_len,
            })
        } else {
            GetBufferOutcome::WouldStarve
        }
    }

    /// spec.md §4.1 `wait_for_completion`: waits until every writer that
    /// reserved room in `list` has completed, then hands the drained
    /// records to `dispatch_fn` (without holding the list lock) and returns
    /// the list to the freelist.
    pub async fn wait_for_completion<F>(&self, list: ConsumableList, dispatch_fn: F)
    where
        F: FnOnce(Vec<Vec<u8>>, u64, u64),
    {
        loop {
            let already_done = {
                let mut lists = self.lists.lock();
                let l = &mut lists[list.index];
                if l.pending_writers == l.completed_writers {
                    true
                } else {
                    l.state = ListState::Waiting;
                    false
                }
            };
            if already_done {
                break;
            }
            self.notifies[list.index].notified().await;
        }

        let records = {
            let mut lists = self.lists.lock();
            std::mem::take(&mut lists[list.index].records)
        };
        dispatch_fn(records, list.seq_start, list.seq_len);

        let mut lists = self.lists.lock();
        lists[list.index].reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_and_complete_tracks_counts() {
        let ring = RotBuf::with_ring_size(2);
        let h = ring.reserve_write(b"hello".to_vec()).unwrap();
        ring.write_complete(h);
    }

    #[test]
    fn oversized_record_starves() {
        let ring = RotBuf::with_ring_size(2);
        let huge = vec![0u8; ROT_BUFF_ALLOC_SIZE + 1];
        assert_eq!(ring.reserve_write(huge), Err(RotBufError::WouldStarve));
    }

    #[test]
    fn get_buffer_empty_list_yields_empty() {
        let ring = RotBuf::with_ring_size(2);
        matches!(ring.get_buffer(|_| (0, 0)), GetBufferOutcome::Empty);
    }

    #[tokio::test]
    async fn rotate_and_drain_round_trip() {
        let ring = RotBuf::with_ring_size(2);
        let h1 = ring.reserve_write(b"one".to_vec()).unwrap();
        ring.write_complete(h1);

        let outcome = ring.get_buffer(|n| (1, n as u64));
        let consumable = match outcome {
            GetBufferOutcome::Consumable(c) => c,
            _ => panic!("expected a consumable list"),
        };
        assert_eq!(consumable.seq_start, 1);

        let mut seen = Vec::new();
        ring.wait_for_completion(consumable, |records, seq_start, seq_len| {
            seen = records;
            assert_eq!(seq_start, 1);
            assert_eq!(seq_len, 1);
        })
        .await;
        assert_eq!(seen, vec![b"one".to_vec()]);
    }
}
