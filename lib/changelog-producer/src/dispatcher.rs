//! C6: consumes RotBuf slots, assigns sequence numbers, dispatches event
//! batches to registered reverse connections (spec.md §4.6).
//!
//! The RPC transport itself is `changelog-rpc`'s concern (spec.md §1: the
//! transport is an external collaborator). This module only owns the
//! sequencing and per-client fan-out loop; it talks to subscribers through
//! the `EventSink` trait so it never needs to know about sockets, framing,
//! or reconnect state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::events::DispatchEvents;
use crate::rotbuf::{GetBufferOutcome, RotBuf};

/// Coarse poll interval (spec.md §4.6 step 1: "sleep 1 second").
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum iovecs per RPC call (spec.md §4.6 step 5): `MAX_IOVEC - 3`,
/// matching the original's headroom for the call's own fixed fields.
const NR_IOVEC: usize = 509;

/// A registered subscriber the dispatcher fans batches out to. Implemented
/// by `changelog-rpc`'s reverse-connection type; kept as a trait here so
/// this crate has no transport dependency of its own.
pub trait EventSink: Send + Sync {
    /// Bitmask of event types this subscriber wants; the dispatcher never
    /// inspects individual event bytes, only whether the sink is still
    /// registered — per-event filtering happens on the C8 side as well
    /// (spec.md §4.6: "per-event filter re-check as a safety net").
    fn wants(&self) -> bool {
        true
    }

    /// Sends one chunk (already split to at most `NR_IOVEC` records) tagged
    /// with a monotonically increasing sequence number.
    fn send(&self, seq: u64, chunk: &[Vec<u8>]);
}

/// Consumes RotBuf slots and fans them out to every registered
/// [`EventSink`] (spec.md §4.6).
pub struct Dispatcher {
    rotbuf: Arc<RotBuf>,
    next_seq: AtomicU64,
    clients: parking_lot::RwLock<Vec<Arc<dyn EventSink>>>,
}

impl Dispatcher {
    pub fn new(rotbuf: Arc<RotBuf>) -> Self {
        Dispatcher {
            rotbuf,
            next_seq: AtomicU64::new(1),
            clients: parking_lot::RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, sink: Arc<dyn EventSink>) {
        self.clients.write().push(sink);
    }

    /// spec.md §4.6's dispatcher loop, expressed as a `tokio` task instead
    /// of a raw pthread; cancellation is a `CancellationToken` rather than
    /// `pthread_cancel`, per SPEC_FULL.md §4's concurrency-primitive note.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }

            let outcome = self.rotbuf.get_buffer(|count| {
                let seq_start = self.next_seq.fetch_add(count as u64, Ordering::AcqRel);
                (seq_start, count as u64)
            });

            let consumable = match outcome {
                GetBufferOutcome::Consumable(c) => c,
                GetBufferOutcome::Busy | GetBufferOutcome::Empty | GetBufferOutcome::WouldStarve => {
                    continue;
                }
            };

            let clients = Arc::clone(&self);
            self.rotbuf
                .wait_for_completion(consumable, move |records, seq_start, _seq_len| {
                    clients.dispatch(records, seq_start);
                })
                .await;
        }
    }

    /// spec.md §4.6 step 5: iterates registered connections, sending
    /// chunks of at most `NR_IOVEC` records each, every chunk carrying a
    /// distinct monotonically increasing sequence number. Public so a
    /// transport crate driving `rotbuf.wait_for_completion` directly (e.g.
    /// in a test harness) can invoke the same fan-out `run` uses.
    pub fn dispatch(&self, records: Vec<Vec<u8>>, seq_start: u64) {
        let clients = self.clients.read();
        if clients.is_empty() {
            DispatchEvents::emit_dispatch_dropped("no registered reverse connections");
            return;
        }
        for sink in clients.iter().filter(|c| c.wants()) {
            let mut seq = seq_start;
            for chunk in records.chunks(NR_IOVEC) {
                sink.send(seq, chunk);
                seq += 1;
            }
        }
        DispatchEvents::emit_batch_dispatched(clients.len(), records.len(), seq_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        received: StdMutex<Vec<(u64, usize)>>,
    }

    impl EventSink for RecordingSink {
        fn send(&self, seq: u64, chunk: &[Vec<u8>]) {
            self.received.lock().unwrap().push((seq, chunk.len()));
        }
    }

    #[tokio::test]
    async fn dispatch_fans_out_to_every_registered_sink() {
        let rotbuf = Arc::new(RotBuf::with_ring_size(2));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&rotbuf)));
        let sink = Arc::new(RecordingSink {
            received: StdMutex::new(Vec::new()),
        });
        dispatcher.register(sink.clone() as Arc<dyn EventSink>);

        let h = rotbuf.reserve_write(b"one".to_vec()).unwrap();
        rotbuf.write_complete(h);

        let outcome = rotbuf.get_buffer(|n| (1, n as u64));
        let consumable = match outcome {
            GetBufferOutcome::Consumable(c) => c,
            _ => panic!("expected consumable"),
        };
        let dispatcher_clone = Arc::clone(&dispatcher);
        rotbuf
            .wait_for_completion(consumable, move |records, seq_start, _| {
                dispatcher_clone.dispatch(records, seq_start);
            })
            .await;

        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], (1, 1));
    }

    #[test]
    fn no_clients_logs_drop_without_panicking() {
        let rotbuf = Arc::new(RotBuf::with_ring_size(2));
        let dispatcher = Dispatcher::new(rotbuf);
        dispatcher.dispatch(vec![b"x".to_vec()], 1);
    }
}
