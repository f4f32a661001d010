//! Query queue (spec.md §4.4, component C4): a single, process-wide
//! blocking FIFO from which workers pull the next ready query.
//!
//! Generalizes the data-structure shape of a `Mutex<VecDeque<T>>` push/pop
//! queue to the async world with a `tokio::sync::Notify`, so a worker can
//! suspend on `blocking_pop` without spinning (spec.md §5 "Suspension
//! points").

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use qmodel::{DecodedRow, Qid, SubQuery, TableDdlRef};
use tokio::sync::{oneshot, Notify};
use tracing::instrument;

use common::error::QueryError;

/// One item in the queue: everything a worker needs to drive a query to
/// completion (spec.md §4.4).
pub struct QueueEntry {
    pub reply_to: oneshot::Sender<Result<Vec<DecodedRow>, QueryError>>,
    pub qid: Qid,
    pub sub_queries: Vec<SubQuery>,
    pub ddl: TableDdlRef,
}

/// The single process-wide FIFO (spec.md §4.4). Producers enqueue from the
/// public submission API (out of scope for the core); workers drive it via
/// `blocking_pop`.
#[derive(Default)]
pub struct QueryQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    notify: Notify,
}

impl QueryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(QueryQueue::default())
    }

    /// Enqueues `entry`, waking at most one waiting consumer.
    #[instrument(skip(self, entry), fields(qid.seq = entry.qid.seq))]
    pub fn push(&self, entry: QueueEntry) {
        self.entries.lock().unwrap().push_back(entry);
        self.notify.notify_one();
    }

    /// Blocks until an entry is available, then pops and returns it
    /// (spec.md §4.4, "exactly one operation relevant to the core").
    #[instrument(skip(self))]
    pub async fn blocking_pop(&self) -> QueueEntry {
        loop {
            if let Some(entry) = self.entries.lock().unwrap().pop_front() {
                return entry;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmodel::{FieldDef, KeyComponent, Quantum, QuantumUnit, ScalarType, TableDdl};

    fn dummy_ddl() -> TableDdlRef {
        TableDdl::new(
            "GeoCheckin",
            vec![FieldDef { name: "time".into(), scalar_type: ScalarType::Timestamp, nullable: false }],
            vec![KeyComponent::Quantum(Quantum { field: "time".into(), n: 1, unit: QuantumUnit::Seconds })],
            vec!["time".into()],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn pop_returns_entries_in_fifo_order() {
        let queue = QueryQueue::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        queue.push(QueueEntry {
            reply_to: tx1,
            qid: Qid { node: "n".into(), seq: 1 },
            sub_queries: vec![],
            ddl: dummy_ddl(),
        });
        queue.push(QueueEntry {
            reply_to: tx2,
            qid: Qid { node: "n".into(), seq: 2 },
            sub_queries: vec![],
            ddl: dummy_ddl(),
        });

        let first = queue.blocking_pop().await;
        let second = queue.blocking_pop().await;
        assert_eq!(first.qid.seq, 1);
        assert_eq!(second.qid.seq, 2);
    }

    #[tokio::test]
    async fn blocking_pop_suspends_until_an_entry_is_pushed() {
        let queue = QueryQueue::new();
        assert!(queue.is_empty());

        let queue2 = queue.clone();
        let popped = tokio::spawn(async move { queue2.blocking_pop().await });

        tokio::task::yield_now().await;
        let (tx, _rx) = oneshot::channel();
        queue.push(QueueEntry {
            reply_to: tx,
            qid: Qid { node: "n".into(), seq: 7 },
            sub_queries: vec![],
            ddl: dummy_ddl(),
        });

        let entry = popped.await.unwrap();
        assert_eq!(entry.qid.seq, 7);
    }
}
