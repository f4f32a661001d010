//! Query worker (spec.md §4.5, component C5): a long-lived, single-task
//! coordinator that owns exactly one query at a time. It fans sub-queries
//! out to storage, accumulates chunked replies in arrival order, and
//! emits the final row set in coverage-plan order.
//!
//! Mapped onto a `tokio::task` with an `mpsc::Receiver<WorkerMsg>` inbox
//! (spec.md §9 "coroutine-style control flow"): the three message kinds
//! (chunk, done, error) plus the internal `PopNextQuery` self-message are
//! one `WorkerMsg` enum, matched in the worker's receive loop.

pub mod decode;
pub mod dispatch;

use std::collections::HashSet;
use std::sync::Arc;

use qmodel::{Chunk, DecodedRow, NodeId, Projection, Qid, SubQid, SubQuery};
use qqueue::{QueryQueue, QueueEntry};
use storage_iface::ValueCodec;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

use common::error::QueryError;

pub use dispatch::{StorageDispatcher, SubQueryDispatcher};

/// The worker's inbox message shape (spec.md §4.5, §9).
#[derive(Debug)]
pub enum WorkerMsg {
    /// Self-message: re-enter the idle state and block on the queue.
    PopNextQuery,
    Chunk(SubQid, Chunk),
    SubQueryDone(SubQid),
    SubQueryError(SubQid, QueryError),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Status {
    Void,
    AccumulatingChunks,
}

/// A handle a dispatcher (or a test) can use to post messages into a
/// worker's inbox, without owning the worker task itself.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerMsg>,
}

impl WorkerHandle {
    pub async fn send(&self, msg: WorkerMsg) {
        let _ = self.tx.send(msg).await;
    }
}

/// The per-query coordinator (spec.md §4.5, "State").
pub struct Worker {
    name: NodeId,
    queue: Arc<QueryQueue>,
    dispatcher: Arc<dyn SubQueryDispatcher>,
    codec: Arc<dyn ValueCodec>,

    inbox: mpsc::Receiver<WorkerMsg>,
    self_tx: mpsc::Sender<WorkerMsg>,

    qid: Option<Qid>,
    reply_to: Option<oneshot::Sender<Result<Vec<DecodedRow>, QueryError>>>,
    projection: Option<Projection>,
    sub_qrys: HashSet<usize>,
    status: Status,
    result: Vec<(usize, Vec<DecodedRow>)>,
}

impl Worker {
    /// Builds an idle worker plus a [`WorkerHandle`] sharing its inbox --
    /// the same handle the default [`StorageDispatcher`] uses internally
    /// to relay storage events back in.
    pub fn new(
        name: impl Into<NodeId>,
        queue: Arc<QueryQueue>,
        dispatcher: Arc<dyn SubQueryDispatcher>,
        codec: Arc<dyn ValueCodec>,
    ) -> (Worker, WorkerHandle) {
        let (tx, rx) = mpsc::channel(128);
        let worker = Worker {
            name: name.into(),
            queue,
            dispatcher,
            codec,
            inbox: rx,
            self_tx: tx.clone(),
            qid: None,
            reply_to: None,
            projection: None,
            sub_qrys: HashSet::new(),
            status: Status::Void,
            result: Vec::new(),
        };
        (worker, WorkerHandle { tx })
    }

    /// Runs the worker's receive loop forever. After initialisation and
    /// after each completed query, the worker sends itself `PopNextQuery`
    /// and re-enters the idle state (spec.md §4.5, "Idle behaviour").
    #[instrument(skip(self), fields(worker = %self.name))]
    pub async fn run(mut self) {
        let _ = self.self_tx.send(WorkerMsg::PopNextQuery).await;
        while let Some(msg) = self.inbox.recv().await {
            self.handle(msg).await;
        }
    }

    async fn handle(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::PopNextQuery => self.on_pop_next_query().await,
            WorkerMsg::Chunk(sub_qid, chunk) => self.on_chunk(sub_qid, chunk).await,
            WorkerMsg::SubQueryDone(sub_qid) => self.on_done(sub_qid).await,
            WorkerMsg::SubQueryError(sub_qid, err) => self.on_error(sub_qid, err).await,
        }
    }

    async fn on_pop_next_query(&mut self) {
        let entry = self.queue.blocking_pop().await;
        self.execute(entry).await;
    }

    /// Assigns indices `1..N` to the sub-queries, dispatches them, then
    /// updates state (spec.md §4.5, "Execute"). If `execute` is somehow
    /// invoked while a query is already in flight, that is the
    /// `mismanagement` bug case (spec.md §7): the entry is failed and the
    /// worker goes back to waiting for the next one, rather than silently
    /// clobbering the in-flight query's state.
    async fn execute(&mut self, entry: QueueEntry) {
        if self.status != Status::Void || self.qid.is_some() {
            tracing::error!(worker = %self.name, "execute called while a query is already in flight");
            let _ = entry
                .reply_to
                .send(Err(QueryError::Mismanagement("execute called while status != void".into())));
            let _ = self.self_tx.send(WorkerMsg::PopNextQuery).await;
            return;
        }

        let QueueEntry { reply_to, qid, sub_queries, ddl: _ } = entry;
        let n = sub_queries.len();
        let projection = sub_queries.first().map(|sq| sq.columns.clone()).unwrap_or(Projection::Star);

        let pairs: Vec<(SubQuery, SubQid)> = sub_queries
            .into_iter()
            .enumerate()
            .map(|(idx, sub_query)| (sub_query, SubQid { index: idx + 1, qid: qid.clone() }))
            .collect();

        self.dispatcher.dispatch(pairs, self.self_tx.clone()).await;

        self.qid = Some(qid);
        self.reply_to = Some(reply_to);
        self.projection = Some(projection);
        self.sub_qrys = (1..=n).collect();
        self.status = Status::Void;
        self.result = Vec::new();
    }

    /// Incoming chunk (spec.md §4.5): late (mismatched qid) and
    /// already-completed indices are silently ignored; otherwise the chunk
    /// is decoded and prepended to the accumulator. A sub-query yields
    /// exactly one accepted chunk -- later chunks for the same index are
    /// discarded (spec.md §9, open question).
    async fn on_chunk(&mut self, sub_qid: SubQid, chunk: Chunk) {
        if !self.matches_current(&sub_qid.qid) {
            tracing::debug!(worker = %self.name, index = sub_qid.index, "late chunk for a stale qid, discarding");
            return;
        }
        if !self.sub_qrys.contains(&sub_qid.index) {
            return;
        }
        let projection = self.projection.clone().unwrap_or(Projection::Star);
        let decoded = decode::decode_chunk(&chunk, &projection, self.codec.as_ref());
        self.result.insert(0, (sub_qid.index, decoded));
        self.sub_qrys.remove(&sub_qid.index);
        self.status = Status::AccumulatingChunks;
    }

    /// Incoming done (spec.md §4.5): only finalises once every sub-query
    /// index has yielded its chunk.
    async fn on_done(&mut self, sub_qid: SubQid) {
        if !self.matches_current(&sub_qid.qid) {
            tracing::debug!(worker = %self.name, index = sub_qid.index, "late done for a stale qid, discarding");
            return;
        }
        if !self.sub_qrys.is_empty() {
            return;
        }
        self.finish_ok().await;
    }

    /// Incoming error (spec.md §4.5): the first error wins; the query is
    /// aborted with no partial results and the worker advances.
    async fn on_error(&mut self, sub_qid: SubQid, err: QueryError) {
        if !self.matches_current(&sub_qid.qid) {
            tracing::debug!(worker = %self.name, index = sub_qid.index, "late error for a stale qid, discarding");
            return;
        }
        if let Some(reply_to) = self.reply_to.take() {
            let _ = reply_to.send(Err(err));
        }
        self.reset();
        let _ = self.self_tx.send(WorkerMsg::PopNextQuery).await;
    }

    /// Sorts the accumulator by index ascending, concatenates the per-index
    /// row lists, and replies (spec.md §4.5, "Incoming done").
    async fn finish_ok(&mut self) {
        let mut result = std::mem::take(&mut self.result);
        result.sort_by_key(|(index, _)| *index);
        let rows: Vec<DecodedRow> = result.into_iter().flat_map(|(_, rows)| rows).collect();
        if let Some(reply_to) = self.reply_to.take() {
            let _ = reply_to.send(Ok(rows));
        }
        self.reset();
        let _ = self.self_tx.send(WorkerMsg::PopNextQuery).await;
    }

    fn matches_current(&self, qid: &Qid) -> bool {
        self.qid.as_ref() == Some(qid)
    }

    fn reset(&mut self) {
        self.qid = None;
        self.reply_to = None;
        self.projection = None;
        self.sub_qrys.clear();
        self.status = Status::Void;
        self.result.clear();
    }
}
