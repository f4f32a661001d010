//! Sub-query dispatch (spec.md §4.5, `run_sub_qs`): starts one index
//! fan-out per sub-query against its coverage plan. Modeled as an
//! injectable trait so tests can substitute a scripted dispatcher instead
//! of standing up a real `storage_iface` backend (spec.md §4.5, "injectable
//! dispatch function, eases testing").

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qmodel::{NodeId, SubQid, SubQuery, TableDdlRef};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::instrument;

use storage_iface::{ClusterMembership, CoverageSpec, RangeScanBackend, SubQueryEvent};

use crate::WorkerMsg;

#[async_trait]
pub trait SubQueryDispatcher: Send + Sync {
    /// Starts a fan-out for every `(sub_query, sub_qid)` pair, forwarding
    /// chunk/done/error events back to `events_tx` as `WorkerMsg`s. Returns
    /// once fan-out has been *started* for every pair — it does not wait
    /// for completion (spec.md §5, "Sub-query dispatch ... happen in
    /// parallel across storage nodes").
    async fn dispatch(&self, pairs: Vec<(SubQuery, SubQid)>, events_tx: mpsc::Sender<WorkerMsg>);
}

/// The default dispatcher: plans coverage for each sub-query via
/// `coverage::plan`, then starts a range scan against the chosen primary
/// with `colocated` coverage and the configured per-sub-query timeout
/// (spec.md §4.5 Dispatch).
pub struct StorageDispatcher {
    pub node: NodeId,
    pub membership: Arc<dyn ClusterMembership>,
    pub backend: Arc<dyn RangeScanBackend>,
    pub bucket_of: Arc<dyn Fn(&TableDdlRef) -> String + Send + Sync>,
    pub n_val: u32,
    pub timeout: Duration,
}

#[async_trait]
impl SubQueryDispatcher for StorageDispatcher {
    #[instrument(skip(self, pairs, events_tx))]
    async fn dispatch(&self, pairs: Vec<(SubQuery, SubQid)>, events_tx: mpsc::Sender<WorkerMsg>) {
        let mut fan_out: JoinSet<()> = JoinSet::new();

        for (sub_query, sub_qid) in pairs {
            let bucket = (self.bucket_of)(&sub_query.table);
            match coverage::plan(&sub_query, &bucket, self.n_val, self.membership.as_ref()) {
                Ok(plan) => {
                    let backend = self.backend.clone();
                    let timeout = self.timeout;
                    let events_tx = events_tx.clone();
                    let node = plan.node;
                    fan_out.spawn(async move {
                        let (tx, mut rx) = mpsc::channel(32);
                        backend
                            .start_range_scan(&node, &bucket, sub_qid, sub_query, timeout, CoverageSpec::Colocated, tx)
                            .await;
                        while let Some((sub_qid, event)) = rx.recv().await {
                            let msg = match event {
                                SubQueryEvent::Chunk(chunk) => WorkerMsg::Chunk(sub_qid, chunk),
                                SubQueryEvent::Done => WorkerMsg::SubQueryDone(sub_qid),
                                SubQueryEvent::Error(err) => WorkerMsg::SubQueryError(sub_qid, err),
                            };
                            if events_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(err) => {
                    let _ = events_tx.send(WorkerMsg::SubQueryError(sub_qid, err)).await;
                }
            }
        }

        // Drain the fan-out set on its own task so a slow or panicking
        // sub-query scan can't block the caller; completion order doesn't
        // matter here since events already flow to `events_tx` directly.
        tokio::spawn(async move { while fan_out.join_next().await.is_some() {} });
    }
}
