//! Composition root wiring C1-C5 into one runnable process (spec.md §2).
//! Analogous to how the teacher's `binlog_server`/`relay_log_server` modules
//! wire `common`/`connection`/`binlog` libraries into a long-lived process.

use std::sync::Arc;
use std::time::Duration;

use common::config::QueryCoreConfig;
use common::error::QueryError;
use common::lifecycle::Lifecycle;
use qmodel::{DecodedRow, NodeId, Qid, Select, TableDdlRef};
use qqueue::{QueryQueue, QueueEntry};
use qregistry::{CompileRegistry, CompileState};
use qworker::{StorageDispatcher, SubQueryDispatcher, Worker};
use storage_iface::mock::{MockCatalog, MockCodec, MockMembership, MockRangeScan};
use storage_iface::{ClusterMembership, RangeScanBackend, TableCatalog, ValueCodec};
use tokio::sync::oneshot;
use tracing::instrument;

/// Everything one process needs to accept and serve `SELECT`s against the
/// query core (spec.md §2 data flow).
pub struct QueryCore {
    pub registry: Arc<CompileRegistry>,
    pub queue: Arc<QueryQueue>,
    pub catalog: Arc<dyn TableCatalog>,
    pub config: QueryCoreConfig,
    qid_gen: Arc<qmodel::QidGenerator>,
    node: NodeId,
}

impl QueryCore {
    /// Builds the registry and queue, and spawns `n_workers` long-lived
    /// `qworker::Worker` tasks, each fed by `dispatcher`.
    pub fn bootstrap(
        node: impl Into<NodeId>,
        config: QueryCoreConfig,
        catalog: Arc<dyn TableCatalog>,
        dispatcher: Arc<dyn SubQueryDispatcher>,
        codec: Arc<dyn ValueCodec>,
        n_workers: usize,
    ) -> QueryCore {
        let node = node.into();
        let registry = Arc::new(CompileRegistry::create());
        let queue = QueryQueue::new();
        let qid_gen = qmodel::QidGenerator::new(node.clone());

        for i in 0..n_workers {
            let (worker, _handle) =
                Worker::new(format!("{node}-worker-{i}"), queue.clone(), dispatcher.clone(), codec.clone());
            tokio::spawn(worker.run());
        }

        QueryCore { registry, queue, catalog, config, qid_gen, node }
    }

    /// A demo-ready `QueryCore` wired entirely to the in-memory
    /// `storage_iface::mock` doubles -- stands in for the real cluster
    /// membership / range-scan backend, which are external collaborators
    /// out of scope for this core (spec.md §1). Returns the concrete
    /// `MockCatalog` and `MockRangeScan` handles alongside so a caller can
    /// `register` table DDLs and script storage responses before
    /// submitting queries against them.
    pub fn bootstrap_demo(
        node: impl Into<NodeId>,
        config: QueryCoreConfig,
        ring: Vec<NodeId>,
    ) -> (QueryCore, Arc<MockCatalog>, Arc<MockRangeScan>) {
        let node = node.into();
        let mock_catalog = Arc::new(MockCatalog::new());
        let catalog: Arc<dyn TableCatalog> = mock_catalog.clone();
        let membership: Arc<dyn ClusterMembership> = Arc::new(MockMembership::new(ring));
        let mock_backend = Arc::new(MockRangeScan::new());
        let backend: Arc<dyn RangeScanBackend> = mock_backend.clone();
        let codec: Arc<dyn ValueCodec> = Arc::new(MockCodec);

        let dispatcher: Arc<dyn SubQueryDispatcher> = Arc::new(StorageDispatcher {
            node: node.clone(),
            membership,
            backend,
            bucket_of: Arc::new(|ddl: &TableDdlRef| ddl.table_name.clone()),
            n_val: 3,
            timeout: Duration::from_millis(config.query.sub_query_timeout_ms),
        });

        let core = QueryCore::bootstrap(node, config, catalog, dispatcher, codec, 4);
        (core, mock_catalog, mock_backend)
    }

    /// Compiles `select` against its table's DDL and runs it to completion,
    /// mirroring spec.md §2's data flow end to end: compile -> enqueue ->
    /// worker dispatch -> coverage plan -> storage -> reassembled rows.
    #[instrument(skip(self, select))]
    pub async fn submit_select(&self, select: Select) -> Result<Vec<DecodedRow>, QueryError> {
        let table = select.table.clone();
        if let Some(owner) = self.registry.is_compiling(&table) {
            tracing::debug!(table = %table, owner = %owner, "table is compiling, not yet queryable");
            return Err(QueryError::TableInactive(table));
        }

        let ddl = self
            .catalog
            .get_ddl(&table)
            .await
            .map_err(|_| QueryError::MissingHelperModule(table.clone()))?;

        let sub_queries = qcompiler::compile(&select, &ddl, self.config.query.max_quanta_span)?;

        let qid = self.qid_gen.next();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.queue.push(QueueEntry { reply_to: reply_tx, qid, sub_queries, ddl });

        reply_rx.await.map_err(|_| QueryError::Mismanagement("worker dropped the reply channel".into()))?
    }

    /// Marks a table's compile-state row as compiled -- stands in for the
    /// out-of-scope activation/compile pipeline (spec.md §3, "Lifecycles").
    /// The DDL itself must already be registered with whatever
    /// `TableCatalog` this core was bootstrapped with.
    pub fn activate_table(&self, ddl: TableDdlRef, owner: impl Into<String>) {
        let table = ddl.table_name.clone();
        self.registry.insert(table, ddl, owner, CompileState::Compiled);
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }
}

/// `QueryCore` follows the same setup/start/pause/stop shape the teacher's
/// own long-lived server components (`BinlogSubscribe`, `ConnectionServer`)
/// implement `Lifecycle` for. Workers are already spawned by `bootstrap`, so
/// `setup`/`start` are log-only checkpoints here; `pause` has no supported
/// meaning for an already-dispatched query and is a no-op.
impl Lifecycle for QueryCore {
    fn setup(&mut self) {
        tracing::info!(node = %self.node, "query core setup complete");
    }

    fn start(&mut self) {
        tracing::info!(node = %self.node, "query core accepting submissions");
    }

    fn stop(&mut self) {
        tracing::info!(node = %self.node, pending = self.queue.len(), "query core stopping");
    }

    fn pause(&mut self) {
        tracing::warn!(node = %self.node, "pause is not supported once queries are in flight");
    }
}
