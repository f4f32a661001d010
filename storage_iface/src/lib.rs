//! Trait boundaries for everything spec.md marks out of scope: the SQL
//! parser, the K/V get/put/delete path, the storage range-scan engine, the
//! wire-protocol decoder, and cluster ring/hash-bin membership. The query
//! core (`qcompiler`, `coverage`, `qworker`) depends only on these traits;
//! a real deployment wires in implementations that talk to the actual
//! cluster, and tests wire in the in-memory doubles under `testing`.

#[cfg(any(test, feature = "testing"))]
pub mod mock;

use async_trait::async_trait;
use common::error::QueryError;
use qmodel::{Chunk, NodeId, SubQid, SubQuery, TableDdlRef, Value};
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-table helper module (spec.md §6, "Helper module per table").
#[async_trait]
pub trait TableCatalog: Send + Sync {
    async fn get_ddl(&self, table: &str) -> Result<TableDdlRef, QueryError>;
}

/// Cluster ring/hash-bin membership (spec.md §6, "Cluster membership").
pub trait ClusterMembership: Send + Sync {
    /// Hashes `(bucket, encoded_key)` to a document index on the ring.
    fn chash_key(&self, bucket: &str, encoded_key: &[u8]) -> u64;

    /// Primary owners of `doc_idx` at replication factor `n_val`, in ring
    /// order. Fallbacks are never consulted by the coverage planner
    /// (spec.md §4.3) — an empty list means no primary is available.
    fn primary_owners(&self, doc_idx: u64, n_val: u32) -> Vec<NodeId>;
}

/// Coverage requested from a range scan. The core only ever asks for
/// `Colocated` (primary only, no fallback fan-out — spec.md §4.5 Dispatch).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CoverageSpec {
    Colocated,
}

/// One event a range scan reports back to its caller (spec.md §6, "Storage
/// range scan").
#[derive(Clone, Debug)]
pub enum SubQueryEvent {
    Chunk(Chunk),
    Done,
    Error(QueryError),
}

/// The storage engine's range-scan entry point (spec.md §6).
#[async_trait]
pub trait RangeScanBackend: Send + Sync {
    /// Starts a range scan for `sub_query` against `bucket` on `node`,
    /// streaming `(SubQid, SubQueryEvent)` pairs to `reply_to` until a
    /// `Done` or `Error` event, or until `timeout` elapses (in which case
    /// the backend itself reports a timeout `Error`).
    #[allow(clippy::too_many_arguments)]
    async fn start_range_scan(
        &self,
        node: &NodeId,
        bucket: &str,
        sub_qid: SubQid,
        sub_query: SubQuery,
        timeout: Duration,
        coverage: CoverageSpec,
        reply_to: mpsc::Sender<(SubQid, SubQueryEvent)>,
    );
}

/// Decodes one storage object's encoded value into `(field, value)` pairs.
/// Returns `None` for a tombstone (spec.md §4.5.1, step 2) — the wire
/// format itself is the storage engine's concern.
pub trait ValueCodec: Send + Sync {
    fn decode_value(&self, encoded: &[u8]) -> Option<Vec<(String, Value)>>;
}
