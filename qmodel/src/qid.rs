use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Identity of the cluster node hosting a query worker.
pub type NodeId = String;

/// `(owning_node, monotonic_counter)`, unique within the cluster's lifetime
/// (spec.md §3, Query identifier).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Qid {
    pub node: NodeId,
    pub seq: i64,
}

/// `(index, QID)`, the 1-based position of a sub-query in coverage-plan
/// order (spec.md §3, Sub-query identifier).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubQid {
    pub index: usize,
    pub qid: Qid,
}

/// Mints `Qid`s for one node. Mirrors the request-id counter pattern used
/// for wire request ids elsewhere in the stack (an `AtomicI64` bumped on
/// every dispatch).
#[derive(Debug)]
pub struct QidGenerator {
    node: NodeId,
    counter: AtomicI64,
}

impl QidGenerator {
    pub fn new(node: impl Into<NodeId>) -> Arc<Self> {
        Arc::new(QidGenerator { node: node.into(), counter: AtomicI64::new(0) })
    }

    pub fn next(&self) -> Qid {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        Qid { node: self.node.clone(), seq }
    }
}
