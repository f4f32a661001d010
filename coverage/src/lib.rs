//! Coverage planner (spec.md §4.3, component C3): for one sub-query,
//! derives the storage key and picks the single primary owner vnode. No
//! fallbacks — a sub-query is served by a primary or it fails outright,
//! since partial results from a fallback would be incorrect.

use common::error::QueryError;
use qmodel::{pack_startkey, NodeId, SubQuery};
use storage_iface::ClusterMembership;
use tracing::instrument;

/// A coverage plan for one sub-query: the chosen primary node and (always
/// empty, per spec) filter list.
#[derive(Clone, Debug)]
pub struct CoveragePlan {
    pub node: NodeId,
    pub filters: Vec<()>,
}

/// `plan(sub_query, bucket, n_val) -> (node, filters) | error` (spec.md §4.3).
///
/// 1. Packs the sub-query's `startkey` in partition-key order.
/// 2. Hashes `(bucket, encoded_key)` to a document index.
/// 3. Asks membership for the primaries at `n_val`.
/// 4. Returns the first primary, or `NoPrimariesAvailable` if none exist.
#[instrument(skip(sub_query, membership), fields(bucket = %bucket))]
pub fn plan(
    sub_query: &SubQuery,
    bucket: &str,
    n_val: u32,
    membership: &dyn ClusterMembership,
) -> Result<CoveragePlan, QueryError> {
    let encoded_key = pack_startkey(&sub_query.table, &sub_query.compiled_where.startkey);
    let doc_idx = membership.chash_key(bucket, &encoded_key);
    let primaries = membership.primary_owners(doc_idx, n_val);

    let node = primaries.into_iter().next().ok_or(QueryError::NoPrimariesAvailable)?;
    Ok(CoveragePlan { node, filters: Vec::new() })
}
