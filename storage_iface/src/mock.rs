//! In-memory test doubles for the traits in this crate. Hand-written, not
//! generated by a mocking framework — the same style the teacher workspace
//! uses for its own fixtures (`schema::mock`).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use common::error::QueryError;
use qmodel::{Chunk, NodeId, SubQid, SubQuery, TableDdlRef, Value};
use tokio::sync::mpsc;

use crate::{ClusterMembership, CoverageSpec, RangeScanBackend, SubQueryEvent, TableCatalog, ValueCodec};

/// A fixed table catalog backed by a map built up front.
#[derive(Default)]
pub struct MockCatalog {
    tables: RwLock<HashMap<String, TableDdlRef>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        MockCatalog::default()
    }

    pub fn register(&self, ddl: TableDdlRef) {
        self.tables.write().unwrap().insert(ddl.table_name.clone(), ddl);
    }
}

#[async_trait]
impl TableCatalog for MockCatalog {
    async fn get_ddl(&self, table: &str) -> Result<TableDdlRef, QueryError> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| QueryError::NotFound(table.to_string()))
    }
}

/// A ring with a fixed, explicit owner list per document index modulo the
/// ring size — good enough to exercise the coverage planner without a real
/// consistent-hash ring.
pub struct MockMembership {
    pub ring: Vec<NodeId>,
}

impl MockMembership {
    pub fn new(ring: Vec<NodeId>) -> Self {
        MockMembership { ring }
    }
}

impl ClusterMembership for MockMembership {
    fn chash_key(&self, bucket: &str, encoded_key: &[u8]) -> u64 {
        // fnv-1a, good enough for deterministic test placement
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in bucket.as_bytes().iter().chain(encoded_key.iter()) {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    fn primary_owners(&self, doc_idx: u64, n_val: u32) -> Vec<NodeId> {
        if self.ring.is_empty() {
            return vec![];
        }
        let start = (doc_idx as usize) % self.ring.len();
        (0..n_val as usize)
            .map(|i| self.ring[(start + i) % self.ring.len()].clone())
            .collect()
    }
}

/// A scripted range-scan backend: each call consumes the next queued
/// response for the target node, or replies with an error if the queue is
/// empty.
#[derive(Default)]
pub struct MockRangeScan {
    responses: RwLock<HashMap<NodeId, Vec<SubQueryEvent>>>,
}

impl MockRangeScan {
    pub fn new() -> Self {
        MockRangeScan::default()
    }

    /// Queues `events` to be replayed, in order, the next time `node` is scanned.
    pub fn queue(&self, node: impl Into<NodeId>, events: Vec<SubQueryEvent>) {
        self.responses.write().unwrap().insert(node.into(), events);
    }
}

#[async_trait]
impl RangeScanBackend for MockRangeScan {
    async fn start_range_scan(
        &self,
        node: &NodeId,
        _bucket: &str,
        sub_qid: SubQid,
        _sub_query: SubQuery,
        _timeout: Duration,
        _coverage: CoverageSpec,
        reply_to: mpsc::Sender<(SubQid, SubQueryEvent)>,
    ) {
        let events = self.responses.write().unwrap().remove(node).unwrap_or_else(|| vec![SubQueryEvent::Done]);
        for event in events {
            let _ = reply_to.send((sub_qid.clone(), event)).await;
        }
    }
}

/// A length-prefixed encoding good enough to round-trip `Value`s in tests.
/// Empty bytes decode as a tombstone (spec.md §4.5.1, step 2).
pub struct MockCodec;

impl ValueCodec for MockCodec {
    fn decode_value(&self, encoded: &[u8]) -> Option<Vec<(String, Value)>> {
        if encoded.is_empty() {
            return None;
        }
        let mut cells = vec![];
        let mut pos = 0;
        while pos < encoded.len() {
            let name_len = encoded[pos] as usize;
            pos += 1;
            let name = String::from_utf8(encoded[pos..pos + name_len].to_vec()).unwrap();
            pos += name_len;
            let tag = encoded[pos];
            pos += 1;
            let value = match tag {
                0 => {
                    let len = u32::from_be_bytes(encoded[pos..pos + 4].try_into().unwrap()) as usize;
                    pos += 4;
                    let s = String::from_utf8(encoded[pos..pos + len].to_vec()).unwrap();
                    pos += len;
                    Value::Varchar(s)
                }
                1 => {
                    let v = i64::from_be_bytes(encoded[pos..pos + 8].try_into().unwrap());
                    pos += 8;
                    Value::Sint64(v)
                }
                2 => {
                    let v = f64::from_be_bytes(encoded[pos..pos + 8].try_into().unwrap());
                    pos += 8;
                    Value::Double(v)
                }
                3 => {
                    let v = i64::from_be_bytes(encoded[pos..pos + 8].try_into().unwrap());
                    pos += 8;
                    Value::Timestamp(v)
                }
                4 => {
                    let v = encoded[pos] != 0;
                    pos += 1;
                    Value::Boolean(v)
                }
                _ => panic!("unknown value tag {tag}"),
            };
            cells.push((name, value));
        }
        Some(cells)
    }
}

/// Encodes `cells` with [`MockCodec`]'s scheme, for building test chunks.
pub fn encode_cells(cells: &[(&str, Value)]) -> Vec<u8> {
    let mut buf = vec![];
    for (name, value) in cells {
        buf.push(name.len() as u8);
        buf.extend_from_slice(name.as_bytes());
        match value {
            Value::Varchar(s) => {
                buf.push(0);
                buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Sint64(v) => {
                buf.push(1);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Double(v) => {
                buf.push(2);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Timestamp(v) => {
                buf.push(3);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Boolean(v) => {
                buf.push(4);
                buf.push(*v as u8);
            }
        }
    }
    buf
}

pub fn tombstone() -> Chunk {
    Chunk::new(vec![qmodel::ChunkEntry { key: vec![1], value: vec![] }])
}
