use crate::scalar::Value;

/// One `(encoded_key, encoded_value)` pair as returned by a storage range
/// scan (spec.md §3, Chunk).
#[derive(Clone, Debug)]
pub struct ChunkEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A list of `(encoded_key, encoded_value)` pairs returned by one storage
/// range scan (spec.md §3, Chunk).
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    pub entries: Vec<ChunkEntry>,
}

impl Chunk {
    pub fn new(entries: Vec<ChunkEntry>) -> Self {
        Chunk { entries }
    }
}

/// One decoded row: a list of `(field_name, value)` pairs, already
/// projected down to the `SELECT` column list (spec.md §4.5.1).
pub type DecodedRow = Vec<(String, Value)>;
