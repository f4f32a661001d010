//! Chunk decoding (spec.md §4.5.1): turns a raw storage chunk into the
//! decoded, projected rows a sub-query contributes to the final result.

use qmodel::{Chunk, DecodedRow, Projection};
use storage_iface::ValueCodec;

/// For each `(k, v)` pair in `chunk`: an empty `v` is a tombstone and is
/// skipped; otherwise `v` decodes to a list of `(field, value)` pairs, and
/// the `SELECT` projection is applied (`*` keeps everything, otherwise only
/// the named columns survive, in stored order). The decoded rows for the
/// sub-query are the concatenation across all surviving `v` (spec.md
/// §4.5.1).
pub fn decode_chunk(chunk: &Chunk, projection: &Projection, codec: &dyn ValueCodec) -> Vec<DecodedRow> {
    let mut rows = Vec::with_capacity(chunk.entries.len());
    for entry in &chunk.entries {
        let Some(cells) = codec.decode_value(&entry.value) else {
            continue; // tombstone
        };
        let row: DecodedRow = cells.into_iter().filter(|(field, _)| projection.keeps(field)).collect();
        rows.push(row);
    }
    rows
}
