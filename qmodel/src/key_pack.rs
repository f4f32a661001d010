use crate::compiled::KeyPart;
use crate::ddl::TableDdl;
use crate::scalar::Value;

/// Packs the *partition key*'s `(field, value)` pairs out of a `startkey`
/// into an engine-level key, in partition-key order (spec.md §4.3 Coverage
/// planner, step 1): records sharing the same partition key must hash to
/// the same placement, so only the partition key's direct fields (plus the
/// quantum field) are packed here, in `ddl.partition_key` order -- *not*
/// the local-key order `startkey` itself is built in, which may list extra
/// local-key-only fields or list the shared fields in a different order.
///
/// The wire format itself is the storage engine's concern; this produces a
/// deterministic, order-preserving byte string good enough to hash and to
/// compare in tests.
pub fn pack_startkey(ddl: &TableDdl, startkey: &[KeyPart]) -> Vec<u8> {
    let mut buf = Vec::new();
    for component in &ddl.partition_key {
        let field = component.field_name();
        if let Some(part) = startkey.iter().find(|p| p.field == field) {
            pack_value(&part.value, &mut buf);
        }
        buf.push(0); // field separator
    }
    buf
}

fn pack_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Varchar(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Sint64(i) => buf.extend_from_slice(&i.to_be_bytes()),
        Value::Double(d) => buf.extend_from_slice(&d.to_be_bytes()),
        Value::Timestamp(ts) => buf.extend_from_slice(&ts.to_be_bytes()),
        Value::Boolean(b) => buf.push(*b as u8),
    }
}
