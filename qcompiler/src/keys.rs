use common::error::QueryError;
use qmodel::{CompOp, KeyPart, Literal, TableDdl, Value};

use crate::bounds::QuantumBounds;

/// Local-key-ordered `startkey`/`endkey` tuples plus the inclusivity flags
/// they imply (spec.md §4.2 Step E).
pub struct CompiledKeys {
    pub startkey: Vec<KeyPart>,
    pub endkey: Vec<KeyPart>,
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

pub fn build_keys(
    ddl: &TableDdl,
    bounds: &QuantumBounds,
    key_bindings: &[(String, Literal)],
) -> Result<CompiledKeys, QueryError> {
    let quantum_field = ddl.quantum_field();
    let mut startkey = Vec::with_capacity(ddl.local_key.len());
    let mut endkey = Vec::with_capacity(ddl.local_key.len());

    for field in &ddl.local_key {
        if field == quantum_field {
            startkey.push(KeyPart::new(field.clone(), Value::Timestamp(bounds.lower_ts)));
            endkey.push(KeyPart::new(field.clone(), Value::Timestamp(bounds.upper_ts)));
            continue;
        }
        let (_, literal) = key_bindings
            .iter()
            .find(|(f, _)| f == field)
            .ok_or_else(|| QueryError::MissingKeyField(field.clone()))?;
        let ty = ddl
            .field_type(field)
            .ok_or_else(|| QueryError::InvalidQuery(format!("unknown field `{field}`")))?;
        let value = Value::coerce(ty, literal)?;
        startkey.push(KeyPart::new(field.clone(), value.clone()));
        endkey.push(KeyPart::new(field.clone(), value));
    }

    Ok(CompiledKeys {
        startkey,
        endkey,
        start_inclusive: bounds.lower_op != CompOp::Gt,
        end_inclusive: bounds.upper_op == CompOp::Le,
    })
}
