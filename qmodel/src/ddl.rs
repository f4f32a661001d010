use std::sync::Arc;

use common::error::QueryError;

use crate::scalar::ScalarType;

/// One `N·unit` quantum bucket size (spec.md §3, GLOSSARY).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QuantumUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl QuantumUnit {
    pub fn as_millis(&self) -> i64 {
        match self {
            QuantumUnit::Seconds => 1_000,
            QuantumUnit::Minutes => 60_000,
            QuantumUnit::Hours => 3_600_000,
            QuantumUnit::Days => 86_400_000,
        }
    }
}

/// A `quantum(field, N, unit)` partition-key component.
#[derive(Clone, Debug)]
pub struct Quantum {
    pub field: String,
    pub n: u32,
    pub unit: QuantumUnit,
}

impl Quantum {
    /// Width of one bucket, in milliseconds.
    pub fn width_millis(&self) -> i64 {
        self.n as i64 * self.unit.as_millis()
    }

    /// Rounds `ts` (epoch millis) down to the start of its bucket.
    pub fn floor(&self, ts: i64) -> i64 {
        let width = self.width_millis();
        ts.div_euclid(width) * width
    }
}

/// One partition-key component: either a direct field reference or the
/// table's single quantum component.
#[derive(Clone, Debug)]
pub enum KeyComponent {
    Param(String),
    Quantum(Quantum),
}

impl KeyComponent {
    pub fn field_name(&self) -> &str {
        match self {
            KeyComponent::Param(f) => f,
            KeyComponent::Quantum(q) => &q.field,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub scalar_type: ScalarType,
    pub nullable: bool,
}

/// Immutable description of a table (spec.md §3, Table DDL). Built once by
/// table activation (out of scope) and shared read-only thereafter, the
/// way the teacher shares `schema::schema::Table` by `Arc`.
#[derive(Clone, Debug)]
pub struct TableDdl {
    pub table_name: String,
    pub fields: Vec<FieldDef>,
    pub partition_key: Vec<KeyComponent>,
    pub local_key: Vec<String>,
}

pub type TableDdlRef = Arc<TableDdl>;

impl TableDdl {
    /// Validates the invariants in spec.md §3: exactly one quantum
    /// component, always last in the partition key; the local key is a
    /// superset of the partition key's direct fields and lists the
    /// quantum's base field last.
    pub fn new(
        table_name: impl Into<String>,
        fields: Vec<FieldDef>,
        partition_key: Vec<KeyComponent>,
        local_key: Vec<String>,
    ) -> Result<TableDdlRef, QueryError> {
        let quantum_positions: Vec<usize> = partition_key
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, KeyComponent::Quantum(_)).then_some(i))
            .collect();
        if quantum_positions.len() != 1 {
            return Err(QueryError::InvalidQuery(format!(
                "partition key must have exactly one quantum component, found {}",
                quantum_positions.len()
            )));
        }
        if quantum_positions[0] != partition_key.len() - 1 {
            return Err(QueryError::InvalidQuery(
                "the quantum component must be the last partition key component".into(),
            ));
        }
        let quantum_field = partition_key[quantum_positions[0]].field_name().to_string();
        if local_key.last().map(String::as_str) != Some(quantum_field.as_str()) {
            return Err(QueryError::InvalidQuery(
                "the local key must end with the quantum's base field".into(),
            ));
        }
        for component in &partition_key {
            if let KeyComponent::Param(f) = component {
                if !local_key.iter().any(|lk| lk == f) {
                    return Err(QueryError::InvalidQuery(format!(
                        "local key must be a superset of the partition key; missing `{f}`"
                    )));
                }
            }
        }
        Ok(Arc::new(TableDdl { table_name: table_name.into(), fields, partition_key, local_key }))
    }

    pub fn field_type(&self, name: &str) -> Option<ScalarType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.scalar_type)
    }

    pub fn quantum(&self) -> &Quantum {
        self.partition_key
            .iter()
            .find_map(|c| match c {
                KeyComponent::Quantum(q) => Some(q),
                _ => None,
            })
            .expect("TableDdl::new enforces exactly one quantum component")
    }

    pub fn quantum_field(&self) -> &str {
        &self.quantum().field
    }

    /// Non-quantum fields in the local key, in local-key order.
    pub fn non_quantum_local_fields(&self) -> impl Iterator<Item = &str> {
        let quantum_field = self.quantum_field().to_string();
        self.local_key.iter().map(String::as_str).filter(move |f| *f != quantum_field)
    }
}
