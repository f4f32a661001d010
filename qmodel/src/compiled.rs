use crate::ast::{Projection, WhereExpr};
use crate::ddl::TableDdlRef;
use crate::scalar::{ScalarType, Value};

/// One `(field, type, value)` tuple, covering one position of the local key
/// (spec.md §3, Compiled WHERE).
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPart {
    pub field: String,
    pub scalar_type: ScalarType,
    pub value: Value,
}

impl KeyPart {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        let scalar_type = value.scalar_type();
        KeyPart { field: field.into(), scalar_type, value }
    }
}

/// A compiled `WHERE` clause: a full local-key range plus a residual filter
/// (spec.md §3, Compiled WHERE).
#[derive(Clone, Debug)]
pub struct CompiledWhere {
    pub startkey: Vec<KeyPart>,
    pub endkey: Vec<KeyPart>,
    pub filter: Option<WhereExpr>,
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

impl CompiledWhere {
    /// Defaults per spec.md §3/§4.2 Step E: start inclusive, end exclusive.
    pub fn new(startkey: Vec<KeyPart>, endkey: Vec<KeyPart>, filter: Option<WhereExpr>) -> Self {
        CompiledWhere { startkey, endkey, filter, start_inclusive: true, end_inclusive: false }
    }
}

/// A compiled `SELECT` whose `WHERE` is a single quantum-aligned window
/// (spec.md §3, Sub-query).
#[derive(Clone, Debug)]
pub struct SubQuery {
    pub table: TableDdlRef,
    pub columns: Projection,
    pub compiled_where: CompiledWhere,
}
