//! Query compiler (spec.md §4.2, component C2): validates a `SELECT`'s
//! `WHERE` clause against a table's DDL and expands it into one compiled
//! sub-query per quantum window it crosses.

pub mod bounds;
pub mod expand;
pub mod flatten;
pub mod keys;

use common::error::QueryError;
use qmodel::{CompiledWhere, Projection, Select, SubQuery, TableDdlRef};
use tracing::instrument;

pub use expand::expand_on_quantum_boundaries;

/// Entry contract (spec.md §4.2): fails immediately with `AlreadyCompiled`
/// if `select.is_executable`, and with `FullTableScanUnsupported` if the
/// projection list is empty. Otherwise runs Steps A-F and returns the
/// ordered list of executable sub-queries.
#[instrument(skip(select, ddl), fields(table = %ddl.table_name))]
pub fn compile(select: &Select, ddl: &TableDdlRef, max_quanta_span: u32) -> Result<Vec<SubQuery>, QueryError> {
    if select.is_executable {
        return Err(QueryError::AlreadyCompiled);
    }
    if select.columns.is_empty() {
        return Err(QueryError::FullTableScanUnsupported);
    }

    // Step A: flatten the WHERE into a working set.
    let items = flatten::flatten(&select.where_clause);

    // Step B: extract the quantum field's lower/upper bounds.
    let quantum_field = ddl.quantum_field().to_string();
    let (quantum_bounds, mut residual) = bounds::extract_quantum_bounds(&items, &quantum_field)?;

    // Step C: bind the remaining local-key fields by equality.
    let key_bindings = bounds::bind_key_fields(ddl, &mut residual)?;

    // Step D: type and normalise the residual filter.
    let filter = bounds::rebuild_filter(residual, ddl)?;

    // Step E: build the startkey/endkey template and inclusivity flags.
    let compiled_keys = keys::build_keys(ddl, &quantum_bounds, &key_bindings)?;

    // Step F: expand across quantum boundaries.
    let windows = expand_on_quantum_boundaries(
        ddl.quantum(),
        quantum_bounds.lower_ts,
        quantum_bounds.upper_ts,
        max_quanta_span,
    )?;

    let n = windows.len();
    let sub_queries = windows
        .into_iter()
        .enumerate()
        .map(|(i, (lo, hi))| {
            let mut startkey = compiled_keys.startkey.clone();
            let mut endkey = compiled_keys.endkey.clone();
            if let Some(last) = startkey.last_mut() {
                last.value = qmodel::Value::Timestamp(lo);
            }
            if let Some(last) = endkey.last_mut() {
                last.value = qmodel::Value::Timestamp(hi);
            }

            let mut compiled = CompiledWhere::new(startkey, endkey, filter.clone());
            // Only the first sub-query may carry start_inclusive, only the
            // last may carry end_inclusive (spec.md §4.2 Step F).
            if i == 0 {
                compiled.start_inclusive = compiled_keys.start_inclusive;
            }
            if i == n - 1 {
                compiled.end_inclusive = compiled_keys.end_inclusive;
            }

            SubQuery { table: ddl.clone(), columns: select.columns.clone(), compiled_where: compiled }
        })
        .collect();

    Ok(sub_queries)
}

/// Convenience used by tests and callers who only care about the column
/// list, not the full `Select` machinery.
pub fn star() -> Projection {
    Projection::Star
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmodel::{CompOp, FieldDef, KeyComponent, Literal, Quantum, QuantumUnit, ScalarType, TableDdl, WhereExpr};

    fn geo_checkin() -> TableDdlRef {
        TableDdl::new(
            "GeoCheckin",
            vec![
                FieldDef { name: "location".into(), scalar_type: ScalarType::Varchar, nullable: false },
                FieldDef { name: "user".into(), scalar_type: ScalarType::Varchar, nullable: false },
                FieldDef { name: "time".into(), scalar_type: ScalarType::Timestamp, nullable: false },
                FieldDef { name: "weather".into(), scalar_type: ScalarType::Varchar, nullable: true },
            ],
            vec![
                KeyComponent::Param("location".into()),
                KeyComponent::Param("user".into()),
                KeyComponent::Quantum(Quantum { field: "time".into(), n: 15, unit: QuantumUnit::Seconds }),
            ],
            vec!["location".into(), "user".into(), "time".into()],
        )
        .unwrap()
    }

    fn leaf(op: CompOp, field: &str, value: Literal) -> WhereExpr {
        WhereExpr::Cmp { op, field: field.into(), value }
    }

    fn and_all(exprs: Vec<WhereExpr>) -> WhereExpr {
        exprs.into_iter().reduce(|acc, e| WhereExpr::And(Box::new(acc), Box::new(e))).unwrap()
    }

    /// Seed scenario 1: one sub-query, exact startkey/endkey reproduced.
    #[test]
    fn single_quantum_range_yields_one_subquery() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Gt, "time", Literal::Int(3000)),
            leaf(CompOp::Lt, "time", Literal::Int(5000)),
            leaf(CompOp::Eq, "user", Literal::Str("user_1".into())),
            leaf(CompOp::Eq, "location", Literal::Str("San Francisco".into())),
        ]);
        let select = Select::new(Projection::Columns(vec!["weather".into()]), "GeoCheckin", where_clause);

        let sub_queries = compile(&select, &ddl, 5).unwrap();
        assert_eq!(sub_queries.len(), 1);
        let compiled = &sub_queries[0].compiled_where;
        assert!(!compiled.start_inclusive);
        assert!(!compiled.end_inclusive);
        assert_eq!(compiled.startkey[0].value, qmodel::Value::Varchar("San Francisco".into()));
        assert_eq!(compiled.startkey[1].value, qmodel::Value::Varchar("user_1".into()));
        assert_eq!(compiled.startkey[2].value, qmodel::Value::Timestamp(3000));
        assert_eq!(compiled.endkey[2].value, qmodel::Value::Timestamp(5000));
    }

    /// Seed scenario 2: three sub-queries crossing two quantum boundaries.
    #[test]
    fn multi_quantum_range_expands_into_contiguous_windows() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Ge, "time", Literal::Int(3000)),
            leaf(CompOp::Lt, "time", Literal::Int(31000)),
            leaf(CompOp::Eq, "user", Literal::Str("user_1".into())),
            leaf(CompOp::Eq, "location", Literal::Str("San Francisco".into())),
        ]);
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);

        let sub_queries = compile(&select, &ddl, 5).unwrap();
        assert_eq!(sub_queries.len(), 3);

        let windows: Vec<(i64, i64)> = sub_queries
            .iter()
            .map(|sq| {
                let lo = sq.compiled_where.startkey.last().unwrap().value.as_timestamp().unwrap();
                let hi = sq.compiled_where.endkey.last().unwrap().value.as_timestamp().unwrap();
                (lo, hi)
            })
            .collect();
        assert_eq!(windows, vec![(3000, 15000), (15000, 30000), (30000, 31000)]);

        assert!(sub_queries[0].compiled_where.start_inclusive);
        assert!(sub_queries[1].compiled_where.start_inclusive);
        assert!(!sub_queries[0].compiled_where.end_inclusive);
        assert!(!sub_queries[1].compiled_where.end_inclusive);
        assert!(!sub_queries[2].compiled_where.end_inclusive);
    }

    /// Seed scenario 3.
    #[test]
    fn degenerate_range_is_rejected() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Gt, "time", Literal::Int(5000)),
            leaf(CompOp::Lt, "time", Literal::Int(5000)),
            leaf(CompOp::Eq, "user", Literal::Str("u".into())),
            leaf(CompOp::Eq, "location", Literal::Str("l".into())),
        ]);
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::DegenerateRange));
    }

    /// Seed scenario 4.
    #[test]
    fn lower_bound_gt_upper_is_rejected() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Gt, "time", Literal::Int(6000)),
            leaf(CompOp::Lt, "time", Literal::Int(5000)),
            leaf(CompOp::Eq, "user", Literal::Str("u".into())),
            leaf(CompOp::Eq, "location", Literal::Str("l".into())),
        ]);
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::LowerBoundGtUpper));
    }

    /// Seed scenario 5.
    #[test]
    fn missing_key_field_is_reported() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Gt, "time", Literal::Int(1)),
            leaf(CompOp::Lt, "time", Literal::Int(6)),
            leaf(CompOp::Eq, "user", Literal::Str("2".into())),
        ]);
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::MissingKeyField(f) if f == "location"));
    }

    /// Seed scenario 6.
    #[test]
    fn non_equality_key_field_is_reported() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Gt, "time", Literal::Int(1)),
            leaf(CompOp::Lt, "time", Literal::Int(6)),
            leaf(CompOp::Eq, "user", Literal::Str("2".into())),
            leaf(CompOp::Ne, "location", Literal::Str("4".into())),
        ]);
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::KeyFieldMustUseEquals { field, op } if field == "location" && op == "!="));
    }

    #[test]
    fn time_bounds_under_or_is_rejected() {
        let ddl = geo_checkin();
        let where_clause = WhereExpr::And(
            Box::new(WhereExpr::Or(
                Box::new(leaf(CompOp::Gt, "time", Literal::Int(1))),
                Box::new(leaf(CompOp::Gt, "time", Literal::Int(2))),
            )),
            Box::new(leaf(CompOp::Lt, "time", Literal::Int(6))),
        );
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::TimeBoundsMustUseAnd));
    }

    #[test]
    fn already_compiled_select_is_rejected() {
        let ddl = geo_checkin();
        let mut select = Select::new(Projection::Star, "GeoCheckin", leaf(CompOp::Eq, "user", Literal::Str("x".into())));
        select.is_executable = true;
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::AlreadyCompiled));
    }

    #[test]
    fn empty_projection_is_full_table_scan_unsupported() {
        let ddl = geo_checkin();
        let select = Select::new(Projection::Columns(vec![]), "GeoCheckin", leaf(CompOp::Eq, "user", Literal::Str("x".into())));
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::FullTableScanUnsupported));
    }

    #[test]
    fn too_many_subqueries_is_rejected_when_span_exceeds_config() {
        let ddl = geo_checkin();
        let where_clause = and_all(vec![
            leaf(CompOp::Ge, "time", Literal::Int(0)),
            leaf(CompOp::Lt, "time", Literal::Int(1_000_000)),
            leaf(CompOp::Eq, "user", Literal::Str("u".into())),
            leaf(CompOp::Eq, "location", Literal::Str("l".into())),
        ]);
        let select = Select::new(Projection::Star, "GeoCheckin", where_clause);
        let err = compile(&select, &ddl, 5).unwrap_err();
        assert!(matches!(err, QueryError::TooManySubqueries(_)));
    }
}
