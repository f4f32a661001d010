use common::error::QueryError;
use qmodel::{CompOp, Literal, ScalarType, TableDdl, Value, WhereExpr};

use crate::flatten::{mentions_field, WorkItem};

/// The quantum field's lower/upper bound, resolved to epoch millis
/// (spec.md §4.2 Step B).
#[derive(Clone, Debug)]
pub struct QuantumBounds {
    pub lower_op: CompOp,
    pub lower_ts: i64,
    pub upper_op: CompOp,
    pub upper_ts: i64,
}

/// Step B: scans `items` for the quantum field's lower/upper bounds,
/// leaving everything else in `residual`.
pub fn extract_quantum_bounds(
    items: &[WorkItem],
    quantum_field: &str,
) -> Result<(QuantumBounds, Vec<WorkItem>), QueryError> {
    let mut lower: Option<(CompOp, Literal)> = None;
    let mut upper: Option<(CompOp, Literal)> = None;
    let mut residual = Vec::with_capacity(items.len());

    for item in items {
        match item {
            WorkItem::Or(expr) => {
                if mentions_field(expr, quantum_field) {
                    return Err(QueryError::TimeBoundsMustUseAnd);
                }
                residual.push(item.clone());
            }
            WorkItem::Leaf { op, field, value } if field == quantum_field => match op {
                CompOp::Gt | CompOp::Ge => {
                    if lower.is_some() {
                        return Err(QueryError::DuplicateLowerBound);
                    }
                    lower = Some((*op, value.clone()));
                }
                CompOp::Lt | CompOp::Le => {
                    if upper.is_some() {
                        return Err(QueryError::DuplicateUpperBound);
                    }
                    upper = Some((*op, value.clone()));
                }
                CompOp::Eq | CompOp::Ne => residual.push(item.clone()),
            },
            WorkItem::Leaf { .. } => residual.push(item.clone()),
        }
    }

    let (lower_op, lower_lit) = lower.ok_or(QueryError::NoLowerBound)?;
    let (upper_op, upper_lit) = upper.ok_or(QueryError::NoUpperBound)?;
    let lower_ts = Value::coerce(ScalarType::Timestamp, &lower_lit)?.as_timestamp().unwrap();
    let upper_ts = Value::coerce(ScalarType::Timestamp, &upper_lit)?.as_timestamp().unwrap();

    if lower_ts > upper_ts {
        return Err(QueryError::LowerBoundGtUpper);
    }
    if lower_ts == upper_ts && lower_op == CompOp::Gt && upper_op == CompOp::Lt {
        return Err(QueryError::DegenerateRange);
    }

    Ok((QuantumBounds { lower_op, lower_ts, upper_op, upper_ts }, residual))
}

/// Step C: for every non-quantum local-key field, finds its equality
/// binding in `residual` and removes the matching leaf. When more than one
/// leaf mentions the field (e.g. `location >= 'aa' AND location = 'sf'`),
/// the `=` leaf is preferred and bound, leaving the other leaf in
/// `residual` as a filter; the `key_field_must_use_equals` error is only
/// raised when *no* `=` leaf is present for the field (spec.md §4.2 Step
/// C, "find a leaf `{=, field, value}`").
pub fn bind_key_fields(ddl: &TableDdl, residual: &mut Vec<WorkItem>) -> Result<Vec<(String, Literal)>, QueryError> {
    let mut bindings = Vec::new();
    for field in ddl.non_quantum_local_fields() {
        let eq_pos = residual
            .iter()
            .position(|item| matches!(item, WorkItem::Leaf { op: CompOp::Eq, field: f, .. } if f == field));
        let pos = match eq_pos {
            Some(pos) => pos,
            None => residual
                .iter()
                .position(|item| matches!(item, WorkItem::Leaf { field: f, .. } if f == field))
                .ok_or_else(|| QueryError::MissingKeyField(field.to_string()))?,
        };
        let WorkItem::Leaf { op, value, .. } = residual.remove(pos) else {
            unreachable!("position() only matched Leaf items")
        };
        if op != CompOp::Eq {
            return Err(QueryError::KeyFieldMustUseEquals { field: field.to_string(), op: op.symbol().to_string() });
        }
        bindings.push((field.to_string(), value));
    }
    Ok(bindings)
}

/// Step D: validates every remaining leaf's literal against its DDL-declared
/// type and reassembles the survivors as an `and_`-joined residual filter.
pub fn rebuild_filter(residual: Vec<WorkItem>, ddl: &TableDdl) -> Result<Option<WhereExpr>, QueryError> {
    let mut leaves = Vec::with_capacity(residual.len());
    for item in residual {
        let expr = match item {
            WorkItem::Leaf { op, field, value } => {
                validate_leaf_type(&field, &value, ddl)?;
                WhereExpr::Cmp { op, field, value }
            }
            WorkItem::Or(expr) => {
                validate_types_recursive(&expr, ddl)?;
                expr
            }
        };
        leaves.push(expr);
    }
    Ok(leaves.into_iter().reduce(|acc, expr| WhereExpr::And(Box::new(acc), Box::new(expr))))
}

fn validate_leaf_type(field: &str, value: &Literal, ddl: &TableDdl) -> Result<(), QueryError> {
    let ty = ddl
        .field_type(field)
        .ok_or_else(|| QueryError::InvalidQuery(format!("unknown field `{field}`")))?;
    Value::coerce(ty, value)?;
    Ok(())
}

fn validate_types_recursive(expr: &WhereExpr, ddl: &TableDdl) -> Result<(), QueryError> {
    match expr {
        WhereExpr::And(lhs, rhs) | WhereExpr::Or(lhs, rhs) => {
            validate_types_recursive(lhs, ddl)?;
            validate_types_recursive(rhs, ddl)
        }
        WhereExpr::Cmp { field, value, .. } => validate_leaf_type(field, value, ddl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use qmodel::{FieldDef, KeyComponent, Quantum, QuantumUnit};

    fn geo_checkin() -> TableDdl {
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
        .map(|r| (*r).clone())
        .unwrap()
    }

    fn leaf(op: CompOp, field: &str, value: Literal) -> WhereExpr {
        WhereExpr::Cmp { op, field: field.into(), value }
    }

    #[test]
    fn duplicate_lower_bound_is_rejected() {
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", Literal::Int(1))),
            Box::new(leaf(CompOp::Ge, "time", Literal::Int(2))),
        );
        let items = flatten(&expr);
        let err = extract_quantum_bounds(&items, "time").unwrap_err();
        assert!(matches!(err, QueryError::DuplicateLowerBound));
    }

    #[test]
    fn degenerate_range_under_two_strict_operators() {
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", Literal::Int(5000))),
            Box::new(leaf(CompOp::Lt, "time", Literal::Int(5000))),
        );
        let items = flatten(&expr);
        let err = extract_quantum_bounds(&items, "time").unwrap_err();
        assert!(matches!(err, QueryError::DegenerateRange));
    }

    #[test]
    fn lower_bound_gt_upper_is_rejected() {
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", Literal::Int(6000))),
            Box::new(leaf(CompOp::Lt, "time", Literal::Int(5000))),
        );
        let items = flatten(&expr);
        let err = extract_quantum_bounds(&items, "time").unwrap_err();
        assert!(matches!(err, QueryError::LowerBoundGtUpper));
    }

    #[test]
    fn missing_key_field_is_reported_by_name() {
        let ddl = geo_checkin();
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", Literal::Int(1))),
            Box::new(WhereExpr::And(
                Box::new(leaf(CompOp::Lt, "time", Literal::Int(6))),
                Box::new(leaf(CompOp::Eq, "user", Literal::Str("2".into()))),
            )),
        );
        let items = flatten(&expr);
        let (_, residual) = extract_quantum_bounds(&items, "time").unwrap();
        let mut residual = residual;
        let err = bind_key_fields(&ddl, &mut residual).unwrap_err();
        assert!(matches!(err, QueryError::MissingKeyField(f) if f == "location"));
    }

    #[test]
    fn non_equality_key_field_binding_is_rejected() {
        let ddl = geo_checkin();
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", Literal::Int(1))),
            Box::new(WhereExpr::And(
                Box::new(leaf(CompOp::Lt, "time", Literal::Int(6))),
                Box::new(WhereExpr::And(
                    Box::new(leaf(CompOp::Eq, "user", Literal::Str("2".into()))),
                    Box::new(leaf(CompOp::Ne, "location", Literal::Str("4".into()))),
                )),
            )),
        );
        let items = flatten(&expr);
        let (_, residual) = extract_quantum_bounds(&items, "time").unwrap();
        let mut residual = residual;
        let err = bind_key_fields(&ddl, &mut residual).unwrap_err();
        assert!(matches!(err, QueryError::KeyFieldMustUseEquals { field, op } if field == "location" && op == "!="));
    }

    /// `location >= 'aa' AND location = 'sf'`: the `=` leaf must be bound
    /// even though it is not the first leaf mentioning `location`; the
    /// other leaf survives as a residual filter rather than causing a
    /// spurious `key_field_must_use_equals`.
    #[test]
    fn equals_leaf_is_preferred_over_an_earlier_non_equality_leaf_for_the_same_field() {
        let ddl = geo_checkin();
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", Literal::Int(1))),
            Box::new(WhereExpr::And(
                Box::new(leaf(CompOp::Lt, "time", Literal::Int(6))),
                Box::new(WhereExpr::And(
                    Box::new(leaf(CompOp::Eq, "user", Literal::Str("2".into()))),
                    Box::new(WhereExpr::And(
                        Box::new(leaf(CompOp::Ge, "location", Literal::Str("aa".into()))),
                        Box::new(leaf(CompOp::Eq, "location", Literal::Str("sf".into()))),
                    )),
                )),
            )),
        );
        let items = flatten(&expr);
        let (_, residual) = extract_quantum_bounds(&items, "time").unwrap();
        let mut residual = residual;
        let bindings = bind_key_fields(&ddl, &mut residual).unwrap();
        assert!(bindings.contains(&("location".to_string(), Literal::Str("sf".into()))));
        // the non-equality leaf for the same field is left behind as a filter
        assert!(residual
            .iter()
            .any(|item| matches!(item, WorkItem::Leaf { op: CompOp::Ge, field, .. } if field == "location")));
    }
}
