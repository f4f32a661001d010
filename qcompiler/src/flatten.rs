use qmodel::WhereExpr;

/// One item of the flattened working set (spec.md §4.2 Step A): either a
/// leaf comparison, or an `or_` subtree left nested.
#[derive(Clone, Debug)]
pub enum WorkItem {
    Leaf { op: qmodel::CompOp, field: String, value: qmodel::Literal },
    Or(WhereExpr),
}

/// Flattens right-associative `and_` chains; `or_` subtrees are kept whole.
pub fn flatten(expr: &WhereExpr) -> Vec<WorkItem> {
    match expr {
        WhereExpr::And(lhs, rhs) => {
            let mut items = flatten(lhs);
            items.extend(flatten(rhs));
            items
        }
        WhereExpr::Or(..) => vec![WorkItem::Or(expr.clone())],
        WhereExpr::Cmp { op, field, value } => {
            vec![WorkItem::Leaf { op: *op, field: field.clone(), value: value.clone() }]
        }
    }
}

/// `true` if `field` appears anywhere in `expr` (used to reject quantum-field
/// references nested under `or_`, spec.md §4.2 Step B.4).
pub fn mentions_field(expr: &WhereExpr, field: &str) -> bool {
    match expr {
        WhereExpr::And(lhs, rhs) | WhereExpr::Or(lhs, rhs) => mentions_field(lhs, field) || mentions_field(rhs, field),
        WhereExpr::Cmp { field: f, .. } => f == field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmodel::{CompOp, Literal};

    fn leaf(op: CompOp, field: &str, value: i64) -> WhereExpr {
        WhereExpr::Cmp { op, field: field.into(), value: Literal::Int(value) }
    }

    #[test]
    fn and_chain_flattens_to_a_flat_list() {
        let expr = WhereExpr::And(
            Box::new(leaf(CompOp::Gt, "time", 3000)),
            Box::new(WhereExpr::And(Box::new(leaf(CompOp::Lt, "time", 5000)), Box::new(leaf(CompOp::Eq, "user", 1)))),
        );
        assert_eq!(flatten(&expr).len(), 3);
    }

    #[test]
    fn or_subtree_stays_nested() {
        let expr = WhereExpr::Or(Box::new(leaf(CompOp::Eq, "user", 1)), Box::new(leaf(CompOp::Eq, "user", 2)));
        let items = flatten(&expr);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], WorkItem::Or(_)));
    }

    #[test]
    fn mentions_field_looks_inside_or_subtrees() {
        let expr = WhereExpr::Or(Box::new(leaf(CompOp::Gt, "time", 1)), Box::new(leaf(CompOp::Eq, "user", 2)));
        assert!(mentions_field(&expr, "time"));
        assert!(!mentions_field(&expr, "location"));
    }
}
