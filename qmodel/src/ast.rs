use crate::compiled::CompiledWhere;
use crate::ddl::TableDdlRef;
use crate::scalar::Literal;

/// Closed sum type of comparison operators usable in a `WHERE` leaf
/// (spec.md §3, §9 "Operators in WHERE are another closed sum").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompOp {
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, CompOp::Gt | CompOp::Ge)
    }

    pub fn is_upper_bound(&self) -> bool {
        matches!(self, CompOp::Lt | CompOp::Le)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompOp::Eq => "=",
            CompOp::Ne => "!=",
            CompOp::Lt => "<",
            CompOp::Le => "<=",
            CompOp::Gt => ">",
            CompOp::Ge => ">=",
        }
    }
}

/// The raw `WHERE` tree handed to the compiler, as produced by the
/// out-of-scope SQL parser (spec.md §3): `and_`/`or_` nodes over leaf
/// comparisons.
#[derive(Clone, Debug)]
pub enum WhereExpr {
    And(Box<WhereExpr>, Box<WhereExpr>),
    Or(Box<WhereExpr>, Box<WhereExpr>),
    Cmp { op: CompOp, field: String, value: Literal },
}

/// Selected columns of a `SELECT` statement.
#[derive(Clone, Debug)]
pub enum Projection {
    Star,
    Columns(Vec<String>),
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Projection::Columns(cols) if cols.is_empty())
    }

    pub fn keeps(&self, field: &str) -> bool {
        match self {
            Projection::Star => true,
            Projection::Columns(cols) => cols.iter().any(|c| c == field),
        }
    }
}

/// A `SELECT` statement, before or after compilation (spec.md §3).
#[derive(Clone, Debug)]
pub struct Select {
    pub columns: Projection,
    pub table: String,
    pub where_clause: WhereExpr,
    pub is_executable: bool,
    pub ddl: Option<TableDdlRef>,
    pub compiled_where: Option<CompiledWhere>,
}

impl Select {
    pub fn new(columns: Projection, table: impl Into<String>, where_clause: WhereExpr) -> Self {
        Select {
            columns,
            table: table.into(),
            where_clause,
            is_executable: false,
            ddl: None,
            compiled_where: None,
        }
    }
}

/// One of the statement shapes the (out-of-scope) parser can return
/// (spec.md §6). Only `Select` is in scope for the core.
#[derive(Clone, Debug)]
pub enum Ast {
    Select(Select),
    Describe(String),
    Insert { table: String, values: Vec<(String, Literal)> },
}
