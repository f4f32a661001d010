use common::error::QueryError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The five scalar types a table's DDL may declare a field as
/// (spec.md §3, Table DDL).
#[derive(IntoPrimitive, TryFromPrimitive, Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum ScalarType {
    Varchar = 0,
    Sint64 = 1,
    Double = 2,
    Timestamp = 3,
    Boolean = 4,
}

/// A typed literal or cell value. `Timestamp` is stored as epoch
/// milliseconds, the unit the quantum function operates over.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Varchar(String),
    Sint64(i64),
    Double(f64),
    Timestamp(i64),
    Boolean(bool),
}

impl Value {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Value::Varchar(_) => ScalarType::Varchar,
            Value::Sint64(_) => ScalarType::Sint64,
            Value::Double(_) => ScalarType::Double,
            Value::Timestamp(_) => ScalarType::Timestamp,
            Value::Boolean(_) => ScalarType::Boolean,
        }
    }

    /// Coerces a raw AST literal (already split into a scalar kind and a
    /// string-ish payload by the out-of-scope parser) into a typed `Value`.
    /// `boolean` literals are accepted case-insensitively as "true"/"false"
    /// (spec.md §4.2 Step D).
    pub fn coerce(ty: ScalarType, raw: &Literal) -> Result<Value, QueryError> {
        match (ty, raw) {
            (ScalarType::Varchar, Literal::Str(s)) => Ok(Value::Varchar(s.clone())),
            (ScalarType::Sint64, Literal::Int(i)) => Ok(Value::Sint64(*i)),
            (ScalarType::Sint64, Literal::Str(s)) => s
                .parse::<i64>()
                .map(Value::Sint64)
                .map_err(|_| QueryError::InvalidQuery(format!("`{s}` is not a valid sint64"))),
            (ScalarType::Double, Literal::Float(f)) => Ok(Value::Double(*f)),
            (ScalarType::Double, Literal::Int(i)) => Ok(Value::Double(*i as f64)),
            (ScalarType::Double, Literal::Str(s)) => s
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| QueryError::InvalidQuery(format!("`{s}` is not a valid double"))),
            (ScalarType::Timestamp, Literal::Int(i)) => Ok(Value::Timestamp(*i)),
            (ScalarType::Timestamp, Literal::Str(s)) => s
                .parse::<i64>()
                .map(Value::Timestamp)
                .map_err(|_| QueryError::InvalidQuery(format!("`{s}` is not a valid timestamp"))),
            (ScalarType::Boolean, Literal::Bool(b)) => Ok(Value::Boolean(*b)),
            (ScalarType::Boolean, Literal::Str(s)) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(Value::Boolean(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(Value::Boolean(false))
                } else {
                    Err(QueryError::InvalidQuery(format!("`{s}` is not a valid boolean")))
                }
            }
            (ty, raw) => Err(QueryError::InvalidQuery(format!(
                "literal {raw:?} cannot be coerced to {ty:?}"
            ))),
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// An untyped literal as handed over by the (out-of-scope) parser, before
/// the compiler resolves it against the DDL's declared field type.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}
