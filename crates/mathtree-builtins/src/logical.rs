//! Logical and relational operators.

use crate::numeric::{broadcast, map_matrix, Result};
use mathtree_compile::{Arity, Namespace};
use mathtree_value::{EvalError, Scalar, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Equal,
    Unequal,
    Smaller,
    Larger,
    SmallerEq,
    LargerEq,
}

impl Relation {
    const ALL: [Relation; 6] = [
        Relation::Equal,
        Relation::Unequal,
        Relation::Smaller,
        Relation::Larger,
        Relation::SmallerEq,
        Relation::LargerEq,
    ];

    fn name(self) -> &'static str {
        match self {
            Relation::Equal => "equal",
            Relation::Unequal => "unequal",
            Relation::Smaller => "smaller",
            Relation::Larger => "larger",
            Relation::SmallerEq => "smallerEq",
            Relation::LargerEq => "largerEq",
        }
    }

    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Relation::Unequal, None) => true,
            (_, None) => false,
            (Relation::Equal, Some(o)) => o == Ordering::Equal,
            (Relation::Unequal, Some(o)) => o != Ordering::Equal,
            (Relation::Smaller, Some(o)) => o == Ordering::Less,
            (Relation::Larger, Some(o)) => o == Ordering::Greater,
            (Relation::SmallerEq, Some(o)) => o != Ordering::Greater,
            (Relation::LargerEq, Some(o)) => o != Ordering::Less,
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, Relation::Equal | Relation::Unequal)
    }
}

pub(crate) fn register(ns: &mut Namespace) {
    for relation in Relation::ALL {
        ns.register(relation.name(), Arity::Exact(2), move |args: &[Value]| {
            compare(relation, &args[0], &args[1])
        });
    }
    ns.register("not", Arity::Exact(1), |args: &[Value]| not_builtin(&args[0]))
        .register("and", Arity::Exact(2), |args: &[Value]| {
            Ok(Value::Bool(args[0].is_truthy()? && args[1].is_truthy()?))
        })
        .register("or", Arity::Exact(2), |args: &[Value]| {
            Ok(Value::Bool(args[0].is_truthy()? || args[1].is_truthy()?))
        })
        .register("xor", Arity::Exact(2), |args: &[Value]| {
            Ok(Value::Bool(args[0].is_truthy()? != args[1].is_truthy()?))
        });
}

fn flag(b: bool) -> Scalar {
    Scalar::Real(if b { 1.0 } else { 0.0 })
}

fn not_builtin(value: &Value) -> Result<Value> {
    match value {
        Value::Matrix(m) => map_matrix(m, |x| Ok(flag(x.is_zero()))),
        other => Ok(Value::Bool(!other.is_truthy()?)),
    }
}

fn compare(relation: Relation, a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Value::Bool(relation.holds(Some(x.cmp(y))))),
        (Value::Null, Value::Null) => Ok(Value::Bool(relation.holds(Some(Ordering::Equal)))),
        (Value::Null, _) | (_, Value::Null) if relation.is_equality() => {
            Ok(Value::Bool(relation == Relation::Unequal))
        }
        _ => {
            let out = broadcast(relation.name(), a, b, |x, y| compare_scalars(relation, x, y))?;
            Ok(match out {
                Value::Num(v) => Value::Bool(v != 0.0),
                other => other,
            })
        }
    }
}

fn compare_scalars(relation: Relation, x: Scalar, y: Scalar) -> Result<Scalar> {
    match (x, y) {
        (Scalar::Real(a), Scalar::Real(b)) => Ok(flag(relation.holds(a.partial_cmp(&b)))),
        _ if relation.is_equality() => {
            let same = x.to_complex() == y.to_complex();
            Ok(flag(if relation == Relation::Equal { same } else { !same }))
        }
        _ => Err(EvalError::type_error(format!(
            "No ordering relation is defined for complex numbers (function {})",
            relation.name()
        ))),
    }
}
