//! The standard mathtree namespace.
//!
//! Operator nodes resolve through the names registered here (`add`,
//! `unaryMinus`, `ctranspose`, ...), so a tree produced by a parser that
//! follows the same operator naming compiles against
//! [`standard_namespace`] without further setup.

mod arithmetic;
mod elementary;
mod logical;
mod matrix;
mod numeric;

use log::debug;
use mathtree_compile::{Namespace, Scope};
use mathtree_value::Value;

pub fn standard_namespace() -> Namespace {
    let mut ns = Namespace::new();
    arithmetic::register(&mut ns);
    logical::register(&mut ns);
    elementary::register(&mut ns);
    matrix::register(&mut ns);
    debug!("standard namespace: {} functions", ns.len());
    ns
}

/// Named constants.
pub fn constants() -> Vec<(&'static str, Value)> {
    vec![
        ("pi", Value::Num(std::f64::consts::PI)),
        ("e", Value::Num(std::f64::consts::E)),
        ("tau", Value::Num(std::f64::consts::TAU)),
        ("phi", Value::Num((1.0 + 5f64.sqrt()) / 2.0)),
        ("i", Value::complex(0.0, 1.0)),
        ("Infinity", Value::Num(f64::INFINITY)),
        ("NaN", Value::Num(f64::NAN)),
    ]
}

/// A fresh scope pre-populated with [`constants`].
pub fn standard_scope() -> Scope {
    constants().into_iter().collect()
}
