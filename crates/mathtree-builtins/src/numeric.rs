//! Shared scalar/matrix plumbing for the builtins.

use mathtree_value::{Complex64, EvalError, Matrix, Scalar, Value};

pub(crate) type Result<T> = std::result::Result<T, EvalError>;

pub(crate) enum Operand {
    Scalar(Scalar),
    Matrix(Matrix),
}

pub(crate) fn unsupported(name: &str, value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "Unexpected type of argument in function {name} ({})",
        value.type_name()
    ))
}

pub(crate) fn operand(name: &str, value: &Value) -> Result<Operand> {
    match value {
        Value::Matrix(m) => Ok(Operand::Matrix(m.clone())),
        Value::Num(_) | Value::Bool(_) | Value::Complex(_) => value.as_scalar().map(Operand::Scalar),
        other => Err(unsupported(name, other)),
    }
}

/// Applies `f` to every element, producing a dense matrix of the same shape.
pub(crate) fn map_matrix(m: &Matrix, f: impl Fn(Scalar) -> Result<Scalar>) -> Result<Value> {
    let data = m.elements().into_iter().map(f).collect::<Result<Vec<_>>>()?;
    Matrix::dense(data, m.shape()).map(Value::Matrix)
}

pub(crate) fn unary(name: &str, value: &Value, f: impl Fn(Scalar) -> Result<Scalar>) -> Result<Value> {
    match operand(name, value)? {
        Operand::Scalar(x) => f(x).map(Value::from_scalar),
        Operand::Matrix(m) => map_matrix(&m, f),
    }
}

/// Elementwise binary application with scalar broadcasting.
pub(crate) fn broadcast(
    name: &str,
    a: &Value,
    b: &Value,
    f: impl Fn(Scalar, Scalar) -> Result<Scalar>,
) -> Result<Value> {
    match (operand(name, a)?, operand(name, b)?) {
        (Operand::Scalar(x), Operand::Scalar(y)) => f(x, y).map(Value::from_scalar),
        (Operand::Matrix(m), Operand::Scalar(y)) => map_matrix(&m, |x| f(x, y)),
        (Operand::Scalar(x), Operand::Matrix(m)) => map_matrix(&m, |y| f(x, y)),
        (Operand::Matrix(m), Operand::Matrix(n)) => m.zip_with(&n, &f).map(Value::Matrix),
    }
}

/// Real arithmetic when both sides are real, complex otherwise.
pub(crate) fn lift(
    a: Scalar,
    b: Scalar,
    real: impl Fn(f64, f64) -> f64,
    complex: impl Fn(Complex64, Complex64) -> Complex64,
) -> Scalar {
    match (a, b) {
        (Scalar::Real(x), Scalar::Real(y)) => Scalar::Real(real(x, y)),
        _ => Scalar::Complex(complex(a.to_complex(), b.to_complex())),
    }
}

pub(crate) fn add(a: Scalar, b: Scalar) -> Scalar {
    lift(a, b, |x, y| x + y, |x, y| x + y)
}

pub(crate) fn sub(a: Scalar, b: Scalar) -> Scalar {
    lift(a, b, |x, y| x - y, |x, y| x - y)
}

pub(crate) fn mul(a: Scalar, b: Scalar) -> Scalar {
    lift(a, b, |x, y| x * y, |x, y| x * y)
}

pub(crate) fn div(a: Scalar, b: Scalar) -> Scalar {
    lift(a, b, |x, y| x / y, |x, y| x / y)
}

pub(crate) fn neg(a: Scalar) -> Scalar {
    match a {
        Scalar::Real(x) => Scalar::Real(-x),
        Scalar::Complex(c) => Scalar::Complex(-c),
    }
}

/// Real or complex function selected by the input; `promote` moves real
/// inputs outside the real domain onto the complex branch.
pub(crate) fn real_or_complex(
    x: Scalar,
    promote: impl Fn(f64) -> bool,
    real: impl Fn(f64) -> f64,
    complex: impl Fn(Complex64) -> Complex64,
) -> Scalar {
    match x {
        Scalar::Real(v) if !promote(v) => Scalar::Real(real(v)),
        other => Scalar::Complex(complex(other.to_complex())),
    }
}

pub(crate) fn to_usize(name: &str, value: &Value) -> Result<usize> {
    let v = value.as_f64()?;
    if v < 0.0 || v.fract() != 0.0 || !v.is_finite() {
        return Err(EvalError::Argument(format!(
            "Function {name} expects a non-negative integer, got {v}"
        )));
    }
    Ok(v as usize)
}

pub(crate) fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(unsupported(name, other)),
    }
}
