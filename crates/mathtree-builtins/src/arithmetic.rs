//! Arithmetic operators: `+ - * / ^ mod`, their elementwise forms and unary
//! signs.

use crate::numeric::{
    add, broadcast, div, mul, neg, operand, sub, unary, unsupported, Operand, Result,
};
use mathtree_compile::{Arity, Namespace};
use mathtree_value::{checked_element_count, EvalError, Matrix, Scalar, Value, MAX_ELEMENTS};

pub(crate) fn register(ns: &mut Namespace) {
    ns.register("add", Arity::Exact(2), |args: &[Value]| {
        broadcast("add", &args[0], &args[1], |x, y| Ok(add(x, y)))
    })
    .register("subtract", Arity::Exact(2), |args: &[Value]| {
        broadcast("subtract", &args[0], &args[1], |x, y| Ok(sub(x, y)))
    })
    .register("multiply", Arity::Exact(2), |args: &[Value]| {
        multiply_builtin(&args[0], &args[1])
    })
    .register("divide", Arity::Exact(2), |args: &[Value]| {
        divide_builtin(&args[0], &args[1])
    })
    .register("pow", Arity::Exact(2), |args: &[Value]| {
        pow_builtin(&args[0], &args[1])
    })
    .register("mod", Arity::Exact(2), |args: &[Value]| {
        broadcast("mod", &args[0], &args[1], modulo)
    })
    .register("dotMultiply", Arity::Exact(2), |args: &[Value]| {
        broadcast("dotMultiply", &args[0], &args[1], |x, y| Ok(mul(x, y)))
    })
    .register("dotDivide", Arity::Exact(2), |args: &[Value]| {
        broadcast("dotDivide", &args[0], &args[1], |x, y| Ok(div(x, y)))
    })
    .register("dotPow", Arity::Exact(2), |args: &[Value]| {
        broadcast("dotPow", &args[0], &args[1], |x, y| Ok(scalar_pow(x, y)))
    })
    .register("unaryMinus", Arity::Exact(1), |args: &[Value]| {
        unary("unaryMinus", &args[0], |x| Ok(neg(x)))
    })
    .register("unaryPlus", Arity::Exact(1), |args: &[Value]| {
        unary("unaryPlus", &args[0], Ok)
    });
}

fn multiply_builtin(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Matrix(x), Value::Matrix(y)) => matmul(x, y),
        _ => broadcast("multiply", a, b, |x, y| Ok(mul(x, y))),
    }
}

fn divide_builtin(a: &Value, b: &Value) -> Result<Value> {
    if let Value::Matrix(_) = b {
        return Err(EvalError::Argument(
            "Division by a matrix is not supported".to_string(),
        ));
    }
    broadcast("divide", a, b, |x, y| Ok(div(x, y)))
}

fn pow_builtin(a: &Value, b: &Value) -> Result<Value> {
    match (operand("pow", a)?, operand("pow", b)?) {
        (Operand::Scalar(x), Operand::Scalar(y)) => Ok(Value::from_scalar(scalar_pow(x, y))),
        (Operand::Matrix(m), Operand::Scalar(Scalar::Real(n))) => matrix_power(&m, n),
        (Operand::Matrix(_), Operand::Scalar(_)) => Err(EvalError::type_error(
            "Matrix power requires a real integer exponent",
        )),
        (Operand::Scalar(_), Operand::Matrix(_)) | (Operand::Matrix(_), Operand::Matrix(_)) => {
            Err(unsupported("pow", b))
        }
    }
}

/// `x ^ y`. Negative real bases with fractional exponents go complex.
pub(crate) fn scalar_pow(x: Scalar, y: Scalar) -> Scalar {
    match (x, y) {
        (Scalar::Real(a), Scalar::Real(b)) if a >= 0.0 || b.fract() == 0.0 => Scalar::Real(a.powf(b)),
        (Scalar::Complex(c), Scalar::Real(b)) if b.fract() == 0.0 && b.abs() < i32::MAX as f64 => {
            Scalar::Complex(c.powi(b as i32))
        }
        _ => Scalar::Complex(x.to_complex().powc(y.to_complex())),
    }
}

fn modulo(x: Scalar, y: Scalar) -> Result<Scalar> {
    match (x, y) {
        (Scalar::Real(a), Scalar::Real(b)) => Ok(Scalar::Real(if b == 0.0 {
            a
        } else {
            a - b * (a / b).floor()
        })),
        _ => Err(EvalError::type_error(
            "Function mod is not defined for complex numbers",
        )),
    }
}

/// Matrix product. Vectors act as a row on the left and a column on the right;
/// vector times vector is the dot product.
pub(crate) fn matmul(a: &Matrix, b: &Matrix) -> Result<Value> {
    let (sa, sb) = (a.shape(), b.shape());
    let (rows, inner, a_vector) = match sa.as_slice() {
        [n] => (1, *n, true),
        [r, k] => (*r, *k, false),
        _ => return Err(too_many_dims(&sa)),
    };
    let (inner_b, cols, b_vector) = match sb.as_slice() {
        [n] => (*n, 1, true),
        [k, c] => (*k, *c, false),
        _ => return Err(too_many_dims(&sb)),
    };
    if inner != inner_b {
        return Err(EvalError::dimension(format!(
            "Dimension mismatch in multiplication. Columns of A ({inner}) must match rows of B ({inner_b})"
        )));
    }
    let (ea, eb) = (a.elements(), b.elements());
    let mut out = vec![Scalar::ZERO; checked_element_count(&[rows, cols], MAX_ELEMENTS)?];
    for i in 0..rows {
        for j in 0..cols {
            let mut acc = Scalar::ZERO;
            for t in 0..inner {
                acc = add(acc, mul(ea[i * inner + t], eb[t * cols + j]));
            }
            out[i * cols + j] = acc;
        }
    }
    let shape = match (a_vector, b_vector) {
        (true, true) => return Ok(Value::from_scalar(out[0])),
        (true, false) => vec![cols],
        (false, true) => vec![rows],
        (false, false) => vec![rows, cols],
    };
    Matrix::dense(out, shape).map(Value::Matrix)
}

fn too_many_dims(shape: &[usize]) -> EvalError {
    EvalError::dimension(format!(
        "Multiplication is only defined for vectors and 2D matrices (size: {shape:?})"
    ))
}

fn matrix_power(m: &Matrix, n: f64) -> Result<Value> {
    let shape = m.shape();
    let size = match shape.as_slice() {
        [r, c] if r == c => *r,
        _ => {
            return Err(EvalError::dimension(format!(
                "Matrix power requires a square matrix (size: {shape:?})"
            )))
        }
    };
    if n < 0.0 || n.fract() != 0.0 {
        return Err(EvalError::Argument(format!(
            "Matrix power requires a non-negative integer exponent, got {n}"
        )));
    }
    let mut result = identity(size);
    for _ in 0..(n as usize) {
        result = match matmul(&result, m)? {
            Value::Matrix(next) => next,
            other => return Err(unsupported("pow", &other)),
        };
    }
    Ok(Value::Matrix(result))
}

pub(crate) fn identity(size: usize) -> Matrix {
    let mut data = vec![Scalar::ZERO; size * size];
    for i in 0..size {
        data[i * size + i] = Scalar::Real(1.0);
    }
    match Matrix::dense(data, vec![size, size]) {
        Ok(m) => m,
        Err(_) => Matrix::empty(),
    }
}
