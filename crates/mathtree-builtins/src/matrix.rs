//! Matrix construction and shape builtins.

use crate::arithmetic::identity;
use crate::numeric::{string_arg, to_usize, unsupported, Result};
use log::trace;
use mathtree_compile::{Arity, Namespace};
use mathtree_value::{checked_element_count, EvalError, Matrix, Scalar, Value, MAX_ELEMENTS};

pub(crate) fn register(ns: &mut Namespace) {
    ns.register("ctranspose", Arity::Exact(1), |args: &[Value]| {
        args[0].ctranspose()
    })
    .register("transpose", Arity::Exact(1), |args: &[Value]| {
        transpose_builtin(&args[0])
    })
    .register("size", Arity::Exact(1), |args: &[Value]| {
        let shape = args[0].shape();
        Ok(Value::Matrix(Matrix::row_vector(
            shape.into_iter().map(|d| d as f64).collect(),
        )))
    })
    .register("nnz", Arity::Exact(1), |args: &[Value]| match &args[0] {
        Value::Matrix(m) => Ok(Value::Num(m.nnz() as f64)),
        other => Ok(Value::Num(if other.as_scalar()?.is_zero() { 0.0 } else { 1.0 })),
    })
    .register("matrix", Arity::Between(0, 3), matrix_builtin)
    .register("sparse", Arity::Between(0, 2), sparse_builtin)
    .register("zeros", Arity::Any, zeros_builtin)
    .register("identity", Arity::Between(1, 2), identity_builtin);
}

fn transpose_builtin(value: &Value) -> Result<Value> {
    match value {
        Value::Num(_) | Value::Bool(_) | Value::Complex(_) => Ok(value.clone()),
        Value::Matrix(m) => m.transpose().map(Value::Matrix),
        other => Err(unsupported("transpose", other)),
    }
}

/// `matrix()`, `matrix(storage)`, `matrix(data)`, `matrix(data, storage)`,
/// `matrix(data, storage, datatype)`.
fn matrix_builtin(args: &[Value]) -> Result<Value> {
    let built = match args {
        [] => Matrix::construct(None, None, None)?,
        [Value::String(storage)] => Matrix::construct(None, Some(storage.as_str()), None)?,
        [data] => data.to_matrix(None, None)?,
        [data, storage] => data.to_matrix(Some(string_arg("matrix", storage)?), None)?,
        [data, storage, datatype] => data.to_matrix(
            Some(string_arg("matrix", storage)?),
            Some(string_arg("matrix", datatype)?),
        )?,
        _ => return Err(EvalError::Argument("matrix expects at most three arguments".into())),
    };
    trace!(
        "matrix(): {} {:?}",
        built.storage_kind().as_str(),
        built.shape()
    );
    Ok(Value::Matrix(built))
}

/// `sparse()`, `sparse(data)`, `sparse(data, datatype)`.
fn sparse_builtin(args: &[Value]) -> Result<Value> {
    let built = match args {
        [] => Matrix::construct(None, Some("sparse"), None)?,
        [data] => data.to_matrix(Some("sparse"), None)?,
        [data, datatype] => {
            data.to_matrix(Some("sparse"), Some(string_arg("sparse", datatype)?))?
        }
        _ => return Err(EvalError::Argument("sparse expects at most two arguments".into())),
    };
    Ok(Value::Matrix(built))
}

fn zeros_builtin(args: &[Value]) -> Result<Value> {
    let shape = match args {
        [Value::Matrix(size)] => size
            .elements()
            .iter()
            .map(|d| to_usize("zeros", &Value::from_scalar(*d)))
            .collect::<Result<Vec<_>>>()?,
        dims => dims
            .iter()
            .map(|d| to_usize("zeros", d))
            .collect::<Result<Vec<_>>>()?,
    };
    if shape.is_empty() {
        return Ok(Value::Matrix(Matrix::empty()));
    }
    let count = checked_element_count(&shape, MAX_ELEMENTS)?;
    Matrix::dense(vec![Scalar::ZERO; count], shape).map(Value::Matrix)
}

fn identity_builtin(args: &[Value]) -> Result<Value> {
    match args {
        [n] => {
            let n = to_usize("identity", n)?;
            checked_element_count(&[n, n], MAX_ELEMENTS)?;
            Ok(Value::Matrix(identity(n)))
        }
        [rows, cols] => {
            let (r, c) = (to_usize("identity", rows)?, to_usize("identity", cols)?);
            let mut data = vec![Scalar::ZERO; checked_element_count(&[r, c], MAX_ELEMENTS)?];
            for i in 0..r.min(c) {
                data[i * c + i] = Scalar::Real(1.0);
            }
            Matrix::dense(data, vec![r, c]).map(Value::Matrix)
        }
        _ => Err(EvalError::Argument("identity expects one or two arguments".into())),
    }
}
