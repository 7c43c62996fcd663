use crate::error::{EvalError, Result};
use crate::matrix::{Matrix, Nested};
use crate::scalar::{format_complex, Scalar};
use num_complex::Complex64;
use std::fmt;
use std::sync::Arc;

/// Native implementation behind a [`Callable`]. Receives the callable being
/// invoked (so a function can refer to itself), the arguments and the call
/// depth of the invocation.
pub type NativeFn = Arc<dyn Fn(&Callable, &[Value], usize) -> Result<Value> + Send + Sync>;

/// A function value, produced by evaluating a function assignment.
#[derive(Clone)]
pub struct Callable {
    pub name: String,
    pub params: Vec<String>,
    func: NativeFn,
}

impl Callable {
    pub fn new(name: impl Into<String>, params: Vec<String>, func: NativeFn) -> Self {
        Callable {
            name: name.into(),
            params,
            func,
        }
    }

    pub fn call(&self, args: &[Value], depth: usize) -> Result<Value> {
        if args.len() != self.params.len() {
            return Err(EvalError::Argument(format!(
                "Wrong number of arguments in function {} ({} provided, {} expected)",
                self.name,
                args.len(),
                self.params.len()
            )));
        }
        (self.func)(self, args, depth)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({}({}))", self.name, self.params.join(", "))
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && Arc::ptr_eq(&self.func, &other.func)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Num(f64),
    Complex(Complex64),
    String(String),
    Matrix(Matrix),
    Function(Callable),
}

impl Value {
    pub fn complex(re: f64, im: f64) -> Self {
        Value::Complex(Complex64::new(re, im))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Complex(_) => "complex",
            Value::String(_) => "string",
            Value::Matrix(_) => "matrix",
            Value::Function(_) => "function",
        }
    }

    /// Condition truthiness used by conditionals.
    pub fn is_truthy(&self) -> Result<bool> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Num(n) => Ok(*n != 0.0 && !n.is_nan()),
            Value::Complex(c) => Ok(c.re != 0.0 || c.im != 0.0),
            Value::String(s) => Ok(!s.is_empty()),
            other => Err(EvalError::type_error(format!(
                "Unsupported type of condition ({})",
                other.type_name()
            ))),
        }
    }

    /// Numeric view for index and range arithmetic.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Complex(c) if c.im == 0.0 => Ok(c.re),
            other => Err(EvalError::type_error(format!(
                "Expected a real number, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_scalar(&self) -> Result<Scalar> {
        match self {
            Value::Num(n) => Ok(Scalar::Real(*n)),
            Value::Bool(b) => Ok(Scalar::Real(if *b { 1.0 } else { 0.0 })),
            Value::Complex(c) => Ok(Scalar::Complex(*c)),
            Value::Matrix(m) if m.numel() == 1 => {
                Ok(m.elements().first().copied().unwrap_or(Scalar::ZERO))
            }
            other => Err(EvalError::type_error(format!(
                "Expected a numeric scalar, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn from_scalar(value: Scalar) -> Value {
        match value {
            Scalar::Real(v) => Value::Num(v),
            Scalar::Complex(c) => Value::Complex(c),
        }
    }

    /// Size as reported by `size()`: empty for scalars.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Value::Matrix(m) => m.shape(),
            Value::String(s) => vec![s.chars().count()],
            _ => Vec::new(),
        }
    }

    /// Conjugate transpose of any value: scalars are transposition-invariant,
    /// complex scalars are conjugated, matrices follow [`Matrix::ctranspose`].
    pub fn ctranspose(&self) -> Result<Value> {
        match self {
            Value::Num(_) | Value::Bool(_) => Ok(self.clone()),
            Value::Complex(c) => Ok(Value::Complex(c.conj())),
            Value::Matrix(m) => m.ctranspose().map(Value::Matrix),
            other => Err(EvalError::type_error(format!(
                "Unexpected type of argument in function ctranspose ({})",
                other.type_name()
            ))),
        }
    }

    /// Builds a matrix value from evaluated array items: scalars produce a
    /// vector, equally shaped matrices are stacked along a new first axis.
    pub fn collect_array(items: Vec<Value>) -> Result<Value> {
        if items.is_empty() {
            return Ok(Value::Matrix(Matrix::empty()));
        }
        let mut rows = Vec::with_capacity(items.len());
        for item in &items {
            rows.push(to_nested(item)?);
        }
        Matrix::from_nested(&Nested::Seq(rows)).map(Value::Matrix)
    }

    /// Matrix construction from an arbitrary value: matrices are deep
    /// copied, other values are rejected.
    pub fn to_matrix(&self, storage: Option<&str>, datatype: Option<&str>) -> Result<Matrix> {
        match self {
            Value::Matrix(m) => Matrix::copy_from(m, storage, datatype),
            other => Err(EvalError::type_error(format!(
                "Unsupported type of data ({}) for matrix construction",
                other.type_name()
            ))),
        }
    }
}

fn to_nested(value: &Value) -> Result<Nested> {
    match value {
        Value::Matrix(m) => {
            let dense = m.to_dense();
            Ok(nest(dense.data(), dense.shape()))
        }
        other => other.as_scalar().map(Nested::Scalar),
    }
}

fn nest(data: &[Scalar], shape: &[usize]) -> Nested {
    match shape {
        [] => Nested::Scalar(data.first().copied().unwrap_or(Scalar::ZERO)),
        [_] => Nested::Seq(data.iter().copied().map(Nested::Scalar).collect()),
        [n, rest @ ..] => {
            let stride: usize = rest.iter().product();
            Nested::Seq(
                (0..*n)
                    .map(|i| nest(&data[i * stride..(i + 1) * stride], rest))
                    .collect(),
            )
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Complex64> for Value {
    fn from(value: Complex64) -> Self {
        Value::Complex(value)
    }
}

impl From<Matrix> for Value {
    fn from(value: Matrix) -> Self {
        Value::Matrix(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Complex(c) => format_complex(*c, f),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Matrix(m) => write!(f, "{m}"),
            Value::Function(c) => write!(f, "{}({})", c.name, c.params.join(", ")),
        }
    }
}
