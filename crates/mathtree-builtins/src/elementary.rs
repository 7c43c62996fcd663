//! Elementwise elementary functions and complex-number helpers.

use crate::numeric::{broadcast, div, real_or_complex, unary, Result};
use mathtree_compile::{Arity, Namespace};
use mathtree_value::{Complex64, EvalError, Scalar, Value};

type ScalarFn = fn(Scalar) -> Scalar;

const ELEMENTWISE: &[(&str, ScalarFn)] = &[
    ("abs", abs),
    ("sqrt", sqrt),
    ("exp", exp),
    ("sin", sin),
    ("cos", cos),
    ("tan", tan),
    ("floor", floor),
    ("ceil", ceil),
    ("round", round),
    ("conj", Scalar::conj),
    ("re", re),
    ("im", im),
];

pub(crate) fn register(ns: &mut Namespace) {
    for &(name, f) in ELEMENTWISE {
        ns.register(name, Arity::Exact(1), move |args: &[Value]| {
            unary(name, &args[0], |x| Ok(f(x)))
        });
    }
    ns.register("log", Arity::Between(1, 2), |args: &[Value]| match args {
        [x] => unary("log", x, |v| Ok(ln(v))),
        [x, base] => broadcast("log", x, base, |v, b| Ok(div(ln(v), ln(b)))),
        _ => Err(EvalError::Argument("log expects one or two arguments".to_string())),
    })
    .register("complex", Arity::Between(1, 2), complex_builtin);
}

fn abs(x: Scalar) -> Scalar {
    match x {
        Scalar::Real(v) => Scalar::Real(v.abs()),
        Scalar::Complex(c) => Scalar::Real(c.norm()),
    }
}

fn sqrt(x: Scalar) -> Scalar {
    real_or_complex(x, |v| v < 0.0, f64::sqrt, |c| c.sqrt())
}

fn ln(x: Scalar) -> Scalar {
    real_or_complex(x, |v| v < 0.0, f64::ln, |c| c.ln())
}

fn exp(x: Scalar) -> Scalar {
    real_or_complex(x, |_| false, f64::exp, |c| c.exp())
}

fn sin(x: Scalar) -> Scalar {
    real_or_complex(x, |_| false, f64::sin, |c| c.sin())
}

fn cos(x: Scalar) -> Scalar {
    real_or_complex(x, |_| false, f64::cos, |c| c.cos())
}

fn tan(x: Scalar) -> Scalar {
    real_or_complex(x, |_| false, f64::tan, |c| c.tan())
}

fn parts(x: Scalar, f: fn(f64) -> f64) -> Scalar {
    match x {
        Scalar::Real(v) => Scalar::Real(f(v)),
        Scalar::Complex(c) => Scalar::Complex(Complex64::new(f(c.re), f(c.im))),
    }
}

fn floor(x: Scalar) -> Scalar {
    parts(x, f64::floor)
}

fn ceil(x: Scalar) -> Scalar {
    parts(x, f64::ceil)
}

fn round(x: Scalar) -> Scalar {
    parts(x, f64::round)
}

fn re(x: Scalar) -> Scalar {
    Scalar::Real(x.re())
}

fn im(x: Scalar) -> Scalar {
    Scalar::Real(x.im())
}

fn complex_builtin(args: &[Value]) -> Result<Value> {
    match args {
        [Value::String(text)] => parse_complex(text).map(Value::Complex),
        [re] => Ok(Value::Complex(re.as_scalar()?.to_complex())),
        [re, im] => Ok(Value::complex(re.as_f64()?, im.as_f64()?)),
        _ => Err(EvalError::Argument(
            "complex expects one or two arguments".to_string(),
        )),
    }
}

/// Parses `a`, `bi`, `a + bi` or `a - bi`.
fn parse_complex(text: &str) -> Result<Complex64> {
    let invalid = || EvalError::Argument(format!("Invalid complex number \"{text}\""));
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(invalid());
    }
    let imaginary = |s: &str| -> Result<f64> {
        match s.strip_suffix('i').ok_or_else(invalid)? {
            "" | "+" => Ok(1.0),
            "-" => Ok(-1.0),
            coeff => coeff.parse().map_err(|_| invalid()),
        }
    };
    if !compact.ends_with('i') {
        return compact.parse().map(|re| Complex64::new(re, 0.0)).map_err(|_| invalid());
    }
    // split at the last sign that is not part of an exponent
    let split = compact
        .char_indices()
        .skip(1)
        .filter(|&(i, c)| {
            (c == '+' || c == '-') && !matches!(compact.as_bytes()[i - 1], b'e' | b'E')
        })
        .map(|(i, _)| i)
        .last();
    match split {
        Some(i) => {
            let re: f64 = compact[..i].parse().map_err(|_| invalid())?;
            Ok(Complex64::new(re, imaginary(&compact[i..])?))
        }
        None => Ok(Complex64::new(0.0, imaginary(&compact)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtree_value::Matrix;

    #[test]
    fn sqrt_of_negative_goes_complex() {
        assert_eq!(sqrt(Scalar::Real(9.0)), Scalar::Real(3.0));
        assert_eq!(sqrt(Scalar::Real(-9.0)), Scalar::complex(0.0, 3.0));
    }

    #[test]
    fn abs_of_complex_is_modulus() {
        assert_eq!(abs(Scalar::complex(3.0, 4.0)), Scalar::Real(5.0));
    }

    #[test]
    fn elementwise_over_matrix() {
        let v = Value::Matrix(Matrix::row_vector(vec![-1.5, 2.5]));
        let out = unary("floor", &v, |x| Ok(floor(x))).unwrap();
        assert_eq!(out, Value::Matrix(Matrix::row_vector(vec![-2.0, 2.0])));
    }

    #[test]
    fn complex_from_text() {
        assert_eq!(parse_complex("3 - 4i").unwrap(), Complex64::new(3.0, -4.0));
        assert_eq!(parse_complex("2i").unwrap(), Complex64::new(0.0, 2.0));
        assert_eq!(parse_complex("-i").unwrap(), Complex64::new(0.0, -1.0));
        assert_eq!(parse_complex("1e-3+i").unwrap(), Complex64::new(1e-3, 1.0));
        assert_eq!(parse_complex("7").unwrap(), Complex64::new(7.0, 0.0));
        assert!(parse_complex("abc").is_err());
    }

    #[test]
    fn complex_from_parts() {
        let z = complex_builtin(&[Value::Num(1.0), Value::Num(-2.0)]).unwrap();
        assert_eq!(z, Value::complex(1.0, -2.0));
    }
}
