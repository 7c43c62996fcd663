use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single matrix element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Real(f64),
    Complex(Complex64),
}

impl Scalar {
    pub const ZERO: Scalar = Scalar::Real(0.0);

    pub fn complex(re: f64, im: f64) -> Self {
        Scalar::Complex(Complex64::new(re, im))
    }

    /// Complex conjugate; the identity on reals.
    pub fn conj(self) -> Self {
        match self {
            Scalar::Real(v) => Scalar::Real(v),
            Scalar::Complex(c) => Scalar::Complex(c.conj()),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Real(v) => *v == 0.0,
            Scalar::Complex(c) => c.re == 0.0 && c.im == 0.0,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Scalar::Real(_))
    }

    pub fn re(&self) -> f64 {
        match self {
            Scalar::Real(v) => *v,
            Scalar::Complex(c) => c.re,
        }
    }

    pub fn im(&self) -> f64 {
        match self {
            Scalar::Real(_) => 0.0,
            Scalar::Complex(c) => c.im,
        }
    }

    pub fn to_complex(self) -> Complex64 {
        match self {
            Scalar::Real(v) => Complex64::new(v, 0.0),
            Scalar::Complex(c) => c,
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Real(value)
    }
}

impl From<Complex64> for Scalar {
    fn from(value: Complex64) -> Self {
        Scalar::Complex(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Real(v) => write!(f, "{v}"),
            Scalar::Complex(c) => format_complex(*c, f),
        }
    }
}

pub(crate) fn format_complex(c: Complex64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if c.im == 0.0 {
        return write!(f, "{}", c.re);
    }
    if c.re == 0.0 {
        return match c.im {
            v if v == 1.0 => write!(f, "i"),
            v if v == -1.0 => write!(f, "-i"),
            v => write!(f, "{v}i"),
        };
    }
    let sign = if c.im < 0.0 { '-' } else { '+' };
    let im = c.im.abs();
    if im == 1.0 {
        write!(f, "{} {sign} i", c.re)
    } else {
        write!(f, "{} {sign} {im}i", c.re)
    }
}
