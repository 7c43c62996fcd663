use thiserror::Error;

/// Errors raised while evaluating a compiled expression.
///
/// Each variant maps to a stable identifier (see [`EvalError::identifier`]) so
/// hosts can match on failures without parsing messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined symbol \"{0}\"")]
    UndefinedSymbol(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("dimension error: {0}")]
    Dimension(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("argument error: {0}")]
    Argument(String),

    #[error("\"{0}\" is not a function")]
    NotCallable(String),

    #[error("maximum call depth of {0} exceeded")]
    RecursionLimit(usize),
}

impl EvalError {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::UndefinedSymbol(_) => "MathTree:UndefinedSymbol",
            Self::Type(_) => "MathTree:TypeError",
            Self::Dimension(_) => "MathTree:DimensionError",
            Self::Index(_) => "MathTree:IndexError",
            Self::Argument(_) => "MathTree:ArgumentError",
            Self::NotCallable(_) => "MathTree:NotCallable",
            Self::RecursionLimit(_) => "MathTree:RecursionLimit",
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn dimension(message: impl Into<String>) -> Self {
        Self::Dimension(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
