use thiserror::Error;

/// Errors raised while constructing or rebuilding nodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("{node} expects {expected} children, got {actual}")]
    ArgumentCount {
        node: &'static str,
        expected: String,
        actual: usize,
    },

    #[error("invalid child for {node}: {message}")]
    InvalidChild { node: &'static str, message: String },

    #[error("invalid constant \"{text}\" for value type {value_type}")]
    InvalidConstant {
        text: String,
        value_type: &'static str,
    },
}

impl NodeError {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::ArgumentCount { .. } => "MathTree:ArgumentCount",
            Self::InvalidChild { .. } => "MathTree:InvalidChild",
            Self::InvalidConstant { .. } => "MathTree:InvalidConstant",
        }
    }
}
