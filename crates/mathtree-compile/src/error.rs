use crate::namespace::Arity;
use mathtree_node::NodeError;
use thiserror::Error;

/// Errors raised while compiling a tree. Any of them aborts the whole compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Undefined function {0}")]
    NameResolution(String),

    #[error("Wrong number of arguments in function {name} ({actual} provided, {expected} expected)")]
    ArgumentCount {
        name: String,
        expected: Arity,
        actual: usize,
    },

    #[error(transparent)]
    Node(#[from] NodeError),
}

impl CompileError {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::NameResolution(_) => "MathTree:NameResolution",
            Self::ArgumentCount { .. } => "MathTree:ArgumentCount",
            Self::Node(err) => err.identifier(),
        }
    }
}
