use mathtree_compile::CompileError;
use mathtree_node::NodeError;
use mathtree_value::EvalError;
use thiserror::Error;

/// Any failure a session can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl MathError {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Node(err) => err.identifier(),
            Self::Compile(err) => err.identifier(),
            Self::Eval(err) => err.identifier(),
        }
    }

    pub fn is_compile_time(&self) -> bool {
        !matches!(self, Self::Eval(_))
    }
}
