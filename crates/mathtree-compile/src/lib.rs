//! Compilation of mathtree expression trees.
//!
//! [`compile`] resolves every operator and function name against a
//! [`Namespace`] and produces a [`CompiledExpr`], which evaluates against any
//! [`Scope`] the caller passes in.

mod compiler;
mod error;
mod namespace;
mod scope;

pub use compiler::{compile, Compile, CompiledExpr};
pub use error::CompileError;
pub use namespace::{Arity, Builtin, BuiltinFn, Namespace};
pub use scope::{Scope, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ELEMENTS};
