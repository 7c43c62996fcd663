//! Host-facing session: a namespace, a persistent scope and execution
//! statistics around the compile/eval pipeline.

mod error;

pub use error::MathError;

use log::{debug, warn};
use mathtree_builtins::{standard_namespace, standard_scope};
use mathtree_compile::{compile, CompiledExpr, Namespace, Scope};
use mathtree_node::Node;
use mathtree_value::Value;
use std::time::Instant;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecutionStats {
    pub total_executions: usize,
    pub compile_errors: usize,
    pub eval_errors: usize,
    pub total_execution_time_us: u64,
    pub average_execution_time_us: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub value: Value,
    pub execution_time_us: u64,
    /// Variables created or changed by this evaluation, sorted by name.
    pub assigned: Vec<String>,
}

/// Compiles trees against one namespace and evaluates them against a scope
/// that persists between calls.
pub struct MathSession {
    namespace: Namespace,
    scope: Scope,
    stats: ExecutionStats,
    verbose: bool,
}

impl Default for MathSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MathSession {
    /// Session over the standard namespace and constants.
    pub fn new() -> Self {
        Self::with_namespace(standard_namespace(), standard_scope())
    }

    pub fn with_namespace(namespace: Namespace, scope: Scope) -> Self {
        MathSession {
            namespace,
            scope,
            stats: ExecutionStats::default(),
            verbose: false,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Mutable namespace access. Already compiled expressions keep the
    /// functions they were bound to.
    pub fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.scope.set(name, value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.scope.get(name)
    }

    /// Drops every binding except the standard constants.
    pub fn clear_variables(&mut self) {
        let (max_depth, max_elements) = (self.scope.max_depth(), self.scope.max_elements());
        self.scope = standard_scope();
        self.scope.set_max_depth(max_depth);
        self.scope.set_max_elements(max_elements);
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.scope.set_max_depth(max_depth);
    }

    /// Limit on range lengths and matrix growth; see [`Scope::set_max_elements`].
    pub fn set_max_elements(&mut self, max_elements: usize) {
        self.scope.set_max_elements(max_elements);
    }

    pub fn compile(&self, tree: &Node) -> Result<CompiledExpr, MathError> {
        if self.verbose {
            debug!("compiling {tree}");
        }
        Ok(compile(tree, &self.namespace)?)
    }

    /// Evaluates an already compiled expression against the session scope.
    pub fn run(&mut self, code: &CompiledExpr) -> Result<ExecutionResult, MathError> {
        let before = self.scope.clone();
        let start = Instant::now();
        self.stats.total_executions += 1;
        let outcome = code.eval(&mut self.scope);
        let elapsed = start.elapsed().as_micros() as u64;
        self.record_time(elapsed);
        let value = outcome.map_err(|err| {
            self.stats.eval_errors += 1;
            warn!("{}: {err}", err.identifier());
            err
        })?;
        let mut assigned: Vec<String> = self
            .scope
            .iter()
            .filter(|(name, value)| changed(before.get(name), value))
            .map(|(name, _)| name.to_string())
            .collect();
        assigned.sort();
        if self.verbose {
            debug!("result {value} in {elapsed}us, assigned {assigned:?}");
        }
        Ok(ExecutionResult {
            value,
            execution_time_us: elapsed,
            assigned,
        })
    }

    /// Compile and evaluate in one step.
    pub fn evaluate(&mut self, tree: &Node) -> Result<ExecutionResult, MathError> {
        let code = self.compile(tree).map_err(|err| {
            self.stats.compile_errors += 1;
            warn!("{}: {err}", err.identifier());
            err
        })?;
        self.run(&code)
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ExecutionStats::default();
    }

    fn record_time(&mut self, elapsed_us: u64) {
        self.stats.total_execution_time_us += elapsed_us;
        self.stats.average_execution_time_us =
            self.stats.total_execution_time_us as f64 / self.stats.total_executions as f64;
    }
}

fn changed(before: Option<&Value>, after: &Value) -> bool {
    match (before, after) {
        // NaN never equals itself
        (Some(Value::Num(a)), Value::Num(b)) => a.to_bits() != b.to_bits(),
        (Some(old), new) => old != new,
        (None, _) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_errors_are_counted_separately() {
        let mut session = MathSession::new();
        let err = session
            .evaluate(&Node::function("nope", vec![]))
            .unwrap_err();
        assert!(err.is_compile_time());
        assert_eq!(err.identifier(), "MathTree:NameResolution");
        assert_eq!(session.stats().compile_errors, 1);
        assert_eq!(session.stats().total_executions, 0);
    }

    #[test]
    fn clear_variables_keeps_constants_and_limits() {
        let mut session = MathSession::new();
        session.set_max_depth(8);
        session.set_max_elements(100);
        session.set_variable("x", 1.0);
        session.clear_variables();
        assert!(session.get_variable("x").is_none());
        assert!(session.get_variable("pi").is_some());
        assert_eq!(session.scope().max_depth(), 8);
        assert_eq!(session.scope().max_elements(), 100);
    }
}
