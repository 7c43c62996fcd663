//! Tree to closure compiler.
//!
//! Every node compiles bottom-up into a [`Step`]. Namespace lookups and arity
//! checks happen here, once; the produced closures only touch the scope they
//! are handed at evaluation time.

use crate::error::CompileError;
use crate::namespace::{Builtin, Namespace};
use crate::scope::Scope;
use log::{debug, trace};
use mathtree_node::{Constant, IndexNode, Node, NodeError, RangeNode, UpdateNode};
use mathtree_value::{
    checked_element_count, Callable, EvalError, Matrix, NativeFn, StorageKind, Value,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

type Step = Arc<dyn Fn(&mut Scope) -> Result<Value, EvalError> + Send + Sync>;

fn step<F>(f: F) -> Step
where
    F: Fn(&mut Scope) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A compiled tree. Owns the evaluation closure and a copy of the tree it was
/// built from, never a scope.
#[derive(Clone)]
pub struct CompiledExpr {
    tree: Node,
    root: Step,
}

impl CompiledExpr {
    pub fn eval(&self, scope: &mut Scope) -> Result<Value, EvalError> {
        (self.root)(scope)
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("tree", &self.tree.to_string())
            .finish_non_exhaustive()
    }
}

/// `node.compile(&namespace)` for any tree.
pub trait Compile {
    fn compile(&self, namespace: &Namespace) -> Result<CompiledExpr, CompileError>;
}

impl Compile for Node {
    fn compile(&self, namespace: &Namespace) -> Result<CompiledExpr, CompileError> {
        compile(self, namespace)
    }
}

/// Compiles `tree` against `namespace`.
///
/// Operator and function names resolve here. A function name that the tree
/// itself defines (through a function assignment or an assignment) resolves
/// from the scope at evaluation time instead.
pub fn compile(tree: &Node, namespace: &Namespace) -> Result<CompiledExpr, CompileError> {
    let locals = tree
        .filter(|node, _, _| matches!(node, Node::Assignment(_) | Node::FunctionAssignment(_)))
        .into_iter()
        .filter_map(|node| match node {
            Node::Assignment(a) => Some(a.name.clone()),
            Node::FunctionAssignment(f) => Some(f.name.clone()),
            _ => None,
        })
        .collect();
    let compiler = Compiler { namespace, locals };
    let root = compiler.node(tree)?;
    debug!(
        "compiled {} against {} namespace entries",
        tree.identifier(),
        namespace.len()
    );
    Ok(CompiledExpr {
        tree: tree.clone(),
        root,
    })
}

struct Compiler<'a> {
    namespace: &'a Namespace,
    locals: HashSet<String>,
}

impl Compiler<'_> {
    fn node(&self, node: &Node) -> Result<Step, CompileError> {
        match node {
            Node::Constant(c) => {
                let value = constant_value(&c.value);
                Ok(step(move |_| Ok(value.clone())))
            }
            Node::Symbol(s) => {
                let name = s.name.clone();
                Ok(step(move |scope| {
                    scope
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))
                }))
            }
            Node::Operator(op) => {
                let builtin = self.resolve(&op.fn_name, op.args.len())?;
                let args = self.all(&op.args)?;
                Ok(call_builtin(builtin, args))
            }
            Node::Function(f) => self.function_call(f.name(), &f.args),
            Node::Array(a) => {
                let items = self.all(&a.items)?;
                Ok(step(move |scope| Value::collect_array(eval_all(&items, scope)?)))
            }
            Node::Assignment(a) => {
                let name = a.name.clone();
                let expr = self.node(&a.expr)?;
                Ok(step(move |scope| {
                    let value = expr(scope)?;
                    scope.set(name.clone(), value.clone());
                    Ok(value)
                }))
            }
            Node::Block(b) => {
                let entries = b
                    .blocks
                    .iter()
                    .map(|entry| -> Result<(Step, bool), CompileError> {
                        Ok((self.node(&entry.node)?, entry.visible))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(step(move |scope| {
                    let mut last = Value::Null;
                    for (entry, visible) in &entries {
                        let value = entry(scope)?;
                        if *visible {
                            last = value;
                        }
                    }
                    Ok(last)
                }))
            }
            Node::Conditional(c) => {
                let condition = self.node(&c.condition)?;
                let when_true = self.node(&c.true_expr)?;
                let when_false = self.node(&c.false_expr)?;
                Ok(step(move |scope| {
                    if condition(scope)?.is_truthy()? {
                        when_true(scope)
                    } else {
                        when_false(scope)
                    }
                }))
            }
            Node::FunctionAssignment(f) => self.function_assignment(&f.name, &f.params, &f.expr),
            Node::Index(i) => self.index(i),
            Node::Range(r) => self.range(r),
            Node::Update(u) => self.update(u),
        }
    }

    fn all(&self, nodes: &[Node]) -> Result<Vec<Step>, CompileError> {
        nodes.iter().map(|n| self.node(n)).collect()
    }

    fn resolve(&self, name: &str, argc: usize) -> Result<Builtin, CompileError> {
        let builtin = self
            .namespace
            .get(name)
            .ok_or_else(|| CompileError::NameResolution(name.to_string()))?;
        if !builtin.arity.accepts(argc) {
            return Err(CompileError::ArgumentCount {
                name: name.to_string(),
                expected: builtin.arity,
                actual: argc,
            });
        }
        Ok(builtin.clone())
    }

    fn function_call(&self, name: &str, args: &[Node]) -> Result<Step, CompileError> {
        if !self.locals.contains(name) {
            let builtin = self.resolve(name, args.len())?;
            return Ok(call_builtin(builtin, self.all(args)?));
        }
        let args = self.all(args)?;
        let name = name.to_string();
        let fallback = self.namespace.get(&name).cloned();
        Ok(step(move |scope| {
            let values = eval_all(&args, scope)?;
            match scope.get(&name) {
                Some(Value::Function(callable)) => callable.call(&values, scope.depth()),
                Some(_) => Err(EvalError::NotCallable(name.clone())),
                None => match &fallback {
                    Some(builtin) => builtin.call(&values),
                    None => Err(EvalError::UndefinedSymbol(name.clone())),
                },
            }
        }))
    }

    fn function_assignment(
        &self,
        name: &str,
        params: &[String],
        body: &Node,
    ) -> Result<Step, CompileError> {
        let body = self.node(body)?;
        let name = name.to_string();
        let params = params.to_vec();
        trace!("compiled function {}({})", name, params.join(", "));
        Ok(step(move |scope| {
            let callable = define_function(&name, &params, body.clone(), scope);
            scope.set(name.clone(), Value::Function(callable.clone()));
            Ok(Value::Function(callable))
        }))
    }

    fn index(&self, index: &IndexNode) -> Result<Step, CompileError> {
        let object = self.node(&index.object)?;
        let dims = self.all(&index.dimensions)?;
        Ok(step(move |scope| {
            let target = object(scope)?;
            let lists = index_lists(&dims, scope)?;
            subset_value(&target, &lists)
        }))
    }

    fn range(&self, range: &RangeNode) -> Result<Step, CompileError> {
        let start = self.node(&range.start)?;
        let end = self.node(&range.end)?;
        let stride = range.step.as_deref().map(|s| self.node(s)).transpose()?;
        Ok(step(move |scope| {
            let from = start(scope)?.as_f64()?;
            let to = end(scope)?.as_f64()?;
            let by = match &stride {
                Some(s) => s(scope)?.as_f64()?,
                None => 1.0,
            };
            range_values(from, to, by, scope.max_elements())
                .map(|values| Value::Matrix(Matrix::row_vector(values)))
        }))
    }

    fn update(&self, update: &UpdateNode) -> Result<Step, CompileError> {
        let target = update.index();
        let name = match target.object.as_ref() {
            Node::Symbol(s) => s.name.clone(),
            other => {
                return Err(CompileError::Node(NodeError::InvalidChild {
                    node: "UpdateNode",
                    message: format!(
                        "update target must be a symbol, got {}",
                        other.kind().type_name()
                    ),
                }))
            }
        };
        let dims = self.all(&target.dimensions)?;
        let expr = self.node(&update.expr)?;
        Ok(step(move |scope| {
            let lists = index_lists(&dims, scope)?;
            let value = expr(scope)?;
            let mut matrix = match scope.get(&name) {
                Some(Value::Matrix(m)) => m.clone(),
                Some(other) => {
                    return Err(EvalError::type_error(format!(
                        "Cannot update {} \"{name}\", expected a matrix",
                        other.type_name()
                    )))
                }
                None => return Err(EvalError::UndefinedSymbol(name.clone())),
            };
            let replacement = match &value {
                Value::Matrix(m) => m.clone(),
                other => Matrix::dense(vec![other.as_scalar()?], vec![1])?,
            };
            if matrix.storage_kind() == StorageKind::Dense {
                let grown = grown_shape(&matrix.shape(), &lists);
                checked_element_count(&grown, scope.max_elements())?;
            }
            matrix.set_subset(&lists, &replacement)?;
            scope.set(name.clone(), Value::Matrix(matrix));
            Ok(value)
        }))
    }
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Number(n) => Value::Num(*n),
        Constant::String(s) => Value::String(s.clone()),
        Constant::Boolean(b) => Value::Bool(*b),
        Constant::Null => Value::Null,
    }
}

fn eval_all(steps: &[Step], scope: &mut Scope) -> Result<Vec<Value>, EvalError> {
    let mut values = Vec::with_capacity(steps.len());
    for s in steps {
        values.push(s(scope)?);
    }
    Ok(values)
}

fn call_builtin(builtin: Builtin, args: Vec<Step>) -> Step {
    step(move |scope| {
        let values = eval_all(&args, scope)?;
        builtin.call(&values)
    })
}

/// Builds the callable for a function assignment. The body runs in a copy of
/// the defining scope with the parameters bound and the function itself
/// visible under its own name.
///
/// The copy is a snapshot taken when the assignment evaluates. Variables
/// assigned afterwards are not visible to the body: `f(x) = x + a; a = 3; f(1)`
/// fails with `UndefinedSymbol("a")` rather than reading the later `a`, and
/// rebinding a captured name does not change the result. Every call clones the
/// snapshot into a fresh frame, so writes made by the body never leak.
fn define_function(name: &str, params: &[String], body: Step, scope: &Scope) -> Callable {
    let closure = scope.frame(scope.depth());
    let bound = params.to_vec();
    let func: NativeFn = Arc::new(
        move |this: &Callable, args: &[Value], depth: usize| -> Result<Value, EvalError> {
            let depth = depth + 1;
            if depth > closure.max_depth() {
                return Err(EvalError::RecursionLimit(closure.max_depth()));
            }
            let mut frame = closure.frame(depth);
            frame.set(this.name.clone(), Value::Function(this.clone()));
            for (param, arg) in bound.iter().zip(args) {
                frame.set(param.clone(), arg.clone());
            }
            body(&mut frame)
        },
    );
    Callable::new(name, params.to_vec(), func)
}

/// Shape of `shape` after writing to every position in `lists`. Rank
/// mismatches are left for the write itself to report.
fn grown_shape(shape: &[usize], lists: &[Vec<usize>]) -> Vec<usize> {
    if shape.len() != lists.len() {
        return shape.to_vec();
    }
    shape
        .iter()
        .zip(lists)
        .map(|(&dim, list)| {
            list.iter()
                .map(|&i| i.saturating_add(1))
                .fold(dim, usize::max)
        })
        .collect()
}

/// Inclusive range values. More than `limit` values is a dimension error.
fn range_values(from: f64, to: f64, by: f64, limit: usize) -> Result<Vec<f64>, EvalError> {
    if by == 0.0 {
        return Err(EvalError::Argument("Step must be non-zero".to_string()));
    }
    if !(from.is_finite() && to.is_finite() && by.is_finite()) {
        return Err(EvalError::Argument(format!(
            "Range bounds must be finite ({from}:{by}:{to})"
        )));
    }
    let steps = ((to - from) / by + 1e-10).floor();
    if steps < 0.0 {
        return Ok(Vec::new());
    }
    if steps >= limit as f64 {
        return Err(EvalError::dimension(format!(
            "Range {from}:{by}:{to} exceeds the limit of {limit} elements"
        )));
    }
    Ok((0..=steps as usize).map(|k| from + k as f64 * by).collect())
}

fn one_based(position: f64) -> Result<usize, EvalError> {
    if position.fract() != 0.0 || position < 1.0 {
        return Err(EvalError::Index(format!(
            "Index must be a positive integer, got {position}"
        )));
    }
    Ok(position as usize - 1)
}

fn index_list(value: &Value) -> Result<Vec<usize>, EvalError> {
    match value {
        Value::Matrix(m) => m
            .elements()
            .iter()
            .map(|s| {
                if s.is_real() {
                    one_based(s.re())
                } else {
                    Err(EvalError::Index(format!("Index must be real, got {s}")))
                }
            })
            .collect(),
        other => Ok(vec![one_based(other.as_f64()?)?]),
    }
}

/// Evaluates index dimensions into zero-based index lists.
fn index_lists(dims: &[Step], scope: &mut Scope) -> Result<Vec<Vec<usize>>, EvalError> {
    eval_all(dims, scope)?.iter().map(index_list).collect()
}

fn subset_value(target: &Value, lists: &[Vec<usize>]) -> Result<Value, EvalError> {
    match target {
        Value::Matrix(m) => {
            let sub = m.subset(lists)?;
            if lists.iter().all(|l| l.len() == 1) {
                sub.get(&vec![0; lists.len()]).map(Value::from_scalar)
            } else {
                Ok(Value::Matrix(sub))
            }
        }
        Value::String(s) => {
            let [list] = lists else {
                return Err(EvalError::Index(format!(
                    "Dimension mismatch: index has {} dimensions, string has 1",
                    lists.len()
                )));
            };
            let chars: Vec<char> = s.chars().collect();
            list.iter()
                .map(|&i| {
                    chars.get(i).copied().ok_or_else(|| {
                        EvalError::Index(format!(
                            "Index out of range ({} > {})",
                            i + 1,
                            chars.len()
                        ))
                    })
                })
                .collect::<Result<String, EvalError>>()
                .map(Value::String)
        }
        other => Err(EvalError::type_error(format!(
            "Cannot apply an index to {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_ranges() {
        let limit = usize::MAX;
        assert_eq!(range_values(1.0, 4.0, 1.0, limit).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(range_values(0.0, 1.0, 0.25, limit).unwrap().len(), 5);
        assert_eq!(range_values(5.0, 1.0, -2.0, limit).unwrap(), vec![5.0, 3.0, 1.0]);
        assert!(range_values(3.0, 1.0, 1.0, limit).unwrap().is_empty());
        assert!(matches!(
            range_values(1.0, 2.0, 0.0, limit),
            Err(EvalError::Argument(_))
        ));
    }

    #[test]
    fn range_length_is_limited() {
        assert_eq!(range_values(1.0, 4.0, 1.0, 4).unwrap().len(), 4);
        assert!(matches!(
            range_values(1.0, 5.0, 1.0, 4),
            Err(EvalError::Dimension(_))
        ));
        assert!(matches!(
            range_values(1.0, 1e300, 1.0, usize::MAX),
            Err(EvalError::Dimension(_))
        ));
    }

    #[test]
    fn growth_covers_every_written_position() {
        assert_eq!(grown_shape(&[1, 3], &[vec![0], vec![1, 7]]), vec![1, 8]);
        assert_eq!(grown_shape(&[2, 2], &[vec![0]]), vec![2, 2]);
    }

    #[test]
    fn indices_are_one_based() {
        assert_eq!(index_list(&Value::Num(1.0)).unwrap(), vec![0]);
        assert!(index_list(&Value::Num(0.0)).is_err());
        assert!(index_list(&Value::Num(1.5)).is_err());
        let v = Value::Matrix(Matrix::row_vector(vec![2.0, 3.0]));
        assert_eq!(index_list(&v).unwrap(), vec![1, 2]);
    }

    #[test]
    fn string_indexing() {
        let s = Value::from("hello");
        assert_eq!(subset_value(&s, &[vec![1, 2]]).unwrap(), Value::from("el"));
        assert!(subset_value(&s, &[vec![9]]).is_err());
    }
}
