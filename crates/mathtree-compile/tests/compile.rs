use mathtree_compile::{compile, Arity, Compile, CompileError, Namespace, Scope};
use mathtree_node::Node;
use mathtree_value::{EvalError, Matrix, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn binary(f: fn(f64, f64) -> f64) -> impl Fn(&[Value]) -> Result<Value, EvalError> {
    move |args: &[Value]| Ok(Value::Num(f(args[0].as_f64()?, args[1].as_f64()?)))
}

fn arithmetic() -> Namespace {
    let mut ns = Namespace::new();
    ns.register("add", Arity::Exact(2), binary(|a, b| a + b))
        .register("subtract", Arity::Exact(2), binary(|a, b| a - b))
        .register("multiply", Arity::Exact(2), binary(|a, b| a * b))
        .register("larger", Arity::Exact(2), |args: &[Value]| {
            Ok(Value::Bool(args[0].as_f64()? > args[1].as_f64()?))
        })
        .register("smallerEq", Arity::Exact(2), |args: &[Value]| {
            Ok(Value::Bool(args[0].as_f64()? <= args[1].as_f64()?))
        });
    ns
}

fn num(v: f64) -> Node {
    Node::number(v)
}

fn sym(name: &str) -> Node {
    Node::symbol(name)
}

#[test]
fn two_plus_x_is_deterministic() {
    let tree = Node::binary("+", "add", num(2.0), sym("x"));
    let code = tree.compile(&arithmetic()).unwrap();
    let mut scope = Scope::new();
    scope.set("x", 3.0);
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(5.0));
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(5.0));
    scope.set("x", 10.0);
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(12.0));
    assert_eq!(code.tree(), &tree);
}

#[test]
fn unknown_function_fails_to_compile() {
    let tree = Node::function("frobnicate", vec![num(1.0)]);
    let err = compile(&tree, &arithmetic()).unwrap_err();
    assert_eq!(err, CompileError::NameResolution("frobnicate".into()));
    assert_eq!(err.identifier(), "MathTree:NameResolution");

    let tree = Node::binary("%", "mod", num(1.0), num(2.0));
    assert!(matches!(
        compile(&tree, &arithmetic()),
        Err(CompileError::NameResolution(_))
    ));
}

#[test]
fn arity_is_checked_at_compile_time() {
    let tree = Node::function("add", vec![num(1.0)]);
    let err = compile(&tree, &arithmetic()).unwrap_err();
    assert!(matches!(err, CompileError::ArgumentCount { actual: 1, .. }));
}

#[test]
fn missing_symbol_is_an_eval_error() {
    let code = compile(&sym("y"), &arithmetic()).unwrap();
    let err = code.eval(&mut Scope::new()).unwrap_err();
    assert_eq!(err, EvalError::UndefinedSymbol("y".into()));
}

#[test]
fn conditional_evaluates_only_the_taken_branch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut ns = arithmetic();
    ns.register("boom", Arity::Exact(0), move |_: &[Value]| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(EvalError::Argument("should not run".into()))
    });
    let tree = Node::conditional(
        Node::binary(">", "larger", sym("x"), num(0.0)),
        sym("x"),
        Node::function("boom", vec![]),
    );
    let code = compile(&tree, &ns).unwrap();
    let mut scope: Scope = [("x", 4.0)].into_iter().collect();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(4.0));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    scope.set("x", -1.0);
    assert!(code.eval(&mut scope).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn matrix_condition_is_a_type_error() {
    let tree = Node::conditional(sym("m"), num(1.0), num(2.0));
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::new();
    scope.set("m", Matrix::row_vector(vec![1.0]));
    assert!(matches!(code.eval(&mut scope), Err(EvalError::Type(_))));
}

#[test]
fn block_returns_last_visible_entry() {
    let tree = Node::block(vec![
        (Node::assign("a", num(2.0)), true),
        (Node::assign("b", Node::binary("*", "multiply", sym("a"), num(5.0))), false),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::new();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(2.0));
    assert_eq!(scope.get("b"), Some(&Value::Num(10.0)));

    let hidden = Node::block(vec![(num(1.0), false)]);
    let code = compile(&hidden, &arithmetic()).unwrap();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Null);
}

#[test]
fn recursive_function_assignment() {
    // fact(n) = n <= 1 ? 1 : n * fact(n - 1); fact(5)
    let body = Node::conditional(
        Node::binary("<=", "smallerEq", sym("n"), num(1.0)),
        num(1.0),
        Node::binary(
            "*",
            "multiply",
            sym("n"),
            Node::function(
                "fact",
                vec![Node::binary("-", "subtract", sym("n"), num(1.0))],
            ),
        ),
    );
    let tree = Node::block(vec![
        (Node::function_assignment("fact", vec!["n".into()], body), false),
        (Node::function("fact", vec![num(5.0)]), true),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::new();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(120.0));
    assert!(matches!(scope.get("fact"), Some(Value::Function(_))));
    assert!(!scope.contains("n"));
}

#[test]
fn unbounded_recursion_hits_the_depth_limit() {
    let tree = Node::block(vec![
        (
            Node::function_assignment(
                "loop",
                vec!["x".into()],
                Node::function("loop", vec![sym("x")]),
            ),
            false,
        ),
        (Node::function("loop", vec![num(1.0)]), true),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::with_max_depth(16);
    assert_eq!(
        code.eval(&mut scope).unwrap_err(),
        EvalError::RecursionLimit(16)
    );
}

#[test]
fn function_captures_defining_scope() {
    let tree = Node::block(vec![
        (Node::assign("k", num(3.0)), false),
        (
            Node::function_assignment(
                "scale",
                vec!["x".into()],
                Node::binary("*", "multiply", sym("k"), sym("x")),
            ),
            false,
        ),
        (Node::assign("k", num(100.0)), false),
        (Node::function("scale", vec![num(2.0)]), true),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::new();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(6.0));
}

#[test]
fn later_assignments_are_invisible_to_defined_functions() {
    // f(x) = x + a; a = 3; f(1)
    let tree = Node::block(vec![
        (
            Node::function_assignment(
                "f",
                vec!["x".into()],
                Node::binary("+", "add", sym("x"), sym("a")),
            ),
            false,
        ),
        (Node::assign("a", num(3.0)), false),
        (Node::function("f", vec![num(1.0)]), true),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::new();
    assert_eq!(
        code.eval(&mut scope).unwrap_err(),
        EvalError::UndefinedSymbol("a".into())
    );
    assert_eq!(scope.get("a"), Some(&Value::Num(3.0)));
}

#[test]
fn shadowed_namespace_fallback_checks_arity() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut ns = arithmetic();
    ns.register("sin", Arity::Exact(1), move |args: &[Value]| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Num(args[0].as_f64()?.sin()))
    });
    // sin() is evaluated before the hidden `sin = 3` binds the name.
    let tree = Node::block(vec![
        (Node::function("sin", vec![]), true),
        (Node::assign("sin", num(3.0)), false),
    ]);
    let code = compile(&tree, &ns).unwrap();
    assert!(matches!(
        code.eval(&mut Scope::new()),
        Err(EvalError::Argument(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let valid = Node::block(vec![
        (Node::function("sin", vec![num(0.0)]), true),
        (Node::assign("sin", num(3.0)), false),
    ]);
    let code = compile(&valid, &ns).unwrap();
    assert_eq!(code.eval(&mut Scope::new()).unwrap(), Value::Num(0.0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn calling_a_non_function_fails() {
    let tree = Node::block(vec![
        (Node::assign("f", num(1.0)), false),
        (Node::function("f", vec![num(2.0)]), true),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    assert_eq!(
        code.eval(&mut Scope::new()).unwrap_err(),
        EvalError::NotCallable("f".into())
    );
}

#[test]
fn range_index_and_update() {
    let range = Node::range(num(1.0), num(9.0), Some(num(2.0)));
    let code = compile(&Node::assign("v", range), &arithmetic()).unwrap();
    let mut scope = Scope::new();
    code.eval(&mut scope).unwrap();
    assert_eq!(
        scope.get("v"),
        Some(&Value::Matrix(Matrix::row_vector(vec![1.0, 3.0, 5.0, 7.0, 9.0])))
    );

    let pick = Node::index(sym("v"), vec![num(2.0)]);
    let code = compile(&pick, &arithmetic()).unwrap();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(3.0));

    let slice = Node::index(sym("v"), vec![Node::range(num(2.0), num(3.0), None)]);
    let code = compile(&slice, &arithmetic()).unwrap();
    assert_eq!(
        code.eval(&mut scope).unwrap(),
        Value::Matrix(Matrix::row_vector(vec![3.0, 5.0]))
    );

    let Node::Index(target) = Node::index(sym("v"), vec![num(1.0)]) else {
        unreachable!();
    };
    let update = Node::update(target, num(-1.0));
    let code = compile(&update, &arithmetic()).unwrap();
    assert_eq!(code.eval(&mut scope).unwrap(), Value::Num(-1.0));
    assert_eq!(
        scope.get("v"),
        Some(&Value::Matrix(Matrix::row_vector(vec![-1.0, 3.0, 5.0, 7.0, 9.0])))
    );
}

#[test]
fn zero_step_range_fails() {
    let range = Node::range(num(1.0), num(2.0), Some(num(0.0)));
    let code = compile(&range, &arithmetic()).unwrap();
    assert!(matches!(
        code.eval(&mut Scope::new()),
        Err(EvalError::Argument(_))
    ));
}

#[test]
fn oversized_range_is_a_dimension_error() {
    let range = Node::range(num(1.0), num(1e14), None);
    let code = compile(&range, &arithmetic()).unwrap();
    assert!(matches!(
        code.eval(&mut Scope::new()),
        Err(EvalError::Dimension(_))
    ));

    let mut scope = Scope::new();
    scope.set_max_elements(3);
    let code = compile(&Node::range(num(1.0), num(4.0), None), &arithmetic()).unwrap();
    assert!(matches!(code.eval(&mut scope), Err(EvalError::Dimension(_))));
    let code = compile(&Node::range(num(1.0), num(3.0), None), &arithmetic()).unwrap();
    assert!(code.eval(&mut scope).is_ok());
}

#[test]
fn update_growth_is_limited() {
    let mut scope = Scope::new();
    scope.set("v", Matrix::row_vector(vec![1.0, 2.0]));
    let Node::Index(target) = Node::index(sym("v"), vec![num(1e14)]) else {
        unreachable!();
    };
    let code = compile(&Node::update(target, num(1.0)), &arithmetic()).unwrap();
    assert!(matches!(code.eval(&mut scope), Err(EvalError::Dimension(_))));
    assert_eq!(
        scope.get("v"),
        Some(&Value::Matrix(Matrix::row_vector(vec![1.0, 2.0])))
    );

    scope.set_max_elements(4);
    let Node::Index(target) = Node::index(sym("v"), vec![num(5.0)]) else {
        unreachable!();
    };
    let code = compile(&Node::update(target, num(1.0)), &arithmetic()).unwrap();
    assert!(matches!(code.eval(&mut scope), Err(EvalError::Dimension(_))));
    let Node::Index(target) = Node::index(sym("v"), vec![num(4.0)]) else {
        unreachable!();
    };
    let code = compile(&Node::update(target, num(7.0)), &arithmetic()).unwrap();
    code.eval(&mut scope).unwrap();
    assert_eq!(
        scope.get("v"),
        Some(&Value::Matrix(Matrix::row_vector(vec![1.0, 2.0, 0.0, 7.0])))
    );
}

#[test]
fn update_of_non_symbol_target_fails_to_compile() {
    let Node::Index(target) = Node::index(Node::array(vec![num(1.0)]), vec![num(1.0)]) else {
        unreachable!();
    };
    let update = Node::update(target, num(0.0));
    assert!(matches!(
        compile(&update, &arithmetic()),
        Err(CompileError::Node(_))
    ));
}

#[test]
fn failed_eval_keeps_earlier_writes() {
    let tree = Node::block(vec![
        (Node::assign("a", num(1.0)), false),
        (sym("missing"), true),
    ]);
    let code = compile(&tree, &arithmetic()).unwrap();
    let mut scope = Scope::new();
    assert!(code.eval(&mut scope).is_err());
    assert_eq!(scope.get("a"), Some(&Value::Num(1.0)));
}

#[test]
fn compiled_expressions_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<mathtree_compile::CompiledExpr>();
    assert_send_sync::<Namespace>();
}
