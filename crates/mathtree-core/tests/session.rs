use mathtree_core::{MathError, MathSession};
use mathtree_node::Node;
use mathtree_value::{EvalError, Value};

fn two_plus_x() -> Node {
    Node::binary("+", "add", Node::number(2.0), Node::symbol("x"))
}

#[test]
fn variables_persist_between_evaluations() {
    let mut session = MathSession::new();
    let first = session
        .evaluate(&Node::assign("x", Node::number(3.0)))
        .unwrap();
    assert_eq!(first.value, Value::Num(3.0));
    assert_eq!(first.assigned, vec!["x".to_string()]);

    let second = session.evaluate(&two_plus_x()).unwrap();
    assert_eq!(second.value, Value::Num(5.0));
    assert!(second.assigned.is_empty());
    assert_eq!(session.stats().total_executions, 2);
}

#[test]
fn compiled_expression_reruns_against_updated_scope() {
    let mut session = MathSession::new();
    let code = session.compile(&two_plus_x()).unwrap();
    session.set_variable("x", 3.0);
    assert_eq!(session.run(&code).unwrap().value, Value::Num(5.0));
    session.set_variable("x", 10.0);
    assert_eq!(session.run(&code).unwrap().value, Value::Num(12.0));
}

#[test]
fn eval_errors_keep_earlier_writes() {
    let mut session = MathSession::new();
    let tree = Node::block(vec![
        (Node::assign("a", Node::number(1.0)), false),
        (Node::symbol("missing"), true),
    ]);
    let err = session.evaluate(&tree).unwrap_err();
    assert_eq!(err, MathError::Eval(EvalError::UndefinedSymbol("missing".into())));
    assert_eq!(err.identifier(), "MathTree:UndefinedSymbol");
    assert_eq!(session.get_variable("a"), Some(&Value::Num(1.0)));
    assert_eq!(session.stats().eval_errors, 1);
}

#[test]
fn custom_functions_join_the_namespace() {
    let mut session = MathSession::new();
    session
        .namespace_mut()
        .register("double", mathtree_compile::Arity::Exact(1), |args: &[Value]| {
            Ok(Value::Num(args[0].as_f64()? * 2.0))
        });
    let out = session
        .evaluate(&Node::function("double", vec![Node::number(21.0)]))
        .unwrap();
    assert_eq!(out.value, Value::Num(42.0));
}

#[test]
fn trees_loaded_from_json_evaluate() {
    let json = r#"{
        "type": "OperatorNode",
        "op": "*",
        "fn": "multiply",
        "args": [
            {"type": "ConstantNode", "value": {"valueType": "number", "value": 6}},
            {"type": "SymbolNode", "name": "y"}
        ]
    }"#;
    let tree: Node = serde_json::from_str(json).unwrap();
    let mut session = MathSession::new();
    session.set_variable("y", 7.0);
    assert_eq!(session.evaluate(&tree).unwrap().value, Value::Num(42.0));
}
