use mathtree_node::{Node, NodeKind};

#[test]
fn tree_survives_json() {
    let Node::Index(target) = Node::index(
        Node::symbol("A"),
        vec![Node::number(2.0), Node::range(Node::number(1.0), Node::symbol("n"), None)],
    ) else {
        unreachable!();
    };
    let tree = Node::block(vec![
        (Node::assign("n", Node::number(3.0)), false),
        (
            Node::function_assignment(
                "f",
                vec!["x".into()],
                Node::conditional(
                    Node::binary(">", "larger", Node::symbol("x"), Node::number(0.0)),
                    Node::string("pos"),
                    Node::string("neg"),
                ),
            ),
            false,
        ),
        (Node::update(target, Node::number(0.0)), true),
    ]);

    let json = serde_json::to_string(&tree).unwrap();
    let back: Node = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);
}

#[test]
fn json_shape_uses_type_tags() {
    let tree = Node::binary("+", "add", Node::number(2.0), Node::symbol("x"));
    let value = serde_json::to_value(&tree).unwrap();
    assert_eq!(value["type"], "OperatorNode");
    assert_eq!(value["fn"], "add");
    assert_eq!(value["args"][0]["type"], "ConstantNode");
    assert_eq!(value["args"][0]["value"]["valueType"], "number");
    assert_eq!(value["args"][1]["name"], "x");
}

#[test]
fn hand_written_json_parses() {
    let json = r#"{
        "type": "FunctionNode",
        "fn": { "name": "sqrt" },
        "args": [ { "type": "SymbolNode", "name": "x" } ]
    }"#;
    let node: Node = serde_json::from_str(json).unwrap();
    assert_eq!(node.kind(), NodeKind::Function);
    assert_eq!(node.to_string(), "sqrt(x)");
}

#[test]
fn invalid_update_is_rejected_on_load() {
    let json = r#"{
        "type": "UpdateNode",
        "index": { "type": "SymbolNode", "name": "A" },
        "expr": { "type": "ConstantNode", "value": { "valueType": "number", "value": 1 } }
    }"#;
    let err = serde_json::from_str::<Node>(json).unwrap_err();
    assert!(err.to_string().contains("IndexNode"));
}

#[test]
fn operator_without_arguments_is_rejected_on_load() {
    let json = r#"{ "type": "OperatorNode", "op": "+", "fn": "add", "args": [] }"#;
    assert!(serde_json::from_str::<Node>(json).is_err());
}
