use mathtree_node::{Node, NodeError, NodeKind};

fn quadratic() -> Node {
    // a * x ^ 2 + b * x + c
    let ax2 = Node::binary(
        "*",
        "multiply",
        Node::symbol("a"),
        Node::binary("^", "pow", Node::symbol("x"), Node::number(2.0)),
    );
    let bx = Node::binary("*", "multiply", Node::symbol("b"), Node::symbol("x"));
    Node::binary(
        "+",
        "add",
        Node::binary("+", "add", ax2, bx),
        Node::symbol("c"),
    )
}

#[test]
fn clone_is_independent() {
    let original = quadratic();
    let mut copy = original.clone();
    if let Node::Operator(op) = &mut copy {
        op.args[1] = Node::symbol("d");
    }
    assert_eq!(original.to_string(), "a * x ^ 2 + b * x + c");
    assert_eq!(copy.to_string(), "a * x ^ 2 + b * x + d");
    assert!(!original.equals(&copy));
}

#[test]
fn transform_leaves_original_untouched() {
    let original = quadratic();
    let snapshot = original.clone();
    let replaced = original
        .transform(|node, _, _| match node {
            Node::Symbol(s) if s.name == "x" => Some(Node::number(3.0)),
            _ => None,
        })
        .unwrap();
    assert_eq!(original, snapshot);
    assert_eq!(replaced.to_string(), "a * 3 ^ 2 + b * 3 + c");
}

#[test]
fn transform_does_not_visit_replacements() {
    let tree = Node::binary("+", "add", Node::symbol("x"), Node::number(1.0));
    let mut visited = Vec::new();
    let out = tree
        .transform(|node, _, _| {
            visited.push(node.identifier());
            match node {
                Node::Symbol(_) => Some(Node::function("f", vec![Node::symbol("x")])),
                _ => None,
            }
        })
        .unwrap();
    assert_eq!(out.to_string(), "f(x) + 1");
    assert_eq!(
        visited,
        vec!["OperatorNode:add", "SymbolNode:x", "ConstantNode"]
    );
}

#[test]
fn transform_can_replace_the_root() {
    let tree = quadratic();
    let out = tree.transform(|_, _, _| Some(Node::number(0.0))).unwrap();
    assert_eq!(out, Node::number(0.0));
}

#[test]
fn filter_visits_every_node_in_pre_order() {
    let tree = quadratic();
    let all = tree.filter(|_, _, _| true);
    assert_eq!(all.len(), 11);
    assert_eq!(all[0], &tree);
    let names: Vec<String> = tree
        .filter(|node, _, _| node.kind() == NodeKind::Symbol)
        .into_iter()
        .map(|node| node.to_string())
        .collect();
    assert_eq!(names, vec!["a", "x", "b", "x", "c"]);
}

#[test]
fn filter_reports_index_and_parent() {
    let tree = Node::conditional(Node::boolean(true), Node::number(1.0), Node::number(2.0));
    let mut positions = Vec::new();
    tree.filter(|node, index, parent| {
        if let Some(parent) = parent {
            positions.push((node.to_string(), index, parent.kind()));
        }
        false
    });
    assert_eq!(
        positions,
        vec![
            ("true".to_string(), Some(0), NodeKind::Conditional),
            ("1".to_string(), Some(1), NodeKind::Conditional),
            ("2".to_string(), Some(2), NodeKind::Conditional),
        ]
    );
}

#[test]
fn function_reference_is_not_a_child() {
    let call = Node::function("sin", vec![Node::symbol("t")]);
    let symbols = call.filter(|node, _, _| node.kind() == NodeKind::Symbol);
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].to_string(), "t");
}

#[derive(Debug, PartialEq)]
enum VisitError {
    Forbidden(String),
    Node(NodeError),
}

impl From<NodeError> for VisitError {
    fn from(err: NodeError) -> Self {
        VisitError::Node(err)
    }
}

#[test]
fn callback_errors_stop_the_walk() {
    let tree = quadratic();
    let mut seen = 0;
    let err = tree
        .try_traverse(|node, _, _| {
            seen += 1;
            match node {
                Node::Symbol(s) if s.name == "x" => Err(VisitError::Forbidden(s.name.clone())),
                _ => Ok(()),
            }
        })
        .unwrap_err();
    assert_eq!(err, VisitError::Forbidden("x".into()));
    // +, +, *, a, ^, x
    assert_eq!(seen, 6);

    let err = tree
        .try_filter(|node, _, _| match node.kind() {
            NodeKind::Constant => Err("constant"),
            _ => Ok(true),
        })
        .unwrap_err();
    assert_eq!(err, "constant");
}

#[test]
fn try_transform_surfaces_invalid_rebuilds() {
    let Node::Index(index) = Node::index(Node::symbol("A"), vec![Node::number(1.0)]) else {
        unreachable!();
    };
    let update = Node::update(index, Node::number(9.0));
    let err = update
        .try_transform(|node, _, _| match node.kind() {
            NodeKind::Index => Ok(Some(Node::symbol("B"))),
            _ => Ok::<_, VisitError>(None),
        })
        .unwrap_err();
    assert!(matches!(err, VisitError::Node(NodeError::InvalidChild { .. })));
}

#[test]
fn rendering_is_deterministic() {
    let tree = quadratic();
    assert_eq!(tree.to_string(), tree.clone().to_string());
    assert_eq!(tree.to_tex(), tree.to_tex());
    assert_eq!(tree.to_tex(), "a\\cdot {x}^{2}+b\\cdot x+c");
}
