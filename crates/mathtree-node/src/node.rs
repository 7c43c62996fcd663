use crate::error::NodeError;
use crate::variants::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    #[serde(rename = "ConstantNode")]
    Constant(ConstantNode),
    #[serde(rename = "SymbolNode")]
    Symbol(SymbolNode),
    #[serde(rename = "OperatorNode")]
    Operator(OperatorNode),
    #[serde(rename = "FunctionNode")]
    Function(FunctionNode),
    #[serde(rename = "ArrayNode")]
    Array(ArrayNode),
    #[serde(rename = "AssignmentNode")]
    Assignment(AssignmentNode),
    #[serde(rename = "BlockNode")]
    Block(BlockNode),
    #[serde(rename = "ConditionalNode")]
    Conditional(ConditionalNode),
    #[serde(rename = "FunctionAssignmentNode")]
    FunctionAssignment(FunctionAssignmentNode),
    #[serde(rename = "IndexNode")]
    Index(IndexNode),
    #[serde(rename = "RangeNode")]
    Range(RangeNode),
    #[serde(rename = "UpdateNode")]
    Update(UpdateNode),
}

/// Variant tag of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Constant,
    Symbol,
    Operator,
    Function,
    Array,
    Assignment,
    Block,
    Conditional,
    FunctionAssignment,
    Index,
    Range,
    Update,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::Constant,
        NodeKind::Symbol,
        NodeKind::Operator,
        NodeKind::Function,
        NodeKind::Array,
        NodeKind::Assignment,
        NodeKind::Block,
        NodeKind::Conditional,
        NodeKind::FunctionAssignment,
        NodeKind::Index,
        NodeKind::Range,
        NodeKind::Update,
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Constant => "ConstantNode",
            NodeKind::Symbol => "SymbolNode",
            NodeKind::Operator => "OperatorNode",
            NodeKind::Function => "FunctionNode",
            NodeKind::Array => "ArrayNode",
            NodeKind::Assignment => "AssignmentNode",
            NodeKind::Block => "BlockNode",
            NodeKind::Conditional => "ConditionalNode",
            NodeKind::FunctionAssignment => "FunctionAssignmentNode",
            NodeKind::Index => "IndexNode",
            NodeKind::Range => "RangeNode",
            NodeKind::Update => "UpdateNode",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Capability check: true when `candidate` is a node of any variant.
pub fn is_node(candidate: &dyn Any) -> bool {
    candidate.is::<Node>()
        || candidate.is::<ConstantNode>()
        || candidate.is::<SymbolNode>()
        || candidate.is::<OperatorNode>()
        || candidate.is::<FunctionNode>()
        || candidate.is::<ArrayNode>()
        || candidate.is::<AssignmentNode>()
        || candidate.is::<BlockNode>()
        || candidate.is::<ConditionalNode>()
        || candidate.is::<FunctionAssignmentNode>()
        || candidate.is::<IndexNode>()
        || candidate.is::<RangeNode>()
        || candidate.is::<UpdateNode>()
}

fn take_children(
    node: &'static str,
    children: Vec<Node>,
    expected: usize,
) -> Result<std::vec::IntoIter<Node>, NodeError> {
    if children.len() != expected {
        return Err(NodeError::ArgumentCount {
            node,
            expected: expected.to_string(),
            actual: children.len(),
        });
    }
    Ok(children.into_iter())
}

impl Node {
    pub fn number(value: f64) -> Node {
        Node::Constant(ConstantNode::new(Constant::Number(value)))
    }

    pub fn string(value: impl Into<String>) -> Node {
        Node::Constant(ConstantNode::new(Constant::String(value.into())))
    }

    pub fn boolean(value: bool) -> Node {
        Node::Constant(ConstantNode::new(Constant::Boolean(value)))
    }

    pub fn symbol(name: impl Into<String>) -> Node {
        Node::Symbol(SymbolNode::new(name))
    }

    pub fn unary(op: impl Into<String>, fn_name: impl Into<String>, arg: Node) -> Node {
        Node::Operator(OperatorNode {
            op: op.into(),
            fn_name: fn_name.into(),
            args: vec![arg],
            implicit: false,
        })
    }

    pub fn binary(op: impl Into<String>, fn_name: impl Into<String>, lhs: Node, rhs: Node) -> Node {
        Node::Operator(OperatorNode {
            op: op.into(),
            fn_name: fn_name.into(),
            args: vec![lhs, rhs],
            implicit: false,
        })
    }

    pub fn function(name: impl Into<String>, args: Vec<Node>) -> Node {
        Node::Function(FunctionNode::new(name, args))
    }

    pub fn array(items: Vec<Node>) -> Node {
        Node::Array(ArrayNode { items })
    }

    pub fn assign(name: impl Into<String>, expr: Node) -> Node {
        Node::Assignment(AssignmentNode {
            name: name.into(),
            expr: Box::new(expr),
        })
    }

    pub fn block(entries: Vec<(Node, bool)>) -> Node {
        Node::Block(BlockNode {
            blocks: entries
                .into_iter()
                .map(|(node, visible)| BlockEntry { node, visible })
                .collect(),
        })
    }

    pub fn conditional(condition: Node, true_expr: Node, false_expr: Node) -> Node {
        Node::Conditional(ConditionalNode {
            condition: Box::new(condition),
            true_expr: Box::new(true_expr),
            false_expr: Box::new(false_expr),
        })
    }

    pub fn function_assignment(
        name: impl Into<String>,
        params: Vec<String>,
        expr: Node,
    ) -> Node {
        Node::FunctionAssignment(FunctionAssignmentNode {
            name: name.into(),
            params,
            expr: Box::new(expr),
        })
    }

    pub fn index(object: Node, dimensions: Vec<Node>) -> Node {
        Node::Index(IndexNode {
            object: Box::new(object),
            dimensions,
        })
    }

    pub fn range(start: Node, end: Node, step: Option<Node>) -> Node {
        Node::Range(RangeNode {
            start: Box::new(start),
            end: Box::new(end),
            step: step.map(Box::new),
        })
    }

    pub fn update(index: IndexNode, expr: Node) -> Node {
        Node::Update(UpdateNode::from_index(index, expr))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Constant(_) => NodeKind::Constant,
            Node::Symbol(_) => NodeKind::Symbol,
            Node::Operator(_) => NodeKind::Operator,
            Node::Function(_) => NodeKind::Function,
            Node::Array(_) => NodeKind::Array,
            Node::Assignment(_) => NodeKind::Assignment,
            Node::Block(_) => NodeKind::Block,
            Node::Conditional(_) => NodeKind::Conditional,
            Node::FunctionAssignment(_) => NodeKind::FunctionAssignment,
            Node::Index(_) => NodeKind::Index,
            Node::Range(_) => NodeKind::Range,
            Node::Update(_) => NodeKind::Update,
        }
    }

    /// `type_name` plus the name for named variants, e.g. `SymbolNode:x`.
    pub fn identifier(&self) -> String {
        let kind = self.kind().type_name();
        match self {
            Node::Symbol(s) => format!("{kind}:{}", s.name),
            Node::Function(f) => format!("{kind}:{}", f.name()),
            Node::Operator(o) => format!("{kind}:{}", o.fn_name),
            Node::Assignment(a) => format!("{kind}:{}", a.name),
            Node::FunctionAssignment(f) => format!("{kind}:{}", f.name),
            _ => kind.to_string(),
        }
    }

    /// Immediate children in declared order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Constant(_) | Node::Symbol(_) => Vec::new(),
            Node::Operator(o) => o.args.iter().collect(),
            Node::Function(f) => f.args.iter().collect(),
            Node::Array(a) => a.items.iter().collect(),
            Node::Assignment(a) => vec![a.expr.as_ref()],
            Node::Block(b) => b.blocks.iter().map(|entry| &entry.node).collect(),
            Node::Conditional(c) => vec![
                c.condition.as_ref(),
                c.true_expr.as_ref(),
                c.false_expr.as_ref(),
            ],
            Node::FunctionAssignment(f) => vec![f.expr.as_ref()],
            Node::Index(i) => std::iter::once(i.object.as_ref())
                .chain(i.dimensions.iter())
                .collect(),
            Node::Range(r) => {
                let mut out = vec![r.start.as_ref(), r.end.as_ref()];
                if let Some(step) = &r.step {
                    out.push(step.as_ref());
                }
                out
            }
            Node::Update(u) => vec![u.index_node(), u.expr.as_ref()],
        }
    }

    /// Path label of the child at `index`, e.g. `args[1]` or `trueExpr`.
    pub fn child_path(&self, index: usize) -> Option<String> {
        if index >= self.children().len() {
            return None;
        }
        let fixed = |names: &[&str]| names.get(index).map(|s| s.to_string());
        match self {
            Node::Constant(_) | Node::Symbol(_) => None,
            Node::Operator(_) | Node::Function(_) => Some(format!("args[{index}]")),
            Node::Array(_) => Some(format!("items[{index}]")),
            Node::Block(_) => Some(format!("blocks[{index}]")),
            Node::Assignment(_) | Node::FunctionAssignment(_) => fixed(&["expr"]),
            Node::Conditional(_) => fixed(&["condition", "trueExpr", "falseExpr"]),
            Node::Index(_) if index == 0 => Some("object".to_string()),
            Node::Index(_) => Some(format!("dimensions[{}]", index - 1)),
            Node::Range(_) => fixed(&["start", "end", "step"]),
            Node::Update(_) => fixed(&["index", "expr"]),
        }
    }

    /// Rebuilds this variant with new children (same count, declared order),
    /// cloning the leaf data.
    pub fn with_children(&self, children: Vec<Node>) -> Result<Node, NodeError> {
        let expected = self.children().len();
        let name = self.kind().type_name();
        let mut it = take_children(name, children, expected)?;
        let mut next = || it.next().map(Box::new);
        let rebuilt = match self {
            Node::Constant(_) | Node::Symbol(_) => self.clone(),
            Node::Operator(o) => Node::Operator(OperatorNode {
                op: o.op.clone(),
                fn_name: o.fn_name.clone(),
                args: std::iter::from_fn(|| next().map(|b| *b)).collect(),
                implicit: o.implicit,
            }),
            Node::Function(f) => Node::Function(FunctionNode {
                function: f.function.clone(),
                args: std::iter::from_fn(|| next().map(|b| *b)).collect(),
            }),
            Node::Array(_) => Node::Array(ArrayNode {
                items: std::iter::from_fn(|| next().map(|b| *b)).collect(),
            }),
            Node::Assignment(a) => Node::Assignment(AssignmentNode {
                name: a.name.clone(),
                expr: next().ok_or_else(|| missing(name))?,
            }),
            Node::Block(b) => Node::Block(BlockNode {
                blocks: b
                    .blocks
                    .iter()
                    .map(|entry| {
                        next().map(|node| BlockEntry {
                            node: *node,
                            visible: entry.visible,
                        })
                    })
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| missing(name))?,
            }),
            Node::Conditional(_) => Node::Conditional(ConditionalNode {
                condition: next().ok_or_else(|| missing(name))?,
                true_expr: next().ok_or_else(|| missing(name))?,
                false_expr: next().ok_or_else(|| missing(name))?,
            }),
            Node::FunctionAssignment(f) => Node::FunctionAssignment(FunctionAssignmentNode {
                name: f.name.clone(),
                params: f.params.clone(),
                expr: next().ok_or_else(|| missing(name))?,
            }),
            Node::Index(_) => Node::Index(IndexNode {
                object: next().ok_or_else(|| missing(name))?,
                dimensions: std::iter::from_fn(|| next().map(|b| *b)).collect(),
            }),
            Node::Range(r) => Node::Range(RangeNode {
                start: next().ok_or_else(|| missing(name))?,
                end: next().ok_or_else(|| missing(name))?,
                step: if r.step.is_some() {
                    Some(next().ok_or_else(|| missing(name))?)
                } else {
                    None
                },
            }),
            Node::Update(_) => {
                let index = next().ok_or_else(|| missing(name))?;
                let expr = next().ok_or_else(|| missing(name))?;
                Node::Update(UpdateNode::new(*index, *expr)?)
            }
        };
        Ok(rebuilt)
    }

    /// Calls `f` for each immediate child with its index and this node.
    pub fn for_each_child<F>(&self, mut f: F)
    where
        F: FnMut(&Node, usize, &Node),
    {
        for (i, child) in self.children().into_iter().enumerate() {
            f(child, i, self);
        }
    }

    /// Rebuilds this node with every immediate child replaced by `f(child)`.
    /// Does not recurse.
    pub fn map_children<F>(&self, mut f: F) -> Result<Node, NodeError>
    where
        F: FnMut(&Node, usize, &Node) -> Node,
    {
        let mapped = self
            .children()
            .into_iter()
            .enumerate()
            .map(|(i, child)| f(child, i, self))
            .collect();
        self.with_children(mapped)
    }

    /// Deep structural equality.
    pub fn equals(&self, other: &Node) -> bool {
        self == other
    }
}

fn missing(node: &'static str) -> NodeError {
    NodeError::InvalidChild {
        node,
        message: "missing child".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::conditional(
            Node::binary(">", "larger", Node::symbol("x"), Node::number(0.0)),
            Node::function("sqrt", vec![Node::symbol("x")]),
            Node::number(0.0),
        )
    }

    #[test]
    fn children_follow_declared_order() {
        let tree = sample();
        let kinds: Vec<NodeKind> = tree.children().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Operator, NodeKind::Function, NodeKind::Constant]
        );
        assert_eq!(tree.child_path(1).as_deref(), Some("trueExpr"));
        assert_eq!(tree.child_path(3), None);
    }

    #[test]
    fn with_children_rebuilds_same_variant() {
        let range = Node::range(Node::number(1.0), Node::number(9.0), Some(Node::number(2.0)));
        let rebuilt = range
            .with_children(vec![Node::number(0.0), Node::number(4.0), Node::number(1.0)])
            .unwrap();
        assert_eq!(rebuilt.kind(), NodeKind::Range);
        assert_eq!(rebuilt.children()[1], &Node::number(4.0));
    }

    #[test]
    fn with_children_checks_count() {
        let err = sample().with_children(vec![Node::number(1.0)]).unwrap_err();
        assert!(matches!(err, NodeError::ArgumentCount { actual: 1, .. }));
    }

    #[test]
    fn with_children_keeps_update_invariant() {
        let index = IndexNode {
            object: Box::new(Node::symbol("A")),
            dimensions: vec![Node::number(1.0)],
        };
        let update = Node::update(index, Node::number(5.0));
        let err = update
            .with_children(vec![Node::symbol("B"), Node::number(5.0)])
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidChild { .. }));
    }

    #[test]
    fn block_visibility_survives_rebuild() {
        let block = Node::block(vec![(Node::number(1.0), false), (Node::number(2.0), true)]);
        let rebuilt = block
            .map_children(|child, _, _| Node::unary("-", "unaryMinus", child.clone()))
            .unwrap();
        let Node::Block(b) = rebuilt else {
            panic!("expected block");
        };
        assert!(!b.blocks[0].visible);
        assert!(b.blocks[1].visible);
        assert_eq!(b.blocks[1].node.kind(), NodeKind::Operator);
    }

    #[test]
    fn identifiers() {
        assert_eq!(Node::symbol("x").identifier(), "SymbolNode:x");
        assert_eq!(Node::number(1.0).identifier(), "ConstantNode");
        assert_eq!(
            Node::function("sin", vec![Node::number(1.0)]).identifier(),
            "FunctionNode:sin"
        );
    }

    #[test]
    fn is_node_recognizes_all_variants() {
        assert!(is_node(&sample()));
        assert!(is_node(&SymbolNode::new("x")));
        assert!(!is_node(&"x"));
        assert!(!is_node(&42_i32));
    }
}
