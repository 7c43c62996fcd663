//! Concrete node variants.
//!
//! Fields are public so owners can edit leaf data in place; the one structural
//! invariant that cannot be expressed in the field type (an update's index
//! must be an [`IndexNode`]) is kept behind an accessor.

use crate::error::NodeError;
use crate::node::Node;
use serde::{Deserialize, Serialize};

/// Literal carried by a [`ConstantNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "valueType", content = "value", rename_all = "lowercase")]
pub enum Constant {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// Value-type hint of a constant literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Null,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantNode {
    pub value: Constant,
}

impl ConstantNode {
    pub fn new(value: Constant) -> Self {
        ConstantNode { value }
    }

    /// Builds a constant from its literal text and a value-type hint.
    pub fn parse(text: &str, value_type: ValueType) -> Result<Self, NodeError> {
        let invalid = || NodeError::InvalidConstant {
            text: text.to_string(),
            value_type: value_type.as_str(),
        };
        let value = match value_type {
            ValueType::Number => Constant::Number(text.trim().parse().map_err(|_| invalid())?),
            ValueType::String => Constant::String(text.to_string()),
            ValueType::Boolean => match text {
                "true" => Constant::Boolean(true),
                "false" => Constant::Boolean(false),
                _ => return Err(invalid()),
            },
            ValueType::Null => match text {
                "null" | "" => Constant::Null,
                _ => return Err(invalid()),
            },
        };
        Ok(ConstantNode { value })
    }

    pub fn value_type(&self) -> ValueType {
        match self.value {
            Constant::Number(_) => ValueType::Number,
            Constant::String(_) => ValueType::String,
            Constant::Boolean(_) => ValueType::Boolean,
            Constant::Null => ValueType::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub name: String,
}

impl SymbolNode {
    pub fn new(name: impl Into<String>) -> Self {
        SymbolNode { name: name.into() }
    }
}

/// An operator application such as `a + b` or `-a`. `fn_name` is the
/// namespace entry the operator resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperatorNode")]
pub struct OperatorNode {
    pub op: String,
    #[serde(rename = "fn")]
    pub fn_name: String,
    pub args: Vec<Node>,
    #[serde(default)]
    pub implicit: bool,
}

#[derive(Deserialize)]
struct RawOperatorNode {
    op: String,
    #[serde(rename = "fn")]
    fn_name: String,
    args: Vec<Node>,
    #[serde(default)]
    implicit: bool,
}

impl TryFrom<RawOperatorNode> for OperatorNode {
    type Error = NodeError;

    fn try_from(raw: RawOperatorNode) -> Result<Self, Self::Error> {
        let mut node = OperatorNode::new(raw.op, raw.fn_name, raw.args)?;
        node.implicit = raw.implicit;
        Ok(node)
    }
}

impl OperatorNode {
    pub fn new(
        op: impl Into<String>,
        fn_name: impl Into<String>,
        args: Vec<Node>,
    ) -> Result<Self, NodeError> {
        if args.is_empty() || args.len() > 2 {
            return Err(NodeError::ArgumentCount {
                node: "OperatorNode",
                expected: "1 or 2".into(),
                actual: args.len(),
            });
        }
        Ok(OperatorNode {
            op: op.into(),
            fn_name: fn_name.into(),
            args,
            implicit: false,
        })
    }

    pub fn is_unary(&self) -> bool {
        self.args.len() == 1
    }

    pub fn is_binary(&self) -> bool {
        self.args.len() == 2
    }
}

/// A named function call. The callee is a symbol reference kept as leaf data;
/// only the arguments are children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionNode {
    #[serde(rename = "fn")]
    pub function: SymbolNode,
    pub args: Vec<Node>,
}

impl FunctionNode {
    pub fn new(name: impl Into<String>, args: Vec<Node>) -> Self {
        FunctionNode {
            function: SymbolNode::new(name),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayNode {
    pub items: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentNode {
    pub name: String,
    pub expr: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub node: Node,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub blocks: Vec<BlockEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalNode {
    pub condition: Box<Node>,
    pub true_expr: Box<Node>,
    pub false_expr: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionAssignmentNode {
    pub name: String,
    pub params: Vec<String>,
    pub expr: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexNode {
    pub object: Box<Node>,
    pub dimensions: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeNode {
    pub start: Box<Node>,
    pub end: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Box<Node>>,
}

/// `object[dims] = expr`. The index child is always an [`IndexNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUpdateNode")]
pub struct UpdateNode {
    index: Box<Node>,
    pub expr: Box<Node>,
}

#[derive(Deserialize)]
struct RawUpdateNode {
    index: Node,
    expr: Node,
}

impl TryFrom<RawUpdateNode> for UpdateNode {
    type Error = NodeError;

    fn try_from(raw: RawUpdateNode) -> Result<Self, Self::Error> {
        UpdateNode::new(raw.index, raw.expr)
    }
}

impl UpdateNode {
    pub fn new(index: Node, expr: Node) -> Result<Self, NodeError> {
        if !matches!(index, Node::Index(_)) {
            return Err(NodeError::InvalidChild {
                node: "UpdateNode",
                message: format!("index must be an IndexNode, got {}", index.kind().type_name()),
            });
        }
        Ok(UpdateNode {
            index: Box::new(index),
            expr: Box::new(expr),
        })
    }

    pub fn from_index(index: IndexNode, expr: Node) -> Self {
        UpdateNode {
            index: Box::new(Node::Index(index)),
            expr: Box::new(expr),
        }
    }

    pub fn index_node(&self) -> &Node {
        &self.index
    }

    pub fn index(&self) -> &IndexNode {
        match self.index.as_ref() {
            Node::Index(index) => index,
            _ => unreachable!("UpdateNode index is validated on construction"),
        }
    }

    pub fn set_index(&mut self, index: Node) -> Result<(), NodeError> {
        let rebuilt = UpdateNode::new(index, Node::Constant(ConstantNode::new(Constant::Null)))?;
        self.index = rebuilt.index;
        Ok(())
    }
}
