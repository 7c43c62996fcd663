//! Expression tree model for mathtree.
//!
//! A tree is a [`Node`]: a closed set of twelve variants, each owning its
//! children. Variants only provide two primitives, [`Node::children`] and
//! [`Node::with_children`]; filter, transform and traverse are written once on
//! top of them in [`walk`].
//!
//! ```
//! use mathtree_node::Node;
//!
//! let tree = Node::binary("+", "add", Node::number(2.0), Node::symbol("x"));
//! assert_eq!(tree.to_string(), "2 + x");
//! assert_eq!(tree.filter(|_, _, _| true).len(), 3);
//! ```

mod error;
mod node;
mod render;
mod variants;
pub mod walk;

pub use error::NodeError;
pub use node::{is_node, Node, NodeKind};
pub use variants::{
    ArrayNode, AssignmentNode, BlockEntry, BlockNode, ConditionalNode, Constant, ConstantNode,
    FunctionAssignmentNode, FunctionNode, IndexNode, OperatorNode, RangeNode, SymbolNode,
    UpdateNode, ValueType,
};

pub type Result<T> = std::result::Result<T, NodeError>;
