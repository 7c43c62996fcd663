//! Tree algorithms shared by every node variant.
//!
//! Everything here is written against [`Node::children`] and
//! [`Node::with_children`]; nothing matches on the variant. Visit order is
//! pre-order: a parent is seen before its children, children in declared
//! order. Callbacks receive `(node, index_within_parent, parent)`, with index
//! and parent both `None` for the root the walk started from.
//!
//! ```
//! use mathtree_node::{Node, NodeKind};
//!
//! let tree = Node::binary("*", "multiply", Node::symbol("x"), Node::symbol("x"));
//! let squared = tree
//!     .transform(|node, _, _| match node.kind() {
//!         NodeKind::Operator => Some(Node::binary("^", "pow", Node::symbol("x"), Node::number(2.0))),
//!         _ => None,
//!     })
//!     .unwrap();
//! assert_eq!(squared.to_string(), "x ^ 2");
//! assert_eq!(tree.to_string(), "x * x");
//! ```

use crate::error::NodeError;
use crate::node::Node;
use std::convert::Infallible;

impl Node {
    /// Calls `visitor` for every node of the subtree.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(&Node, Option<usize>, Option<&Node>),
    {
        let result = self.try_traverse(|node, index, parent| {
            visitor(node, index, parent);
            Ok::<(), Infallible>(())
        });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Like [`Node::traverse`], stopping at the first visitor error.
    pub fn try_traverse<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&Node, Option<usize>, Option<&Node>) -> Result<(), E>,
    {
        traverse_at(self, None, None, &mut visitor)
    }

    /// All nodes of the subtree, root included, for which `predicate` holds.
    pub fn filter<F>(&self, mut predicate: F) -> Vec<&Node>
    where
        F: FnMut(&Node, Option<usize>, Option<&Node>) -> bool,
    {
        let result = self.try_filter(|node, index, parent| {
            Ok::<bool, Infallible>(predicate(node, index, parent))
        });
        match result {
            Ok(found) => found,
            Err(never) => match never {},
        }
    }

    pub fn try_filter<E, F>(&self, mut predicate: F) -> Result<Vec<&Node>, E>
    where
        F: FnMut(&Node, Option<usize>, Option<&Node>) -> Result<bool, E>,
    {
        let mut found = Vec::new();
        filter_at(self, None, None, &mut predicate, &mut found)?;
        Ok(found)
    }

    /// Builds a new tree. `mapper` returning `Some(replacement)` substitutes
    /// the node without visiting the replacement; `None` keeps the node and
    /// descends into its children. `self` is left untouched.
    pub fn transform<F>(&self, mut mapper: F) -> Result<Node, NodeError>
    where
        F: FnMut(&Node, Option<usize>, Option<&Node>) -> Option<Node>,
    {
        self.try_transform(|node, index, parent| Ok(mapper(node, index, parent)))
    }

    pub fn try_transform<E, F>(&self, mut mapper: F) -> Result<Node, E>
    where
        E: From<NodeError>,
        F: FnMut(&Node, Option<usize>, Option<&Node>) -> Result<Option<Node>, E>,
    {
        transform_at(self, None, None, &mut mapper)
    }
}

fn traverse_at<E, F>(
    node: &Node,
    index: Option<usize>,
    parent: Option<&Node>,
    visitor: &mut F,
) -> Result<(), E>
where
    F: FnMut(&Node, Option<usize>, Option<&Node>) -> Result<(), E>,
{
    visitor(node, index, parent)?;
    for (i, child) in node.children().into_iter().enumerate() {
        traverse_at(child, Some(i), Some(node), visitor)?;
    }
    Ok(())
}

fn filter_at<'a, E, F>(
    node: &'a Node,
    index: Option<usize>,
    parent: Option<&'a Node>,
    predicate: &mut F,
    found: &mut Vec<&'a Node>,
) -> Result<(), E>
where
    F: FnMut(&Node, Option<usize>, Option<&Node>) -> Result<bool, E>,
{
    if predicate(node, index, parent)? {
        found.push(node);
    }
    for (i, child) in node.children().into_iter().enumerate() {
        filter_at(child, Some(i), Some(node), predicate, found)?;
    }
    Ok(())
}

fn transform_at<E, F>(
    node: &Node,
    index: Option<usize>,
    parent: Option<&Node>,
    mapper: &mut F,
) -> Result<Node, E>
where
    E: From<NodeError>,
    F: FnMut(&Node, Option<usize>, Option<&Node>) -> Result<Option<Node>, E>,
{
    if let Some(replacement) = mapper(node, index, parent)? {
        return Ok(replacement);
    }
    let children = node.children();
    if children.is_empty() {
        return Ok(node.clone());
    }
    let mut rebuilt = Vec::with_capacity(children.len());
    for (i, child) in children.into_iter().enumerate() {
        rebuilt.push(transform_at(child, Some(i), Some(node), mapper)?);
    }
    Ok(node.with_children(rebuilt)?)
}
