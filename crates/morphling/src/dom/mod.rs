//! The DOM capability interface
//!
//! The runtime never assumes a concrete tree. It creates nodes, inserts them
//! before reference nodes, removes them, and walks sibling links between the
//! boundary nodes of a morph. Everything else is up to the adapter.

mod html;
mod simple;

pub use simple::SimpleDom;

use std::fmt;

use crate::error::DomError;
use crate::value::Value;

/// Handle to a node owned by a [`DomHelper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name
    Element,
    /// A text node
    Text,
    /// A comment node
    Comment,
}

/// Result alias for adapter operations
pub type DomResult<T> = std::result::Result<T, DomError>;

/// Operations the runtime needs from an output tree.
///
/// `insert_before` with `reference == None` appends. Inserting a node that is
/// already attached moves it, as in the browser DOM.
pub trait DomHelper {
    // ═══════════════════════════════════════════════════════════════════
    // Creation
    // ═══════════════════════════════════════════════════════════════════

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a detached text node
    fn create_text_node(&mut self, text: &str) -> NodeId;

    /// Create a detached comment node
    fn create_comment(&mut self, text: &str) -> NodeId;

    /// Parse trusted HTML into detached top-level nodes, in document order.
    fn parse_html(&mut self, html: &str) -> DomResult<Vec<NodeId>>;

    // ═══════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════

    /// Insert (or move) `node` into `parent` before `reference`.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()>;

    /// Detach `node` from `parent`.
    fn remove_child(&mut self, parent: NodeId, node: NodeId) -> DomResult<()>;

    /// Set an attribute on an element
    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()>;

    /// Remove an attribute from an element
    fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<()>;

    /// Set a property on an element
    fn set_property(&mut self, element: NodeId, name: &str, value: Value) -> DomResult<()>;

    /// Replace the data of a text or comment node
    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()>;

    // ═══════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Parent of a node
    fn parent_node(&self, node: NodeId) -> Option<NodeId>;

    /// First child of a node
    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    /// Last child of a node
    fn last_child(&self, node: NodeId) -> Option<NodeId>;

    /// Next sibling of a node
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Kind of a node, `None` if the handle is unknown
    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Data of a text or comment node
    fn text(&self, node: NodeId) -> Option<String>;

    /// Attribute of an element
    fn attribute(&self, element: NodeId, name: &str) -> Option<String>;

    /// Property of an element
    fn property(&self, element: NodeId, name: &str) -> Option<Value>;

    /// Serialized children of a node
    fn inner_html(&self, node: NodeId) -> String;

    /// Serialized node
    fn outer_html(&self, node: NodeId) -> String;
}

/// Nodes from `first` to `last` inclusive, following sibling links.
///
/// Stops early if the chain ends before reaching `last`.
pub fn sibling_range(dom: &dyn DomHelper, first: NodeId, last: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![first];
    let mut current = first;
    while current != last {
        match dom.next_sibling(current) {
            Some(next) => {
                nodes.push(next);
                current = next;
            }
            None => break,
        }
    }
    nodes
}
