//! In-memory document used by tests and headless rendering

use indexmap::IndexMap;

use super::html::{self, HtmlNode};
use super::{DomHelper, DomResult, NodeId, NodeKind};
use crate::error::DomError;
use crate::value::Value;

#[derive(Debug)]
enum Data {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        properties: IndexMap<String, Value>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct NodeData {
    data: Data,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A serializable DOM kept entirely in memory.
///
/// Nodes live in an arena and are never freed; a removed node is simply
/// detached. Every tree or attribute mutation bumps a counter so callers can
/// assert that a pass left the document untouched.
///
/// ```
/// use morphling::dom::{DomHelper, SimpleDom};
///
/// let mut dom = SimpleDom::new();
/// let div = dom.create_element("div");
/// let text = dom.create_text_node("a < b");
/// dom.insert_before(div, text, None).unwrap();
/// assert_eq!(dom.outer_html(div), "<div>a &lt; b</div>");
/// assert_eq!(dom.mutation_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SimpleDom {
    nodes: Vec<NodeData>,
    mutations: usize,
}

impl SimpleDom {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutations applied since creation
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Number of nodes ever created, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Child handles of `node` in order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn alloc(&mut self, data: Data) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> DomResult<&NodeData> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(
        &mut self,
        id: NodeId,
    ) -> DomResult<(&mut IndexMap<String, String>, &mut IndexMap<String, Value>)> {
        match &mut self.node_mut(id)?.data {
            Data::Element {
                attributes,
                properties,
                ..
            } => Ok((attributes, properties)),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).ok().and_then(|data| data.parent);
        }
        false
    }

    fn detach(&mut self, node: NodeId) -> DomResult<()> {
        if let Some(parent) = self.node(node)?.parent {
            self.node_mut(parent)?.children.retain(|child| *child != node);
            self.node_mut(node)?.parent = None;
        }
        Ok(())
    }

    fn materialize(&mut self, parsed: HtmlNode) -> NodeId {
        match parsed {
            HtmlNode::Text(text) => self.create_text_node(&text),
            HtmlNode::Comment(text) => self.create_comment(&text),
            HtmlNode::Element {
                tag,
                attributes,
                children,
            } => {
                let element = self.alloc(Data::Element {
                    tag,
                    attributes: attributes.into_iter().collect(),
                    properties: IndexMap::new(),
                });
                for child in children {
                    let child = self.materialize(child);
                    self.nodes[child.0 as usize].parent = Some(element);
                    self.nodes[element.0 as usize].children.push(child);
                }
                element
            }
        }
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        let Ok(data) = self.node(node) else {
            return;
        };
        match &data.data {
            Data::Text(text) => out.push_str(&html::escape_text(text)),
            Data::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Data::Element {
                tag, attributes, ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html::escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if html::is_void(tag) {
                    return;
                }
                for child in &data.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl DomHelper for SimpleDom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Data::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
        })
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        self.alloc(Data::Text(text.to_string()))
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(Data::Comment(text.to_string()))
    }

    fn parse_html(&mut self, html: &str) -> DomResult<Vec<NodeId>> {
        let parsed = html::parse_fragment(html)?;
        Ok(parsed
            .into_iter()
            .map(|node| self.materialize(node))
            .collect())
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        if !matches!(self.node(parent)?.data, Data::Element { .. }) {
            return Err(DomError::NotAnElement(parent));
        }
        self.node(node)?;
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DomError::HierarchyRequest(node));
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    node: reference,
                });
            }
            if reference == node {
                return Ok(());
            }
        }

        self.detach(node)?;
        let children = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|reference| children.iter().position(|child| *child == reference))
            .unwrap_or(children.len());
        children.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        self.mutations += 1;
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) -> DomResult<()> {
        if self.node(node)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, node });
        }
        self.detach(node)?;
        self.mutations += 1;
        Ok(())
    }

    fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        let (attributes, _) = self.element_mut(element)?;
        attributes.insert(name.to_string(), value.to_string());
        self.mutations += 1;
        Ok(())
    }

    fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<()> {
        let (attributes, _) = self.element_mut(element)?;
        if attributes.shift_remove(name).is_some() {
            self.mutations += 1;
        }
        Ok(())
    }

    fn set_property(&mut self, element: NodeId, name: &str, value: Value) -> DomResult<()> {
        let (_, properties) = self.element_mut(element)?;
        properties.insert(name.to_string(), value);
        self.mutations += 1;
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        match &mut self.node_mut(node)?.data {
            Data::Text(data) | Data::Comment(data) => {
                *data = text.to_string();
            }
            Data::Element { .. } => return Err(DomError::NotCharacterData(node)),
        }
        self.mutations += 1;
        Ok(())
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.children.first().copied()
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.children.last().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).ok()?.parent?;
        let siblings = &self.node(parent).ok()?.children;
        let index = siblings.iter().position(|child| *child == node)?;
        siblings.get(index + 1).copied()
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        Some(match self.node(node).ok()?.data {
            Data::Element { .. } => NodeKind::Element,
            Data::Text(_) => NodeKind::Text,
            Data::Comment(_) => NodeKind::Comment,
        })
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.node(node).ok()?.data {
            Data::Text(text) | Data::Comment(text) => Some(text.clone()),
            Data::Element { .. } => None,
        }
    }

    fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        match &self.node(element).ok()?.data {
            Data::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }

    fn property(&self, element: NodeId, name: &str) -> Option<Value> {
        match &self.node(element).ok()?.data {
            Data::Element { properties, .. } => properties.get(name).cloned(),
            _ => None,
        }
    }

    fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.serialize(child, &mut out);
        }
        out
    }

    fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(dom: &mut SimpleDom) -> (NodeId, NodeId, NodeId, NodeId) {
        let ul = dom.create_element("ul");
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        let c = dom.create_text_node("c");
        for node in [a, b, c] {
            dom.insert_before(ul, node, None).unwrap();
        }
        (ul, a, b, c)
    }

    #[test]
    fn test_insert_before_moves_attached_nodes() {
        let mut dom = SimpleDom::new();
        let (ul, a, b, c) = list(&mut dom);

        dom.insert_before(ul, c, Some(a)).unwrap();
        assert_eq!(dom.children(ul), vec![c, a, b]);
        assert_eq!(dom.inner_html(ul), "cab");
        assert_eq!(dom.next_sibling(b), None);
        assert_eq!(dom.first_child(ul), Some(c));
        assert_eq!(dom.last_child(ul), Some(b));
    }

    #[test]
    fn test_insert_before_self_is_noop() {
        let mut dom = SimpleDom::new();
        let (ul, _, b, _) = list(&mut dom);
        let before = dom.mutation_count();
        dom.insert_before(ul, b, Some(b)).unwrap();
        assert_eq!(dom.mutation_count(), before);
        assert_eq!(dom.inner_html(ul), "abc");
    }

    #[test]
    fn test_insert_rejects_foreign_reference() {
        let mut dom = SimpleDom::new();
        let (ul, a, _, _) = list(&mut dom);
        let other = dom.create_element("p");
        assert_eq!(
            dom.insert_before(other, a, Some(ul)),
            Err(DomError::NotAChild {
                parent: other,
                node: ul
            })
        );
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let mut dom = SimpleDom::new();
        let outer = dom.create_element("div");
        let inner = dom.create_element("div");
        dom.insert_before(outer, inner, None).unwrap();
        assert_eq!(
            dom.insert_before(inner, outer, None),
            Err(DomError::HierarchyRequest(outer))
        );
    }

    #[test]
    fn test_remove_child() {
        let mut dom = SimpleDom::new();
        let (ul, a, b, _) = list(&mut dom);
        dom.remove_child(ul, b).unwrap();
        assert_eq!(dom.inner_html(ul), "ac");
        assert_eq!(dom.parent_node(b), None);
        assert!(dom.remove_child(ul, b).is_err());
        assert_eq!(dom.next_sibling(a).and_then(|n| dom.text(n)), Some("c".to_string()));
    }

    #[test]
    fn test_serialization() {
        let mut dom = SimpleDom::new();
        let div = dom.create_element("div");
        dom.set_attribute(div, "class", "a \"b\"").unwrap();
        let br = dom.create_element("br");
        let comment = dom.create_comment("");
        dom.insert_before(div, br, None).unwrap();
        dom.insert_before(div, comment, None).unwrap();
        assert_eq!(
            dom.outer_html(div),
            "<div class=\"a &quot;b&quot;\"><br><!----></div>"
        );
    }

    #[test]
    fn test_properties_are_not_serialized() {
        let mut dom = SimpleDom::new();
        let div = dom.create_element("div");
        dom.set_property(div, "foo", Value::Bool(true)).unwrap();
        assert_eq!(dom.outer_html(div), "<div></div>");
        assert_eq!(dom.property(div, "foo"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_parse_html_creates_detached_nodes() {
        let mut dom = SimpleDom::new();
        let nodes = dom.parse_html("<p>hello <b>world</b></p>tail").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(dom.parent_node(nodes[0]), None);
        assert_eq!(dom.outer_html(nodes[0]), "<p>hello <b>world</b></p>");
        assert_eq!(dom.node_kind(nodes[1]), Some(NodeKind::Text));
        assert_eq!(dom.mutation_count(), 0);
    }

    #[test]
    fn test_attribute_operations_require_elements() {
        let mut dom = SimpleDom::new();
        let text = dom.create_text_node("x");
        assert_eq!(
            dom.set_attribute(text, "a", "b"),
            Err(DomError::NotAnElement(text))
        );
        assert_eq!(
            dom.set_attribute(NodeId(99), "a", "b"),
            Err(DomError::UnknownNode(NodeId(99)))
        );
    }
}
