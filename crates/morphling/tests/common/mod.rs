//! Shared test harness
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use morphling::*;

/// A document with a detached `<div>` to render into.
pub struct Harness {
    pub dom: Rc<RefCell<SimpleDom>>,
    pub env: Rc<Environment>,
    pub root: NodeId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    pub fn with_config(config: RenderConfig) -> Self {
        let dom = Rc::new(RefCell::new(SimpleDom::new()));
        let env = Rc::new(Environment::with_prelude(dom.clone()).with_config(config));
        let root = dom.borrow_mut().create_element("div");
        Self { dom, env, root }
    }

    /// Render and check the result's bounds against the root's children.
    pub fn render(&self, template: &Template, context: impl Into<Value>) -> RenderResult {
        let result = template
            .render(context, &self.env, self.root)
            .expect("render failed");
        self.assert_bounds(&result);
        result
    }

    pub fn assert_bounds(&self, result: &RenderResult) {
        assert_eq!(result.first_node(), self.first_child(self.root), "first node");
        assert_eq!(result.last_node(), self.last_child(self.root), "last node");
    }

    /// Serialized children of the root
    pub fn html(&self) -> String {
        self.dom.borrow().inner_html(self.root)
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.dom.borrow().first_child(node)
    }

    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.dom.borrow().last_child(node)
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.dom.borrow().next_sibling(node)
    }

    /// Follow first-child links `depth` times from the root.
    pub fn descend(&self, depth: usize) -> Option<NodeId> {
        let mut node = Some(self.root);
        for _ in 0..depth {
            node = node.and_then(|n| self.first_child(n));
        }
        node
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.dom.borrow().children(node)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.dom.borrow().node_kind(node)
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.dom.borrow().text(node)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.borrow().attribute(node, name)
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<Value> {
        self.dom.borrow().property(node, name)
    }

    pub fn mutations(&self) -> usize {
        self.dom.borrow().mutation_count()
    }

    /// Collect every render node the cleanup hook reports.
    pub fn record_destroyed(&self) -> Rc<RefCell<Vec<DestroyedNode>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        self.env
            .on_destroy_render_node(move |node| sink.borrow_mut().push(node.clone()));
        log
    }
}

/// A plain object from `(name, value)` pairs
pub fn object<V: Into<Value>>(fields: Vec<(&str, V)>) -> ObjectRef {
    ObjectRef::from_fields(fields)
}

/// A fragment that is just text
pub fn text(text: &str) -> Template {
    TemplateBuilder::new().text(text).build()
}
