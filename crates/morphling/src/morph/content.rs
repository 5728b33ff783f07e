//! `{{value}}` and `{{{value}}}`

use tracing::trace;

use crate::dom::NodeId;
use crate::environment::Environment;
use crate::error::Result;
use crate::eval::Expression;
use crate::value::Value;

pub(crate) struct ContentMorph {
    expression: Expression,
    trusting: bool,
    parent: NodeId,
    /// One text node, or the parsed nodes of trusted HTML (a placeholder
    /// comment when the HTML is empty)
    nodes: Vec<NodeId>,
    last_value: Value,
    last_text: String,
}

impl ContentMorph {
    pub(crate) fn render(
        env: &Environment,
        expression: Expression,
        trusting: bool,
        parent: NodeId,
        before: Option<NodeId>,
    ) -> Result<Self> {
        let value = expression.value()?;
        let text = value.to_string();
        let nodes = create_nodes(env, trusting, &text)?;
        for node in &nodes {
            env.dom().insert_before(parent, *node, before)?;
        }
        Ok(Self {
            expression,
            trusting,
            parent,
            nodes,
            last_value: value,
            last_text: text,
        })
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub(crate) fn last_value(&self) -> Value {
        self.last_value.clone()
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        if !self.expression.is_dirty() {
            return Ok(());
        }
        let value = self.expression.value()?;
        let text = value.to_string();
        self.last_value = value;
        if text == self.last_text {
            return Ok(());
        }

        if self.trusting {
            let nodes = create_nodes(env, true, &text)?;
            let before = self.first_node();
            for node in &nodes {
                env.dom().insert_before(self.parent, *node, before)?;
            }
            for node in std::mem::replace(&mut self.nodes, nodes) {
                env.dom().remove_child(self.parent, node)?;
            }
            trace!(parent = %self.parent, "replaced trusted content");
        } else if let Some(node) = self.first_node() {
            env.dom().set_text(node, &text)?;
            trace!(node = %node, "updated text");
        }
        self.last_text = text;
        Ok(())
    }
}

fn create_nodes(env: &Environment, trusting: bool, text: &str) -> Result<Vec<NodeId>> {
    if !trusting {
        return Ok(vec![env.dom().create_text_node(text)]);
    }
    let mut nodes = env.dom().parse_html(text)?;
    if nodes.is_empty() {
        nodes.push(env.dom().create_comment(&env.config().marker_text));
    }
    Ok(nodes)
}
