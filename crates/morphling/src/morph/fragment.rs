//! Rendered template instances

use super::Morph;
use crate::dom::{sibling_range, NodeId};
use crate::environment::Environment;
use crate::error::Result;
use crate::reference::RootReference;
use crate::value::Value;

/// A top-level position of a fragment
enum Slot {
    Node(NodeId),
    Morph(usize),
}

/// One rendered instance of a template.
///
/// Top-level nodes are contiguous siblings under one parent. `morphs` holds
/// every render node of the instance in document order, whether it sits at
/// the top level or inside one of the instance's elements.
pub(crate) struct Fragment {
    slots: Vec<Slot>,
    morphs: Vec<Morph>,
    params: Vec<RootReference>,
}

impl Fragment {
    pub(crate) fn new(params: Vec<RootReference>) -> Self {
        Self {
            slots: Vec::new(),
            morphs: Vec::new(),
            params,
        }
    }

    pub(crate) fn push_node(&mut self, node: NodeId) {
        self.slots.push(Slot::Node(node));
    }

    pub(crate) fn push_morph(&mut self, morph: Morph, top_level: bool) {
        if top_level {
            self.slots.push(Slot::Morph(self.morphs.len()));
        }
        self.morphs.push(morph);
    }

    pub(crate) fn has_top_level(&self) -> bool {
        !self.slots.is_empty()
    }

    fn slot_first(&self, slot: &Slot) -> Option<NodeId> {
        match slot {
            Slot::Node(node) => Some(*node),
            Slot::Morph(index) => self.morphs.get(*index).and_then(Morph::first_node),
        }
    }

    fn slot_last(&self, slot: &Slot) -> Option<NodeId> {
        match slot {
            Slot::Node(node) => Some(*node),
            Slot::Morph(index) => self.morphs.get(*index).and_then(Morph::last_node),
        }
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.slots.iter().find_map(|slot| self.slot_first(slot))
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        self.slots.iter().rev().find_map(|slot| self.slot_last(slot))
    }

    /// Top-level nodes, in order
    pub(crate) fn nodes(&self, env: &Environment) -> Vec<NodeId> {
        match (self.first_node(), self.last_node()) {
            (Some(first), Some(last)) => sibling_range(&*env.dom_ref(), first, last),
            _ => Vec::new(),
        }
    }

    /// Re-point block parameters at freshly yielded values.
    pub(crate) fn update_params(&self, args: &[Value]) {
        for (index, param) in self.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or(Value::Undefined);
            if !param.current().identical(&value) {
                param.update(value);
            }
        }
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        for morph in &mut self.morphs {
            morph.rerender(env)?;
        }
        Ok(())
    }

    /// Move the fragment's nodes in front of `next` (or to the end).
    pub(crate) fn move_before(
        &self,
        env: &Environment,
        parent: NodeId,
        next: Option<NodeId>,
    ) -> Result<()> {
        for node in self.nodes(env) {
            env.dom().insert_before(parent, node, next)?;
        }
        Ok(())
    }

    /// Run the cleanup hook for every render node, innermost first.
    pub(crate) fn destroy(&mut self, env: &Environment) {
        for morph in &mut self.morphs {
            morph.destroy(env);
        }
    }

    /// Detach the fragment's nodes from `parent`.
    pub(crate) fn remove(&self, env: &Environment, parent: NodeId) -> Result<()> {
        for node in self.nodes(env) {
            env.dom().remove_child(parent, node)?;
        }
        Ok(())
    }
}
