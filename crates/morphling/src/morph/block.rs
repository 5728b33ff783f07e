//! Block helpers: conditionals, iteration and custom blocks
//!
//! Every block is a list of items, one per yield of its helper. A
//! conditional yields once to one of two templates; `each` yields once per
//! list entry. Items are matched across passes by [`ItemKey`], so one
//! reconciliation algorithm covers branch switches and keyed lists alike.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::Fragment;
use crate::dom::NodeId;
use crate::environment::{Environment, Scope};
use crate::error::{RenderError, Result};
use crate::eval::{any_dirty, build_fragment, hash_values, values, BuildContext, Expression};
use crate::helper::{Blocks, Branch, HelperFn, Yielded};
use crate::reference::RootReference;
use crate::template::Template;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeySlot {
    Named(String),
    Unkeyed(usize),
}

/// Identity of a block item across passes. Keys are scoped per branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ItemKey {
    branch: Branch,
    slot: KeySlot,
}

struct Entry {
    key: ItemKey,
    args: Vec<Value>,
}

struct BlockItem {
    key: ItemKey,
    fragment: Fragment,
}

/// A compiled `Opcode::Block`
pub(crate) struct BlockInvocation {
    pub(crate) name: String,
    pub(crate) helper: HelperFn,
    pub(crate) params: Vec<Expression>,
    pub(crate) hash: Vec<(String, Expression)>,
    pub(crate) template: Option<Rc<Template>>,
    pub(crate) inverse: Option<Rc<Template>>,
}

pub(crate) struct BlockMorph {
    invocation: BlockInvocation,
    scope: Scope,
    depth: usize,
    parent: NodeId,
    items: Vec<BlockItem>,
    /// Trailing placeholder comment. Present while the block is empty and,
    /// once any yield was keyed, for as long as the block lives.
    marker: Option<NodeId>,
    /// Set by the first keyed yield and never cleared
    keyed: bool,
    last_value: Value,
}

impl BlockMorph {
    pub(crate) fn render(
        env: &Environment,
        invocation: BlockInvocation,
        scope: Scope,
        parent: NodeId,
        before: Option<NodeId>,
        depth: usize,
    ) -> Result<Self> {
        let mut morph = Self {
            invocation,
            scope,
            depth,
            parent,
            items: Vec::new(),
            marker: None,
            keyed: false,
            last_value: Value::Undefined,
        };
        let yields = morph.invoke()?;
        morph.reconcile(env, yields, before)?;
        Ok(morph)
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.items
            .iter()
            .find_map(|item| item.fragment.first_node())
            .or(self.marker)
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        self.marker.or_else(|| {
            self.items
                .iter()
                .rev()
                .find_map(|item| item.fragment.last_node())
        })
    }

    pub(crate) fn last_value(&self) -> Value {
        self.last_value.clone()
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        let built = if any_dirty(&self.invocation.params, &self.invocation.hash) {
            let yields = self.invoke()?;
            self.reconcile(env, yields, None)?
        } else {
            HashSet::new()
        };
        // Items built by this pass are already current.
        for item in self.items.iter_mut().filter(|item| !built.contains(&item.key)) {
            item.fragment.rerender(env)?;
        }
        Ok(())
    }

    pub(crate) fn destroy(&mut self, env: &Environment) {
        for item in &mut self.items {
            item.fragment.destroy(env);
        }
    }

    fn invoke(&mut self) -> Result<Vec<Yielded>> {
        let invocation = &self.invocation;
        let params = values(&invocation.params)?;
        let hash = hash_values(&invocation.hash)?;
        self.last_value = params.first().cloned().unwrap_or(Value::Undefined);

        let mut blocks = Blocks::new(invocation.template.is_some(), invocation.inverse.is_some());
        trace!(helper = %invocation.name, "invoking block helper");
        (invocation.helper)(&params, &hash, &mut blocks).map_err(|message| {
            RenderError::Helper {
                name: invocation.name.clone(),
                message,
            }
        })?;
        Ok(blocks.into_yields())
    }

    /// Bring the items in line with `yields`.
    ///
    /// Items whose key persists keep their nodes and are moved only when
    /// out of place; vanished items are destroyed and detached; new items are
    /// built in position. `before` is where an empty, markerless block
    /// inserts (the initial render). Returns the keys of the items built.
    fn reconcile(
        &mut self,
        env: &Environment,
        yields: Vec<Yielded>,
        before: Option<NodeId>,
    ) -> Result<HashSet<ItemKey>> {
        self.keyed |= yields.iter().any(|yielded| yielded.key.is_some());
        let entries = assign_keys(&self.invocation.name, yields);
        let needs_marker = entries.is_empty() || self.keyed;

        // Computed before anything is removed.
        let mut anchor = match (self.marker, self.items.last()) {
            (Some(marker), _) => Some(marker),
            (None, Some(last)) => {
                let last = last.fragment.last_node();
                last.and_then(|node| env.dom_ref().next_sibling(node))
            }
            (None, None) => before,
        };

        if needs_marker && self.marker.is_none() {
            let marker = env.dom().create_comment(&env.config().marker_text);
            env.dom().insert_before(self.parent, marker, anchor)?;
            self.marker = Some(marker);
            anchor = Some(marker);
        }

        let mut previous: HashMap<ItemKey, BlockItem> = HashMap::new();
        let mut vanished = Vec::new();
        {
            let wanted: HashSet<&ItemKey> = entries.iter().map(|entry| &entry.key).collect();
            for item in self.items.drain(..) {
                if wanted.contains(&item.key) {
                    previous.insert(item.key.clone(), item);
                } else {
                    vanished.push(item);
                }
            }
        }

        for item in &mut vanished {
            item.fragment.destroy(env);
        }
        for item in &vanished {
            item.fragment.remove(env, self.parent)?;
        }

        let mut reused = 0;
        let mut built = HashSet::new();
        let mut next = anchor;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries.into_iter().rev() {
            let item = match previous.remove(&entry.key) {
                Some(item) => {
                    item.fragment.update_params(&entry.args);
                    let in_place = match item.fragment.last_node() {
                        Some(last) => env.dom_ref().next_sibling(last) == next,
                        None => true,
                    };
                    if !in_place {
                        item.fragment.move_before(env, self.parent, next)?;
                    }
                    reused += 1;
                    item
                }
                None => {
                    built.insert(entry.key.clone());
                    BlockItem {
                        fragment: self.build_item(env, &entry, next)?,
                        key: entry.key,
                    }
                }
            };
            next = item.fragment.first_node().or(next);
            items.push(item);
        }
        items.reverse();
        self.items = items;

        if !needs_marker {
            if let Some(marker) = self.marker.take() {
                env.dom().remove_child(self.parent, marker)?;
            }
        }

        debug!(
            helper = %self.invocation.name,
            reused,
            built = built.len(),
            removed = vanished.len(),
            "reconciled block"
        );
        Ok(built)
    }

    fn build_item(&self, env: &Environment, entry: &Entry, before: Option<NodeId>) -> Result<Fragment> {
        let template = match entry.key.branch {
            Branch::Template => self.invocation.template.as_ref(),
            Branch::Inverse => self.invocation.inverse.as_ref(),
        };
        let Some(template) = template else {
            return Err(RenderError::MalformedProgram(format!(
                "`{}` yielded to a template it does not have",
                self.invocation.name
            )));
        };

        let params: Vec<RootReference> = (0..template.block_params().len())
            .map(|index| {
                let value = entry.args.get(index).cloned().unwrap_or(Value::Undefined);
                env.registry().detached_root(value)
            })
            .collect();

        let mut scope = self.scope.clone();
        let mut guard = scope.scope_guard();
        for (name, param) in template.block_params().iter().zip(&params) {
            guard.define(name.as_str(), param.clone());
        }

        let cx = BuildContext {
            env,
            parent: self.parent,
            before,
            depth: self.depth + 1,
        };
        build_fragment(&cx, template, &guard, params)
    }
}

/// Key every yield. Later duplicates of a named key fall back to their
/// position.
fn assign_keys(helper: &str, yields: Vec<Yielded>) -> Vec<Entry> {
    let mut seen: HashSet<(Branch, String)> = HashSet::new();
    yields
        .into_iter()
        .enumerate()
        .map(|(index, yielded)| {
            let branch = yielded.branch;
            let slot = match yielded.key {
                Some(key) if seen.insert((branch, key.clone())) => KeySlot::Named(key),
                Some(key) => {
                    warn!(helper, key = %key, index, "duplicate block key; matching by position");
                    KeySlot::Unkeyed(index)
                }
                None => KeySlot::Unkeyed(index),
            };
            Entry {
                key: ItemKey { branch, slot },
                args: yielded.args,
            }
        })
        .collect()
}
