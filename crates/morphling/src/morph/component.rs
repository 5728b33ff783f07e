//! Component invocations

use std::rc::Rc;

use tracing::debug;

use super::Fragment;
use crate::component::ComponentDefinition;
use crate::dom::NodeId;
use crate::environment::{Environment, Scope};
use crate::error::Result;
use crate::reference::RootReference;
use crate::eval::{any_dirty, build_fragment, hash_values, BuildContext, Expression};
use crate::value::{ObjectRef, Value};

pub(crate) struct ComponentMorph {
    definition: Rc<ComponentDefinition>,
    hash: Vec<(String, Expression)>,
    attrs: ObjectRef,
    component: ObjectRef,
    /// Self context of the layout
    root: RootReference,
    fragment: Fragment,
}

impl ComponentMorph {
    pub(crate) fn render(
        env: &Environment,
        definition: Rc<ComponentDefinition>,
        hash: Vec<(String, Expression)>,
        parent: NodeId,
        before: Option<NodeId>,
        depth: usize,
    ) -> Result<Self> {
        let attrs = ObjectRef::from_fields(hash_values(&hash)?);
        let component = definition.instantiate(&attrs);
        let hooks = definition.hooks.clone();

        hooks.begin(&component);
        hooks.did_receive_attrs(&component);
        hooks.will_render(&component);

        let root = env.registry().detached_root(component.clone());
        let scope = Scope::new(root.clone());
        let cx = BuildContext {
            env,
            parent,
            before,
            depth: depth + 1,
        };
        let fragment = build_fragment(&cx, &definition.layout, &scope, Vec::new())?;

        hooks.commit(&component);
        hooks.did_insert_element(&component);
        hooks.did_render(&component);
        debug!(component = %definition.name, "rendered component");

        Ok(Self {
            definition,
            hash,
            attrs,
            component,
            root,
            fragment,
        })
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        self.fragment.first_node()
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        self.fragment.last_node()
    }

    pub(crate) fn last_value(&self) -> Value {
        self.root.current()
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        if !any_dirty(&[], &self.hash) {
            return self.fragment.rerender(env);
        }

        // Hooks observe the new attributes.
        let mut changed = 0;
        for (name, value) in hash_values(&self.hash)? {
            if !self.attrs.get(&name).identical(&value) {
                env.registry().set(&self.attrs, &name, value);
                changed += 1;
            }
        }
        debug!(component = %self.definition.name, changed, "updating component");

        let hooks = self.definition.hooks.clone();
        let component = &self.component;
        hooks.begin(component);
        hooks.did_update_attrs(component);
        hooks.did_receive_attrs(component);
        hooks.will_update(component);
        hooks.will_render(component);

        self.fragment.rerender(env)?;

        hooks.commit(component);
        hooks.did_update(component);
        hooks.did_render(component);
        Ok(())
    }

    pub(crate) fn destroy(&mut self, env: &Environment) {
        self.fragment.destroy(env);
    }
}
