//! Component definitions and lifecycle hooks

use std::fmt;
use std::rc::Rc;

use crate::template::Template;
use crate::value::ObjectRef;

/// Lifecycle callbacks of a component.
///
/// Every method defaults to a no-op. `component` is the object the layout
/// renders against.
///
/// Initial render: `begin`, `did_receive_attrs`, `will_render`, layout,
/// `commit`, `did_insert_element`, `did_render`.
///
/// Rerender with changed attributes: `begin`, `did_update_attrs`,
/// `did_receive_attrs`, `will_update`, `will_render`, layout, `commit`,
/// `did_update`, `did_render`. The new attribute values are in place before
/// `begin` runs. With unchanged attributes only the layout is revalidated.
#[allow(unused_variables)]
pub trait ComponentHooks {
    /// A render or update of this component is starting
    fn begin(&self, component: &ObjectRef) {}

    /// The render or update finished
    fn commit(&self, component: &ObjectRef) {}

    /// Attributes were received (initially or after a change)
    fn did_receive_attrs(&self, component: &ObjectRef) {}

    /// Attributes changed since the last pass
    fn did_update_attrs(&self, component: &ObjectRef) {}

    /// The component's nodes were inserted for the first time
    fn did_insert_element(&self, component: &ObjectRef) {}

    /// The layout is about to render
    fn will_render(&self, component: &ObjectRef) {}

    /// The layout is about to update
    fn will_update(&self, component: &ObjectRef) {}

    /// The layout rendered
    fn did_render(&self, component: &ObjectRef) {}

    /// The layout updated
    fn did_update(&self, component: &ObjectRef) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ComponentHooks for NoHooks {}

/// Builds the component object from its attributes.
pub type ComponentFactory = Rc<dyn Fn(&ObjectRef) -> ObjectRef>;

/// A registered component.
#[derive(Clone)]
pub struct ComponentDefinition {
    /// Name used by `Opcode::Component`
    pub name: String,
    /// Template rendered with the component object as `this`
    pub layout: Rc<Template>,
    /// Lifecycle callbacks
    pub hooks: Rc<dyn ComponentHooks>,
    /// Optional factory; without one the component object is `{ attrs }`
    pub factory: Option<ComponentFactory>,
}

impl ComponentDefinition {
    /// A component with no hooks and the default component object.
    pub fn new(name: impl Into<String>, layout: Template) -> Self {
        Self {
            name: name.into(),
            layout: Rc::new(layout),
            hooks: Rc::new(NoHooks),
            factory: None,
        }
    }

    /// Attach lifecycle hooks
    pub fn with_hooks(mut self, hooks: impl ComponentHooks + 'static) -> Self {
        self.hooks = Rc::new(hooks);
        self
    }

    /// Attach a factory that builds the component object from its attributes
    pub fn with_factory(mut self, factory: impl Fn(&ObjectRef) -> ObjectRef + 'static) -> Self {
        self.factory = Some(Rc::new(factory));
        self
    }

    pub(crate) fn instantiate(&self, attrs: &ObjectRef) -> ObjectRef {
        match &self.factory {
            Some(factory) => factory(attrs),
            None => ObjectRef::new().with_field("attrs", attrs.clone()),
        }
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}
