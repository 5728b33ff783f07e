//! The runtime environment shared by every render pass

mod prelude;
mod scope;

pub use scope::{Binding, Scope, ScopeGuard};

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::ComponentDefinition;
use crate::config::RenderConfig;
use crate::dom::DomHelper;
use crate::helper::{Blocks, Hash, HelperFn};
use crate::morph::DestroyedNode;
use crate::reference::MetaRegistry;
use crate::value::Value;

type DestroyHook = Rc<dyn Fn(&DestroyedNode)>;

/// Everything a render pass needs besides the template and the context:
/// the output tree, registered helpers and components, the meta registry and
/// the configuration.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use morphling::{Environment, SimpleDom, Value};
///
/// let dom = Rc::new(RefCell::new(SimpleDom::new()));
/// let env = Environment::with_prelude(dom);
///
/// env.register_helper("shout", |params, _hash, _blocks| {
///     Ok(Value::string(params[0].to_string().to_uppercase()))
/// });
/// assert!(env.helper("shout").is_some());
/// assert!(env.helper("each").is_some());
/// ```
pub struct Environment {
    dom: Rc<RefCell<dyn DomHelper>>,
    helpers: RefCell<IndexMap<String, HelperFn>>,
    components: RefCell<IndexMap<String, Rc<ComponentDefinition>>>,
    registry: Rc<MetaRegistry>,
    destroy_hook: RefCell<Option<DestroyHook>>,
    config: RenderConfig,
}

impl Environment {
    /// Create an environment with no helpers.
    pub fn new(dom: Rc<RefCell<dyn DomHelper>>) -> Self {
        Self {
            dom,
            helpers: RefCell::new(IndexMap::new()),
            components: RefCell::new(IndexMap::new()),
            registry: MetaRegistry::new(),
            destroy_hook: RefCell::new(None),
            config: RenderConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    // ═══════════════════════════════════════════════════════════════════
    // Helpers and Components
    // ═══════════════════════════════════════════════════════════════════

    /// Register a helper, replacing any helper with the same name.
    pub fn register_helper(
        &self,
        name: impl Into<String>,
        helper: impl Fn(&[Value], &Hash, &mut Blocks) -> Result<Value, String> + 'static,
    ) {
        self.helpers
            .borrow_mut()
            .insert(name.into(), Rc::new(helper));
    }

    /// Look up a helper by name.
    pub fn helper(&self, name: &str) -> Option<HelperFn> {
        self.helpers.borrow().get(name).cloned()
    }

    /// Names of all registered helpers, in registration order
    pub fn helper_names(&self) -> Vec<String> {
        self.helpers.borrow().keys().cloned().collect()
    }

    /// Register a component, replacing any component with the same name.
    pub fn register_component(&self, definition: ComponentDefinition) {
        self.components
            .borrow_mut()
            .insert(definition.name.clone(), Rc::new(definition));
    }

    /// Look up a component by name.
    pub fn component(&self, name: &str) -> Option<Rc<ComponentDefinition>> {
        self.components.borrow().get(name).cloned()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Hooks
    // ═══════════════════════════════════════════════════════════════════

    /// Install the cleanup hook, called once for every render node that is
    /// torn down.
    pub fn on_destroy_render_node(&self, hook: impl Fn(&DestroyedNode) + 'static) {
        *self.destroy_hook.borrow_mut() = Some(Rc::new(hook));
    }

    pub(crate) fn render_node_destroyed(&self, node: DestroyedNode) {
        let hook = self.destroy_hook.borrow().clone();
        if let Some(hook) = hook {
            hook(&node);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    /// The meta registry shared by every render in this environment
    pub fn registry(&self) -> &Rc<MetaRegistry> {
        &self.registry
    }

    /// The active configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Mutable access to the output tree.
    ///
    /// Panics if the tree is already borrowed; never hold the guard across a
    /// render or rerender call.
    pub fn dom(&self) -> RefMut<'_, dyn DomHelper + 'static> {
        self.dom.borrow_mut()
    }

    /// Shared access to the output tree
    pub fn dom_ref(&self) -> Ref<'_, dyn DomHelper + 'static> {
        self.dom.borrow()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("helpers", &self.helper_names())
            .field(
                "components",
                &self.components.borrow().keys().collect::<Vec<_>>(),
            )
            .field("metas", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
