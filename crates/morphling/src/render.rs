//! Render entry points

use std::rc::Rc;

use tracing::{debug, info};

use crate::dom::NodeId;
use crate::environment::{Environment, Scope};
use crate::error::Result;
use crate::eval::{build_fragment, BuildContext};
use crate::morph::Fragment;
use crate::reference::RootReference;
use crate::template::Template;
use crate::value::Value;

impl Template {
    /// Render the template against `context`, appending the output to
    /// `append_to`.
    ///
    /// The returned [`RenderResult`] keeps the rendered tree alive and
    /// patches it in place on [`rerender`](RenderResult::rerender).
    ///
    /// # Example
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use morphling::{DomHelper, Environment, Expr, ObjectRef, SimpleDom, TemplateBuilder};
    ///
    /// let dom = Rc::new(RefCell::new(SimpleDom::new()));
    /// let env = Rc::new(Environment::with_prelude(dom.clone()));
    /// let root = dom.borrow_mut().create_element("div");
    ///
    /// let template = TemplateBuilder::new()
    ///     .text("hello ")
    ///     .append(Expr::path("name"))
    ///     .build();
    /// let context = ObjectRef::new().with_field("name", "world");
    ///
    /// let mut result = template.render(context.clone(), &env, root).unwrap();
    /// assert_eq!(dom.borrow().inner_html(root), "hello world");
    ///
    /// context.set("name", "morphling");
    /// result.rerender(None).unwrap();
    /// assert_eq!(dom.borrow().inner_html(root), "hello morphling");
    /// ```
    pub fn render(
        &self,
        context: impl Into<Value>,
        env: &Rc<Environment>,
        append_to: NodeId,
    ) -> Result<RenderResult> {
        let context = context.into();
        // Owned by this render; paths below it still register with the
        // registry, so writes through `MetaRegistry::set` reach them.
        let root = env.registry().detached_root(context.clone());
        let scope = Scope::new(root.clone());
        let cx = BuildContext {
            env: env.as_ref(),
            parent: append_to,
            before: None,
            depth: 0,
        };
        let fragment = build_fragment(&cx, self, &scope, Vec::new())?;
        info!(parent = %append_to, context = context.type_name(), "rendered template");

        Ok(RenderResult {
            env: env.clone(),
            root,
            parent: append_to,
            fragment,
        })
    }
}

/// A live render of a template.
pub struct RenderResult {
    env: Rc<Environment>,
    root: RootReference,
    parent: NodeId,
    fragment: Fragment,
}

impl RenderResult {
    /// Revalidate the tree and patch whatever changed.
    ///
    /// With `Some(context)` this render's self context is replaced first.
    /// Other renders of the old context are unaffected. Meta records nothing
    /// reads any more are released at the end of the pass.
    pub fn rerender(&mut self, context: Option<Value>) -> Result<()> {
        if let Some(context) = context {
            self.root.update(context);
        }
        self.fragment.rerender(&self.env)?;
        let swept = self.env.registry().sweep();
        debug!(parent = %self.parent, swept, "rerendered template");
        Ok(())
    }

    /// First top-level node of the render
    pub fn first_node(&self) -> Option<NodeId> {
        self.fragment.first_node()
    }

    /// Last top-level node of the render
    pub fn last_node(&self) -> Option<NodeId> {
        self.fragment.last_node()
    }

    /// Top-level nodes of the render, in order
    pub fn nodes(&self) -> Vec<NodeId> {
        self.fragment.nodes(&self.env)
    }

    /// The self context reference
    pub fn root(&self) -> &RootReference {
        &self.root
    }

    /// The node the render was appended to
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// The environment the render belongs to
    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    /// Tear the render down: run the cleanup hook for every render node,
    /// detach the nodes and release the meta records only this render used.
    pub fn destroy(self) -> Result<()> {
        let RenderResult {
            env,
            root,
            parent,
            mut fragment,
        } = self;

        fragment.destroy(&env);
        fragment.remove(&env, parent)?;
        drop(fragment);
        drop(root);

        // Records another live render reads through are still retained.
        let swept = env.registry().sweep();
        debug!(parent = %parent, swept, "destroyed render");
        Ok(())
    }
}

impl std::fmt::Debug for RenderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderResult")
            .field("parent", &self.parent)
            .field("context", &self.root.current())
            .finish()
    }
}
