//! # Morphling
//!
//! A reactive template runtime. Templates are compiled opcode streams; the
//! runtime renders them against a context object into a live output tree
//! and, on every later pass, patches only the parts whose inputs changed.
//!
//! ## Architecture
//!
//! - **Values**: shared, mutable objects and lists with identity and a
//!   revision counter
//! - **References**: interned path references that know when they are dirty
//! - **Meta Registry**: per-object records that let writes notify readers
//! - **Render Tree**: morphs for content, attributes, blocks and components
//! - **DOM Helper**: the capability interface the runtime writes through
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use morphling::{BlockBuilder, DomHelper, Environment, Expr, ObjectRef, SimpleDom, TemplateBuilder};
//!
//! let dom = Rc::new(RefCell::new(SimpleDom::new()));
//! let env = Rc::new(Environment::with_prelude(dom.clone()));
//! let root = dom.borrow_mut().create_element("div");
//!
//! let template = TemplateBuilder::new()
//!     .block(
//!         BlockBuilder::new("if")
//!             .param(Expr::path("admin"))
//!             .template(TemplateBuilder::new().text("welcome back").build())
//!             .inverse(TemplateBuilder::new().text("please sign in").build()),
//!     )
//!     .build();
//!
//! let context = ObjectRef::new().with_field("admin", false);
//! let mut result = template.render(context.clone(), &env, root).unwrap();
//! assert_eq!(dom.borrow().inner_html(root), "please sign in");
//!
//! context.set("admin", true);
//! result.rerender(None).unwrap();
//! assert_eq!(dom.borrow().inner_html(root), "welcome back");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod config;
pub mod dom;
pub mod environment;
pub mod error;
pub mod helper;
pub mod reference;
pub mod template;
pub mod value;

mod eval;
mod morph;
mod render;

// Re-export main types
pub use component::{ComponentDefinition, ComponentFactory, ComponentHooks, NoHooks};
pub use config::RenderConfig;
pub use dom::{DomHelper, DomResult, NodeId, NodeKind, SimpleDom};
pub use environment::{Binding, Environment, Scope, ScopeGuard};
pub use error::{ConfigError, DomError, RenderError, Result};
pub use helper::{Blocks, Branch, Hash, HelperFn, Yielded};
pub use morph::{DestroyedNode, MorphKind};
pub use reference::{
    ChainHandle, ConstReference, Destroyable, Meta, MetaHandle, MetaRegistry, PathReference,
    Reference, RootReference,
};
pub use render::RenderResult;
pub use template::{BlockBuilder, Expr, Opcode, Template, TemplateBuilder};
pub use value::{ListRef, ObjectId, ObjectRef, Value};

/// Morphling version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
