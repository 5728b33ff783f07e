//! The render tree
//!
//! A morph owns a region of the output tree and the expression that fills
//! it. Rendering materializes the region once; rerendering asks the
//! expression whether it is dirty and patches only what changed; destroying
//! tears the region down and reports it to the cleanup hook.

mod attribute;
mod block;
mod component;
mod content;
mod fragment;

pub(crate) use attribute::{AttributeMorph, PropertyMorph};
pub(crate) use block::{BlockInvocation, BlockMorph};
pub(crate) use component::ComponentMorph;
pub(crate) use content::ContentMorph;
pub(crate) use fragment::Fragment;

use crate::dom::NodeId;
use crate::environment::Environment;
use crate::error::Result;
use crate::value::Value;

/// Kind of a render node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MorphKind {
    /// `{{value}}` or `{{{value}}}`
    Content,
    /// A computed attribute
    Attribute,
    /// A computed element property
    Property,
    /// A block helper invocation
    Block,
    /// A component invocation
    Component,
}

/// What the cleanup hook receives for every render node torn down.
#[derive(Debug, Clone)]
pub struct DestroyedNode {
    /// Kind of the destroyed node
    pub kind: MorphKind,
    /// The value the node rendered last
    pub last_value: Value,
}

pub(crate) enum Morph {
    Content(ContentMorph),
    Attribute(AttributeMorph),
    Property(PropertyMorph),
    Block(BlockMorph),
    Component(ComponentMorph),
}

impl Morph {
    pub(crate) fn kind(&self) -> MorphKind {
        match self {
            Morph::Content(_) => MorphKind::Content,
            Morph::Attribute(_) => MorphKind::Attribute,
            Morph::Property(_) => MorphKind::Property,
            Morph::Block(_) => MorphKind::Block,
            Morph::Component(_) => MorphKind::Component,
        }
    }

    pub(crate) fn first_node(&self) -> Option<NodeId> {
        match self {
            Morph::Content(morph) => morph.first_node(),
            Morph::Attribute(morph) => Some(morph.element()),
            Morph::Property(morph) => Some(morph.element()),
            Morph::Block(morph) => morph.first_node(),
            Morph::Component(morph) => morph.first_node(),
        }
    }

    pub(crate) fn last_node(&self) -> Option<NodeId> {
        match self {
            Morph::Content(morph) => morph.last_node(),
            Morph::Attribute(morph) => Some(morph.element()),
            Morph::Property(morph) => Some(morph.element()),
            Morph::Block(morph) => morph.last_node(),
            Morph::Component(morph) => morph.last_node(),
        }
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        match self {
            Morph::Content(morph) => morph.rerender(env),
            Morph::Attribute(morph) => morph.rerender(env),
            Morph::Property(morph) => morph.rerender(env),
            Morph::Block(morph) => morph.rerender(env),
            Morph::Component(morph) => morph.rerender(env),
        }
    }

    /// Tear down nested morphs first, then report this one.
    pub(crate) fn destroy(&mut self, env: &Environment) {
        let kind = self.kind();
        let last_value = match self {
            Morph::Content(morph) => morph.last_value(),
            Morph::Attribute(morph) => morph.last_value(),
            Morph::Property(morph) => morph.last_value(),
            Morph::Block(morph) => {
                morph.destroy(env);
                morph.last_value()
            }
            Morph::Component(morph) => {
                morph.destroy(env);
                morph.last_value()
            }
        };
        env.render_node_destroyed(DestroyedNode { kind, last_value });
    }
}
