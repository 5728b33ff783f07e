//! Walks an opcode stream and builds a [`Fragment`]

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::Expression;
use crate::dom::NodeId;
use crate::environment::{Environment, Scope};
use crate::error::{RenderError, Result};
use crate::morph::{
    AttributeMorph, BlockInvocation, BlockMorph, ComponentMorph, ContentMorph, Fragment, Morph,
    PropertyMorph,
};
use crate::reference::RootReference;
use crate::template::{Expr, Opcode, Template};

/// Where a fragment is built
pub(crate) struct BuildContext<'a> {
    pub(crate) env: &'a Environment,
    /// Node the fragment's top-level nodes are inserted into
    pub(crate) parent: NodeId,
    /// Insert before this child of `parent`, or append
    pub(crate) before: Option<NodeId>,
    /// Number of blocks and components enclosing the fragment
    pub(crate) depth: usize,
}

/// Resolve an [`Expr`] against `scope`.
fn compile(expr: &Expr, scope: &Scope, env: &Environment) -> Result<Expression> {
    Ok(match expr {
        Expr::Literal(value) => Expression::Const(value.clone()),
        Expr::Path(parts) => Expression::reference(scope.resolve(parts)),
        Expr::Helper { name, params, hash } => {
            let helper = env
                .helper(name)
                .ok_or_else(|| RenderError::UnknownHelper(name.clone()))?;
            Expression::Helper {
                name: name.clone(),
                helper,
                params: compile_all(params, scope, env)?,
                hash: compile_hash(hash, scope, env)?,
                cached: RefCell::new(None),
            }
        }
        Expr::Concat(parts) => Expression::Concat(compile_all(parts, scope, env)?),
    })
}

fn compile_all(exprs: &[Expr], scope: &Scope, env: &Environment) -> Result<Vec<Expression>> {
    exprs.iter().map(|expr| compile(expr, scope, env)).collect()
}

fn compile_hash(
    hash: &[(String, Expr)],
    scope: &Scope,
    env: &Environment,
) -> Result<Vec<(String, Expression)>> {
    hash.iter()
        .map(|(name, expr)| compile(expr, scope, env).map(|expression| (name.clone(), expression)))
        .collect()
}

/// Build one instance of `template` at the position described by `cx`.
///
/// `params` are the roots of the template's block parameters; they are kept
/// alive by the fragment.
pub(crate) fn build_fragment(
    cx: &BuildContext<'_>,
    template: &Template,
    scope: &Scope,
    params: Vec<RootReference>,
) -> Result<Fragment> {
    let max = cx.env.config().max_depth;
    if cx.depth > max {
        return Err(RenderError::DepthExceeded {
            depth: cx.depth,
            max,
        });
    }

    let env = cx.env;
    let mut fragment = Fragment::new(params);
    // Elements opened but not yet closed, innermost last
    let mut open: Vec<NodeId> = Vec::new();

    for opcode in template.opcodes() {
        let (parent, before) = match open.last() {
            Some(element) => (*element, None),
            None => (cx.parent, cx.before),
        };
        let top_level = open.is_empty();

        match opcode {
            Opcode::Text(text) => {
                let node = env.dom().create_text_node(text);
                insert(env, &mut fragment, parent, node, before, top_level)?;
            }
            Opcode::Comment(text) => {
                let node = env.dom().create_comment(text);
                insert(env, &mut fragment, parent, node, before, top_level)?;
            }
            Opcode::OpenElement(tag) => {
                let element = env.dom().create_element(tag);
                insert(env, &mut fragment, parent, element, before, top_level)?;
                open.push(element);
            }
            Opcode::CloseElement => {
                if open.pop().is_none() {
                    return Err(RenderError::MalformedProgram(
                        "CloseElement without a matching OpenElement".to_string(),
                    ));
                }
            }
            Opcode::StaticAttr { name, value } => {
                let element = open_element(&open, "StaticAttr")?;
                env.dom().set_attribute(element, name, value)?;
            }
            Opcode::DynamicAttr { name, value } => {
                let element = open_element(&open, "DynamicAttr")?;
                let expression = compile(value, scope, env)?;
                let morph = AttributeMorph::render(env, element, name, expression)?;
                fragment.push_morph(Morph::Attribute(morph), false);
            }
            Opcode::DynamicProp { name, value } => {
                let element = open_element(&open, "DynamicProp")?;
                let expression = compile(value, scope, env)?;
                let morph = PropertyMorph::render(env, element, name, expression)?;
                fragment.push_morph(Morph::Property(morph), false);
            }
            Opcode::Append { value, trusting } => {
                let expression = compile(value, scope, env)?;
                let morph = ContentMorph::render(env, expression, *trusting, parent, before)?;
                fragment.push_morph(Morph::Content(morph), top_level);
            }
            Opcode::Block {
                helper,
                params,
                hash,
                template: main,
                inverse,
            } => {
                let invocation = BlockInvocation {
                    name: helper.clone(),
                    helper: env
                        .helper(helper)
                        .ok_or_else(|| RenderError::UnknownHelper(helper.clone()))?,
                    params: compile_all(params, scope, env)?,
                    hash: compile_hash(hash, scope, env)?,
                    template: nested(template, *main)?,
                    inverse: nested(template, *inverse)?,
                };
                let morph =
                    BlockMorph::render(env, invocation, scope.clone(), parent, before, cx.depth)?;
                fragment.push_morph(Morph::Block(morph), top_level);
            }
            Opcode::Component { name, hash } => {
                let definition = env
                    .component(name)
                    .ok_or_else(|| RenderError::UnknownComponent(name.clone()))?;
                let hash = compile_hash(hash, scope, env)?;
                let morph = ComponentMorph::render(env, definition, hash, parent, before, cx.depth)?;
                fragment.push_morph(Morph::Component(morph), top_level);
            }
        }
    }

    if !open.is_empty() {
        return Err(RenderError::MalformedProgram(format!(
            "{} element(s) left open",
            open.len()
        )));
    }

    // Every fragment owns at least one node so it can be located and moved.
    if !fragment.has_top_level() {
        let placeholder = env.dom().create_comment(&env.config().marker_text);
        insert(env, &mut fragment, cx.parent, placeholder, cx.before, true)?;
    }

    trace!(depth = cx.depth, opcodes = template.opcodes().len(), "built fragment");
    Ok(fragment)
}

fn insert(
    env: &Environment,
    fragment: &mut Fragment,
    parent: NodeId,
    node: NodeId,
    before: Option<NodeId>,
    top_level: bool,
) -> Result<()> {
    env.dom().insert_before(parent, node, before)?;
    if top_level {
        fragment.push_node(node);
    }
    Ok(())
}

fn open_element(open: &[NodeId], opcode: &str) -> Result<NodeId> {
    open.last().copied().ok_or_else(|| {
        RenderError::MalformedProgram(format!("{opcode} outside of an element"))
    })
}

fn nested(template: &Template, index: Option<usize>) -> Result<Option<Rc<Template>>> {
    match index {
        Some(index) => template
            .block(index)
            .cloned()
            .map(Some)
            .ok_or(RenderError::UndefinedBlock { index }),
        None => Ok(None),
    }
}
