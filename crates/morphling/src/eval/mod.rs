//! Runtime expressions and the opcode walker
//!
//! An [`Expression`] is the compiled form of an [`Expr`](crate::Expr): paths
//! are resolved to interned references once, helpers are looked up once, and
//! each expression remembers what it last consumed so it can answer
//! [`is_dirty`](Expression::is_dirty) without recomputing anything.

mod builder;

pub(crate) use builder::{build_fragment, BuildContext};

use std::cell::{Cell, RefCell};

use tracing::trace;

use crate::error::{RenderError, Result};
use crate::helper::{Blocks, Hash, HelperFn};
use crate::reference::{PathReference, Reference};
use crate::value::Value;

pub(crate) enum Expression {
    Const(Value),
    Reference {
        reference: PathReference,
        /// Revision of `reference` this expression last consumed
        seen: Cell<u64>,
    },
    Helper {
        name: String,
        helper: HelperFn,
        params: Vec<Expression>,
        hash: Vec<(String, Expression)>,
        cached: RefCell<Option<Value>>,
    },
    Concat(Vec<Expression>),
}

impl Expression {
    pub(crate) fn reference(reference: PathReference) -> Self {
        Expression::Reference {
            reference,
            seen: Cell::new(0),
        }
    }

    /// Whether [`value`](Self::value) may return something new.
    pub(crate) fn is_dirty(&self) -> bool {
        match self {
            Expression::Const(_) => false,
            Expression::Reference { reference, seen } => {
                reference.is_dirty() || reference.revision() != seen.get()
            }
            Expression::Helper {
                params,
                hash,
                cached,
                ..
            } => {
                cached.borrow().is_none()
                    || params.iter().any(Expression::is_dirty)
                    || hash.iter().any(|(_, value)| value.is_dirty())
            }
            Expression::Concat(parts) => parts.iter().any(Expression::is_dirty),
        }
    }

    pub(crate) fn value(&self) -> Result<Value> {
        match self {
            Expression::Const(value) => Ok(value.clone()),
            Expression::Reference { reference, seen } => {
                let value = reference.value();
                seen.set(reference.revision());
                Ok(value)
            }
            Expression::Helper {
                name,
                helper,
                params,
                hash,
                cached,
            } => {
                if !self.is_dirty() {
                    if let Some(value) = cached.borrow().as_ref() {
                        return Ok(value.clone());
                    }
                }
                let params = values(params)?;
                let hash = hash_values(hash)?;
                trace!(helper = %name, "invoking inline helper");
                let value = helper(&params, &hash, &mut Blocks::inline()).map_err(|message| {
                    RenderError::Helper {
                        name: name.clone(),
                        message,
                    }
                })?;
                *cached.borrow_mut() = Some(value.clone());
                Ok(value)
            }
            Expression::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&part.value()?.to_string());
                }
                Ok(Value::string(out))
            }
        }
    }
}

pub(crate) fn values(expressions: &[Expression]) -> Result<Vec<Value>> {
    expressions.iter().map(Expression::value).collect()
}

pub(crate) fn hash_values(hash: &[(String, Expression)]) -> Result<Hash> {
    hash.iter()
        .map(|(name, expression)| expression.value().map(|value| (name.clone(), value)))
        .collect()
}

pub(crate) fn any_dirty(params: &[Expression], hash: &[(String, Expression)]) -> bool {
    params.iter().any(Expression::is_dirty) || hash.iter().any(|(_, value)| value.is_dirty())
}
