//! Value representation for template data

mod display;
mod impls;
mod object;

pub use object::{ListRef, ObjectId, ObjectRef, WeakObjectRef};

use std::rc::Rc;

/// Data read by templates.
///
/// Values are organized into two tiers:
/// - Tier 1: Inline primitives, compared by value
/// - Tier 2: Shared containers, compared by identity and mutated in place
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Tier 1: Primitives
    // ═══════════════════════════════════════════════════════════════════
    /// The result of resolving a path that does not exist
    Undefined,

    /// An explicit null
    Null,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// Any number (templates do not distinguish integers from floats)
    Number(f64),

    /// Immutable string
    String(Rc<str>),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 2: Shared Containers
    // ═══════════════════════════════════════════════════════════════════
    /// An ordered list, shared and mutable in place
    List(ListRef),

    /// An object with named fields, shared and mutable in place
    Object(ObjectRef),
}

impl Value {
    /// Whether `self` and `other` are the same value for change detection.
    ///
    /// Primitives compare by value (`NaN` is identical to itself), containers
    /// by identity.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// The mutation revision of a container value, `None` for primitives.
    pub fn container_revision(&self) -> Option<u64> {
        match self {
            Value::List(list) => Some(list.revision()),
            Value::Object(object) => Some(object.revision()),
            _ => None,
        }
    }

    /// Read a property of this value.
    ///
    /// Objects expose their fields, lists expose numeric indices and
    /// `length`, strings expose `length`. Anything else is `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(object) => object.get(key),
            Value::List(list) => {
                if key == "length" {
                    Value::Number(list.len() as f64)
                } else {
                    key.parse::<usize>()
                        .ok()
                        .map(|index| list.get(index))
                        .unwrap_or(Value::Undefined)
                }
            }
            Value::String(s) if key == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }
}
