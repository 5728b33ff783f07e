//! Display and Debug implementations for Value

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use super::*;

thread_local! {
    /// Containers being formatted further up the stack
    static FORMATTING: RefCell<HashSet<ObjectId>> = RefCell::new(HashSet::new());
}

/// Marks a container as being formatted until dropped.
pub(crate) struct Visit(ObjectId);

impl Visit {
    /// `None` when `id` is already being formatted: the container contains
    /// itself.
    pub(crate) fn enter(id: ObjectId) -> Option<Visit> {
        FORMATTING
            .with(|visiting| visiting.borrow_mut().insert(id))
            .then(|| Visit(id))
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        FORMATTING.with(|visiting| visiting.borrow_mut().remove(&self.0));
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s.as_ref()),
            Value::List(list) => write!(f, "{:?}", list),
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

/// Text rendering, as inserted by a `{{curly}}`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined | Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::List(list) => {
                // A list nested in itself renders as empty text there.
                let Some(_visit) = Visit::enter(list.id()) else {
                    return Ok(());
                };
                for (i, item) in list.to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
        }
    }
}

/// Format a number the way templates print it: integral values have no
/// fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_primitives() {
        assert_eq!(Value::Undefined.to_string(), "");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::string("hi").to_string(), "hi");
    }

    #[test]
    fn test_display_containers() {
        let list = Value::list(vec![Value::from(1), Value::from("a"), Value::Null]);
        assert_eq!(list.to_string(), "1,a,");
        assert_eq!(Value::object(ObjectRef::new()).to_string(), "[object Object]");
    }

    #[test]
    fn test_debug_object() {
        let object = ObjectRef::new().with_field("a", 1).with_field("b", "x");
        assert_eq!(format!("{:?}", Value::object(object)), r#"{"a": 1, "b": "x"}"#);
    }

    #[test]
    fn test_self_containing_containers_terminate() {
        let list = ListRef::from_vec(vec![Value::from(1)]);
        list.push(Value::List(list.clone()));
        list.push(2);
        assert_eq!(Value::List(list.clone()).to_string(), "1,,2");
        assert_eq!(format!("{:?}", list), "[1, [...], 2]");

        let object = ObjectRef::new().with_field("a", 1);
        object.set("me", object.clone());
        assert_eq!(format!("{:?}", object), r#"{"a": 1, "me": {...}}"#);

        // Break the cycles so the containers are freed.
        list.pop();
        list.pop();
        object.remove("me");
    }
}
