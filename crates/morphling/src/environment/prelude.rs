//! Built-in helpers

use std::cell::RefCell;
use std::rc::Rc;

use super::Environment;
use crate::dom::DomHelper;
use crate::helper::{Blocks, Hash};
use crate::value::Value;

impl Environment {
    /// Create an environment with the built-in helpers registered.
    pub fn with_prelude(dom: Rc<RefCell<dyn DomHelper>>) -> Self {
        let env = Self::new(dom);
        env.load_prelude();
        env
    }

    /// Register `if`, `unless`, `with`, `each` and `concat`.
    pub fn load_prelude(&self) {
        self.register_helper("if", helper_if);
        self.register_helper("unless", helper_unless);
        self.register_helper("with", helper_with);
        self.register_helper("each", helper_each);
        self.register_helper("concat", helper_concat);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Conditionals
// ═══════════════════════════════════════════════════════════════════════

fn param(params: &[Value], index: usize) -> Value {
    params.get(index).cloned().unwrap_or(Value::Undefined)
}

fn conditional(condition: bool, params: &[Value], blocks: &mut Blocks) -> Value {
    if blocks.has_template() || blocks.has_inverse() {
        if condition {
            blocks.yield_template(Vec::new());
        } else {
            blocks.yield_inverse(Vec::new());
        }
        return Value::Undefined;
    }
    // Inline form: `{{if cond a b}}`
    if condition {
        param(params, 1)
    } else {
        param(params, 2)
    }
}

fn helper_if(params: &[Value], _hash: &Hash, blocks: &mut Blocks) -> Result<Value, String> {
    let condition = param(params, 0).is_truthy();
    Ok(conditional(condition, params, blocks))
}

fn helper_unless(params: &[Value], _hash: &Hash, blocks: &mut Blocks) -> Result<Value, String> {
    let condition = !param(params, 0).is_truthy();
    Ok(conditional(condition, params, blocks))
}

fn helper_with(params: &[Value], _hash: &Hash, blocks: &mut Blocks) -> Result<Value, String> {
    let value = param(params, 0);
    if value.is_truthy() {
        blocks.yield_template(vec![value]);
    } else {
        blocks.yield_inverse(Vec::new());
    }
    Ok(Value::Undefined)
}

// ═══════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════

/// `{{#each list key="id" as |item index|}}`.
///
/// `key` names the item property that identifies an item, or is `@index`
/// (the position) or `@identity` (the item itself). Without a key items are
/// matched by position.
fn helper_each(params: &[Value], hash: &Hash, blocks: &mut Blocks) -> Result<Value, String> {
    let items = match param(params, 0) {
        Value::List(list) => list.to_vec(),
        Value::Undefined | Value::Null => Vec::new(),
        other => {
            return Err(format!(
                "expected a list to iterate, got {}",
                other.type_name()
            ))
        }
    };

    if items.is_empty() {
        blocks.yield_inverse(Vec::new());
        return Ok(Value::Undefined);
    }

    let key = hash.get("key").and_then(Value::as_str).map(str::to_string);
    for (index, item) in items.into_iter().enumerate() {
        let item_key = key.as_deref().map(|key| match key {
            "@index" => index.to_string(),
            "@identity" => identity_key(&item),
            property => item.get(property).to_string(),
        });
        let args = vec![item, Value::from(index)];
        match item_key {
            Some(item_key) => blocks.yield_keyed(item_key, args),
            None => blocks.yield_template(args),
        }
    }
    Ok(Value::Undefined)
}

fn identity_key(item: &Value) -> String {
    match item {
        Value::Object(object) => object.id().to_string(),
        Value::List(list) => list.id().to_string(),
        other => format!("{}:{}", other.type_name(), other),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Strings
// ═══════════════════════════════════════════════════════════════════════

fn helper_concat(params: &[Value], _hash: &Hash, _blocks: &mut Blocks) -> Result<Value, String> {
    Ok(Value::string(
        params.iter().map(Value::to_string).collect::<String>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::Branch;
    use crate::value::ObjectRef;

    fn block_call(
        helper: fn(&[Value], &Hash, &mut Blocks) -> Result<Value, String>,
        params: Vec<Value>,
        hash: Hash,
    ) -> Blocks {
        let mut blocks = Blocks::new(true, true);
        helper(&params, &hash, &mut blocks).unwrap();
        blocks
    }

    #[test]
    fn test_if_branches() {
        let yes = block_call(helper_if, vec![Value::from(1)], Hash::new());
        assert_eq!(yes.yields()[0].branch, Branch::Template);
        let no = block_call(helper_if, vec![Value::from("")], Hash::new());
        assert_eq!(no.yields()[0].branch, Branch::Inverse);
        let unless = block_call(helper_unless, vec![Value::Null], Hash::new());
        assert_eq!(unless.yields()[0].branch, Branch::Template);
    }

    #[test]
    fn test_inline_if() {
        let params = vec![Value::Bool(false), Value::from("a"), Value::from("b")];
        let out = helper_if(&params, &Hash::new(), &mut Blocks::inline()).unwrap();
        assert_eq!(out, Value::from("b"));
    }

    #[test]
    fn test_each_keys() {
        let a = ObjectRef::new().with_field("id", "x");
        let b = ObjectRef::new().with_field("id", "y");
        let list = Value::list(vec![a.into(), b.into()]);

        let mut hash = Hash::new();
        hash.insert("key".to_string(), Value::from("id"));
        let keyed = block_call(helper_each, vec![list.clone()], hash);
        let keys: Vec<_> = keyed.yields().iter().map(|y| y.key.clone()).collect();
        assert_eq!(keys, vec![Some("x".to_string()), Some("y".to_string())]);
        assert_eq!(keyed.yields()[1].args[1], Value::from(1));

        let unkeyed = block_call(helper_each, vec![list], Hash::new());
        assert!(unkeyed.yields().iter().all(|y| y.key.is_none()));
    }

    #[test]
    fn test_each_empty_yields_inverse() {
        let blocks = block_call(helper_each, vec![Value::list(vec![])], Hash::new());
        assert_eq!(blocks.yields().len(), 1);
        assert_eq!(blocks.yields()[0].branch, Branch::Inverse);
    }

    #[test]
    fn test_each_rejects_non_lists() {
        let mut blocks = Blocks::new(true, false);
        assert!(helper_each(&[Value::from(3)], &Hash::new(), &mut blocks).is_err());
    }

    #[test]
    fn test_concat() {
        let out = helper_concat(
            &[Value::from("a"), Value::from(1), Value::Null],
            &Hash::new(),
            &mut Blocks::inline(),
        )
        .unwrap();
        assert_eq!(out, Value::from("a1"));
    }
}
