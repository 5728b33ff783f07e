//! The helper calling convention

use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// Named helper parameters, in source order
pub type Hash = IndexMap<String, Value>;

/// A registered helper.
///
/// Inline helpers return their output. Block helpers yield to their
/// templates through [`Blocks`] and usually return `Value::Undefined`.
/// An `Err` aborts the pass with [`RenderError::Helper`](crate::RenderError::Helper).
pub type HelperFn = Rc<dyn Fn(&[Value], &Hash, &mut Blocks) -> Result<Value, String>>;

/// Which template of a block a yield targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The main template
    Template,
    /// The `{{else}}` template
    Inverse,
}

/// One yield recorded during a block helper call.
#[derive(Debug, Clone)]
pub struct Yielded {
    /// Target template
    pub branch: Branch,
    /// Identity of the yielded item, if the helper supplied one
    pub key: Option<String>,
    /// Values bound to the template's block parameters
    pub args: Vec<Value>,
}

/// What a helper can do with the templates of its block.
///
/// Yields are recorded in order and become the block's items. A yield to a
/// template the block does not have is ignored.
#[derive(Debug, Default)]
pub struct Blocks {
    has_template: bool,
    has_inverse: bool,
    yields: Vec<Yielded>,
}

impl Blocks {
    /// Capability for a block with the given templates
    pub fn new(has_template: bool, has_inverse: bool) -> Self {
        Self {
            has_template,
            has_inverse,
            yields: Vec::new(),
        }
    }

    /// Capability for an inline call: there is nothing to yield to.
    pub fn inline() -> Self {
        Self::default()
    }

    /// Whether the block has a main template
    pub fn has_template(&self) -> bool {
        self.has_template
    }

    /// Whether the block has an `{{else}}` template
    pub fn has_inverse(&self) -> bool {
        self.has_inverse
    }

    /// Render the main template with `args` bound to its block parameters.
    pub fn yield_template(&mut self, args: Vec<Value>) {
        self.push(Branch::Template, None, args);
    }

    /// Render the inverse template.
    pub fn yield_inverse(&mut self, args: Vec<Value>) {
        self.push(Branch::Inverse, None, args);
    }

    /// Render the main template as the item identified by `key`.
    ///
    /// Items keep their nodes across rerenders for as long as their key is
    /// yielded again.
    pub fn yield_keyed(&mut self, key: impl Into<String>, args: Vec<Value>) {
        self.push(Branch::Template, Some(key.into()), args);
    }

    /// The yields recorded so far
    pub fn yields(&self) -> &[Yielded] {
        &self.yields
    }

    pub(crate) fn into_yields(self) -> Vec<Yielded> {
        self.yields
    }

    fn push(&mut self, branch: Branch, key: Option<String>, args: Vec<Value>) {
        let exists = match branch {
            Branch::Template => self.has_template,
            Branch::Inverse => self.has_inverse,
        };
        if exists {
            self.yields.push(Yielded { branch, key, args });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yields_to_missing_templates_are_ignored() {
        let mut blocks = Blocks::new(true, false);
        blocks.yield_inverse(vec![]);
        blocks.yield_template(vec![Value::from(1)]);
        blocks.yield_keyed("a", vec![]);
        let yields = blocks.into_yields();
        assert_eq!(yields.len(), 2);
        assert_eq!(yields[0].branch, Branch::Template);
        assert_eq!(yields[1].key.as_deref(), Some("a"));
    }

    #[test]
    fn test_inline_records_nothing() {
        let mut blocks = Blocks::inline();
        blocks.yield_template(vec![]);
        assert!(blocks.yields().is_empty());
        assert!(!blocks.has_template());
    }
}
