//! Lexical scope for block parameters

use std::rc::Rc;

use crate::reference::{PathReference, RootReference};

/// A block parameter bound to its root reference.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The parameter name (`item` in `as |item|`)
    pub name: Rc<str>,

    /// The reference the parameter reads through
    pub reference: RootReference,
}

/// The names visible to a template: the self context plus the block
/// parameters of every enclosing block.
///
/// Uses a flat binding list with frame boundaries. Lookups search from the
/// innermost binding outwards, so inner parameters shadow outer ones.
///
/// # Example
///
/// ```
/// use morphling::{RootReference, Scope, Value};
///
/// let mut scope = Scope::new(RootReference::new(Value::Null));
/// scope.define("item", RootReference::new("outer"));
///
/// scope.push_frame();
/// scope.define("item", RootReference::new("inner"));
/// assert_eq!(scope.lookup("item").map(|r| r.current()), Some(Value::from("inner")));
///
/// scope.pop_frame();
/// assert_eq!(scope.lookup("item").map(|r| r.current()), Some(Value::from("outer")));
/// ```
#[derive(Debug, Clone)]
pub struct Scope {
    self_ref: RootReference,
    bindings: Vec<Binding>,
    frames: Vec<usize>,
}

impl Scope {
    /// A scope whose self context is `self_ref`, with no parameters.
    pub fn new(self_ref: RootReference) -> Self {
        Self {
            self_ref,
            bindings: Vec::new(),
            frames: vec![0],
        }
    }

    /// The self context
    pub fn self_ref(&self) -> &RootReference {
        &self.self_ref
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a block: bindings defined after this are dropped by the
    /// matching [`pop_frame`](Self::pop_frame).
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Leave a block. The outermost frame is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            if let Some(boundary) = self.frames.pop() {
                self.bindings.truncate(boundary);
            }
        }
    }

    /// Number of frames, including the outermost one
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Enter a frame that is popped when the guard drops.
    pub fn scope_guard(&mut self) -> ScopeGuard<'_> {
        self.push_frame();
        ScopeGuard { scope: self }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Bindings
    // ═══════════════════════════════════════════════════════════════════

    /// Bind `name` in the current frame, shadowing outer bindings.
    pub fn define(&mut self, name: impl Into<Rc<str>>, reference: RootReference) {
        self.bindings.push(Binding {
            name: name.into(),
            reference,
        });
    }

    /// The innermost binding for `name`.
    pub fn lookup(&self, name: &str) -> Option<&RootReference> {
        self.bindings
            .iter()
            .rev()
            .find(|binding| &*binding.name == name)
            .map(|binding| &binding.reference)
    }

    /// Whether any frame binds `name`
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Names bound in the innermost frame
    pub fn names_in_current_frame(&self) -> Vec<&str> {
        let start = *self.frames.last().unwrap_or(&0);
        self.bindings[start..]
            .iter()
            .map(|binding| &*binding.name)
            .collect()
    }

    /// Resolve a path expression to a reference.
    ///
    /// `this` names the self context; a leading block parameter is read
    /// through its binding; anything else is read from the self context.
    pub fn resolve(&self, parts: &[String]) -> PathReference {
        let rest = |skip: usize| parts[skip..].iter().map(String::as_str);
        match parts.first().map(String::as_str) {
            None => self.self_ref.as_path().clone(),
            Some("this") => self.self_ref.get_path(rest(1)),
            Some(head) => match self.lookup(head) {
                Some(binding) => binding.get_path(rest(1)),
                None => self.self_ref.get_path(rest(0)),
            },
        }
    }
}

/// Pops its frame when dropped.
pub struct ScopeGuard<'a> {
    scope: &'a mut Scope,
}

impl<'a> Drop for ScopeGuard<'a> {
    fn drop(&mut self) {
        self.scope.pop_frame();
    }
}

impl<'a> std::ops::Deref for ScopeGuard<'a> {
    type Target = Scope;

    fn deref(&self) -> &Self::Target {
        self.scope
    }
}

impl<'a> std::ops::DerefMut for ScopeGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;
    use crate::value::{ObjectRef, Value};

    fn scope() -> Scope {
        let context = ObjectRef::new()
            .with_field("name", "self")
            .with_field("item", "from self");
        Scope::new(RootReference::new(context))
    }

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_guard_pops_frame() {
        let mut scope = scope();
        {
            let mut guard = scope.scope_guard();
            guard.define("item", RootReference::new("bound"));
            assert_eq!(guard.depth(), 2);
            assert!(guard.contains("item"));
        }
        assert_eq!(scope.depth(), 1);
        assert!(!scope.contains("item"));
    }

    #[test]
    fn test_outer_frame_is_never_popped() {
        let mut scope = scope();
        scope.define("a", RootReference::new(1));
        scope.pop_frame();
        assert_eq!(scope.depth(), 1);
        assert!(scope.contains("a"));
    }

    #[test]
    fn test_resolve_prefers_block_params() {
        let mut scope = scope();
        let item = ObjectRef::new().with_field("name", "param");
        scope.define("item", RootReference::new(item));

        assert_eq!(
            scope.resolve(&strings(&["item", "name"])).value(),
            Value::from("param")
        );
        assert_eq!(scope.resolve(&strings(&["name"])).value(), Value::from("self"));
        assert_eq!(
            scope.resolve(&strings(&["this", "item"])).value(),
            Value::from("from self")
        );
    }

    #[test]
    fn test_resolve_empty_path_is_self() {
        let scope = scope();
        assert!(scope.resolve(&[]).ptr_eq(scope.self_ref()));
    }

    #[test]
    fn test_names_in_current_frame() {
        let mut scope = scope();
        scope.define("outer", RootReference::new(1));
        scope.push_frame();
        scope.define("inner", RootReference::new(2));
        assert_eq!(scope.names_in_current_frame(), vec!["inner"]);
    }
}
