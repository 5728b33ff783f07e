//! References: lazily evaluated, cacheable handles to values reachable by path
//!
//! A [`PathReference`] caches the value it last read and knows, without
//! recomputing, whether that value may be stale. Dirtiness is pushed along
//! chain edges by [`PathReference::notify`] and also pulled: a reference is
//! dirty when its parent is dirty, when its parent produced a new value since
//! the last read, or when the container it points at was mutated in place.
//!
//! Consumers that share an interned reference compare [`Reference::revision`]
//! against the revision they last consumed, so one consumer clearing the dirty
//! flag never hides a change from another.

mod meta;

pub use meta::{Meta, MetaHandle, MetaRegistry};

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::value::{ObjectId, Value};

/// Something that owns resources and can be torn down explicitly.
pub trait Destroyable {
    /// Release the resources held by this handle.
    fn destroy(&self);
}

/// A handle to a value that can tell whether it changed.
pub trait Reference {
    /// Current value, recomputed if the reference is dirty.
    ///
    /// Clears the dirty state.
    fn value(&self) -> Value;

    /// Whether the value may have changed since the last [`value`](Self::value)
    /// call. Never clears anything.
    fn is_dirty(&self) -> bool;

    /// Counter bumped every time a recomputation produced a different value.
    fn revision(&self) -> u64;
}

// ═══════════════════════════════════════════════════════════════════════
// Constant References
// ═══════════════════════════════════════════════════════════════════════

/// A reference to a literal. Never dirty.
#[derive(Debug, Clone)]
pub struct ConstReference(Value);

impl ConstReference {
    /// Wrap a literal value
    pub fn new(value: impl Into<Value>) -> Self {
        ConstReference(value.into())
    }
}

impl Reference for ConstReference {
    fn value(&self) -> Value {
        self.0.clone()
    }

    fn is_dirty(&self) -> bool {
        false
    }

    fn revision(&self) -> u64 {
        1
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Path References
// ═══════════════════════════════════════════════════════════════════════

struct Cache {
    value: Value,
    /// Container revision of `value` when it was read
    token: Option<u64>,
    /// Parent revision the value was derived from
    parent_revision: u64,
    valid: bool,
}

struct PathInner {
    parent: Option<Weak<PathInner>>,
    key: Option<Rc<str>>,
    root_value: RefCell<Value>,
    cache: RefCell<Cache>,
    revision: Cell<u64>,
    dirty: Cell<bool>,
    children: RefCell<HashMap<Rc<str>, PathReference>>,
    chains: RefCell<Vec<(u64, Weak<PathInner>)>>,
    next_chain: Cell<u64>,
    registry: Weak<MetaRegistry>,
    source: Cell<Option<ObjectId>>,
}

/// A reference to the value found by following a property path.
///
/// Cloning the handle shares the reference. Children obtained through
/// [`get`](Self::get) are interned, so the same path from the same root is
/// always the same reference.
#[derive(Clone)]
pub struct PathReference(Rc<PathInner>);

/// A non-owning handle to a [`PathReference`].
#[derive(Clone)]
pub struct WeakPathReference(Weak<PathInner>);

impl PathReference {
    fn new(
        parent: Option<Weak<PathInner>>,
        key: Option<Rc<str>>,
        root_value: Value,
        registry: Weak<MetaRegistry>,
    ) -> Self {
        PathReference(Rc::new(PathInner {
            parent,
            key,
            root_value: RefCell::new(root_value),
            cache: RefCell::new(Cache {
                value: Value::Undefined,
                token: None,
                parent_revision: 0,
                valid: false,
            }),
            revision: Cell::new(0),
            dirty: Cell::new(true),
            children: RefCell::new(HashMap::new()),
            chains: RefCell::new(Vec::new()),
            next_chain: Cell::new(0),
            registry,
            source: Cell::new(None),
        }))
    }

    /// Reference for property `key` of this reference's value.
    ///
    /// Creates the child on first access and chains it to `self`.
    pub fn get(&self, key: &str) -> PathReference {
        if let Some(child) = self.0.children.borrow().get(key) {
            return child.clone();
        }

        let key: Rc<str> = Rc::from(key);
        let child = PathReference::new(
            Some(Rc::downgrade(&self.0)),
            Some(key.clone()),
            Value::Undefined,
            self.0.registry.clone(),
        );
        self.link(&child);
        self.0.children.borrow_mut().insert(key, child.clone());
        child
    }

    /// Follow a sequence of property names.
    pub fn get_path<'a>(&self, parts: impl IntoIterator<Item = &'a str>) -> PathReference {
        parts
            .into_iter()
            .fold(self.clone(), |reference, part| reference.get(part))
    }

    /// The property this reference reads, `None` for roots.
    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    /// Whether this reference has no parent
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Property names from the root down to this reference.
    pub fn path(&self) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = Some(self.0.clone());
        while let Some(inner) = current {
            if let Some(key) = &inner.key {
                parts.push(key.to_string());
            }
            current = inner.parent.as_ref().and_then(Weak::upgrade);
        }
        parts.reverse();
        parts
    }

    /// Register a dependency edge: notifying `self` marks `child` dirty.
    pub fn chain(&self, child: &PathReference) -> ChainHandle {
        let id = self.link(child);
        ChainHandle {
            parent: Rc::downgrade(&self.0),
            id,
        }
    }

    fn link(&self, child: &PathReference) -> u64 {
        let id = self.0.next_chain.get();
        self.0.next_chain.set(id + 1);
        self.0
            .chains
            .borrow_mut()
            .push((id, Rc::downgrade(&child.0)));
        id
    }

    /// Mark this reference and everything chained to it dirty.
    pub fn notify(&self) {
        let mut visited = HashSet::new();
        self.notify_inner(&mut visited);
    }

    fn notify_inner(&self, visited: &mut HashSet<*const PathInner>) {
        if !visited.insert(Rc::as_ptr(&self.0)) {
            return;
        }
        self.0.dirty.set(true);

        let dependents: Vec<PathReference> = {
            let mut chains = self.0.chains.borrow_mut();
            chains.retain(|(_, edge)| edge.strong_count() > 0);
            chains
                .iter()
                .filter_map(|(_, edge)| edge.upgrade().map(PathReference))
                .collect()
        };
        for dependent in dependents {
            dependent.notify_inner(visited);
        }
    }

    /// Number of live chain edges leaving this reference.
    pub fn chain_count(&self) -> usize {
        self.0
            .chains
            .borrow()
            .iter()
            .filter(|(_, edge)| edge.strong_count() > 0)
            .count()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &PathReference) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create a non-owning handle
    pub fn downgrade(&self) -> WeakPathReference {
        WeakPathReference(Rc::downgrade(&self.0))
    }

    /// Whether anything outside the reference graph still holds this
    /// reference or one of its descendants.
    pub(crate) fn is_retained(&self, owners: usize) -> bool {
        Rc::strong_count(&self.0) > owners
            || self
                .0
                .children
                .borrow()
                .values()
                .any(|child| child.is_retained(1))
    }

    fn recompute(&self) -> Value {
        let inner = &self.0;
        let parent = inner.parent.as_ref().map(|parent| parent.upgrade());

        let (value, parent_revision) = match (parent, &inner.key) {
            (Some(Some(parent)), Some(key)) => {
                let parent = PathReference(parent);
                let source = parent.value();
                self.track_source(&source, key);
                (source.get(key), parent.revision())
            }
            // Orphaned: the root this path hung off is gone.
            (Some(None), _) => (Value::Undefined, 0),
            _ => (inner.root_value.borrow().clone(), 0),
        };

        let token = value.container_revision();
        let mut cache = inner.cache.borrow_mut();
        let changed =
            !cache.valid || !cache.value.identical(&value) || cache.token != token;
        if changed {
            inner.revision.set(inner.revision.get() + 1);
        }
        *cache = Cache {
            value: value.clone(),
            token,
            parent_revision,
            valid: true,
        };
        inner.dirty.set(false);
        value
    }

    /// Keep the meta registration in step with the object this reference
    /// actually reads from.
    fn track_source(&self, source: &Value, key: &str) {
        let current = source.as_object().map(|object| object.id());
        let previous = self.0.source.get();
        if current == previous {
            return;
        }
        self.0.source.set(current);

        let Some(registry) = self.0.registry.upgrade() else {
            return;
        };
        if let Some(previous) = previous {
            registry.remove_reference(previous, key, self);
        }
        if let Some(object) = source.as_object() {
            registry.add_reference(object, key, self);
        }
    }
}

impl Reference for PathReference {
    fn value(&self) -> Value {
        if self.is_dirty() {
            self.recompute()
        } else {
            self.0.cache.borrow().value.clone()
        }
    }

    fn is_dirty(&self) -> bool {
        let inner = &self.0;
        if inner.dirty.get() {
            return true;
        }

        let cache = inner.cache.borrow();
        if !cache.valid || cache.value.container_revision() != cache.token {
            return true;
        }

        match inner.parent.as_ref().map(Weak::upgrade) {
            Some(Some(parent)) => {
                let parent = PathReference(parent);
                parent.is_dirty() || parent.revision() != cache.parent_revision
            }
            _ => false,
        }
    }

    fn revision(&self) -> u64 {
        self.0.revision.get()
    }
}

impl Destroyable for PathReference {
    /// Drop every chain edge and child, and leave the meta registry.
    fn destroy(&self) {
        if let (Some(previous), Some(key), Some(registry)) = (
            self.0.source.take(),
            self.0.key.as_deref(),
            self.0.registry.upgrade(),
        ) {
            registry.remove_reference(previous, key, self);
        }
        self.0.chains.borrow_mut().clear();
        self.0.children.borrow_mut().clear();
        self.0.dirty.set(true);
    }
}

impl fmt::Debug for PathReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathReference")
            .field("path", &self.path().join("."))
            .field("revision", &self.revision())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl WeakPathReference {
    /// Recover the reference if it is still alive
    pub fn upgrade(&self) -> Option<PathReference> {
        self.0.upgrade().map(PathReference)
    }

    /// Whether this handle points at `reference`
    pub fn points_to(&self, reference: &PathReference) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&reference.0))
    }

    /// Whether the reference has been dropped
    pub fn is_dead(&self) -> bool {
        self.0.strong_count() == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Root References
// ═══════════════════════════════════════════════════════════════════════

/// The root of a reference graph: a reference that holds its value directly.
#[derive(Clone, Debug)]
pub struct RootReference(PathReference);

impl RootReference {
    /// Create a standalone root that is not tracked by any registry.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_registry(value.into(), Weak::new())
    }

    pub(crate) fn with_registry(value: Value, registry: Weak<MetaRegistry>) -> Self {
        RootReference(PathReference::new(None, None, value, registry))
    }

    /// Re-point the root at a new value and mark every descendant dirty.
    pub fn update(&self, value: impl Into<Value>) {
        *self.0 .0.root_value.borrow_mut() = value.into();
        self.0.notify();
    }

    /// Reference for a sequence of property names
    pub fn reference_from_parts<'a>(
        &self,
        parts: impl IntoIterator<Item = &'a str>,
    ) -> PathReference {
        self.0.get_path(parts)
    }

    /// The root as a plain path reference
    pub fn as_path(&self) -> &PathReference {
        &self.0
    }

    /// The value the root currently points at, without validating anything.
    pub fn current(&self) -> Value {
        self.0 .0.root_value.borrow().clone()
    }
}

impl Deref for RootReference {
    type Target = PathReference;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Reference for RootReference {
    fn value(&self) -> Value {
        self.0.value()
    }

    fn is_dirty(&self) -> bool {
        self.0.is_dirty()
    }

    fn revision(&self) -> u64 {
        self.0.revision()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Chain Edges
// ═══════════════════════════════════════════════════════════════════════

/// Handle to a dependency edge created by [`PathReference::chain`].
#[derive(Debug)]
pub struct ChainHandle {
    parent: Weak<PathInner>,
    id: u64,
}

impl Destroyable for ChainHandle {
    /// Remove the edge. Destroying twice is a no-op.
    fn destroy(&self) {
        if let Some(parent) = self.parent.upgrade() {
            parent
                .chains
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;

    #[test]
    fn test_children_are_interned() {
        let root = RootReference::new(ObjectRef::new().with_field("a", 1));
        assert!(root.get("a").ptr_eq(&root.get("a")));
        assert!(root
            .reference_from_parts(["a", "b"])
            .ptr_eq(&root.get("a").get("b")));
    }

    #[test]
    fn test_path_lists_keys_from_root() {
        let root = RootReference::new(Value::Null);
        let reference = root.get_path(["person", "name", "first"]);
        assert_eq!(reference.path(), vec!["person", "name", "first"]);
        assert_eq!(reference.key(), Some("first"));
        assert!(root.is_root());
        assert!(!reference.is_root());
    }

    #[test]
    fn test_value_clears_dirty() {
        let root = RootReference::new(ObjectRef::new().with_field("a", 1));
        let a = root.get("a");
        assert!(a.is_dirty());
        assert_eq!(a.value(), Value::from(1));
        assert!(!a.is_dirty());
        assert!(!a.is_dirty(), "is_dirty is not destructive");
    }

    #[test]
    fn test_revision_only_moves_on_change() {
        let object = ObjectRef::new().with_field("a", 1).with_field("b", 2);
        let root = RootReference::new(object.clone());
        let a = root.get("a");
        a.value();
        let before = a.revision();

        object.set("b", 3);
        assert!(a.is_dirty());
        a.value();
        assert_eq!(a.revision(), before);

        object.set("a", 5);
        assert_eq!(a.value(), Value::from(5));
        assert_eq!(a.revision(), before + 1);
    }

    #[test]
    fn test_chain_handle_removes_edge() {
        let root = RootReference::new(Value::Null);
        let other = RootReference::new(Value::Null);
        other.value();

        let handle = root.chain(&other);
        root.notify();
        assert!(other.is_dirty());

        other.value();
        handle.destroy();
        root.notify();
        assert!(!other.is_dirty());
    }

    #[test]
    fn test_notify_survives_cycles() {
        let a = RootReference::new(Value::Null);
        let b = RootReference::new(Value::Null);
        let _ab = a.chain(&b);
        let _ba = b.chain(&a);
        a.value();
        b.value();
        a.notify();
        assert!(a.is_dirty());
        assert!(b.is_dirty());
    }

    #[test]
    fn test_const_reference() {
        let reference = ConstReference::new("x");
        assert!(!reference.is_dirty());
        assert_eq!(reference.value(), Value::from("x"));
    }
}
