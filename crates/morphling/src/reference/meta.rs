//! Per-object bookkeeping for reference graphs
//!
//! The registry is an arena of [`Meta`] records looked up by the stable
//! [`ObjectId`] every container carries. Records hold their object weakly;
//! only a record's root reference keeps the object alive. Records nothing
//! reads through any more are reclaimed by [`MetaRegistry::sweep`], which
//! renders run after every pass.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::{PathReference, RootReference, WeakPathReference};
use crate::value::{ObjectId, ObjectRef, Value, WeakObjectRef};

/// Stable handle to a record in a [`MetaRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaHandle(usize);

/// Reference bookkeeping for one object.
pub struct Meta {
    object: WeakObjectRef,
    root: Option<RootReference>,
    references: HashMap<String, Vec<WeakPathReference>>,
    slots: HashMap<String, Rc<dyn Any>>,
}

impl Meta {
    fn new(object: &ObjectRef) -> Self {
        Self {
            object: object.downgrade(),
            root: None,
            references: HashMap::new(),
            slots: HashMap::new(),
        }
    }

    /// Identity of the object this record describes
    pub fn identity(&self) -> ObjectId {
        self.object.id()
    }

    /// The object, if it is still alive
    pub fn object(&self) -> Option<ObjectRef> {
        self.object.upgrade()
    }

    /// The root reference, if one has been requested
    pub fn root(&self) -> Option<&RootReference> {
        self.root.as_ref()
    }

    /// Live references that read `property` from this object
    pub fn references_for(&self, property: &str) -> Vec<PathReference> {
        self.references
            .get(property)
            .map(|set| set.iter().filter_map(WeakPathReference::upgrade).collect())
            .unwrap_or_default()
    }

    /// Names of properties with at least one registered reference
    pub fn tracked_properties(&self) -> Vec<&str> {
        self.references
            .iter()
            .filter(|(_, set)| set.iter().any(|r| !r.is_dead()))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Extension slot used by higher-level features
    pub fn slot(&self, name: &str) -> Option<Rc<dyn Any>> {
        self.slots.get(name).cloned()
    }

    fn add_reference(&mut self, property: &str, reference: &PathReference) {
        let set = self.references.entry(property.to_string()).or_default();
        set.retain(|r| !r.is_dead());
        if !set.iter().any(|r| r.points_to(reference)) {
            set.push(reference.downgrade());
        }
    }

    fn remove_reference(&mut self, property: &str, reference: &PathReference) {
        if let Some(set) = self.references.get_mut(property) {
            set.retain(|r| !r.is_dead() && !r.points_to(reference));
            if set.is_empty() {
                self.references.remove(property);
            }
        }
    }

    fn is_unused(&self) -> bool {
        if self.object.is_dead() {
            return true;
        }
        let root_unused = self.root.as_ref().map_or(true, |root| !root.is_retained(1));
        // A registered reference is owned by its parent's child table; the
        // upgrade below is the second owner.
        let references_unused = self.references.values().all(|set| {
            set.iter()
                .all(|r| r.upgrade().map_or(true, |r| !r.is_retained(2)))
        });
        root_unused && references_unused && self.slots.is_empty()
    }
}

/// Identity-keyed registry of [`Meta`] records.
///
/// Lookups are idempotent: asking twice for the same object yields the same
/// record, the same root reference and the same interned path references.
///
/// ```
/// use morphling::{MetaRegistry, ObjectRef, Reference, Value};
///
/// let registry = MetaRegistry::new();
/// let person = ObjectRef::new().with_field("name", "Tom");
///
/// let name = registry.get(&person, "name");
/// assert!(name.ptr_eq(&registry.get(&person, "name")));
/// assert_eq!(name.value(), Value::from("Tom"));
///
/// person.set("name", "Yehuda");
/// assert!(name.is_dirty());
/// assert_eq!(name.value(), Value::from("Yehuda"));
/// ```
pub struct MetaRegistry {
    this: Weak<MetaRegistry>,
    records: RefCell<Vec<Option<Meta>>>,
    index: RefCell<HashMap<ObjectId, MetaHandle>>,
    free: RefCell<Vec<usize>>,
}

impl MetaRegistry {
    /// Create an empty registry.
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| MetaRegistry {
            this: this.clone(),
            records: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
            free: RefCell::new(Vec::new()),
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Handle of the object's record, creating the record if absent.
    pub fn meta_for(&self, object: &ObjectRef) -> MetaHandle {
        if let Some(handle) = self.index.borrow().get(&object.id()) {
            return *handle;
        }

        let meta = Meta::new(object);
        let mut records = self.records.borrow_mut();
        let handle = match self.free.borrow_mut().pop() {
            Some(slot) => {
                records[slot] = Some(meta);
                MetaHandle(slot)
            }
            None => {
                records.push(Some(meta));
                MetaHandle(records.len() - 1)
            }
        };
        self.index.borrow_mut().insert(object.id(), handle);
        trace!(object = %object.id(), slot = handle.0, "created meta");
        handle
    }

    /// Whether the object has a record
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.index.borrow().contains_key(&object.id())
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.index.borrow().len()
    }

    /// Whether the registry holds no records
    pub fn is_empty(&self) -> bool {
        self.index.borrow().is_empty()
    }

    /// Run `f` against the object's record, if there is one.
    pub fn with_meta<R>(&self, object: &ObjectRef, f: impl FnOnce(&Meta) -> R) -> Option<R> {
        let handle = *self.index.borrow().get(&object.id())?;
        let records = self.records.borrow();
        records[handle.0].as_ref().map(f)
    }

    fn with_meta_mut<R>(&self, handle: MetaHandle, f: impl FnOnce(&mut Meta) -> R) -> Option<R> {
        let mut records = self.records.borrow_mut();
        records.get_mut(handle.0).and_then(Option::as_mut).map(f)
    }

    // ═══════════════════════════════════════════════════════════════════
    // References
    // ═══════════════════════════════════════════════════════════════════

    /// The object's root reference, created on first request.
    pub fn root(&self, object: &ObjectRef) -> RootReference {
        let handle = self.meta_for(object);
        let existing = self.with_meta_mut(handle, |meta| meta.root.clone()).flatten();
        if let Some(root) = existing {
            return root;
        }

        let root = RootReference::with_registry(Value::Object(object.clone()), self.this.clone());
        self.with_meta_mut(handle, |meta| meta.root = Some(root.clone()));
        root
    }

    /// Interned reference for a dotted `path` from `object`.
    ///
    /// An empty path is the root itself.
    pub fn get(&self, object: &ObjectRef, path: &str) -> PathReference {
        self.root(object)
            .get_path(path.split('.').filter(|part| !part.is_empty()))
    }

    /// A root for a value that is not itself a tracked context, such as a
    /// block parameter. Paths below it still register with this registry.
    pub fn detached_root(&self, value: impl Into<Value>) -> RootReference {
        RootReference::with_registry(value.into(), self.this.clone())
    }

    /// Live references reading `property` from `object`.
    pub fn references_for(&self, object: &ObjectRef, property: &str) -> Vec<PathReference> {
        self.with_meta(object, |meta| meta.references_for(property))
            .unwrap_or_default()
    }

    /// Register `reference` as reading `property` from `object`.
    pub fn add_reference(&self, object: &ObjectRef, property: &str, reference: &PathReference) {
        let handle = self.meta_for(object);
        self.with_meta_mut(handle, |meta| meta.add_reference(property, reference));
    }

    /// Forget that `reference` reads `property` from the object `id`.
    pub fn remove_reference(&self, id: ObjectId, property: &str, reference: &PathReference) {
        let Some(handle) = self.index.borrow().get(&id).copied() else {
            return;
        };
        self.with_meta_mut(handle, |meta| meta.remove_reference(property, reference));
    }

    // ═══════════════════════════════════════════════════════════════════
    // Notification
    // ═══════════════════════════════════════════════════════════════════

    /// Mark every reference reading `property` from `object` dirty, along
    /// with everything chained to them.
    pub fn notify(&self, object: &ObjectRef, property: &str) {
        let references = self.references_for(object, property);
        trace!(object = %object.id(), property, count = references.len(), "notify");
        for reference in references {
            reference.notify();
        }
    }

    /// Write a property and notify its references.
    pub fn set(&self, object: &ObjectRef, property: &str, value: impl Into<Value>) {
        object.set(property, value);
        self.notify(object, property);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extension Slots
    // ═══════════════════════════════════════════════════════════════════

    /// Read an extension slot
    pub fn slot(&self, object: &ObjectRef, name: &str) -> Option<Rc<dyn Any>> {
        self.with_meta(object, |meta| meta.slot(name)).flatten()
    }

    /// Write an extension slot
    pub fn set_slot(&self, object: &ObjectRef, name: &str, value: Rc<dyn Any>) {
        let handle = self.meta_for(object);
        self.with_meta_mut(handle, |meta| {
            meta.slots.insert(name.to_string(), value);
        });
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lifetime
    // ═══════════════════════════════════════════════════════════════════

    /// Re-point `root` at `object` and make it the new object's root.
    ///
    /// If `root` was the previous object's interned root, that record lets
    /// go of it and is released when nothing else uses it. The new object
    /// adopts `root` unless its record already has a root that someone
    /// holds. Records other holders rely on are never re-keyed or released.
    /// Path references under the root re-register against the objects they
    /// read from on their next evaluation.
    pub fn rebind(&self, root: &RootReference, object: &ObjectRef) {
        let previous = root.current().as_object().map(ObjectRef::id);
        root.update(Value::Object(object.clone()));
        if previous == Some(object.id()) {
            return;
        }

        let previous_handle =
            previous.and_then(|id| self.index.borrow().get(&id).copied());
        if let (Some(id), Some(handle)) = (previous, previous_handle) {
            let unused = self
                .with_meta_mut(handle, |meta| {
                    if !meta.root.as_ref().is_some_and(|r| r.ptr_eq(root)) {
                        return false;
                    }
                    meta.root = None;
                    meta.is_unused()
                })
                .unwrap_or(false);
            if unused {
                self.release_id(id);
            }
        }

        let handle = self.meta_for(object);
        let (adopted, displaced) = self
            .with_meta_mut(handle, |meta| {
                let taken = meta
                    .root
                    .as_ref()
                    .is_some_and(|existing| !existing.ptr_eq(root) && existing.is_retained(1));
                if taken {
                    (false, None)
                } else {
                    (true, meta.root.replace(root.clone()))
                }
            })
            .unwrap_or((false, None));
        // Dropped outside of the registry borrows.
        drop(displaced);
        debug!(from = ?previous, to = %object.id(), adopted, "rebound root reference");
    }

    /// Drop the object's record. Returns whether there was one.
    pub fn release(&self, object: &ObjectRef) -> bool {
        self.release_id(object.id())
    }

    /// Drop the record for `id`. Returns whether there was one.
    pub fn release_id(&self, id: ObjectId) -> bool {
        let Some(handle) = self.index.borrow_mut().remove(&id) else {
            return false;
        };
        let meta = self.records.borrow_mut()[handle.0].take();
        self.free.borrow_mut().push(handle.0);
        trace!(object = %id, "released meta");
        // Dropped outside of the registry borrows.
        drop(meta);
        true
    }

    /// Drop every record whose object is gone or that nothing uses any more.
    /// Returns how many were released.
    pub fn sweep(&self) -> usize {
        let unused: Vec<ObjectId> = {
            let records = self.records.borrow();
            records
                .iter()
                .flatten()
                .filter(|meta| meta.is_unused())
                .map(Meta::identity)
                .collect()
        };
        let released = unused.into_iter().filter(|id| self.release_id(*id)).count();
        if released > 0 {
            debug!(released, remaining = self.len(), "swept meta registry");
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;

    #[test]
    fn test_meta_for_is_idempotent() {
        let registry = MetaRegistry::new();
        let object = ObjectRef::new();
        let a = registry.meta_for(&object);
        let b = registry.meta_for(&object);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_root_is_shared() {
        let registry = MetaRegistry::new();
        let object = ObjectRef::new();
        assert!(registry.root(&object).ptr_eq(&registry.root(&object)));
    }

    #[test]
    fn test_released_slots_are_reused() {
        let registry = MetaRegistry::new();
        let a = ObjectRef::new();
        let b = ObjectRef::new();
        let handle = registry.meta_for(&a);
        assert!(registry.release(&a));
        assert!(!registry.release(&a));
        assert_eq!(registry.meta_for(&b), handle);
    }

    #[test]
    fn test_evaluation_registers_reference() {
        let registry = MetaRegistry::new();
        let object = ObjectRef::new().with_field("value", 1);
        let reference = registry.get(&object, "value");
        assert!(registry.references_for(&object, "value").is_empty());

        reference.value();
        let registered = registry.references_for(&object, "value");
        assert_eq!(registered.len(), 1);
        assert!(registered[0].ptr_eq(&reference));
    }

    #[test]
    fn test_sweep_keeps_retained_roots() {
        let registry = MetaRegistry::new();
        let object = ObjectRef::new().with_field("value", 1);
        let reference = registry.get(&object, "value");
        reference.value();
        assert_eq!(registry.sweep(), 0);

        drop(reference);
        assert_eq!(registry.sweep(), 1);
        assert!(registry.is_empty());
    }
}
