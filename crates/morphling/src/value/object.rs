//! Shared container types: objects and lists

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::display::Visit;
use super::Value;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a container, assigned when it is created.
///
/// This is the handle the meta registry indexes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric identity
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ObjectData {
    id: ObjectId,
    fields: RefCell<IndexMap<String, Value>>,
    revision: Cell<u64>,
}

/// A shared object with named fields.
///
/// Cloning the handle shares the object. Every mutation bumps the object's
/// revision, which is how references notice changes made behind their back.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectData>);

/// A non-owning handle to an [`ObjectRef`].
#[derive(Clone)]
pub struct WeakObjectRef {
    id: ObjectId,
    data: Weak<ObjectData>,
}

impl ObjectRef {
    /// Create an empty object
    pub fn new() -> Self {
        ObjectRef(Rc::new(ObjectData {
            id: ObjectId::next(),
            fields: RefCell::new(IndexMap::new()),
            revision: Cell::new(0),
        }))
    }

    /// Create an object from `(name, value)` pairs
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let object = Self::new();
        {
            let mut map = object.0.fields.borrow_mut();
            for (name, value) in fields {
                map.insert(name.into(), value.into());
            }
        }
        object
    }

    /// Add a field (builder pattern)
    pub fn with_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// The object's stable identity
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// The number of mutations applied so far
    pub fn revision(&self) -> u64 {
        self.0.revision.get()
    }

    /// Read a field, `Undefined` if missing
    pub fn get(&self, name: &str) -> Value {
        self.0
            .fields
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Whether the field exists
    pub fn contains(&self, name: &str) -> bool {
        self.0.fields.borrow().contains_key(name)
    }

    /// Write a field
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.fields.borrow_mut().insert(name.into(), value.into());
        self.bump();
    }

    /// Remove a field, returning its previous value
    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = self.0.fields.borrow_mut().shift_remove(name);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Field names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.0.fields.borrow().keys().cloned().collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    /// Whether the object has no fields
    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create a non-owning handle
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef {
            id: self.0.id,
            data: Rc::downgrade(&self.0),
        }
    }

    fn bump(&self) {
        self.0.revision.set(self.0.revision.get() + 1);
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_visit) = Visit::enter(self.id()) else {
            return write!(f, "{{...}}");
        };
        let fields = self.0.fields.borrow();
        let mut map = f.debug_map();
        for (name, value) in fields.iter() {
            map.entry(name, value);
        }
        map.finish()
    }
}

impl WeakObjectRef {
    /// Identity of the object this handle points at
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Recover the object if it is still alive
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.data.upgrade().map(ObjectRef)
    }

    /// Whether the object has been dropped
    pub fn is_dead(&self) -> bool {
        self.data.strong_count() == 0
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakObjectRef({})", self.id)
    }
}

struct ListData {
    id: ObjectId,
    items: RefCell<Vec<Value>>,
    revision: Cell<u64>,
}

/// A shared, in-place mutable list.
#[derive(Clone)]
pub struct ListRef(Rc<ListData>);

impl ListRef {
    /// Create an empty list
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create a list that takes ownership of `items`
    pub fn from_vec(items: Vec<Value>) -> Self {
        ListRef(Rc::new(ListData {
            id: ObjectId::next(),
            items: RefCell::new(items),
            revision: Cell::new(0),
        }))
    }

    /// The list's stable identity
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// The number of mutations applied so far
    pub fn revision(&self) -> u64 {
        self.0.revision.get()
    }

    /// Item at `index`, `Undefined` when out of bounds
    pub fn get(&self, index: usize) -> Value {
        self.0
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Snapshot of the current items
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Append an item
    pub fn push(&self, value: impl Into<Value>) {
        self.0.items.borrow_mut().push(value.into());
        self.bump();
    }

    /// Remove and return the last item
    pub fn pop(&self) -> Option<Value> {
        let popped = self.0.items.borrow_mut().pop();
        if popped.is_some() {
            self.bump();
        }
        popped
    }

    /// Insert an item at `index` (clamped to the list length)
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        {
            let mut items = self.0.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, value.into());
        }
        self.bump();
    }

    /// Remove the item at `index`
    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Overwrite the item at `index`; out-of-bounds writes are ignored
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let written = {
            let mut items = self.0.items.borrow_mut();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = value.into();
                    true
                }
                None => false,
            }
        };
        if written {
            self.bump();
        }
    }

    /// Replace the whole contents
    pub fn replace(&self, items: Vec<Value>) {
        *self.0.items.borrow_mut() = items;
        self.bump();
    }

    /// Reverse the items in place
    pub fn reverse(&self) {
        self.0.items.borrow_mut().reverse();
        self.bump();
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn bump(&self) {
        self.0.revision.set(self.0.revision.get() + 1);
    }
}

impl Default for ListRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_visit) = Visit::enter(self.id()) else {
            return write!(f, "[...]");
        };
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}
