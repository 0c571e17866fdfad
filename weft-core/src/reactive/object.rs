//! Reactive Objects
//!
//! A [`ReactiveObject`] is a keyed record whose every access goes through
//! the runtime: reads call [`Runtime::track`], writes apply the mutation and
//! then call [`Runtime::trigger`]. It is the observable accessor the core is
//! designed around, provided here so the core can be used without a host.
//!
//! Fields hold a [`Value`], an explicit tag for what kind of slot they are:
//!
//! - [`Value::Plain`]: inert data (`serde_json::Value`). Replacing it is
//!   tracked; its interior is not.
//! - [`Value::Object`]: a nested reactive object with its own tracking.
//! - [`Value::Cell`]: a tracked cell ([`Ref`]). [`ReactiveObject::get_unwrapped`]
//!   reads through it and [`ReactiveObject::set_unwrapped`] writes into it.
//!
//! Besides per-field keys, each object has a key-set slot
//! ([`PropertyKey::Keys`]) read by [`ReactiveObject::keys`] and triggered
//! whenever a field is added or removed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use super::cell::Ref;
use super::key::{ObservableKey, PropertyKey, TargetId};
use super::runtime::Runtime;

/// The content of one field.
#[derive(Clone)]
pub enum Value {
    Plain(Json),
    Object(ReactiveObject),
    Cell(Ref<Value>),
}

impl Value {
    /// The plain data, if this is a plain value.
    pub fn as_plain(&self) -> Option<&Json> {
        match self {
            Self::Plain(json) => Some(json),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&Ref<Value>> {
        match self {
            Self::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    /// Snapshot as JSON without tracking any read.
    ///
    /// Cells are unwrapped. An object reached again while its own snapshot
    /// is still being built renders as `null`.
    pub fn to_json_untracked(&self) -> Json {
        self.snapshot(&mut Vec::new())
    }

    fn snapshot(&self, path: &mut Vec<TargetId>) -> Json {
        match self {
            Self::Plain(json) => json.clone(),
            Self::Object(object) => {
                if path.contains(&object.target_id()) {
                    return Json::Null;
                }
                path.push(object.target_id());
                let fields = object.inner.fields.borrow().clone();
                let map: Map<String, Json> = fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.snapshot(path)))
                    .collect();
                path.pop();
                Json::Object(map)
            }
            Self::Cell(cell) => {
                if path.contains(&cell.target_id()) {
                    return Json::Null;
                }
                path.push(cell.target_id());
                let json = cell.get_untracked().snapshot(path);
                path.pop();
                json
            }
        }
    }
}

/// Plain values compare structurally; objects and cells by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Cell(a), Self::Cell(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(json) => write!(f, "Plain({json})"),
            Self::Object(object) => write!(f, "Object({})", object.target_id()),
            Self::Cell(cell) => write!(f, "Cell({})", cell.target_id()),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self::Plain(json)
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        Self::Object(object)
    }
}

impl From<Ref<Value>> for Value {
    fn from(cell: Ref<Value>) -> Self {
        Self::Cell(cell)
    }
}

macro_rules! plain_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Plain(Json::from(value))
                }
            }
        )*
    };
}

plain_from!(bool, i32, i64, u32, u64, f64, &str, String);

struct ObjectInner {
    target: TargetId,
    fields: RefCell<IndexMap<String, Value>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        Runtime::forget_target(self.target);
    }
}

/// A keyed record with tracked reads and triggering writes.
///
/// Clones share the same record; identity is the [`TargetId`].
#[derive(Clone)]
pub struct ReactiveObject {
    inner: Rc<ObjectInner>,
}

impl ReactiveObject {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                target: TargetId::new(),
                fields: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Build an object from JSON, converting nested JSON objects into nested
    /// reactive objects. Arrays and scalars become plain values.
    ///
    /// A non-object `json` yields an empty object.
    pub fn from_json(json: Json) -> Self {
        let object = Self::new();
        if let Json::Object(map) = json {
            let mut fields = object.inner.fields.borrow_mut();
            for (name, value) in map {
                let value = match value {
                    nested @ Json::Object(_) => Value::Object(Self::from_json(nested)),
                    other => Value::Plain(other),
                };
                fields.insert(name, value);
            }
        }
        object
    }

    /// Get the object's target identity.
    pub fn target_id(&self) -> TargetId {
        self.inner.target
    }

    /// The observable key of field `name`.
    pub fn key(&self, name: &str) -> ObservableKey {
        ObservableKey::new(self.inner.target, name)
    }

    /// Read field `name`, tracking the read even if the field is absent.
    pub fn get(&self, name: &str) -> Option<Value> {
        Runtime::track(&self.key(name));
        self.get_untracked(name)
    }

    pub fn get_untracked(&self, name: &str) -> Option<Value> {
        self.inner.fields.borrow().get(name).cloned()
    }

    /// Read field `name` as plain JSON, if it holds plain data.
    pub fn get_plain(&self, name: &str) -> Option<Json> {
        match self.get(name)? {
            Value::Plain(json) => Some(json),
            _ => None,
        }
    }

    /// Write field `name`, then trigger it.
    ///
    /// Adding a new field also triggers the key-set slot.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let previous = self
            .inner
            .fields
            .borrow_mut()
            .insert(name.to_owned(), value.into());

        Runtime::trigger(&self.key(name));
        if previous.is_none() {
            Runtime::trigger(&ObservableKey::keys(self.inner.target));
        }
    }

    /// Remove field `name`, then trigger it and the key-set slot.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = self.inner.fields.borrow_mut().shift_remove(name);
        if removed.is_some() {
            Runtime::trigger(&self.key(name));
            Runtime::trigger(&ObservableKey::keys(self.inner.target));
        }
        removed
    }

    /// Check for field `name`, tracking it.
    pub fn contains_key(&self, name: &str) -> bool {
        Runtime::track(&self.key(name));
        self.inner.fields.borrow().contains_key(name)
    }

    /// The field names in insertion order, tracking the key set.
    pub fn keys(&self) -> Vec<String> {
        Runtime::track(&ObservableKey::keys(self.inner.target));
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Number of fields, tracking the key set.
    pub fn len(&self) -> usize {
        Runtime::track(&ObservableKey::keys(self.inner.target));
        self.inner.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read field `name`, reading through a cell if it holds one.
    pub fn get_unwrapped(&self, name: &str) -> Option<Value> {
        match self.get(name)? {
            Value::Cell(cell) => Some(cell.get()),
            other => Some(other),
        }
    }

    /// Write field `name`. If it currently holds a cell, the cell is written
    /// and the field keeps pointing at it.
    pub fn set_unwrapped(&self, name: &str, value: impl Into<Value>) {
        match self.get_untracked(name) {
            Some(Value::Cell(cell)) => cell.set(value.into()),
            _ => self.set(name, value),
        }
    }

    /// A handle on field `name` that stays connected to this object.
    pub fn to_ref(&self, name: &str) -> FieldRef {
        FieldRef {
            object: self.clone(),
            name: name.to_owned(),
        }
    }

    /// One [`FieldRef`] per current field.
    pub fn to_refs(&self) -> IndexMap<String, FieldRef> {
        self.keys()
            .into_iter()
            .map(|name| {
                let field = self.to_ref(&name);
                (name, field)
            })
            .collect()
    }

    /// Snapshot as JSON without tracking.
    pub fn snapshot(&self) -> Json {
        Value::Object(self.clone()).to_json_untracked()
    }

    /// Check whether two handles share one object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
            .field("target", &self.inner.target)
            .field("fields", &self.inner.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One field of a [`ReactiveObject`], usable like a cell.
///
/// Reads and writes go to the object, so they stay tracked after the field
/// is handed out on its own.
#[derive(Debug, Clone)]
pub struct FieldRef {
    object: ReactiveObject,
    name: String,
}

impl FieldRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> &ReactiveObject {
        &self.object
    }

    pub fn get(&self) -> Option<Value> {
        self.object.get(&self.name)
    }

    pub fn set(&self, value: impl Into<Value>) {
        self.object.set(&self.name, value);
    }

    /// The observable key this field reads and writes.
    pub fn key(&self) -> ObservableKey {
        ObservableKey::new(self.object.target_id(), PropertyKey::from(self.name.as_str()))
    }
}
