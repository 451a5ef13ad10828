// ── Elements ──
//
// A single record held by identity. Fields live behind a lock so one
// handle can be shared between the store, collections and callers, and
// mutations through `set_field` are visible to all of them.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use checkbook_api::FieldSource;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Notification emitted by [`Element::set_field`] when a value actually changed.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub element: Element,
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Receives field changes of the elements it is subscribed to.
pub trait ChangeObserver: Send + Sync {
    fn field_changed(&self, change: &FieldChange);
}

struct ElementInner {
    fields: RwLock<Map<String, Value>>,
    observers: Mutex<Vec<Arc<dyn ChangeObserver>>>,
}

/// Shared handle to a record. Clones refer to the same record.
#[derive(Clone)]
pub struct Element(Arc<ElementInner>);

impl Element {
    pub fn new() -> Self {
        Self::from_fields(Map::new())
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(Arc::new(ElementInner {
            fields: RwLock::new(fields),
            observers: Mutex::new(Vec::new()),
        }))
    }

    /// Build an element from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(StoreError::NotAnObject {
                found: kind_of(&other).into(),
            }),
        }
    }

    /// Whether both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ── Field access ─────────────────────────────────────────────────

    pub fn get(&self, name: &str) -> Option<Value> {
        self.read().get(name).cloned()
    }

    /// The `id` field, unless absent or null.
    pub fn id(&self) -> Option<Value> {
        self.get("id").filter(|id| !id.is_null())
    }

    /// Snapshot of all fields.
    pub fn fields(&self) -> Map<String, Value> {
        self.read().clone()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields())
    }

    /// Set a field, notifying observers if the value changed.
    ///
    /// An absent field counts as `null`. Observers run synchronously on the
    /// calling thread after the element's locks are released, so they may
    /// read or modify this element. Returns whether the value changed.
    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> bool {
        let new = value.into();
        let old = {
            let mut fields = self
                .0
                .fields
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            fields
                .insert(name.to_owned(), new.clone())
                .unwrap_or(Value::Null)
        };

        if old == new {
            return false;
        }

        let observers = self.observers();
        if !observers.is_empty() {
            let change = FieldChange {
                element: self.clone(),
                field: name.to_owned(),
                old,
                new,
            };
            for observer in observers {
                observer.field_changed(&change);
            }
        }
        true
    }

    /// Copy every field of `fields` into this element through [`set_field`](Self::set_field).
    pub fn assign(&self, fields: Map<String, Value>) {
        for (name, value) in fields {
            self.set_field(&name, value);
        }
    }

    /// A new, unobserved element with the same field values.
    pub fn shallow_copy(&self) -> Element {
        Element::from_fields(self.fields())
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Subscribe `observer`. Subscribing the same observer twice is a no-op.
    pub fn on_change(&self, observer: Arc<dyn ChangeObserver>) {
        let mut observers = self.lock_observers();
        if !observers.iter().any(|o| same_observer(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn off_change(&self, observer: &Arc<dyn ChangeObserver>) {
        self.lock_observers().retain(|o| !same_observer(o, observer));
    }

    pub fn observer_count(&self) -> usize {
        self.lock_observers().len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Map<String, Value>> {
        self.0.fields.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observers(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn ChangeObserver>>> {
        self.0
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> Vec<Arc<dyn ChangeObserver>> {
        self.lock_observers().clone()
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Element").field(&self.fields()).finish()
    }
}

impl FieldSource for Element {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

impl From<Map<String, Value>> for Element {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_fields(fields)
    }
}

fn same_observer(a: &Arc<dyn ChangeObserver>, b: &Arc<dyn ChangeObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
