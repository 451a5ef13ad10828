// ── Collections ──
//
// An ordered list of elements plus the attributes of the list view it
// was fetched from (e.g. `monthid` and `category` of a per-month list).
// Membership is by identity, never by value.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use checkbook_api::FieldSource;
use serde_json::{Map, Value};

use super::element::Element;

struct CollectionInner {
    attributes: RwLock<Map<String, Value>>,
    members: RwLock<Vec<Element>>,
}

/// Shared handle to a list of elements. Clones refer to the same list.
#[derive(Clone)]
pub struct Collection(Arc<CollectionInner>);

impl Collection {
    pub fn new() -> Self {
        Self::with_members(Map::new(), Vec::new())
    }

    pub fn with_members(attributes: Map<String, Value>, members: Vec<Element>) -> Self {
        Self(Arc::new(CollectionInner {
            attributes: RwLock::new(attributes),
            members: RwLock::new(members),
        }))
    }

    pub fn from_members(members: impl IntoIterator<Item = Element>) -> Self {
        Self::with_members(Map::new(), members.into_iter().collect())
    }

    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ── Attributes ───────────────────────────────────────────────────

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.attrs().get(name).cloned()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        self.attrs().clone()
    }

    pub fn set_attribute(&self, name: &str, value: impl Into<Value>) {
        self.0
            .attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), value.into());
    }

    // ── Members ──────────────────────────────────────────────────────

    /// Snapshot of the current members, in order.
    pub fn members(&self) -> Vec<Element> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, element: &Element) -> bool {
        self.read().iter().any(|m| m.ptr_eq(element))
    }

    /// Append `element` unless it is already a member. Returns whether it was added.
    pub fn push_unique(&self, element: Element) -> bool {
        let mut members = self.write();
        if members.iter().any(|m| m.ptr_eq(&element)) {
            return false;
        }
        members.push(element);
        true
    }

    /// Remove the first occurrence of `element`. Returns whether it was a member.
    pub fn remove_member(&self, element: &Element) -> bool {
        let mut members = self.write();
        match members.iter().position(|m| m.ptr_eq(element)) {
            Some(index) => {
                members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace the member at `index`. Out-of-range indices are ignored.
    pub fn replace_at(&self, index: usize, element: Element) {
        if let Some(slot) = self.write().get_mut(index) {
            *slot = element;
        }
    }

    /// Member values as a JSON array.
    pub fn to_value(&self) -> Value {
        Value::Array(self.read().iter().map(Element::to_value).collect())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn attrs(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.0
            .attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Element>> {
        self.0.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Element>> {
        self.0
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("attributes", &self.attributes())
            .field("members", &self.members())
            .finish()
    }
}

/// Collection attributes feed URL expansion, the same way element fields do.
impl FieldSource for Collection {
    fn field(&self, name: &str) -> Option<Value> {
        self.attribute(name)
    }
}
