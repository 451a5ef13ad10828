// ── Items ──
//
// What a store holds: a single element or a collection of elements.
// Raw JSON is classified with the store's collection predicate.

use std::sync::Arc;

use serde_json::Value;

use super::collection::Collection;
use super::element::{Element, kind_of};
use crate::error::StoreError;

/// Decides whether a raw JSON value describes a collection.
pub type CollectionPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// An element or a collection.
#[derive(Debug, Clone)]
pub enum Item {
    Element(Element),
    Collection(Collection),
}

impl Item {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(c) => Some(c),
            Self::Element(_) => None,
        }
    }

    pub fn into_element(self) -> Option<Element> {
        match self {
            Self::Element(e) => Some(e),
            Self::Collection(_) => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Self::Collection(c) => Some(c),
            Self::Element(_) => None,
        }
    }

    /// Whether both items are the same object.
    pub fn ptr_eq(&self, other: &Item) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => a.ptr_eq(b),
            (Self::Collection(a), Self::Collection(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Element(e) => e.to_value(),
            Self::Collection(c) => c.to_value(),
        }
    }
}

impl From<Element> for Item {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Collection> for Item {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

/// Conversion into a storable [`Item`].
///
/// Typed items convert as they are. Raw JSON goes through the store's
/// collection predicate and fails for scalars.
pub trait IntoItem {
    fn into_item(self, is_collection: &dyn Fn(&Value) -> bool) -> Result<Item, StoreError>;
}

impl IntoItem for Item {
    fn into_item(self, _: &dyn Fn(&Value) -> bool) -> Result<Item, StoreError> {
        Ok(self)
    }
}

impl IntoItem for Element {
    fn into_item(self, _: &dyn Fn(&Value) -> bool) -> Result<Item, StoreError> {
        Ok(Item::Element(self))
    }
}

impl IntoItem for Collection {
    fn into_item(self, _: &dyn Fn(&Value) -> bool) -> Result<Item, StoreError> {
        Ok(Item::Collection(self))
    }
}

impl IntoItem for Value {
    fn into_item(self, is_collection: &dyn Fn(&Value) -> bool) -> Result<Item, StoreError> {
        if !(self.is_object() || self.is_array()) {
            return Err(StoreError::NotAnObject {
                found: kind_of(&self).into(),
            });
        }

        match (is_collection(&self), self) {
            (true, Value::Array(values)) => {
                let members = values
                    .into_iter()
                    .map(Element::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Item::Collection(Collection::from_members(members)))
            }
            (false, Value::Object(fields)) => Ok(Item::Element(Element::from_fields(fields))),
            (_, other) => Err(StoreError::Unclassifiable {
                found: kind_of(&other).into(),
            }),
        }
    }
}

impl IntoItem for &str {
    fn into_item(self, _: &dyn Fn(&Value) -> bool) -> Result<Item, StoreError> {
        Err(StoreError::NotAnObject {
            found: "a string".into(),
        })
    }
}

/// The default predicate: JSON arrays are collections.
pub fn is_array(value: &Value) -> bool {
    value.is_array()
}
