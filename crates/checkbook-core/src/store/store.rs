// ── Reconciling key-value store ──
//
// Holds elements and collections under string keys and keeps every stored
// collection in step with the stored elements that belong to it. Keys may
// depend on watched fields; a change to one of those re-files the element.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::collection::Collection;
use super::element::{ChangeObserver, Element, FieldChange};
use super::item::{CollectionPredicate, IntoItem, Item, is_array};
use crate::error::StoreError;

type KeyFn = Arc<dyn Fn(&Item) -> String + Send + Sync>;
type CollectionKeyFn = Arc<dyn Fn(&Collection) -> String + Send + Sync>;
type AssociateFn = Arc<dyn Fn(&Element) -> Vec<String> + Send + Sync>;

struct StoreInner {
    items: DashMap<String, Item>,
    key_fn: KeyFn,
    collection_key_fn: CollectionKeyFn,
    associate_fn: AssociateFn,
    /// `None` when no fields are watched.
    watched: Option<HashSet<String>>,
    is_collection: CollectionPredicate,
    /// The single observer this store subscribes to stored elements.
    listener: Arc<dyn ChangeObserver>,
    version: watch::Sender<u64>,
}

/// Forwards element changes to the store that subscribed it.
struct StoreListener {
    store: Weak<StoreInner>,
}

impl ChangeObserver for StoreListener {
    fn field_changed(&self, change: &FieldChange) {
        if let Some(inner) = self.store.upgrade() {
            Store(inner).on_item_changed(change);
        }
    }
}

/// Key-indexed store of elements and collections.
///
/// After every public operation:
///
/// - every stored collection contains (by identity) each stored element
///   whose associations name that collection's key
/// - removing an element removes it from the stored collections it is
///   associated with; removing a collection leaves its elements alone
/// - a key holds at most one item; putting under an occupied key replaces
///   the occupant without cleaning up after it
///
/// Cloning a `Store` yields another handle to the same items. Operations
/// never hold a map guard while calling key functions, observers or other
/// store methods, so re-entrant calls from change handlers are safe.
#[derive(Clone)]
pub struct Store(Arc<StoreInner>);

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Put `item` under the key derived from it.
    pub fn put(&self, item: impl IntoItem) -> Result<(), StoreError> {
        let item = self.classify(item)?;
        let key = self.key_of(&item);
        self.insert(key, item);
        Ok(())
    }

    /// Put `item` under an explicit key.
    pub fn put_at(&self, key: impl Into<String>, item: impl IntoItem) -> Result<(), StoreError> {
        let item = self.classify(item)?;
        self.insert(key.into(), item);
        Ok(())
    }

    /// Remove the item under `key`, returning it.
    ///
    /// An element is unsubscribed and taken out of every stored collection
    /// its current field values associate it with.
    pub fn remove(&self, key: &str) -> Option<Item> {
        let (_, item) = self.0.items.remove(key)?;
        debug!(key, collection = item.is_collection(), "store remove");

        if let Item::Element(element) = &item {
            let associated = (self.0.associate_fn)(element);
            self.detach(element, &associated);
        }
        self.bump_version();
        Some(item)
    }

    /// Re-file an element after one of its watched fields changed.
    ///
    /// The key the element was filed under is recovered by resetting the
    /// field to its old value on a detached copy. Nothing happens unless
    /// that key is occupied.
    pub fn on_item_changed(&self, change: &FieldChange) {
        let Some(watched) = &self.0.watched else {
            return;
        };
        if !watched.contains(&change.field) {
            return;
        }

        let former = change.element.shallow_copy();
        former.set_field(&change.field, change.old.clone());
        let former_key = (self.0.key_fn)(&Item::Element(former.clone()));

        let Some((_, occupant)) = self.0.items.remove(&former_key) else {
            trace!(key = %former_key, field = %change.field, "changed element not stored");
            return;
        };
        debug!(key = %former_key, field = %change.field, "re-filing changed element");

        if let Item::Element(occupant) = &occupant {
            // The changed element was listed where its former values placed it.
            let associated = if occupant.ptr_eq(&change.element) {
                (self.0.associate_fn)(&former)
            } else {
                (self.0.associate_fn)(occupant)
            };
            self.detach(occupant, &associated);
        }
        self.bump_version();

        let item = Item::Element(change.element.clone());
        let key = (self.0.key_fn)(&item);
        self.insert(key, item);
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<Item> {
        self.0.items.get(key).map(|r| r.value().clone())
    }

    pub fn get_element(&self, key: &str) -> Option<Element> {
        self.get(key).and_then(Item::into_element)
    }

    pub fn get_collection(&self, key: &str) -> Option<Collection> {
        self.get(key).and_then(Item::into_collection)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.items.contains_key(key)
    }

    /// The key `item` would be stored under by [`put`](Self::put).
    pub fn key_of(&self, item: &Item) -> String {
        match item {
            Item::Collection(collection) => (self.0.collection_key_fn)(collection),
            Item::Element(_) => (self.0.key_fn)(item),
        }
    }

    pub fn len(&self) -> usize {
        self.0.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.items.iter().map(|r| r.key().clone()).collect()
    }

    /// Whether elements are re-filed when `field` changes.
    pub fn watches(&self, field: &str) -> bool {
        self.0.watched.as_ref().is_some_and(|w| w.contains(field))
    }

    /// Mutation counter, bumped by every put, remove and re-filing.
    pub fn version(&self) -> u64 {
        *self.0.version.borrow()
    }

    /// Receiver that observes every version bump.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.version.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn classify(&self, item: impl IntoItem) -> Result<Item, StoreError> {
        item.into_item(&*self.0.is_collection)
    }

    fn insert(&self, key: String, item: Item) {
        match &item {
            Item::Collection(collection) => {
                self.backfill(&key, collection);
                self.adopt_members(collection);
            }
            Item::Element(element) => {
                if self.0.watched.is_some() {
                    element.on_change(Arc::clone(&self.0.listener));
                }
                self.attach(element);
            }
        }

        debug!(key = %key, collection = item.is_collection(), "store put");
        self.0.items.insert(key, item);
        self.bump_version();
    }

    /// Append stored elements associated with `key` to an incoming collection.
    fn backfill(&self, key: &str, collection: &Collection) {
        for element in self.elements() {
            if (self.0.associate_fn)(&element).iter().any(|k| k == key)
                && collection.push_unique(element)
            {
                trace!(key, "back-filled element into collection");
            }
        }
    }

    /// File members that have no entry of their own yet. Existing entries win.
    fn adopt_members(&self, collection: &Collection) {
        for member in collection.members() {
            let item = Item::Element(member);
            let key = (self.0.key_fn)(&item);
            if self.has(&key) {
                trace!(key = %key, "member already stored, keeping stored copy");
            } else {
                self.insert(key, item);
            }
        }
    }

    /// List `element` in every stored collection it is associated with.
    fn attach(&self, element: &Element) {
        for key in (self.0.associate_fn)(element) {
            if let Some(Item::Collection(collection)) = self.get(&key) {
                if collection.push_unique(element.clone()) {
                    trace!(key = %key, "element appended to collection");
                }
            }
        }
    }

    /// Unsubscribe `element` and de-list it from the collections under `associated`.
    fn detach(&self, element: &Element, associated: &[String]) {
        if self.0.watched.is_some() {
            element.off_change(&self.0.listener);
        }
        for key in associated {
            if let Some(Item::Collection(collection)) = self.get(key) {
                if collection.remove_member(element) {
                    trace!(key = %key, "element removed from collection");
                }
            }
        }
    }

    fn elements(&self) -> Vec<Element> {
        self.0
            .items
            .iter()
            .filter_map(|r| r.value().as_element().cloned())
            .collect()
    }

    fn bump_version(&self) {
        self.0.version.send_modify(|v| *v += 1);
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.keys())
            .field("watched", &self.0.watched)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

// ── Builder ──────────────────────────────────────────────────────────

/// Configures and validates a [`Store`].
#[derive(Default)]
pub struct StoreBuilder {
    key_fn: Option<KeyFn>,
    collection_key_fn: Option<CollectionKeyFn>,
    associate_fn: Option<AssociateFn>,
    watched: HashSet<String>,
    is_collection: Option<CollectionPredicate>,
}

impl StoreBuilder {
    /// Key of an item. Also used for collections unless
    /// [`collection_key_fn`](Self::collection_key_fn) is set.
    pub fn key_fn(mut self, f: impl Fn(&Item) -> String + Send + Sync + 'static) -> Self {
        self.key_fn = Some(Arc::new(f));
        self
    }

    pub fn collection_key_fn(
        mut self,
        f: impl Fn(&Collection) -> String + Send + Sync + 'static,
    ) -> Self {
        self.collection_key_fn = Some(Arc::new(f));
        self
    }

    /// Keys of the collections an element belongs to when they are stored.
    pub fn associate_fn(
        mut self,
        f: impl Fn(&Element) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.associate_fn = Some(Arc::new(f));
        self
    }

    /// Fields whose changes re-file elements. An empty set disables tracking.
    pub fn watch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watched.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn watch_field(self, field: impl Into<String>) -> Self {
        self.watch([field.into()])
    }

    /// Predicate deciding whether raw JSON is a collection (default: arrays).
    pub fn collection_predicate(
        mut self,
        f: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_collection = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Result<Store, StoreError> {
        let key_fn = self.key_fn.ok_or_else(|| StoreError::InvalidArgument {
            message: "no key function provided".into(),
        })?;
        let associate_fn = self
            .associate_fn
            .ok_or_else(|| StoreError::InvalidArgument {
                message: "no associate function provided".into(),
            })?;

        let collection_key_fn: CollectionKeyFn = match self.collection_key_fn {
            Some(f) => f,
            None => {
                let key_fn = Arc::clone(&key_fn);
                Arc::new(move |collection: &Collection| {
                    key_fn(&Item::Collection(collection.clone()))
                })
            }
        };
        let is_collection: CollectionPredicate = match self.is_collection {
            Some(f) => f,
            None => Arc::new(is_array),
        };
        let watched = (!self.watched.is_empty()).then_some(self.watched);
        let (version, _) = watch::channel(0u64);

        Ok(Store(Arc::new_cyclic(|weak| StoreInner {
            items: DashMap::new(),
            key_fn,
            collection_key_fn,
            associate_fn,
            watched,
            is_collection,
            listener: Arc::new(StoreListener {
                store: weak.clone(),
            }),
            version,
        })))
    }
}
