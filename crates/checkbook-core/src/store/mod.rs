// ── Resource store ──
//
// Identity-preserving storage of elements and collections with automatic
// membership reconciliation and mutable-key re-filing.

mod collection;
mod element;
mod item;
#[allow(clippy::module_inception)]
mod store;

pub use collection::Collection;
pub use element::{ChangeObserver, Element, FieldChange};
pub use item::{CollectionPredicate, IntoItem, Item, is_array};
pub use store::{Store, StoreBuilder};
