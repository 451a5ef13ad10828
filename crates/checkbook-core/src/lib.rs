//! Data layer between `checkbook-api` and the CLI.
//!
//! - **[`Store`]**: Key-indexed storage of elements and collections. Keeps
//!   every stored collection in step with the stored elements that belong
//!   to it, re-files elements whose keys depend on changed fields, and
//!   publishes a version counter over a `watch` channel.
//!
//! - **[`Resource`]**: REST actions over a URL template, composed with a
//!   `Store`: reads are served from the store when possible, writes and
//!   deletes keep it current.
//!
//! - **Domain model** ([`model`]): Typed views (`Entry`, `Category`,
//!   `Month`, `CategoryForMonth`) over shared store elements.
//!
//! - **[`Checkbook`]**: Facade owning the API client, one store per
//!   resource type and the resources bound to them.

pub mod config;
pub mod error;
pub mod model;
pub mod resource;
pub mod service;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ClientConfig, Credentials, TlsVerification};
pub use error::{CoreError, StoreError};
pub use model::{Category, CategoryForMonth, Entry, Month, NewEntry};
pub use resource::Resource;
pub use service::Checkbook;
pub use store::{ChangeObserver, Collection, Element, FieldChange, IntoItem, Item, Store};
