// checkbook-api: Async HTTP client for the Checkbook budgeting server

pub mod auth;
pub mod client;
pub mod error;
pub mod template;
pub mod transport;

pub use auth::{Credentials, TokenPair};
pub use client::{ApiClient, Method};
pub use error::Error;
pub use template::{FieldSource, ParamValue, Params, UrlTemplate, strip_last_segment};
pub use transport::{TlsMode, TransportConfig};
