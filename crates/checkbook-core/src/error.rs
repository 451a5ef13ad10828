// ── Core error types ──
//
// User-facing errors from checkbook-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<checkbook_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Errors raised by the [`Store`](crate::store::Store) itself.
///
/// Construction errors are fatal to the store being built. `put` errors
/// leave the store exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A mandatory keying function was not supplied.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// `put` was handed something that is not a record or a list of records.
    #[error("Expected an object or a collection, found {found}")]
    NotAnObject { found: String },

    /// A JSON container the collection predicate classified against its shape
    /// (an object treated as a collection, or an array treated as an element).
    #[error("Cannot store {found} under the configured collection predicate")]
    Unclassifiable { found: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Login required -- no valid session, log in with credentials")]
    LoginRequired,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} on {resource}")]
    Unsupported { operation: String, resource: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the caller has to log in again before retrying.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            Self::LoginRequired | Self::AuthenticationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<checkbook_api::Error> for CoreError {
    fn from(err: checkbook_api::Error) -> Self {
        match err {
            checkbook_api::Error::TokenRejected {
                error, description, ..
            } => CoreError::AuthenticationFailed {
                message: match description {
                    Some(description) => format!("{error}: {description}"),
                    None => error,
                },
            },
            checkbook_api::Error::LoginRequired => CoreError::LoginRequired,
            checkbook_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            checkbook_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            checkbook_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            checkbook_api::Error::Http { status: 404, body } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: body,
            },
            checkbook_api::Error::Http { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            checkbook_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
