use thiserror::Error;

/// Top-level error type for the `checkbook-api` crate.
///
/// Covers every failure mode of the HTTP surface: token negotiation,
/// transport, and non-success responses. `checkbook-core` maps these
/// into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token endpoint refused the grant (wrong password, revoked refresh token, ...).
    #[error("Token request rejected (HTTP {status}): {error}")]
    TokenRejected {
        status: u16,
        /// OAuth error code, e.g. `invalid_grant`.
        error: String,
        description: Option<String>,
    },

    /// A request came back 401 and no new token could be negotiated.
    /// The caller has to log in again with credentials.
    #[error("Login required -- no valid access or refresh token")]
    LoginRequired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server responses ────────────────────────────────────────────
    /// Non-success HTTP status with the raw body for diagnostics.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the user has to authenticate again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::LoginRequired | Self::TokenRejected { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }
}
