// ── Runtime connection configuration ──
//
// Describes *how* to reach a Checkbook server. Carries credential data
// and connection tuning, but never touches disk. The CLI builds a
// `ClientConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use checkbook_api::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

/// Username and password for the password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl From<Credentials> for checkbook_api::Credentials {
    fn from(credentials: Credentials) -> Self {
        Self {
            username: credentials.username,
            password: credentials.password,
        }
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Configuration for talking to one Checkbook server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL (e.g. `https://checkbook.example.com`).
    pub url: Url,
    /// Credentials for an interactive or scripted login.
    pub credentials: Option<Credentials>,
    /// Refresh token persisted from an earlier session.
    pub refresh_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            credentials: None,
            refresh_token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}
