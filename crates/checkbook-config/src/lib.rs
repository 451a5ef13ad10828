//! Shared configuration for Checkbook tools.
//!
//! TOML profiles, credential resolution (env + plaintext + keyring),
//! refresh-token persistence, and translation to
//! `checkbook_core::ClientConfig`. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use checkbook_core::{ClientConfig, Credentials, TlsVerification};

/// Keyring service name shared by every Checkbook tool.
const KEYRING_SERVICE: &str = "checkbook";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("keyring unavailable: {message}")]
    Keyring { message: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring {
            message: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use: the explicit one, else the configured default.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Comma-separated profile names, for error help text.
    pub fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            return "(none)".into();
        }
        self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named server profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://checkbook.example.com").
    pub server: String,

    /// Login name for the password grant.
    pub username: Option<String>,

    /// Password (plaintext; prefer the keyring or `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid certificates.
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("app", "checkbook", "checkbook").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("checkbook");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + `CHECKBOOK_*` environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CHECKBOOK_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "loaded config");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

/// Render `cfg` as the TOML document `save_config` would write.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Keyring ─────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str, kind: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{kind}"),
    )?)
}

pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "password")?.set_password(password)?;
    Ok(())
}

/// Persist the refresh token so the next run can skip the password grant.
pub fn store_refresh_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "refresh-token")?.set_password(token.expose_secret())?;
    debug!(profile = profile_name, "stored refresh token");
    Ok(())
}

/// Refresh token from an earlier session, if one is stored.
pub fn load_refresh_token(profile_name: &str) -> Option<SecretString> {
    keyring_entry(profile_name, "refresh-token")
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

/// Forget the stored refresh token. A missing entry is not an error.
pub fn clear_refresh_token(profile_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name, "refresh-token")?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the profile's password.
///
/// Order: `password_env`, plaintext in the profile, system keyring.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    if let Some(ref pw) = profile.password {
        return Some(SecretString::from(pw.clone()));
    }

    keyring_entry(profile_name, "password")
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

/// Build a `ClientConfig` from a profile, without command-line overrides.
///
/// Credentials are set only when both a username and a password resolve.
/// The refresh token is left for the caller (see [`load_refresh_token`]).
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ClientConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let mut config = ClientConfig::new(url);

    config.credentials = match &profile.username {
        Some(username) => {
            resolve_password(profile, profile_name).map(|password| Credentials {
                username: username.clone(),
                password,
            })
        }
        None => None,
    };

    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    if let Some(secs) = profile.timeout {
        config.timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            ..Profile::default()
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.default_profile = Some("home".into());
        cfg.profiles.insert(
            "home".into(),
            Profile {
                username: Some("alice".into()),
                timeout: Some(5),
                ..profile("https://checkbook.example.com")
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn rendered_toml_escapes_quotes() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                username: Some(r#"al"ice"#.into()),
                ..profile("http://localhost:3000")
            },
        );

        let text = to_toml(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.profiles["home"].username.as_deref(), Some(r#"al"ice"#));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[profiles.work]\nserver = \"http://localhost:3000\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.profiles["work"].server, "http://localhost:3000");
        assert_eq!(cfg.profiles["work"].username, None);
    }

    #[test]
    fn active_profile_prefers_explicit_name() {
        let mut cfg = Config::default();
        assert_eq!(cfg.active_profile_name(None), "default");
        assert_eq!(cfg.active_profile_name(Some("work")), "work");

        cfg.default_profile = None;
        assert_eq!(cfg.active_profile_name(None), "default");
    }

    #[test]
    fn profile_names_for_help() {
        let mut cfg = Config::default();
        assert_eq!(cfg.profile_names(), "(none)");
        cfg.profiles.insert("b".into(), profile("http://b"));
        cfg.profiles.insert("a".into(), profile("http://a"));
        assert_eq!(cfg.profile_names(), "a, b");
    }

    #[test]
    fn client_config_from_profile() {
        let p = Profile {
            username: Some("alice".into()),
            password: Some("hunter2".into()),
            timeout: Some(7),
            ..profile("https://checkbook.example.com")
        };
        let config = profile_to_client_config(&p, "home").unwrap();

        assert_eq!(config.url.as_str(), "https://checkbook.example.com/");
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "hunter2");
        assert!(config.refresh_token.is_none());
    }

    #[test]
    fn tls_settings_from_profile() {
        let insecure = Profile {
            insecure: Some(true),
            ca_cert: Some("/etc/ca.pem".into()),
            ..profile("https://localhost")
        };
        assert_eq!(
            profile_to_client_config(&insecure, "x").unwrap().tls,
            TlsVerification::DangerAcceptInvalid
        );

        let custom = Profile {
            ca_cert: Some("/etc/ca.pem".into()),
            ..profile("https://localhost")
        };
        assert_eq!(
            profile_to_client_config(&custom, "x").unwrap().tls,
            TlsVerification::CustomCa("/etc/ca.pem".into())
        );
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let err = profile_to_client_config(&profile("not a url"), "x").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));
    }

    #[test]
    fn no_username_means_no_credentials() {
        let config = profile_to_client_config(&profile("http://localhost"), "x").unwrap();
        assert!(config.credentials.is_none());
    }
}
