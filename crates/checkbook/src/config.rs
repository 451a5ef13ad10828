//! Resolution of the active profile plus command-line overrides into a
//! `checkbook_core::ClientConfig`.
//!
//! Core never sees profiles; it receives a pre-built `ClientConfig`.

use std::time::Duration;

use checkbook_config::{Config, Profile};
use checkbook_core::{ClientConfig, Credentials, TlsVerification};
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use checkbook_config::{config_path, load_config_or_default, save_config};

/// Everything needed to open a session.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub client: ClientConfig,
}

/// Resolve the active profile and flags into a `ClientConfig`.
///
/// Precedence: command-line flag (or its env var) > profile > defaults.
/// A stored refresh token is attached unless a password was given
/// explicitly, in which case the password grant is used.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    resolve_with(&cfg, global, checkbook_config::load_refresh_token)
}

pub fn resolve_with(
    cfg: &Config,
    global: &GlobalOpts,
    refresh_token: impl Fn(&str) -> Option<SecretString>,
) -> Result<Resolved, CliError> {
    let profile_name = cfg.active_profile_name(global.profile.as_deref());
    let profile = cfg.profiles.get(&profile_name);

    if profile.is_none() && global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: cfg.profile_names(),
        });
    }

    // 1. Server URL (flag > env > profile)
    let url_str = global
        .server
        .as_deref()
        .or(profile.map(|p| p.server.as_str()))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;
    let mut client = ClientConfig::new(url);

    // 2. Credentials
    let username = global
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()));
    let password = global.password.clone().map(SecretString::from).or_else(|| {
        profile.and_then(|p| checkbook_config::resolve_password(p, &profile_name))
    });
    client.credentials = username
        .zip(password)
        .map(|(username, password)| Credentials { username, password });

    // 3. Stored session
    if global.password.is_none() {
        client.refresh_token = refresh_token(&profile_name);
    }

    // 4. TLS verification
    client.tls = tls_for(global, profile, cfg);

    // 5. Timeout
    let secs = global
        .timeout
        .or(profile.and_then(|p| p.timeout))
        .unwrap_or(cfg.defaults.timeout);
    client.timeout = Duration::from_secs(secs);

    Ok(Resolved {
        profile_name,
        client,
    })
}

fn tls_for(global: &GlobalOpts, profile: Option<&Profile>, cfg: &Config) -> TlsVerification {
    let insecure = global.insecure
        || profile
            .and_then(|p| p.insecure)
            .unwrap_or(cfg.defaults.insecure);
    if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ca_path) = profile.and_then(|p| p.ca_cert.clone()) {
        TlsVerification::CustomCa(ca_path)
    } else {
        TlsVerification::SystemDefaults
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["checkbook"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["months", "list"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_home() -> Config {
        let mut cfg = Config::default();
        cfg.default_profile = Some("home".into());
        cfg.profiles.insert(
            "home".into(),
            Profile {
                server: "https://books.example.com".into(),
                username: Some("alice".into()),
                password: Some("from-profile".into()),
                timeout: Some(12),
                ..Profile::default()
            },
        );
        cfg
    }

    fn no_token(_: &str) -> Option<SecretString> {
        None
    }

    fn saved_token(_: &str) -> Option<SecretString> {
        Some(SecretString::from("saved".to_string()))
    }

    #[test]
    fn profile_values_are_used() {
        let resolved = resolve_with(&config_with_home(), &global(&[]), saved_token).unwrap();
        assert_eq!(resolved.profile_name, "home");
        assert_eq!(resolved.client.url.as_str(), "https://books.example.com/");
        assert_eq!(resolved.client.timeout, Duration::from_secs(12));
        let credentials = resolved.client.credentials.unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "from-profile");
        assert_eq!(
            resolved.client.refresh_token.unwrap().expose_secret(),
            "saved"
        );
    }

    #[test]
    fn flags_override_profile() {
        let g = global(&[
            "--server",
            "http://localhost:3000",
            "--username",
            "bob",
            "--password",
            "pw",
            "--timeout",
            "3",
            "-k",
        ]);
        let resolved = resolve_with(&config_with_home(), &g, saved_token).unwrap();
        assert_eq!(resolved.client.url.as_str(), "http://localhost:3000/");
        assert_eq!(resolved.client.timeout, Duration::from_secs(3));
        assert_eq!(resolved.client.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(resolved.client.credentials.unwrap().username, "bob");
        // An explicit password skips the stored session.
        assert!(resolved.client.refresh_token.is_none());
    }

    #[test]
    fn unknown_named_profile_is_an_error() {
        let err = resolve_with(&config_with_home(), &global(&["-p", "work"]), no_token)
            .unwrap_err();
        assert!(matches!(err, CliError::ProfileNotFound { ref available, .. } if available == "home"));
    }

    #[test]
    fn no_server_anywhere_is_an_error() {
        let err = resolve_with(&Config::default(), &global(&[]), no_token).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn server_flag_alone_is_enough() {
        let resolved = resolve_with(
            &Config::default(),
            &global(&["--server", "http://localhost:3000"]),
            no_token,
        )
        .unwrap();
        assert!(resolved.client.credentials.is_none());
        assert_eq!(resolved.client.timeout, Duration::from_secs(30));
    }
}
