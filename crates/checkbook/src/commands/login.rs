//! Login handler: password grant, then persist the refresh token.

use std::io::IsTerminal;

use checkbook_core::{Checkbook, Credentials};
use dialoguer::Input;
use secrecy::SecretString;
use tracing::warn;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Ask for whatever part of the credentials is missing.
fn prompt_credentials(
    profile_name: &str,
    username: Option<String>,
) -> Result<Credentials, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    }

    let username = match username {
        Some(username) => username,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?,
    };
    let password = rpassword::prompt_password(format!("Password for {username}: "))
        .map_err(prompt_err)?;

    if username.is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "username and password cannot be empty".into(),
        });
    }

    Ok(Credentials {
        username,
        password: SecretString::from(password),
    })
}

pub async fn handle(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut resolved = config::resolve(global)?;
    let profile_name = resolved.profile_name.clone();

    if args.logout {
        checkbook_config::clear_refresh_token(&profile_name)?;
        output::print_done(&format!("Logged out of profile '{profile_name}'"), global.quiet);
        return Ok(());
    }

    let credentials = match resolved.client.credentials.take() {
        Some(credentials) => credentials,
        None => {
            let username = global.username.clone().or_else(|| {
                config::load_config_or_default()
                    .profiles
                    .get(&profile_name)
                    .and_then(|p| p.username.clone())
            });
            prompt_credentials(&profile_name, username)?
        }
    };
    let username = credentials.username.clone();

    // A fresh login never reuses the stored session.
    resolved.client.credentials = Some(credentials);
    resolved.client.refresh_token = None;

    let checkbook = Checkbook::new(resolved.client)?;
    checkbook.login().await?;

    match checkbook.refresh_token() {
        Some(token) => {
            if let Err(err) = checkbook_config::store_refresh_token(&profile_name, &token) {
                warn!(error = %err, "session not saved, the next command will need credentials");
            }
        }
        None => warn!("server issued no refresh token"),
    }

    output::print_done(
        &format!("Logged in as {username} (profile '{profile_name}')"),
        global.quiet,
    );
    Ok(())
}
