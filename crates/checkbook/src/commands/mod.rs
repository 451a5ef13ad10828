//! Command handlers, one module per top-level command.

pub mod categories;
pub mod config_cmd;
pub mod entries;
pub mod login;
pub mod months;
pub mod util;

use checkbook_core::Checkbook;
use tracing::{debug, warn};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

/// Resolve the configuration and open an authenticated session.
///
/// A refresh token renewed from the keyring is written back so the next
/// run can resume from it.
pub async fn connect(global: &GlobalOpts) -> Result<Checkbook, CliError> {
    let resolved = config::resolve(global)?;
    let has_session = resolved.client.refresh_token.is_some();

    if resolved.client.credentials.is_none() && !has_session {
        return Err(CliError::LoginRequired);
    }

    let checkbook = Checkbook::new(resolved.client)?;
    checkbook.login().await?;
    debug!(profile = %resolved.profile_name, "session open");

    if has_session {
        if let Some(token) = checkbook.refresh_token() {
            if let Err(err) = checkbook_config::store_refresh_token(&resolved.profile_name, &token) {
                warn!(error = %err, "could not persist refreshed session");
            }
        }
    }
    Ok(checkbook)
}
