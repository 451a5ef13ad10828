//! Shared helpers for command handlers.

use std::io::IsTerminal;

use chrono::{DateTime, NaiveDate, Utc};
use checkbook_core::CoreError;
use checkbook_core::model::monthid_of;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the action is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Replace the server's generic 404 with one naming what was looked up.
pub fn not_found(err: CoreError, resource_type: &str, identifier: &str, list_command: &str) -> CliError {
    match err {
        CoreError::NotFound { .. } => CliError::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        },
        other => other.into(),
    }
}

/// Parse a month given as `YYYY-MM` or as a raw month id.
pub fn parse_month(input: &str) -> Result<i64, CliError> {
    if let Ok(id) = input.parse::<i64>() {
        return Ok(id);
    }
    NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| monthid_of(&dt.and_utc()))
        .ok_or_else(|| CliError::Validation {
            field: "month".into(),
            reason: format!("expected YYYY-MM or a month id, got '{input}'"),
        })
}

/// Parse a date given as `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CliError::Validation {
            field: "date".into(),
            reason: format!("expected YYYY-MM-DD or RFC 3339, got '{input}'"),
        })
}

/// `YYYY-MM-DD` of a datetime, empty when absent.
pub fn short_date(datetime: Option<DateTime<Utc>>) -> String {
    datetime
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Display form of an optional id.
pub fn id_str(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}
