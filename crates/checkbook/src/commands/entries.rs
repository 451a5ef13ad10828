//! Entry command handlers.

use chrono::{DateTime, Utc};
use checkbook_core::{Checkbook, Entry, NewEntry};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{EntriesArgs, EntriesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntryView {
    id: Option<i64>,
    caption: String,
    value: f64,
    category: Option<i64>,
    datetime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<&Entry> for EntryView {
    fn from(e: &Entry) -> Self {
        Self {
            id: e.id(),
            caption: e.caption(),
            value: e.value(),
            category: e.category(),
            datetime: e.datetime(),
            details: e.details(),
        }
    }
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Caption")]
    caption: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&EntryView> for EntryRow {
    fn from(e: &EntryView) -> Self {
        Self {
            id: util::id_str(e.id),
            date: util::short_date(e.datetime),
            category: util::id_str(e.category),
            caption: e.caption.clone(),
            value: output::amount(e.value),
        }
    }
}

fn entry_detail(e: &EntryView) -> String {
    let mut out = format!(
        "ID:        {}\nCaption:   {}\nValue:     {}\nCategory:  {}\nDate:      {}",
        util::id_str(e.id),
        e.caption,
        output::amount(e.value),
        util::id_str(e.category),
        util::short_date(e.datetime),
    );
    if let Some(details) = &e.details {
        out.push_str("\nDetails:   ");
        out.push_str(details);
    }
    out
}

async fn fetch(checkbook: &Checkbook, id: i64) -> Result<Entry, CliError> {
    checkbook
        .entry(id)
        .await
        .map_err(|e| util::not_found(e, "entry", &id.to_string(), "entries list"))
}

fn print_entry(entry: &Entry, global: &GlobalOpts) -> Result<(), CliError> {
    let view = EntryView::from(entry);
    let out = output::render_single(&global.output, &view, entry_detail, |e| {
        util::id_str(e.id)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    checkbook: &Checkbook,
    args: EntriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EntriesCommand::List { month, category } => {
            let entries = match (month, category) {
                (Some(month), Some(category)) => {
                    let monthid = util::parse_month(&month)?;
                    checkbook.entries_for(monthid, category).await?
                }
                (None, None) => checkbook.entries().await?,
                _ => {
                    return Err(CliError::Validation {
                        field: "month".into(),
                        reason: "--month and --category filter together".into(),
                    });
                }
            };
            let views: Vec<_> = entries.iter().map(EntryView::from).collect();
            let out = output::render_list(&global.output, &views, |e| EntryRow::from(e), |e| {
                util::id_str(e.id)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EntriesCommand::Get { id } => {
            let entry = fetch(checkbook, id).await?;
            print_entry(&entry, global)
        }

        EntriesCommand::Create {
            caption,
            value,
            category,
            date,
            details,
        } => {
            let datetime = match date {
                Some(date) => util::parse_date(&date)?,
                None => Utc::now(),
            };
            let entry = checkbook
                .create_entry(&NewEntry {
                    caption,
                    value,
                    category,
                    datetime,
                    details,
                })
                .await?;
            output::print_done(
                &format!("Created entry {}", util::id_str(entry.id())),
                global.quiet,
            );
            print_entry(&entry, global)
        }

        EntriesCommand::Move { id, category, date } => {
            let datetime = date.as_deref().map(util::parse_date).transpose()?;
            let entry = fetch(checkbook, id).await?;
            checkbook.move_entry(&entry, category, datetime).await?;
            output::print_done(
                &format!(
                    "Moved entry {id} to category {} on {}",
                    util::id_str(entry.category()),
                    util::short_date(entry.datetime())
                ),
                global.quiet,
            );
            Ok(())
        }

        EntriesCommand::Delete { id } => {
            let entry = fetch(checkbook, id).await?;
            if !util::confirm(
                &format!("Delete entry '{}'?", entry.caption()),
                "entries delete",
                global.yes,
            )? {
                return Ok(());
            }
            checkbook.delete_entry(&entry).await?;
            output::print_done(&format!("Deleted entry {id}"), global.quiet);
            Ok(())
        }
    }
}
