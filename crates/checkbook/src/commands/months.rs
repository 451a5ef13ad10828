//! Month command handlers.

use checkbook_core::{CategoryForMonth, Checkbook, Month};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, MonthsArgs, MonthsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MonthView {
    id: Option<i64>,
    month: String,
    total: f64,
}

impl MonthView {
    fn new(checkbook: &Checkbook, month: &Month) -> Self {
        Self {
            id: month.id(),
            month: month.label(),
            total: checkbook.month_total(month),
        }
    }
}

#[derive(Tabled)]
struct MonthRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl From<&MonthView> for MonthRow {
    fn from(m: &MonthView) -> Self {
        Self {
            id: util::id_str(m.id),
            month: m.month.clone(),
            total: output::amount(m.total),
        }
    }
}

#[derive(Serialize)]
struct CategoryTotalView {
    id: Option<i64>,
    monthid: Option<i64>,
    caption: String,
    total: f64,
}

#[derive(Tabled)]
struct CategoryTotalRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Category")]
    caption: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl From<&CategoryTotalView> for CategoryTotalRow {
    fn from(c: &CategoryTotalView) -> Self {
        Self {
            id: util::id_str(c.id),
            caption: c.caption.clone(),
            total: output::amount(c.total),
        }
    }
}

fn month_detail(m: &MonthView) -> String {
    format!(
        "Month:  {}\nID:     {}\nTotal:  {}",
        m.month,
        util::id_str(m.id),
        output::amount(m.total)
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    checkbook: &Checkbook,
    args: MonthsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        MonthsCommand::List => {
            let months = checkbook.months().await?;
            let views: Vec<_> = months
                .iter()
                .map(|m| MonthView::new(checkbook, m))
                .collect();
            let out = output::render_list(&global.output, &views, |m| MonthRow::from(m), |m| {
                m.month.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MonthsCommand::Get { month } => {
            let id = util::parse_month(&month)?;
            let found = checkbook
                .month(id)
                .await
                .map_err(|e| util::not_found(e, "month", &month, "months list"))?;
            let view = MonthView::new(checkbook, &found);
            let out = output::render_single(&global.output, &view, month_detail, |m| {
                m.month.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MonthsCommand::Categories { month } => {
            let id = util::parse_month(&month)?;
            let categories = checkbook
                .categories_for_month(id)
                .await
                .map_err(|e| util::not_found(e, "month", &month, "months list"))?;
            let views: Vec<_> = categories
                .iter()
                .map(|c: &CategoryForMonth| CategoryTotalView {
                    id: c.id(),
                    monthid: c.monthid(),
                    caption: c.caption(),
                    total: checkbook.category_total(c),
                })
                .collect();
            let out = output::render_list(&global.output, &views, |c| CategoryTotalRow::from(c), |c| {
                util::id_str(c.id)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
