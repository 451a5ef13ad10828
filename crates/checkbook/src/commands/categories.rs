//! Category command handlers.

use checkbook_core::{Category, Checkbook};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{CategoriesArgs, CategoriesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct CategoryView {
    id: Option<i64>,
    caption: String,
}

impl From<&Category> for CategoryView {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id(),
            caption: c.caption(),
        }
    }
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Caption")]
    caption: String,
}

pub async fn handle(
    checkbook: &Checkbook,
    args: CategoriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CategoriesCommand::List => {
            let categories = checkbook.categories().await?;
            let views: Vec<_> = categories.iter().map(CategoryView::from).collect();
            let out = output::render_list(
                &global.output,
                &views,
                |c| CategoryRow {
                    id: util::id_str(c.id),
                    caption: c.caption.clone(),
                },
                |c| util::id_str(c.id),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CategoriesCommand::Create { caption } => {
            let created = checkbook.create_category(&caption).await?;
            output::print_done(
                &format!("Created category {} '{caption}'", util::id_str(created.id())),
                global.quiet,
            );
            Ok(())
        }

        CategoriesCommand::Delete { id } => {
            let category = checkbook
                .category(id)
                .await
                .map_err(|e| util::not_found(e, "category", &id.to_string(), "categories list"))?;
            if !util::confirm(
                &format!("Delete category '{}'?", category.caption()),
                "categories delete",
                global.yes,
            )? {
                return Ok(());
            }
            checkbook.delete_category(&category).await?;
            output::print_done(&format!("Deleted category {id}"), global.quiet);
            Ok(())
        }
    }
}
