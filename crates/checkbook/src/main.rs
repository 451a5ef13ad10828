mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::{categories, config_cmd, connect, entries, login, months};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.quiet);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    tracing::debug!(command = ?cli.command, "dispatching command");

    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => config_cmd::handle(args, &global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "checkbook", &mut std::io::stdout());
            Ok(())
        }

        Command::Login(args) => login::handle(args, &global).await,

        Command::Months(args) => months::handle(&connect(&global).await?, args, &global).await,
        Command::Categories(args) => {
            categories::handle(&connect(&global).await?, args, &global).await
        }
        Command::Entries(args) => entries::handle(&connect(&global).await?, args, &global).await,
    }
}
