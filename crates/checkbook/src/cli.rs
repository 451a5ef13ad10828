//! Clap derive structures for the `checkbook` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// checkbook -- command-line client for a Checkbook budgeting server
#[derive(Debug, Parser)]
#[command(
    name = "checkbook",
    version,
    about = "Track a Checkbook budget from the command line",
    long_about = "Browse months, categories and entries of a Checkbook server,\n\
        record new entries and move them between categories and months.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "CHECKBOOK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 's', env = "CHECKBOOK_SERVER", global = true)]
    pub server: Option<String>,

    /// Login name (overrides profile)
    #[arg(long, short = 'u', env = "CHECKBOOK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for the login name
    #[arg(long, env = "CHECKBOOK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CHECKBOOK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CHECKBOOK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (default: profile, then 30)
    #[arg(long, env = "CHECKBOOK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login(LoginArgs),

    /// Browse months and their totals
    #[command(alias = "m")]
    Months(MonthsArgs),

    /// Manage categories
    #[command(alias = "cat")]
    Categories(CategoriesArgs),

    /// Manage ledger entries
    #[command(alias = "e")]
    Entries(EntriesArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOGIN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Forget the stored session instead of logging in
    #[arg(long)]
    pub logout: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MONTHS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MonthsArgs {
    #[command(subcommand)]
    pub command: MonthsCommand,
}

#[derive(Debug, Subcommand)]
pub enum MonthsCommand {
    /// List months with their totals
    #[command(alias = "ls")]
    List,

    /// Show one month
    Get {
        /// Month as YYYY-MM or a month id
        month: String,
    },

    /// List a month's categories with their totals
    Categories {
        /// Month as YYYY-MM or a month id
        month: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CATEGORIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    /// List categories
    #[command(alias = "ls")]
    List,

    /// Create a category
    Create {
        /// Category caption
        caption: String,
    },

    /// Delete a category
    #[command(alias = "rm")]
    Delete {
        /// Category ID
        id: i64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ENTRIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EntriesArgs {
    #[command(subcommand)]
    pub command: EntriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntriesCommand {
    /// List entries, optionally those of one category in one month
    #[command(alias = "ls")]
    List {
        /// Month as YYYY-MM or a month id
        #[arg(long, short = 'm', requires = "category")]
        month: Option<String>,

        /// Category ID
        #[arg(long, short = 'c', requires = "month")]
        category: Option<i64>,
    },

    /// Show one entry
    Get {
        /// Entry ID
        id: i64,
    },

    /// Record a new entry
    Create {
        /// Short description
        #[arg(long, required = true)]
        caption: String,

        /// Amount
        #[arg(long, required = true, allow_negative_numbers = true)]
        value: f64,

        /// Category ID
        #[arg(long, short = 'c', required = true)]
        category: i64,

        /// Date (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long, short = 'd')]
        date: Option<String>,

        /// Free-form notes
        #[arg(long)]
        details: Option<String>,
    },

    /// Move an entry to another category and/or date
    #[command(alias = "mv")]
    Move {
        /// Entry ID
        id: i64,

        /// Target category ID
        #[arg(long, short = 'c', required_unless_present = "date")]
        category: Option<i64>,

        /// Target date (YYYY-MM-DD or RFC 3339)
        #[arg(long, short = 'd')]
        date: Option<String>,
    },

    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry ID
        id: i64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
