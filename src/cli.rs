use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "remindme")]
#[command(bin_name = "remindme")]
#[command(version)]
#[command(about = "Schedule reminders that survive restarts")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "REMINDME_DB_PATH",
        default_value = ".remindme/state.sqlite",
        global = true,
        help = "Path to the alarm store database."
    )]
    pub db: String,

    #[arg(
        short = 'c',
        long,
        env = "REMINDME_CONFIG",
        default_value = ".remindme/config.toml",
        global = true,
        help = "Path to the TOML config file (missing file means defaults)."
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Schedule a reminder, optionally repeating weekly.")]
    Add(AddArgs),
    #[command(about = "List pending reminders (prunes expired ones).")]
    Ls(ListArgs),
    #[command(about = "Cancel reminders selected by handle.")]
    Cancel(CancelArgs),
    #[command(about = "Re-register every pending reminder with the timer spool.")]
    Reconcile(ReconcileArgs),
    #[command(about = "Deliver reminders that are due.")]
    Deliver(DeliverArgs),
    #[command(about = "Generate shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
#[command(about = "Schedule a reminder.")]
pub struct AddArgs {
    #[arg(help = "Reminder title.")]
    pub title: String,

    #[arg(short = 'm', long, default_value = "", help = "Reminder message.")]
    pub message: String,

    #[arg(
        short = 'a',
        long,
        help = "First occurrence: RFC3339 or 'YYYY-MM-DD HH:MM' local time."
    )]
    pub at: String,

    #[arg(
        short = 'w',
        long,
        default_value_t = 1,
        help = "Number of weekly occurrences."
    )]
    pub weeks: u32,

    #[arg(long, help = "Do not add medication reminders for class titles.")]
    pub no_medication: bool,

    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "List pending reminders.")]
pub struct ListArgs {
    #[arg(long, help = "Print JSON output.")]
    pub json: bool,

    #[arg(long, help = "Print stored tokens without decoding or pruning.")]
    pub raw: bool,
}

#[derive(Debug, Args)]
#[command(about = "Cancel reminders.")]
pub struct CancelArgs {
    #[arg(required = true, help = "Handles of the reminders to cancel, as shown by `ls`.")]
    pub handles: Vec<i64>,

    #[arg(
        long,
        help = "Cancel only these handles, not every reminder sharing their time and text."
    )]
    pub exact: bool,

    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Re-register pending reminders.")]
pub struct ReconcileArgs {
    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Deliver due reminders.")]
pub struct DeliverArgs {
    #[arg(long, help = "Print JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Generate shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish, elvish, powershell). Auto-detected if omitted.")]
    pub shell: Option<String>,
}
