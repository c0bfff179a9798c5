mod app;
mod cancel;
mod cli;
mod clock;
mod codec;
mod completions;
mod config;
mod db;
mod delivery;
mod domain;
#[cfg(test)]
mod main_tests;
mod plan;
mod reconcile;
mod scheduler;
mod store;
mod ui;

use std::path::Path;

use time::UtcOffset;
use tracing_subscriber::EnvFilter;

use app::{App, AppError};
use cli::{Commands, CompletionsArgs, DeliverArgs};
use config::Config;
use domain::record::Handle;
use domain::registration::Registration;

fn main() {
    let offset = clock::local_offset();
    init_tracing();
    if let Err(err) = run(offset) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("remindme=warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run(offset: UtcOffset) -> Result<(), AppError> {
    use clap::Parser;

    let cli = cli::Cli::parse();
    match cli.command {
        Commands::Completions(args) => run_completions(&args),
        Commands::Deliver(args) => {
            let config = Config::load(&cli.config)?;
            run_deliver(&config, &args, offset)
        }
        command => {
            let config = Config::load(&cli.config)?;
            let mut app = App::open(&cli.db, config)?;
            run_store_command(&mut app, command, &cli.config, offset)
        }
    }
}

fn run_store_command(
    app: &mut App,
    command: Commands,
    config_path: &Path,
    offset: UtcOffset,
) -> Result<(), AppError> {
    let now_ms = clock::now_ms();
    match command {
        Commands::Add(args) => {
            let first = clock::parse_when(&args.at, offset)
                .map_err(|err| AppError::InvalidArgument(err.to_string()))?;
            let request = plan::ScheduleRequest {
                title: args.title,
                message: args.message,
                first,
                weeks: args.weeks,
                medication: !args.no_medication,
            };
            let summary = app.schedule(&request, now_ms)?;
            if args.json {
                print_json(&summary);
            } else {
                ui::print_schedule_summary(&summary, offset);
            }
            if summary.count(Registration::Denied) > 0 {
                eprintln!("{}", denied_hint(config_path));
            }
        }
        Commands::Ls(args) => {
            if args.raw {
                for token in app.tokens()? {
                    println!("{token}");
                }
                return Ok(());
            }
            let alarms = app.list(now_ms)?;
            if args.json {
                print_json(&alarms);
            } else {
                ui::print_alarm_list(&alarms, offset);
            }
        }
        Commands::Cancel(args) => {
            let handles = args.handles.iter().copied().map(Handle).collect::<Vec<_>>();
            let outcome = if args.exact {
                app.cancel_exact(&handles)?
            } else {
                app.cancel_selected(&handles, now_ms)?
            };
            if args.json {
                print_json(&outcome);
            } else {
                ui::print_cancel_outcome(&outcome);
            }
        }
        Commands::Reconcile(args) => {
            let summary = app.reconcile(now_ms)?;
            if args.json {
                print_json(&summary);
            } else {
                ui::print_reconcile_summary(&summary);
            }
            if summary.denied > 0 {
                eprintln!("{}", denied_hint(config_path));
            }
        }
        Commands::Deliver(_) | Commands::Completions(_) => {
            unreachable!("handled before the store is opened")
        }
    }
    Ok(())
}

fn run_deliver(config: &Config, args: &DeliverArgs, offset: UtcOffset) -> Result<(), AppError> {
    let spool =
        scheduler::SpoolScheduler::new(config.resolved_spool_dir(), config.exact_alarms_allowed);
    let fired = delivery::drain_due(&spool, clock::now_ms())?;
    if args.json {
        print_json(&fired);
    } else {
        ui::print_notifications(&fired, offset);
    }
    Ok(())
}

fn run_completions(args: &CompletionsArgs) -> Result<(), AppError> {
    let shell = completions::resolve_shell(args.shell.as_deref()).ok_or_else(|| {
        AppError::InvalidArgument(
            "could not determine shell; pass one of bash, zsh, fish, elvish, powershell"
                .to_string(),
        )
    })?;
    completions::generate_completions(shell, &mut std::io::stdout());
    Ok(())
}

fn denied_hint(config_path: &Path) -> String {
    format!(
        "warning: exact alarms are not permitted; reminders were saved but will not fire. \
         Set `exact_alarms_allowed = true` in {} and run `remindme reconcile`.",
        config_path.display()
    )
}
