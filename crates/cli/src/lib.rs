pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "mentor",
    about = "Daily mentor: one motivational quote from Gemini, delivered to Telegram",
    long_about = "Generate a motivational quote for programmers and forward it to a Telegram chat. \
                  Runs once and exits; schedule it with cron or a CI workflow.",
    after_help = "Examples:\n  mentor\n  mentor run\n  mentor config\n  mentor doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate one quote and deliver it (default when no command is given)")]
    Run,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Check configuration and credential readiness without network calls")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    // Real environment values win over the file.
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
