use std::path::PathBuf;

use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "namebank",
    version,
    about = "Intern and query identifier names extracted from source code"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Path to the namebank database
    #[arg(long, global = true, env = "NAMEBANK_DB", default_value = "namebank.db")]
    db: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
/// Exit codes:
///   0  success
///   1  general/unknown error
///   2  configuration error
///   3  database not found / not initialized
///   4  database error
///   10 partial ingest (some lines failed)
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();

    if lower.contains("partial ingest") {
        10
    } else if lower.contains("not initialized") || lower.contains("database not found") {
        3
    } else if lower.contains("config") || lower.contains("no project given") {
        2
    } else if lower.contains("database") || lower.contains("sqlite") {
        4
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let ctx = commands::Context {
        db: cli.db,
        quiet: cli.quiet,
    };

    match commands::run(cli.command, &ctx) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
