//! Build blocker CLI entrypoint.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod handlers;
mod input;

use commands::{Commands, LogFormat};

#[derive(Parser)]
#[command(name = "buildblocker")]
#[command(author, version, about = "Check which jobs keep a queued build from running", long_about = None)]
struct Cli {
    /// Log output format; the level is read from RUST_LOG
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Check { path, node, json } => {
            if handlers::check(&path, node, json)?.is_some() {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Validate { path } => handlers::validate(&path)?,
        Commands::Schema => handlers::schema()?,
    }

    Ok(ExitCode::SUCCESS)
}
