//! tdmasat CLI - Command-line interface
//!
//! Runs the network simulation headless and prints configuration figures.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tdmasat_core::TdmaError;
use tdmasat_core::tracing_setup::{CliLogLevel, LogSettings, init_tracing};

#[derive(Parser)]
#[command(name = "tdmasat")]
#[command(about = "Satellite-relayed TDMA sensor network simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Directory for the trace-level run log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_settings =
        LogSettings::new(cli.log_level.as_tracing_level()).with_logs_dir(cli.logs_dir.as_deref());
    if let Err(e) = init_tracing(&log_settings) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match commands::handle_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<TdmaError>() {
                Some(tdma_error) if tdma_error.is_user_error() => {
                    eprintln!("Error: {}", tdma_error.user_message());
                }
                _ => eprintln!("Error: {error:#}"),
            }
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_log_level_after_subcommand() {
        let cli = Cli::try_parse_from(["tdmasat", "figures", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, CliLogLevel::Debug);
        assert!(cli.logs_dir.is_none());
    }
}
