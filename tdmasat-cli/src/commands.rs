//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use tdmasat_core::{TdmaConfig, TdmaError};
use tdmasat_sim::{ConfiguredFigures, NetworkSnapshot, SimulationDriver};
use tracing::info;

/// Transmission policy applied to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Every node transmits in its own TDMA slot
    Scheduled,
    /// Designated nodes send burst reports on heartbeat or alert
    Emergency,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the simulation headless and print the report
    Run {
        /// Transmission policy (defaults to the configured topology)
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
        /// Seconds to simulate (defaults to the configured duration)
        #[arg(short, long)]
        seconds: Option<u64>,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Number of nodes in the ring
        #[arg(short, long)]
        nodes: Option<usize>,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print energy, throughput and channel figures derived from the configuration
    Figures {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the figures as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            mode,
            seconds,
            seed,
            nodes,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let config = apply_overrides(config, mode, seed, nodes)?;
            run_simulation(config, seconds, json)
        }
        Commands::Figures { config, json } => {
            let config = load_config(config.as_deref())?;
            show_figures(&config, json)
        }
    }
}

/// Loads configuration from a JSON file, or from the environment.
///
/// # Errors
/// - `TdmaError::Io` - File could not be read
/// - `TdmaError::Parse` - File is not valid JSON
/// - `TdmaError::Config` - File or environment describes an invalid network
pub fn load_config(path: Option<&Path>) -> Result<TdmaConfig> {
    match path {
        Some(path) => TdmaConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => TdmaConfig::from_env()
            .map_err(TdmaError::from)
            .context("Invalid TDMASAT_* environment overrides"),
    }
}

/// Applies command-line overrides and re-validates.
///
/// Without a mode the loaded topology is kept. Scheduled mode clears the
/// emergency nodes; emergency mode without configured emergency nodes uses
/// the demonstration set, limited to nodes that exist.
///
/// # Errors
/// - `TdmaError::Config` - Overrides produce an invalid network
pub fn apply_overrides(
    mut config: TdmaConfig,
    mode: Option<Mode>,
    seed: Option<u64>,
    nodes: Option<usize>,
) -> Result<TdmaConfig> {
    if let Some(seed) = seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(nodes) = nodes {
        config.schedule.num_nodes = nodes;
    }

    match mode {
        Some(Mode::Scheduled) => config.topology.emergency_nodes.clear(),
        Some(Mode::Emergency) if config.topology.emergency_nodes.is_empty() => {
            let num_nodes = config.schedule.num_nodes;
            config.topology.emergency_nodes = TdmaConfig::emergency_demo()
                .topology
                .emergency_nodes
                .into_iter()
                .filter(|&id| (id as usize) < num_nodes)
                .collect();
        }
        Some(Mode::Emergency) | None => {}
    }

    config.validate().map_err(TdmaError::from)?;
    Ok(config)
}

/// Run the simulation headless
///
/// # Errors
/// - `SimulationError::RandomSourceUnavailable` - No seed and no OS entropy
/// - `SimulationError::TooManyInvariantViolations` - Network broke an invariant repeatedly
pub fn run_simulation(config: TdmaConfig, seconds: Option<u64>, json: bool) -> Result<()> {
    let seconds = seconds.unwrap_or(config.simulation.duration_secs);
    let mut driver = SimulationDriver::new(config)
        .context("Failed to set up simulation")?
        .with_standard_invariants();

    info!(seconds, seed = ?driver.seed(), "Starting headless run");
    let report = driver
        .run_for(seconds)
        .context("Simulation aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", report.summary());
    println!();
    print_snapshot(&driver.snapshot());
    Ok(())
}

fn print_snapshot(snapshot: &NetworkSnapshot) {
    println!("Node states at {}", snapshot.clock_label());
    println!("{:-<72}", "");
    println!(
        "{:>4}  {:<10} {:<8} {:>6} {:>8} {:>10}  {}",
        "node", "policy", "power", "sent", "buffered", "next (s)", "flag"
    );
    for node in &snapshot.nodes {
        let flag = node
            .emergency_flag
            .map(|flag| flag.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<10} {:<8} {:>6} {:>8} {:>10}  {}",
            node.node_id,
            node.policy.as_str(),
            node.power_state.as_str(),
            node.transmission_count,
            node.buffered,
            node.seconds_until_window,
            flag
        );
    }
    println!(
        "Satellite: {} packets, {} bytes",
        snapshot.satellite.packets_received, snapshot.satellite.total_bytes_received
    );
}

/// Print figures derived from the configuration
///
/// # Errors
/// - `serde_json::Error` - Figures could not be serialized
pub fn show_figures(config: &TdmaConfig, json: bool) -> Result<()> {
    let figures = ConfiguredFigures::from_config(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&figures)?);
    } else {
        println!("Configured network figures ({} nodes)", config.schedule.num_nodes);
        println!("{:-<53}", "");
        print!("{}", figures.summary());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_scheduled_mode_clears_emergency_nodes() {
        let config = apply_overrides(TdmaConfig::emergency_demo(), Some(Mode::Scheduled), Some(3), None)
            .unwrap();

        assert!(config.topology.emergency_nodes.is_empty());
        assert_eq!(config.simulation.seed, Some(3));
    }

    #[test]
    fn test_emergency_mode_defaults_to_demo_nodes() {
        let config = apply_overrides(TdmaConfig::default(), Some(Mode::Emergency), None, None).unwrap();
        assert_eq!(config.topology.emergency_nodes, vec![0, 1]);

        let single = apply_overrides(TdmaConfig::default(), Some(Mode::Emergency), None, Some(1))
            .unwrap();
        assert_eq!(single.topology.emergency_nodes, vec![0]);
    }

    #[test]
    fn test_invalid_override_is_user_error() {
        let error =
            apply_overrides(TdmaConfig::default(), Some(Mode::Scheduled), None, Some(0)).unwrap_err();

        let tdma_error = error.downcast_ref::<TdmaError>().unwrap();
        assert!(tdma_error.is_user_error());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"schedule": {{"num_nodes": 3}}}}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.schedule.num_nodes, 3);

        let missing = load_config(Some(Path::new("/nonexistent/tdmasat.json"))).unwrap_err();
        assert!(missing.downcast_ref::<TdmaError>().is_some());
    }

    #[test]
    fn test_no_mode_keeps_file_topology() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"topology": {{"emergency_nodes": [2]}}}}"#).unwrap();

        let loaded = load_config(Some(file.path())).unwrap();
        let config = apply_overrides(loaded.clone(), None, Some(8), None).unwrap();
        assert_eq!(config.topology.emergency_nodes, vec![2]);
        assert_eq!(config.simulation.seed, Some(8));

        // An explicit mode still wins over the file
        let scheduled = apply_overrides(loaded.clone(), Some(Mode::Scheduled), None, None).unwrap();
        assert!(scheduled.topology.emergency_nodes.is_empty());
        let emergency = apply_overrides(loaded, Some(Mode::Emergency), None, None).unwrap();
        assert_eq!(emergency.topology.emergency_nodes, vec![2]);
    }

    #[test]
    fn test_mode_flag_is_optional() {
        use clap::Parser;

        use crate::Cli;

        let cli = Cli::try_parse_from(["tdmasat", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { mode: None, .. }));

        let cli = Cli::try_parse_from(["tdmasat", "run", "--mode", "emergency"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                mode: Some(Mode::Emergency),
                ..
            }
        ));
    }
}
