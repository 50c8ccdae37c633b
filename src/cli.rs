//! Command-line surface: one positional config path, `-v/--verbose`,
//! and an optional `--transport` override.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "tmon-collector", about = "Temperature telemetry collector")]
pub struct Cli {
    /// Path to the TOML configuration file.
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the transport selected in the config file.
    #[arg(long, value_parser = ["rs485", "udp"])]
    pub transport: Option<String>,
}
