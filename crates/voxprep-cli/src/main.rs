use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use voxprep_core::ConfigError;

mod cli;
mod commands;
mod volume_io;

use crate::cli::{Cli, Commands};
use crate::volume_io::VolumeIoError;

fn main() {
    // VOXPREP_LOG sets the level unless RUST_LOG gives a full filter.
    let log_level = std::env::var("VOXPREP_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(exit_code(&e));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => commands::run(args),
        Commands::Describe(args) => commands::describe(args),
        Commands::Synth(args) => commands::synth(args),
    }
}

/// 2 for invalid configs, 3 for file I/O, 1 for everything else.
fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(config) = error.downcast_ref::<ConfigError>() {
        return match config {
            ConfigError::Io(_) | ConfigError::Auxiliary { .. } => 3,
            _ => 2,
        };
    }
    if error.downcast_ref::<VolumeIoError>().is_some() {
        return 3;
    }
    1
}
