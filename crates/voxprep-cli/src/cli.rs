use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "voxprep",
    version,
    about = "Pre-process 3-D medical volumes through a configurable filter pipeline",
    long_about = "voxprep runs normalization, resampling, denoising, skull stripping and \
                  atlas registration stages, described in a JSON pipeline config, over a \
                  raw volume (JSON header + little-endian f32 payload)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a pipeline config on a volume
    Run(RunArgs),

    /// Print the stages of a pipeline config without running them
    Describe(DescribeArgs),

    /// Write a synthetic test volume
    Synth(SynthArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Pipeline config (JSON)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Input volume header
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output volume header; the payload is written next to it
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Write a middle-slice PNG per stage into this directory
    #[arg(long, value_name = "DIR")]
    pub snapshots: Option<PathBuf>,

    /// Print per-stage intensity statistics as JSON
    #[arg(long)]
    pub stats: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DescribeArgs {
    /// Pipeline config (JSON)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct SynthArgs {
    /// Voxel counts along x, y and z, comma separated
    #[arg(long, value_delimiter = ',', default_value = "32,32,32")]
    pub size: Vec<usize>,

    /// Sample value (the gradient's maximum with --gradient)
    #[arg(long, default_value_t = 1.0)]
    pub value: f32,

    /// Ramp linearly along x from 0 to --value instead of a constant
    #[arg(long)]
    pub gradient: bool,

    /// Output volume header
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,
}
