use std::path::{Path, PathBuf};

use anyhow::Context;
use voxprep_core::config::PipelineConfig;
use voxprep_core::diagnostics::{SliceSnapshots, StageStatistics};
use voxprep_core::error::BoxError;
use voxprep_core::{FilterPipeline, Geometry, Volume};

use crate::cli::{DescribeArgs, RunArgs, SynthArgs};
use crate::volume_io::{read_volume, write_volume};

/// Directory relative config paths are resolved against.
fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn load_pipeline(config_path: &Path) -> anyhow::Result<(PipelineConfig, FilterPipeline)> {
    let config = PipelineConfig::from_path(config_path)?;
    let base = config_dir(config_path);
    let loader = |path: &Path| -> Result<Volume, BoxError> { Ok(read_volume(&base.join(path))?) };
    let pipeline = config.build(&loader)?;
    tracing::info!(
        "loaded {} with {} stages",
        config_path.display(),
        pipeline.len()
    );
    Ok((config, pipeline))
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let (config, pipeline) = load_pipeline(&args.config)?;
    let input = read_volume(&args.input)?;

    let snapshot_dir = args.snapshots.clone().or_else(|| {
        config
            .diagnostics
            .snapshots
            .as_ref()
            .map(|dir| config_dir(&args.config).join(dir))
    });
    let want_stats = args.stats || config.diagnostics.statistics;

    let mut observers = (
        want_stats.then(StageStatistics::default),
        snapshot_dir.map(SliceSnapshots::new),
    );
    let output = pipeline.execute_with_observer(&input, &mut observers)?;
    write_volume(&output, &args.output)?;
    tracing::info!("wrote {} {:?}", args.output.display(), output.size());

    let (stats, snapshots) = observers;
    if let Some(snapshots) = snapshots {
        tracing::info!("{} snapshots written", snapshots.written().len());
    }
    if let Some(stats) = stats {
        let json = serde_json::to_string_pretty(&stats).context("failed to serialize statistics")?;
        println!("{json}");
    }
    Ok(())
}

pub fn describe(args: DescribeArgs) -> anyhow::Result<()> {
    let (_, pipeline) = load_pipeline(&args.config)?;
    if pipeline.is_empty() {
        println!("(empty pipeline)");
    }
    for (index, descriptor) in pipeline.descriptors().iter().enumerate() {
        println!("{index:>2}  {descriptor}");
    }
    Ok(())
}

pub fn synth(args: SynthArgs) -> anyhow::Result<()> {
    let size: [usize; 3] = args
        .size
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("--size needs exactly 3 values, got {}", args.size.len()))?;

    let span = size[0].saturating_sub(1).max(1) as f32;
    let volume = Volume::from_fn(Geometry::new(size), |[x, _, _]| {
        if args.gradient {
            args.value * x as f32 / span
        } else {
            args.value
        }
    })?;
    write_volume(&volume, &args.output)?;
    tracing::info!("wrote synthetic volume {} {:?}", args.output.display(), size);
    Ok(())
}
