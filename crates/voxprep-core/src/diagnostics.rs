//! Diagnostic side channel for pipeline runs.
//!
//! Observers see every stage output but cannot change it, so switching them
//! on or off never alters the pipeline result.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::image::Volume;

/// Receives each stage's output as the pipeline runs.
pub trait StageObserver {
    fn on_stage(&mut self, index: usize, descriptor: &str, output: &Volume);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&mut self, _: usize, _: &str, _: &Volume) {}
}

/// A disabled observer is a no-op.
impl<T: StageObserver> StageObserver for Option<T> {
    fn on_stage(&mut self, index: usize, descriptor: &str, output: &Volume) {
        if let Some(observer) = self {
            observer.on_stage(index, descriptor, output);
        }
    }
}

impl<A: StageObserver, B: StageObserver> StageObserver for (A, B) {
    fn on_stage(&mut self, index: usize, descriptor: &str, output: &Volume) {
        self.0.on_stage(index, descriptor, output);
        self.1.on_stage(index, descriptor, output);
    }
}

/// Intensity summary of one stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub index: usize,
    pub descriptor: String,
    pub size: [usize; 3],
    pub min: f32,
    pub max: f32,
    pub mean: f64,
}

/// Collects a [`StageSummary`] per stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageStatistics {
    pub stages: Vec<StageSummary>,
}

impl StageObserver for StageStatistics {
    fn on_stage(&mut self, index: usize, descriptor: &str, output: &Volume) {
        let (min, max) = output.min_max().unwrap_or((f32::NAN, f32::NAN));
        self.stages.push(StageSummary {
            index,
            descriptor: descriptor.to_string(),
            size: output.size(),
            min,
            max,
            mean: output.mean().unwrap_or(f64::NAN),
        });
    }
}

/// Keeps a copy of every intermediate volume.
#[derive(Debug, Clone, Default)]
pub struct Intermediates {
    pub volumes: Vec<(String, Volume)>,
}

impl StageObserver for Intermediates {
    fn on_stage(&mut self, _: usize, descriptor: &str, output: &Volume) {
        self.volumes.push((descriptor.to_string(), output.clone()));
    }
}

/// Render the middle z-slice as 8-bit grayscale, windowed to the slice range.
pub fn middle_slice(volume: &Volume) -> GrayImage {
    let [nx, ny, nz] = volume.size();
    let z = nz / 2;
    let value = |x: u32, y: u32| volume.get([x as usize, y as usize, z]);

    let (lo, hi) = (0..ny as u32)
        .flat_map(|y| (0..nx as u32).map(move |x| (x, y)))
        .map(|(x, y)| value(x, y))
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = hi - lo;

    GrayImage::from_fn(nx as u32, ny as u32, |x, y| {
        let v = value(x, y);
        let level = if range > 0.0 && v.is_finite() {
            ((v - lo) / range * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        Luma([level])
    })
}

/// Write [`middle_slice`] of `volume` as a PNG.
pub fn save_middle_slice(volume: &Volume, path: &Path) -> image::ImageResult<()> {
    middle_slice(volume).save(path)
}

/// Writes the middle slice of every stage output into a directory.
///
/// Failures are logged and skipped.
#[derive(Debug, Clone)]
pub struct SliceSnapshots {
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl SliceSnapshots {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            written: Vec::new(),
        }
    }

    /// Paths written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl StageObserver for SliceSnapshots {
    fn on_stage(&mut self, index: usize, descriptor: &str, output: &Volume) {
        let name: String = descriptor
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        let path = self.directory.join(format!("stage_{index:02}_{name}.png"));

        if let Err(e) = std::fs::create_dir_all(&self.directory) {
            tracing::warn!("cannot create snapshot directory {}: {e}", self.directory.display());
            return;
        }
        match save_middle_slice(output, &path) {
            Ok(()) => {
                tracing::debug!("wrote snapshot {}", path.display());
                self.written.push(path);
            }
            Err(e) => tracing::warn!("failed to write snapshot {}: {e}", path.display()),
        }
    }
}
