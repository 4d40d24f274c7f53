//! Resampling to a target grid size.

use glam::DVec3;

use crate::error::FilterError;
use crate::filter::{Filter, describe_with, required};
use crate::image::{Geometry, Volume};
use crate::kernels::{CpuKernels, ImageKernels};
use crate::params::{FilterParams, ResamplingParams};

/// Resamples a volume to a requested voxel count per axis.
///
/// The physical field of view is preserved: the new spacing is
/// `old_spacing * old_size / new_size`, origin and direction are kept.
#[derive(Debug, Clone, Default)]
pub struct ImageResampling<K = CpuKernels> {
    kernels: K,
}

impl ImageResampling {
    pub fn new() -> Self {
        Self::with_kernels(CpuKernels)
    }
}

impl<K: ImageKernels> ImageResampling<K> {
    pub fn with_kernels(kernels: K) -> Self {
        Self { kernels }
    }
}

/// Output grid covering the same field of view with `size` voxels.
pub fn target_grid(input: &Geometry, size: [usize; 3]) -> Geometry {
    let scale = DVec3::new(
        input.size[0] as f64 / size[0] as f64,
        input.size[1] as f64 / size[1] as f64,
        input.size[2] as f64 / size[2] as f64,
    );
    Geometry {
        size,
        spacing: input.spacing * scale,
        origin: input.origin,
        direction: input.direction,
    }
}

impl<K: ImageKernels> Filter for ImageResampling<K> {
    fn name(&self) -> &'static str {
        "ImageResampling"
    }

    fn execute(&self, image: &Volume, params: Option<&FilterParams>) -> Result<Volume, FilterError> {
        let params = required(self.name(), params, "resampling", FilterParams::as_resampling)?;
        let grid = target_grid(image.geometry(), params.size());
        tracing::debug!(
            "{}: {:?} -> {:?} ({})",
            self.name(),
            image.size(),
            grid.size,
            params.interpolation()
        );

        Ok(self
            .kernels
            .resample_to_grid(image, &grid, params.interpolation())?)
    }

    fn describe(&self, params: Option<&FilterParams>) -> String {
        describe_with(
            self.name(),
            params.and_then(FilterParams::as_resampling),
            |p: &ResamplingParams| format!("size={:?}, interpolation={}", p.size(), p.interpolation()),
        )
    }
}
