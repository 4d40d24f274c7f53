//! Numeric kernels the filters delegate to.
//!
//! Filters never touch interpolation or convolution code directly; they call
//! an [`ImageKernels`] implementation. [`CpuKernels`] is the in-crate
//! reference backend; other backends (a toolkit binding, a GPU path) plug in
//! by implementing the same trait.

pub mod interpolate;
pub mod resample;
pub mod smoothing;

pub use interpolate::Interpolation;

use crate::error::KernelError;
use crate::image::{Geometry, Volume};
use crate::transform::SpatialTransform;

/// The narrow kernel surface consumed by the pipeline's filters.
pub trait ImageKernels: Send + Sync {
    /// Gaussian smoothing with `sigma` in physical units.
    fn blur(&self, image: &Volume, sigma: f64) -> Result<Volume, KernelError>;

    /// Median over a box of `2r + 1` voxels per axis.
    fn median(&self, image: &Volume, radius: [usize; 3]) -> Result<Volume, KernelError>;

    /// Resample onto `grid` with an identity transform; out-of-buffer voxels become 0.
    fn resample_to_grid(
        &self,
        image: &Volume,
        grid: &Geometry,
        interpolation: Interpolation,
    ) -> Result<Volume, KernelError> {
        self.resample_to_reference(image, grid, &SpatialTransform::IDENTITY, interpolation, 0.0)
    }

    /// Resample into `reference` space through `transform`, filling with `fill`.
    fn resample_to_reference(
        &self,
        image: &Volume,
        reference: &Geometry,
        transform: &SpatialTransform,
        interpolation: Interpolation,
        fill: f32,
    ) -> Result<Volume, KernelError>;

    /// Keep samples where `mask` is non-zero, replace the rest with `background`.
    fn mask_apply(&self, image: &Volume, mask: &Volume, background: f32) -> Result<Volume, KernelError>;
}

/// Single-threaded CPU implementation of [`ImageKernels`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuKernels;

impl ImageKernels for CpuKernels {
    fn blur(&self, image: &Volume, sigma: f64) -> Result<Volume, KernelError> {
        smoothing::gaussian_blur(image, sigma)
    }

    fn median(&self, image: &Volume, radius: [usize; 3]) -> Result<Volume, KernelError> {
        smoothing::median_filter(image, radius)
    }

    fn resample_to_reference(
        &self,
        image: &Volume,
        reference: &Geometry,
        transform: &SpatialTransform,
        interpolation: Interpolation,
        fill: f32,
    ) -> Result<Volume, KernelError> {
        resample::resample(image, reference, transform, interpolation, fill)
    }

    fn mask_apply(&self, image: &Volume, mask: &Volume, background: f32) -> Result<Volume, KernelError> {
        if let Some(detail) = image.geometry().mismatch(mask.geometry()) {
            return Err(KernelError::InvalidArgument(format!(
                "mask geometry differs from image: {detail}"
            )));
        }
        let samples = image
            .samples()
            .iter()
            .zip(mask.samples())
            .map(|(&v, &m)| if m != 0.0 { v } else { background })
            .collect();
        Ok(Volume::from_array(samples, image)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_mask_apply_selects_samples() {
        let geometry = Geometry::new([4, 1, 1]);
        let image = Volume::new(geometry, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mask = Volume::new(geometry, vec![1.0, 0.0, 0.5, 0.0]).unwrap();
        let out = CpuKernels.mask_apply(&image, &mask, -5.0).unwrap();
        assert_eq!(out.samples(), &[1.0, -5.0, 3.0, -5.0]);
    }

    #[test]
    fn test_mask_apply_rejects_other_grid() {
        let image = Volume::filled(Geometry::new([4, 1, 1]), 1.0).unwrap();
        let mask = Volume::filled(
            Geometry::new([4, 1, 1]).with_spacing(DVec3::new(2.0, 1.0, 1.0)),
            1.0,
        )
        .unwrap();
        assert!(CpuKernels.mask_apply(&image, &mask, 0.0).is_err());
    }

    #[test]
    fn test_resample_to_grid_keeps_physical_alignment() {
        let image = Volume::from_fn(Geometry::new([4, 4, 4]), |[x, _, _]| x as f32).unwrap();
        let grid = Geometry::new([2, 4, 4]).with_spacing(DVec3::new(2.0, 1.0, 1.0));
        let out = CpuKernels.resample_to_grid(&image, &grid, Interpolation::Nearest).unwrap();
        assert_eq!(out.get([0, 0, 0]), 0.0);
        assert_eq!(out.get([1, 0, 0]), 2.0);
    }
}
