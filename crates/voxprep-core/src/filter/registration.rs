//! Registration to an atlas with a precomputed transform.
//!
//! The transform is supplied by the caller; this stage only applies it,
//! resampling the input into the atlas grid.

use crate::error::FilterError;
use crate::filter::{Filter, describe_with, required};
use crate::image::Volume;
use crate::kernels::{CpuKernels, ImageKernels};
use crate::params::{FilterParams, RegistrationParams};

/// Value written where the transformed grid falls outside the input.
pub const FILL_VALUE: f32 = 0.0;

#[derive(Debug, Clone, Default)]
pub struct ImageRegistration<K = CpuKernels> {
    kernels: K,
}

impl ImageRegistration {
    pub fn new() -> Self {
        Self::with_kernels(CpuKernels)
    }
}

impl<K: ImageKernels> ImageRegistration<K> {
    pub fn with_kernels(kernels: K) -> Self {
        Self { kernels }
    }
}

impl<K: ImageKernels> Filter for ImageRegistration<K> {
    fn name(&self) -> &'static str {
        "ImageRegistration"
    }

    fn execute(&self, image: &Volume, params: Option<&FilterParams>) -> Result<Volume, FilterError> {
        let params = required(self.name(), params, "registration", FilterParams::as_registration)?;
        let interpolation = params.interpolation();
        tracing::debug!(
            "{}: {:?} -> atlas {:?} ({}, ground_truth={})",
            self.name(),
            image.size(),
            params.atlas().size(),
            interpolation,
            params.is_ground_truth()
        );

        Ok(self.kernels.resample_to_reference(
            image,
            params.atlas().geometry(),
            params.transform(),
            interpolation,
            FILL_VALUE,
        )?)
    }

    fn describe(&self, params: Option<&FilterParams>) -> String {
        describe_with(
            self.name(),
            params.and_then(FilterParams::as_registration),
            |p: &RegistrationParams| {
                format!(
                    "atlas={:?}, transform={}, ground_truth={}, interpolation={}",
                    p.atlas().size(),
                    p.transform(),
                    p.is_ground_truth(),
                    p.interpolation()
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Geometry;
    use crate::kernels::Interpolation;
    use crate::transform::SpatialTransform;
    use glam::{DMat3, DVec3};

    fn atlas() -> Volume {
        let geometry = Geometry::new([5, 4, 6])
            .with_spacing(DVec3::new(1.5, 1.5, 1.0))
            .with_origin(DVec3::new(-2.0, -1.0, 0.5))
            .with_direction(DMat3::from_rotation_z(0.25));
        Volume::filled(geometry, 0.0).unwrap()
    }

    fn labels() -> Volume {
        Volume::from_fn(Geometry::new([8, 8, 8]), |[x, y, z]| ((x / 3 + y / 3 + z / 3) % 3) as f32).unwrap()
    }

    #[test]
    fn test_output_geometry_is_atlas_geometry() {
        let atlas = atlas();
        let inputs = [
            labels(),
            Volume::filled(
                Geometry::new([3, 9, 2])
                    .with_spacing(DVec3::new(0.3, 2.0, 4.0))
                    .with_origin(DVec3::splat(10.0)),
                1.0,
            )
            .unwrap(),
        ];
        for input in inputs {
            let params: FilterParams =
                RegistrationParams::new(atlas.clone(), SpatialTransform::translation(DVec3::X), false).into();
            let out = ImageRegistration::new().execute(&input, Some(&params)).unwrap();
            assert_eq!(out.geometry(), atlas.geometry());
        }
    }

    #[test]
    fn test_ground_truth_keeps_label_values() {
        let input = labels();
        let params: FilterParams = RegistrationParams::new(
            atlas(),
            SpatialTransform::translation(DVec3::new(2.3, 1.7, 0.4)),
            true,
        )
        .into();
        let out = ImageRegistration::new().execute(&input, Some(&params)).unwrap();
        assert!(out.samples().iter().all(|v| [0.0, 1.0, 2.0].contains(v)));
    }

    #[test]
    fn test_outside_input_uses_fill_value() {
        let input = Volume::filled(Geometry::new([2, 2, 2]), 9.0).unwrap();
        let params: FilterParams = RegistrationParams::new(
            atlas(),
            SpatialTransform::translation(DVec3::splat(100.0)),
            false,
        )
        .with_interpolation(Interpolation::Linear)
        .into();
        let out = ImageRegistration::new().execute(&input, Some(&params)).unwrap();
        assert!(out.samples().iter().all(|&v| v == FILL_VALUE));
    }

    #[test]
    fn test_wrong_parameter_variant() {
        let params: FilterParams = crate::params::SkullStrippingParams::new(atlas()).into();
        let err = ImageRegistration::new().execute(&labels(), Some(&params)).unwrap_err();
        assert!(err.to_string().contains("expects registration parameters"));
    }
}
