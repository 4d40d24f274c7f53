//! Resampling onto a target grid through a spatial transform.

use glam::DVec3;

use crate::error::KernelError;
use crate::image::{Geometry, Volume};
use crate::kernels::interpolate::{Interpolation, Sampler};
use crate::transform::SpatialTransform;

/// Resample `image` onto `reference`.
///
/// For every output voxel the physical position in `reference` is mapped
/// through `transform` into the input's physical space and interpolated there.
/// Positions that land outside the input buffer receive `fill`.
pub fn resample(
    image: &Volume,
    reference: &Geometry,
    transform: &SpatialTransform,
    interpolation: Interpolation,
    fill: f32,
) -> Result<Volume, KernelError> {
    reference.validate()?;

    let sampler = Sampler::new(image, interpolation);
    let to_input_index = image.geometry().index_mapping();
    let [nx, ny, nz] = reference.size;
    let mut samples = Vec::with_capacity(reference.voxel_count());

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let physical = reference.index_to_physical(DVec3::new(x as f64, y as f64, z as f64));
                let moving = transform.transform_point(physical);
                let index = to_input_index.apply(moving);
                samples.push(sampler.sample(index).unwrap_or(fill));
            }
        }
    }

    Ok(Volume::new(*reference, samples)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DMat3;

    fn labels() -> Volume {
        Volume::from_fn(Geometry::new([4, 4, 4]), |[x, y, z]| ((x + y + z) % 3) as f32).unwrap()
    }

    #[test]
    fn test_identity_onto_own_grid_is_lossless() {
        let volume = labels();
        for interpolation in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Spline] {
            let out = resample(&volume, volume.geometry(), &SpatialTransform::IDENTITY, interpolation, -1.0)
                .unwrap();
            for (a, b) in out.samples().iter().zip(volume.samples()) {
                assert!((a - b).abs() < 1e-4, "{interpolation}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_translation_shifts_content_and_fills_outside() {
        let volume = labels();
        let shift = SpatialTransform::translation(DVec3::new(1.0, 0.0, 0.0));
        let out = resample(&volume, volume.geometry(), &shift, Interpolation::Nearest, -1.0).unwrap();
        assert_eq!(out.get([0, 1, 2]), volume.get([1, 1, 2]));
        assert_eq!(out.get([3, 0, 0]), -1.0);
    }

    #[test]
    fn test_output_takes_reference_geometry() {
        let volume = labels();
        let reference = Geometry::new([2, 3, 5])
            .with_spacing(DVec3::new(2.0, 1.5, 0.5))
            .with_origin(DVec3::new(0.5, 0.0, 0.0))
            .with_direction(DMat3::from_rotation_x(0.1));
        let out = resample(&volume, &reference, &SpatialTransform::IDENTITY, Interpolation::Linear, 0.0)
            .unwrap();
        assert_eq!(*out.geometry(), reference);
        assert_eq!(out.samples().len(), 30);
    }

    #[test]
    fn test_invalid_reference_is_rejected() {
        let volume = labels();
        let reference = Geometry::new([0, 3, 5]);
        assert!(matches!(
            resample(&volume, &reference, &SpatialTransform::IDENTITY, Interpolation::Linear, 0.0),
            Err(KernelError::Image(_))
        ));
    }
}
