//! Volume representation shared by every pipeline stage.
//!
//! A [`Volume`] is a dense 3-D `f32` sample array plus the [`Geometry`] that
//! places it in physical space. Volumes are values: filters read them by
//! reference and build new ones for their output.

use std::fmt;

use glam::{DMat3, DVec3};

use crate::error::ImageError;

/// Tolerance used when comparing spacing, origin and direction.
pub const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// Spatial metadata of a volume, independent of its sample values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Number of voxels along x, y and z.
    pub size: [usize; 3],
    /// Physical distance between voxel centres along each axis.
    pub spacing: DVec3,
    /// Physical position of voxel `(0, 0, 0)`.
    pub origin: DVec3,
    /// Axis direction cosines, one column per image axis.
    pub direction: DMat3,
}

impl Geometry {
    /// Unit spacing, zero origin, identity direction.
    pub fn new(size: [usize; 3]) -> Self {
        Self {
            size,
            spacing: DVec3::ONE,
            origin: DVec3::ZERO,
            direction: DMat3::IDENTITY,
        }
    }

    pub fn with_spacing(mut self, spacing: DVec3) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_origin(mut self, origin: DVec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_direction(mut self, direction: DMat3) -> Self {
        self.direction = direction;
        self
    }

    /// Total number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.size.iter().product()
    }

    /// Physical field of view (`size * spacing` per axis).
    pub fn extent(&self) -> DVec3 {
        DVec3::new(
            self.size[0] as f64,
            self.size[1] as f64,
            self.size[2] as f64,
        ) * self.spacing
    }

    /// Check that the geometry describes a non-empty, invertible grid.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.size.contains(&0) {
            return Err(ImageError::InvalidGeometry(format!(
                "size must be positive on every axis, got {:?}",
                self.size
            )));
        }
        if !self.spacing.is_finite() || self.spacing.min_element() <= 0.0 {
            return Err(ImageError::InvalidGeometry(format!(
                "spacing must be finite and positive, got {}",
                self.spacing
            )));
        }
        if !self.origin.is_finite() {
            return Err(ImageError::InvalidGeometry(format!(
                "origin must be finite, got {}",
                self.origin
            )));
        }
        if !self.direction.is_finite() || self.direction.determinant().abs() < 1e-12 {
            return Err(ImageError::InvalidGeometry(
                "direction matrix must be finite and invertible".to_string(),
            ));
        }
        Ok(())
    }

    /// Linear offset of voxel `(x, y, z)` in x-fastest order.
    #[inline]
    pub fn linear_index(&self, [x, y, z]: [usize; 3]) -> usize {
        x + self.size[0] * (y + self.size[1] * z)
    }

    /// Physical position of a (possibly fractional) voxel index.
    #[inline]
    pub fn index_to_physical(&self, index: DVec3) -> DVec3 {
        self.origin + self.direction * (index * self.spacing)
    }

    /// Continuous voxel index of a physical point.
    pub fn physical_to_index(&self, point: DVec3) -> DVec3 {
        self.index_mapping().apply(point)
    }

    /// Precomputed physical-to-index mapping for tight loops.
    pub(crate) fn index_mapping(&self) -> IndexMapping {
        IndexMapping {
            origin: self.origin,
            inverse_direction: self.direction.inverse(),
            inverse_spacing: self.spacing.recip(),
        }
    }

    /// Describe how `other` differs from `self`, or `None` if they match.
    ///
    /// Size must match exactly; spacing, origin and direction within
    /// [`GEOMETRY_TOLERANCE`].
    pub fn mismatch(&self, other: &Geometry) -> Option<String> {
        if self.size != other.size {
            return Some(format!("size {:?} vs {:?}", self.size, other.size));
        }
        if !self.spacing.abs_diff_eq(other.spacing, GEOMETRY_TOLERANCE) {
            return Some(format!("spacing {} vs {}", self.spacing, other.spacing));
        }
        if !self.origin.abs_diff_eq(other.origin, GEOMETRY_TOLERANCE) {
            return Some(format!("origin {} vs {}", self.origin, other.origin));
        }
        if !self.direction.abs_diff_eq(other.direction, GEOMETRY_TOLERANCE) {
            return Some("direction cosines differ".to_string());
        }
        None
    }

    /// Whether `other` occupies the same physical grid.
    pub fn matches(&self, other: &Geometry) -> bool {
        self.mismatch(other).is_none()
    }
}

/// Physical point to continuous index: `D⁻¹ (p - origin) / spacing`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexMapping {
    origin: DVec3,
    inverse_direction: DMat3,
    inverse_spacing: DVec3,
}

impl IndexMapping {
    #[inline]
    pub(crate) fn apply(&self, point: DVec3) -> DVec3 {
        (self.inverse_direction * (point - self.origin)) * self.inverse_spacing
    }
}

/// Dense 3-D scalar image with physical geometry.
#[derive(Clone, PartialEq)]
pub struct Volume {
    geometry: Geometry,
    samples: Vec<f32>,
}

impl Volume {
    /// Build a volume, checking the geometry and the sample count.
    pub fn new(geometry: Geometry, samples: Vec<f32>) -> Result<Self, ImageError> {
        geometry.validate()?;
        let expected = geometry.voxel_count();
        if samples.len() != expected {
            return Err(ImageError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { geometry, samples })
    }

    /// A volume with every sample set to `value`.
    pub fn filled(geometry: Geometry, value: f32) -> Result<Self, ImageError> {
        geometry.validate()?;
        Ok(Self {
            samples: vec![value; geometry.voxel_count()],
            geometry,
        })
    }

    /// A volume whose samples are computed from their voxel index.
    pub fn from_fn(
        geometry: Geometry,
        mut f: impl FnMut([usize; 3]) -> f32,
    ) -> Result<Self, ImageError> {
        geometry.validate()?;
        let [nx, ny, nz] = geometry.size;
        let mut samples = Vec::with_capacity(geometry.voxel_count());
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    samples.push(f([x, y, z]));
                }
            }
        }
        Ok(Self { geometry, samples })
    }

    /// Wrap a numeric array produced from `reference`, copying its geometry.
    pub fn from_array(samples: Vec<f32>, reference: &Volume) -> Result<Self, ImageError> {
        Self::new(reference.geometry, samples)
    }

    /// Copy the samples out for array-level manipulation.
    pub fn to_array(&self) -> Vec<f32> {
        self.samples.clone()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn size(&self) -> [usize; 3] {
        self.geometry.size
    }

    pub fn spacing(&self) -> DVec3 {
        self.geometry.spacing
    }

    pub fn origin(&self) -> DVec3 {
        self.geometry.origin
    }

    pub fn direction(&self) -> DMat3 {
        self.geometry.direction
    }

    /// Samples in x-fastest order.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample at an integer voxel index.
    ///
    /// # Panics
    /// Panics if the index lies outside the volume.
    #[inline]
    pub fn get(&self, index: [usize; 3]) -> f32 {
        self.samples[self.geometry.linear_index(index)]
    }

    /// Smallest and largest finite sample, `None` if there is none.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.samples
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Mean of the finite samples.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0_f64, 0_usize), |(s, n), &v| (s + v as f64, n + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("geometry", &self.geometry)
            .field("samples", &self.samples.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oblique_geometry() -> Geometry {
        let rotation = DMat3::from_rotation_z(0.3);
        Geometry::new([4, 5, 6])
            .with_spacing(DVec3::new(0.5, 1.0, 2.0))
            .with_origin(DVec3::new(-10.0, 4.0, 2.5))
            .with_direction(rotation)
    }

    #[test]
    fn test_new_rejects_wrong_sample_count() {
        let err = Volume::new(Geometry::new([2, 2, 2]), vec![0.0; 7]).unwrap_err();
        assert!(matches!(
            err,
            ImageError::SampleCount {
                expected: 8,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_new_rejects_zero_size_and_bad_spacing() {
        assert!(Volume::filled(Geometry::new([0, 2, 2]), 1.0).is_err());
        let flat = Geometry::new([2, 2, 2]).with_spacing(DVec3::new(1.0, 0.0, 1.0));
        assert!(Volume::filled(flat, 1.0).is_err());
    }

    #[test]
    fn test_from_array_copies_geometry() {
        let geometry = oblique_geometry();
        let source = Volume::filled(geometry, 2.0).unwrap();
        let doubled: Vec<f32> = source.to_array().iter().map(|v| v * 2.0).collect();
        let out = Volume::from_array(doubled, &source).unwrap();
        assert_eq!(out.geometry(), source.geometry());
        assert!(out.samples().iter().all(|&v| v == 4.0));
    }

    #[test]
    fn test_from_fn_uses_x_fastest_order() {
        let volume = Volume::from_fn(Geometry::new([3, 2, 2]), |[x, y, z]| {
            (x + 10 * y + 100 * z) as f32
        })
        .unwrap();
        assert_eq!(volume.samples()[1], 1.0);
        assert_eq!(volume.samples()[3], 10.0);
        assert_eq!(volume.samples()[6], 100.0);
        assert_eq!(volume.get([2, 1, 1]), 112.0);
    }

    #[test]
    fn test_physical_index_round_trip() {
        let geometry = oblique_geometry();
        let index = DVec3::new(1.5, 2.0, 3.25);
        let point = geometry.index_to_physical(index);
        let back = geometry.physical_to_index(point);
        assert!(back.abs_diff_eq(index, 1e-9), "{back} vs {index}");
    }

    #[test]
    fn test_mismatch_reports_first_difference() {
        let a = oblique_geometry();
        assert!(a.matches(&a));

        let resized = Geometry { size: [4, 5, 7], ..a };
        assert!(a.mismatch(&resized).unwrap().starts_with("size"));

        let shifted = a.with_origin(a.origin + DVec3::new(0.0, 0.0, 1e-3));
        assert!(a.mismatch(&shifted).unwrap().starts_with("origin"));

        let nudged = a.with_origin(a.origin + DVec3::splat(1e-9));
        assert!(a.matches(&nudged));
    }

    #[test]
    fn test_min_max_ignores_nan() {
        let volume = Volume::new(Geometry::new([3, 1, 1]), vec![f32::NAN, -1.0, 4.0]).unwrap();
        assert_eq!(volume.min_max(), Some((-1.0, 4.0)));
        assert_eq!(volume.mean(), Some(1.5));
    }
}
