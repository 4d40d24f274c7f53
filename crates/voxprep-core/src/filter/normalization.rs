//! Min-max intensity normalization to `[0, 1]`.

use crate::error::FilterError;
use crate::filter::Filter;
use crate::image::Volume;
use crate::params::FilterParams;

/// Rescales samples linearly so the minimum maps to 0 and the maximum to 1.
///
/// A constant volume has no range to rescale and is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNormalization;

impl ImageNormalization {
    pub fn new() -> Self {
        Self
    }
}

impl Filter for ImageNormalization {
    fn name(&self) -> &'static str {
        "ImageNormalization"
    }

    fn execute(&self, image: &Volume, params: Option<&FilterParams>) -> Result<Volume, FilterError> {
        if let Some(params) = params {
            return Err(FilterError::parameter(format!(
                "{} takes no parameters, got {}",
                self.name(),
                params.kind()
            )));
        }
        tracing::debug!("{}: {:?}", self.name(), image.size());

        let Some((min, max)) = image.min_max() else {
            return Ok(image.clone());
        };
        if max == min {
            return Ok(image.clone());
        }

        let range = max - min;
        let samples = image.samples().iter().map(|&v| (v - min) / range).collect();
        Ok(Volume::from_array(samples, image)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Geometry;
    use crate::params::{DenoisingMethod, DenoisingParams};
    use glam::DVec3;

    #[test]
    fn test_output_spans_unit_interval() {
        let geometry = Geometry::new([4, 3, 2]).with_spacing(DVec3::new(0.7, 1.0, 3.0));
        let image = Volume::from_fn(geometry, |[x, y, z]| 10.0 + x as f32 * 3.0 - y as f32 + z as f32 * 0.5)
            .unwrap();
        let out = ImageNormalization.execute(&image, None).unwrap();

        assert!(out.samples().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(out.min_max(), Some((0.0, 1.0)));
        assert_eq!(out.geometry(), image.geometry());
    }

    #[test]
    fn test_constant_volume_is_returned_unchanged() {
        let image = Volume::filled(Geometry::new([3, 3, 3]), 5.0).unwrap();
        let out = ImageNormalization.execute(&image, None).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_rejects_parameters() {
        let image = Volume::filled(Geometry::new([2, 2, 2]), 1.0).unwrap();
        let params = FilterParams::from(DenoisingParams::new(DenoisingMethod::median()).unwrap());
        assert!(matches!(
            ImageNormalization.execute(&image, Some(&params)),
            Err(FilterError::Parameter(_))
        ));
    }

    #[test]
    fn test_describe_is_plain_name() {
        let params = FilterParams::from(DenoisingParams::new(DenoisingMethod::median()).unwrap());
        assert_eq!(ImageNormalization.describe(None), "ImageNormalization");
        assert_eq!(ImageNormalization.describe(Some(&params)), "ImageNormalization");
    }
}
