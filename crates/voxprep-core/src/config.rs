//! Serializable pipeline descriptions.
//!
//! A [`PipelineConfig`] is the on-disk form of a pipeline:
//!
//! ```json
//! {
//!   "stages": [
//!     { "filter": "normalization" },
//!     { "filter": "resampling", "size": [2, 2, 2], "interpolation": "nearest" },
//!     { "filter": "denoising", "method": "gaussian", "sigma": 0.8 },
//!     { "filter": "skull_stripping", "mask": "brain_mask.json" },
//!     { "filter": "registration", "atlas": "atlas.json",
//!       "transform": { "translation": [1.0, 0.0, -2.5] }, "is_ground_truth": false }
//!   ],
//!   "diagnostics": { "snapshots": "slices", "statistics": true }
//! }
//! ```
//!
//! Required fields are optional in the raw form so that an absent one is
//! reported as a parameter error naming the field.

use std::path::{Path, PathBuf};

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, ConfigError, FilterError};
use crate::filter::{
    Filter, ImageDenoising, ImageNormalization, ImageRegistration, ImageResampling, SkullStripping,
};
use crate::image::Volume;
use crate::kernels::Interpolation;
use crate::params::{
    DenoisingParams, FilterParams, RegistrationParams, ResamplingParams, SkullStrippingParams,
};
use crate::pipeline::FilterPipeline;
use crate::transform::SpatialTransform;

/// Resolves auxiliary image references (masks, atlases) to volumes.
pub trait AuxiliaryLoader {
    fn load_volume(&self, path: &Path) -> Result<Volume, BoxError>;
}

impl<F> AuxiliaryLoader for F
where
    F: Fn(&Path) -> Result<Volume, BoxError>,
{
    fn load_volume(&self, path: &Path) -> Result<Volume, BoxError> {
        self(path)
    }
}

/// Ordered stages plus diagnostic switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Diagnostic side channels. None of them affect the pipeline output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Directory for middle-slice PNG snapshots of every stage.
    #[serde(default)]
    pub snapshots: Option<PathBuf>,
    /// Log min/max/mean per stage.
    #[serde(default)]
    pub statistics: bool,
}

/// Raw description of one stage, tagged by `"filter"`.
///
/// Unknown keys are rejected so a misspelled knob never falls back to its
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum StageConfig {
    Normalization(NormalizationStage),
    Resampling(ResamplingStage),
    Denoising(DenoisingStage),
    SkullStripping(SkullStrippingStage),
    Registration(RegistrationStage),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizationStage {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResamplingStage {
    pub size: Option<Vec<usize>>,
    pub interpolation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenoisingStage {
    pub method: Option<String>,
    pub kernel_size: Option<usize>,
    pub sigma: Option<f64>,
    pub radius: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkullStrippingStage {
    pub mask: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationStage {
    pub atlas: Option<PathBuf>,
    pub transform: Option<TransformConfig>,
    pub is_ground_truth: Option<bool>,
    pub interpolation: Option<String>,
}

/// Serialized transform: `"identity"`, `{ "translation": [..] }` or
/// `{ "matrix": [[..], [..], [..]], "translation": [..] }` (matrix row-major).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformConfig {
    Named(String),
    Affine(AffineConfig),
}

/// Explicit affine parts; at least one must be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AffineConfig {
    #[serde(default)]
    pub matrix: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub translation: Option<[f64; 3]>,
}

impl TransformConfig {
    pub fn to_transform(&self) -> Result<SpatialTransform, FilterError> {
        match self {
            Self::Named(name) if name.eq_ignore_ascii_case("identity") => Ok(SpatialTransform::IDENTITY),
            Self::Named(name) => Err(FilterError::parameter(format!("unknown transform {name:?}"))),
            Self::Affine(AffineConfig {
                matrix: None,
                translation: None,
            }) => Err(FilterError::parameter(
                "transform needs `matrix` or `translation`; use \"identity\" for none",
            )),
            Self::Affine(AffineConfig {
                matrix,
                translation,
            }) => {
                let matrix = matrix
                    .map(|rows| DMat3::from_cols_array_2d(&rows).transpose())
                    .unwrap_or(DMat3::IDENTITY);
                let offset = translation.map(DVec3::from_array).unwrap_or(DVec3::ZERO);
                if !matrix.is_finite() || !offset.is_finite() {
                    return Err(FilterError::parameter("transform must be finite"));
                }
                Ok(SpatialTransform::affine(matrix, offset))
            }
        }
    }
}

fn missing(filter: &str, field: &str) -> FilterError {
    FilterError::parameter(format!("{filter} requires `{field}`"))
}

impl StageConfig {
    /// Validate into a filter and its parameters, loading auxiliary images.
    pub fn build(
        &self,
        loader: &dyn AuxiliaryLoader,
    ) -> Result<(Box<dyn Filter>, Option<FilterParams>), ConfigError> {
        let load = |path: &Path| {
            loader
                .load_volume(path)
                .map_err(|source| ConfigError::Auxiliary {
                    path: path.to_path_buf(),
                    source,
                })
        };
        // Parameter errors get their stage index attached by the caller.
        let param = |e: FilterError| ConfigError::Stage { index: 0, source: e };

        Ok(match self {
            Self::Normalization(NormalizationStage {}) => (Box::new(ImageNormalization), None),
            Self::Resampling(ResamplingStage {
                size,
                interpolation,
            }) => {
                let size = size.as_deref().ok_or_else(|| param(missing("resampling", "size")))?;
                let interpolation = interpolation
                    .as_deref()
                    .ok_or_else(|| param(missing("resampling", "interpolation")))?;
                let params = ResamplingParams::parse(size, interpolation).map_err(param)?;
                (Box::new(ImageResampling::new()), Some(params.into()))
            }
            Self::Denoising(DenoisingStage {
                method,
                kernel_size,
                sigma,
                radius,
            }) => {
                let method = method
                    .as_deref()
                    .ok_or_else(|| param(missing("denoising", "method")))?;
                let params = DenoisingParams::parse(method, *kernel_size, *sigma, *radius).map_err(param)?;
                (Box::new(ImageDenoising::new()), Some(params.into()))
            }
            Self::SkullStripping(SkullStrippingStage { mask }) => {
                let mask = mask
                    .as_deref()
                    .ok_or_else(|| param(missing("skull_stripping", "mask")))?;
                let params = SkullStrippingParams::new(load(mask)?);
                (Box::new(SkullStripping::new()), Some(params.into()))
            }
            Self::Registration(RegistrationStage {
                atlas,
                transform,
                is_ground_truth,
                interpolation,
            }) => {
                let atlas = atlas
                    .as_deref()
                    .ok_or_else(|| param(missing("registration", "atlas")))?;
                let transform = transform
                    .as_ref()
                    .ok_or_else(|| param(missing("registration", "transform")))?
                    .to_transform()
                    .map_err(param)?;
                let is_ground_truth =
                    is_ground_truth.ok_or_else(|| param(missing("registration", "is_ground_truth")))?;
                let interpolation = interpolation
                    .as_deref()
                    .map(str::parse::<Interpolation>)
                    .transpose()
                    .map_err(param)?;

                let mut params = RegistrationParams::new(load(atlas)?, transform, is_ground_truth);
                if let Some(interpolation) = interpolation {
                    params = params.with_interpolation(interpolation);
                }
                (Box::new(ImageRegistration::new()), Some(params.into()))
            }
        })
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate every stage and assemble the pipeline.
    ///
    /// Stops at the first invalid stage; nothing is executed.
    pub fn build(&self, loader: &dyn AuxiliaryLoader) -> Result<FilterPipeline, ConfigError> {
        let mut pipeline = FilterPipeline::new();
        for (index, stage) in self.stages.iter().enumerate() {
            let (filter, params) = stage.build(loader).map_err(|e| match e {
                ConfigError::Stage { source, .. } => ConfigError::Stage { index, source },
                other => other,
            })?;
            pipeline.add_boxed(filter, params);
        }
        tracing::debug!("built pipeline with {} stages", pipeline.len());
        Ok(pipeline)
    }
}
