//! Per-stage parameter bundles.
//!
//! Each filter kind that needs inputs has its own struct, and [`FilterParams`]
//! tags them. Constructors validate everything that can be checked without
//! the image; filters re-check what depends on it (e.g. mask geometry).

use std::fmt;

use crate::error::FilterError;
use crate::image::Volume;
use crate::kernels::Interpolation;
use crate::transform::SpatialTransform;

/// Parameters for one pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterParams {
    Resampling(ResamplingParams),
    Denoising(DenoisingParams),
    SkullStripping(SkullStrippingParams),
    Registration(RegistrationParams),
}

impl FilterParams {
    /// Short name of the variant, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Resampling(_) => "resampling",
            Self::Denoising(_) => "denoising",
            Self::SkullStripping(_) => "skull-stripping",
            Self::Registration(_) => "registration",
        }
    }

    pub fn as_resampling(&self) -> Option<&ResamplingParams> {
        match self {
            Self::Resampling(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_denoising(&self) -> Option<&DenoisingParams> {
        match self {
            Self::Denoising(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_skull_stripping(&self) -> Option<&SkullStrippingParams> {
        match self {
            Self::SkullStripping(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_registration(&self) -> Option<&RegistrationParams> {
        match self {
            Self::Registration(p) => Some(p),
            _ => None,
        }
    }
}

impl From<ResamplingParams> for FilterParams {
    fn from(p: ResamplingParams) -> Self {
        Self::Resampling(p)
    }
}

impl From<DenoisingParams> for FilterParams {
    fn from(p: DenoisingParams) -> Self {
        Self::Denoising(p)
    }
}

impl From<SkullStrippingParams> for FilterParams {
    fn from(p: SkullStrippingParams) -> Self {
        Self::SkullStripping(p)
    }
}

impl From<RegistrationParams> for FilterParams {
    fn from(p: RegistrationParams) -> Self {
        Self::Registration(p)
    }
}

// ── Resampling ───────────────────────────────────────────────────

/// Target grid size and interpolator. Both are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplingParams {
    size: [usize; 3],
    interpolation: Interpolation,
}

impl ResamplingParams {
    pub fn new(size: [usize; 3], interpolation: Interpolation) -> Result<Self, FilterError> {
        if size.contains(&0) {
            return Err(FilterError::parameter(format!(
                "resampling size must be positive on every axis, got {size:?}"
            )));
        }
        Ok(Self { size, interpolation })
    }

    /// Build from loosely typed inputs, e.g. a config file.
    pub fn parse(size: &[usize], interpolation: &str) -> Result<Self, FilterError> {
        let size: [usize; 3] = size.try_into().map_err(|_| {
            FilterError::parameter(format!(
                "resampling size must have 3 entries to match the volume, got {}",
                size.len()
            ))
        })?;
        Self::new(size, interpolation.parse()?)
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }
}

// ── Denoising ────────────────────────────────────────────────────

/// Denoising strategy with its tuning parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DenoisingMethod {
    /// Local-statistics Wiener approximation over a cubic window.
    Wiener { kernel_size: usize },
    /// Gaussian blur, sigma in physical units.
    Gaussian { sigma: f64 },
    /// Median over a `2 * radius + 1` box on every axis.
    Median { radius: usize },
}

impl DenoisingMethod {
    pub const DEFAULT_KERNEL_SIZE: usize = 3;
    pub const DEFAULT_SIGMA: f64 = 1.0;
    pub const DEFAULT_RADIUS: usize = 1;

    /// Largest accepted Wiener window edge.
    pub const MAX_KERNEL_SIZE: usize = 51;
    /// Largest accepted Gaussian sigma, in physical units.
    pub const MAX_SIGMA: f64 = 1000.0;
    /// Largest accepted median radius (a `51³` window).
    pub const MAX_RADIUS: usize = 25;

    pub const fn wiener() -> Self {
        Self::Wiener {
            kernel_size: Self::DEFAULT_KERNEL_SIZE,
        }
    }

    pub const fn gaussian() -> Self {
        Self::Gaussian {
            sigma: Self::DEFAULT_SIGMA,
        }
    }

    pub const fn median() -> Self {
        Self::Median {
            radius: Self::DEFAULT_RADIUS,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wiener { .. } => "wiener",
            Self::Gaussian { .. } => "gaussian",
            Self::Median { .. } => "median",
        }
    }

    fn validate(&self) -> Result<(), FilterError> {
        match *self {
            Self::Wiener { kernel_size } if kernel_size == 0 || kernel_size % 2 == 0 => {
                Err(FilterError::parameter(format!(
                    "wiener kernel_size must be a positive odd number, got {kernel_size}"
                )))
            }
            Self::Wiener { kernel_size } if kernel_size > Self::MAX_KERNEL_SIZE => {
                Err(FilterError::parameter(format!(
                    "wiener kernel_size must be at most {}, got {kernel_size}",
                    Self::MAX_KERNEL_SIZE
                )))
            }
            Self::Gaussian { sigma } if !sigma.is_finite() || sigma <= 0.0 => Err(
                FilterError::parameter(format!("gaussian sigma must be positive, got {sigma}")),
            ),
            Self::Gaussian { sigma } if sigma > Self::MAX_SIGMA => Err(FilterError::parameter(
                format!("gaussian sigma must be at most {}, got {sigma}", Self::MAX_SIGMA),
            )),
            Self::Median { radius } if radius > Self::MAX_RADIUS => Err(FilterError::parameter(
                format!("median radius must be at most {}, got {radius}", Self::MAX_RADIUS),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DenoisingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wiener { kernel_size } => write!(f, "wiener(kernel_size={kernel_size})"),
            Self::Gaussian { sigma } => write!(f, "gaussian(sigma={sigma})"),
            Self::Median { radius } => write!(f, "median(radius={radius})"),
        }
    }
}

/// Denoising parameters. The method is required; its knob defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoisingParams {
    method: DenoisingMethod,
}

impl DenoisingParams {
    pub fn new(method: DenoisingMethod) -> Result<Self, FilterError> {
        method.validate()?;
        Ok(Self { method })
    }

    /// Build from a method name plus optional knobs.
    ///
    /// Knobs that belong to a different method are ignored with a warning.
    pub fn parse(
        method: &str,
        kernel_size: Option<usize>,
        sigma: Option<f64>,
        radius: Option<usize>,
    ) -> Result<Self, FilterError> {
        let method = match method.trim().to_ascii_lowercase().as_str() {
            "wiener" => DenoisingMethod::Wiener {
                kernel_size: kernel_size.unwrap_or(DenoisingMethod::DEFAULT_KERNEL_SIZE),
            },
            "gaussian" => DenoisingMethod::Gaussian {
                sigma: sigma.unwrap_or(DenoisingMethod::DEFAULT_SIGMA),
            },
            "median" => DenoisingMethod::Median {
                radius: radius.unwrap_or(DenoisingMethod::DEFAULT_RADIUS),
            },
            other => {
                return Err(FilterError::parameter(format!(
                    "unsupported denoising method: {other:?}"
                )));
            }
        };

        let unused = [
            ("kernel_size", kernel_size.is_some(), "wiener"),
            ("sigma", sigma.is_some(), "gaussian"),
            ("radius", radius.is_some(), "median"),
        ];
        for (knob, given, owner) in unused {
            if given && owner != method.name() {
                tracing::warn!("denoising: `{knob}` has no effect on method {}", method.name());
            }
        }

        Self::new(method)
    }

    pub fn method(&self) -> DenoisingMethod {
        self.method
    }
}

// ── Skull stripping ──────────────────────────────────────────────

/// Brain mask applied by skull stripping.
#[derive(Debug, Clone, PartialEq)]
pub struct SkullStrippingParams {
    mask: Volume,
}

impl SkullStrippingParams {
    pub fn new(mask: Volume) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> &Volume {
        &self.mask
    }
}

// ── Registration ─────────────────────────────────────────────────

/// Atlas, precomputed transform and ground-truth flag for registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationParams {
    atlas: Volume,
    transform: SpatialTransform,
    is_ground_truth: bool,
    interpolation: Option<Interpolation>,
}

impl RegistrationParams {
    pub fn new(atlas: Volume, transform: SpatialTransform, is_ground_truth: bool) -> Self {
        Self {
            atlas,
            transform,
            is_ground_truth,
            interpolation: None,
        }
    }

    /// Override the interpolator chosen from the ground-truth flag.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    pub fn atlas(&self) -> &Volume {
        &self.atlas
    }

    pub fn transform(&self) -> &SpatialTransform {
        &self.transform
    }

    pub fn is_ground_truth(&self) -> bool {
        self.is_ground_truth
    }

    /// Explicit interpolator if set; otherwise nearest for label volumes and
    /// linear for intensity volumes.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation.unwrap_or(if self.is_ground_truth {
            Interpolation::Nearest
        } else {
            Interpolation::Linear
        })
    }
}
