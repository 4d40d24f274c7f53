//! Voxprep Core — pre-processing filters for volumetric medical images.
//!
//! Filters (normalization, resampling, denoising, skull stripping,
//! registration) share one [`Filter`] trait and compose into an ordered,
//! fail-fast [`FilterPipeline`]. Numeric work goes through the
//! [`ImageKernels`] seam. No file formats or frameworks live here.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod image;
pub mod kernels;
pub mod params;
pub mod pipeline;
pub mod transform;

// Re-exports for convenience.
pub use config::{AuxiliaryLoader, PipelineConfig, StageConfig};
pub use error::{ConfigError, FilterError, ImageError, KernelError, PipelineError};
pub use filter::{
    Filter, ImageDenoising, ImageNormalization, ImageRegistration, ImageResampling, SkullStripping,
};
pub use crate::image::{Geometry, Volume};
pub use kernels::{CpuKernels, ImageKernels, Interpolation};
pub use params::{
    DenoisingMethod, DenoisingParams, FilterParams, RegistrationParams, ResamplingParams,
    SkullStrippingParams,
};
pub use pipeline::{FilterPipeline, Stage};
pub use transform::SpatialTransform;
