//! The filter contract and the concrete pre-processing filters.

pub mod denoising;
pub mod normalization;
pub mod registration;
pub mod resampling;
pub mod skull_stripping;

pub use denoising::ImageDenoising;
pub use normalization::ImageNormalization;
pub use registration::ImageRegistration;
pub use resampling::ImageResampling;
pub use skull_stripping::SkullStripping;

use crate::error::FilterError;
use crate::image::Volume;
use crate::params::FilterParams;

/// One unit of pipeline work.
///
/// Implementations hold no mutable state: the same image and parameters
/// always produce the same output, and one filter value may be shared by any
/// number of pipelines. Parameters are validated before numeric work starts,
/// so a failing call has no side effects.
pub trait Filter: Send + Sync {
    /// Stable name used in logs and descriptors.
    fn name(&self) -> &'static str;

    /// Transform `image`, returning a new volume.
    fn execute(&self, image: &Volume, params: Option<&FilterParams>) -> Result<Volume, FilterError>;

    /// Name plus the effective parameters, for diagnostics.
    fn describe(&self, _params: Option<&FilterParams>) -> String {
        self.name().to_string()
    }
}

/// Pull the expected parameter variant out of `params`.
pub(crate) fn required<'a, T>(
    filter: &'static str,
    params: Option<&'a FilterParams>,
    expected: &'static str,
    extract: impl FnOnce(&'a FilterParams) -> Option<&'a T>,
) -> Result<&'a T, FilterError> {
    let params = params.ok_or_else(|| {
        FilterError::parameter(format!("{filter} requires {expected} parameters"))
    })?;
    extract(params).ok_or_else(|| {
        FilterError::parameter(format!(
            "{filter} expects {expected} parameters, got {}",
            params.kind()
        ))
    })
}

/// `Name(details)` or `Name(<no parameters>)`.
pub(crate) fn describe_with<T>(
    name: &str,
    params: Option<&T>,
    details: impl FnOnce(&T) -> String,
) -> String {
    match params {
        Some(p) => format!("{name}({})", details(p)),
        None => format!("{name}(<no parameters>)"),
    }
}
