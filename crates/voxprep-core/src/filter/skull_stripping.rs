//! Skull stripping by brain mask.
//!
//! This is pure masking: voxels outside a supplied brain mask are set to the
//! background value. It does no tissue segmentation of its own; the mask is
//! expected to come from an external brain-extraction step.

use crate::error::FilterError;
use crate::filter::{Filter, describe_with, required};
use crate::image::Volume;
use crate::kernels::{CpuKernels, ImageKernels};
use crate::params::{FilterParams, SkullStrippingParams};

/// Value written outside the mask.
pub const BACKGROUND: f32 = 0.0;

#[derive(Debug, Clone, Default)]
pub struct SkullStripping<K = CpuKernels> {
    kernels: K,
}

impl SkullStripping {
    pub fn new() -> Self {
        Self::with_kernels(CpuKernels)
    }
}

impl<K: ImageKernels> SkullStripping<K> {
    pub fn with_kernels(kernels: K) -> Self {
        Self { kernels }
    }
}

impl<K: ImageKernels> Filter for SkullStripping<K> {
    fn name(&self) -> &'static str {
        "SkullStripping"
    }

    fn execute(&self, image: &Volume, params: Option<&FilterParams>) -> Result<Volume, FilterError> {
        let params = required(self.name(), params, "skull-stripping", FilterParams::as_skull_stripping)?;
        let mask = params.mask();
        if let Some(detail) = image.geometry().mismatch(mask.geometry()) {
            return Err(FilterError::GeometryMismatch {
                auxiliary: "mask",
                detail,
            });
        }
        tracing::debug!("{}: masking {:?}", self.name(), image.size());

        Ok(self.kernels.mask_apply(image, mask, BACKGROUND)?)
    }

    fn describe(&self, params: Option<&FilterParams>) -> String {
        describe_with(
            self.name(),
            params.and_then(FilterParams::as_skull_stripping),
            |p: &SkullStrippingParams| format!("mask={:?}", p.mask().size()),
        )
    }
}
