//! Denoising with a selectable strategy.
//!
//! | method   | knob          | default |
//! |----------|---------------|---------|
//! | wiener   | `kernel_size` | 3       |
//! | gaussian | `sigma`       | 1.0     |
//! | median   | `radius`      | 1       |
//!
//! Gaussian and median go through the kernel backend. The Wiener strategy is
//! a simplified baseline computed on the sample array: an adaptive smoother
//! driven by local mean and variance, not a frequency-domain Wiener filter.

use crate::error::FilterError;
use crate::filter::{Filter, describe_with, required};
use crate::image::Volume;
use crate::kernels::{CpuKernels, ImageKernels};
use crate::params::{DenoisingMethod, DenoisingParams, FilterParams};

#[derive(Debug, Clone, Default)]
pub struct ImageDenoising<K = CpuKernels> {
    kernels: K,
}

impl ImageDenoising {
    pub fn new() -> Self {
        Self::with_kernels(CpuKernels)
    }
}

impl<K: ImageKernels> ImageDenoising<K> {
    pub fn with_kernels(kernels: K) -> Self {
        Self { kernels }
    }
}

impl<K: ImageKernels> Filter for ImageDenoising<K> {
    fn name(&self) -> &'static str {
        "ImageDenoising"
    }

    fn execute(&self, image: &Volume, params: Option<&FilterParams>) -> Result<Volume, FilterError> {
        let params = required(self.name(), params, "denoising", FilterParams::as_denoising)?;
        let method = params.method();
        tracing::debug!("{}: {method}", self.name());

        match method {
            DenoisingMethod::Wiener { kernel_size } => wiener(image, kernel_size),
            DenoisingMethod::Gaussian { sigma } => Ok(self.kernels.blur(image, sigma)?),
            DenoisingMethod::Median { radius } => Ok(self.kernels.median(image, [radius; 3])?),
        }
    }

    fn describe(&self, params: Option<&FilterParams>) -> String {
        describe_with(
            self.name(),
            params.and_then(FilterParams::as_denoising),
            |p: &DenoisingParams| p.method().to_string(),
        )
    }
}

/// Local-statistics Wiener approximation.
///
/// Over a `kernel_size³` window compute local mean `m` and variance `v`.
/// Samples outside the volume count as zero and every window is divided by
/// its full size, so borders are pulled toward zero. The noise power `n` is the mean of all local variances. Each sample
/// becomes `m + (1 - n / v) * (x - m)` where `v > n`, and `m` elsewhere.
fn wiener(image: &Volume, kernel_size: usize) -> Result<Volume, FilterError> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(FilterError::parameter(format!(
            "wiener kernel_size must be a positive odd number, got {kernel_size}"
        )));
    }

    let size = image.size();
    let samples = image.to_array();
    let values: Vec<f64> = samples.iter().map(|&v| v as f64).collect();
    let squares: Vec<f64> = values.iter().map(|v| v * v).collect();
    let radius = kernel_size / 2;

    let sums = box_sum(values.clone(), size, radius);
    let sum_squares = box_sum(squares, size, radius);
    let window = (kernel_size as f64).powi(3);

    let mut means = Vec::with_capacity(values.len());
    let mut variances = Vec::with_capacity(values.len());
    for (s, s2) in sums.iter().zip(&sum_squares) {
        let mean = s / window;
        means.push(mean);
        variances.push((s2 / window - mean * mean).max(0.0));
    }
    let noise = variances.iter().sum::<f64>() / variances.len() as f64;

    let out = values
        .iter()
        .zip(means.iter().zip(&variances))
        .map(|(&x, (&mean, &variance))| {
            let v = if variance > noise {
                mean + (1.0 - noise / variance) * (x - mean)
            } else {
                mean
            };
            v as f32
        })
        .collect();

    Ok(Volume::from_array(out, image)?)
}

/// Sum over a `(2r+1)³` box with zeros outside the volume, separably with prefix sums.
fn box_sum(mut data: Vec<f64>, size: [usize; 3], radius: usize) -> Vec<f64> {
    let strides = [1, size[0], size[0] * size[1]];
    let mut prefix = Vec::new();
    for axis in 0..3 {
        let n = size[axis];
        let stride = strides[axis];
        let (a, b) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        for j in 0..size[b] {
            for i in 0..size[a] {
                let start = i * strides[a] + j * strides[b];
                prefix.clear();
                prefix.push(0.0);
                for k in 0..n {
                    let last = prefix[k];
                    prefix.push(last + data[start + k * stride]);
                }
                for k in 0..n {
                    let lo = k.saturating_sub(radius);
                    let hi = (k + radius + 1).min(n);
                    data[start + k * stride] = prefix[hi] - prefix[lo];
                }
            }
        }
    }
    data
}
