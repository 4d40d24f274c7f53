//! Interpolators used by the resampling kernels.

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use crate::error::FilterError;
use crate::image::Volume;

/// Interpolation strategy for sampling a volume at a continuous index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Nearest neighbour. Preserves discrete label values.
    Nearest,
    /// Trilinear.
    Linear,
    /// Cubic B-spline on prefiltered coefficients.
    Spline,
}

impl Interpolation {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::Spline => "spline",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Interpolation {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "linear" | "bilinear" | "trilinear" => Ok(Self::Linear),
            "spline" | "bspline" => Ok(Self::Spline),
            other => Err(FilterError::parameter(format!(
                "unsupported interpolation type: {other:?}"
            ))),
        }
    }
}

/// A volume prepared for sampling with one interpolation strategy.
pub(crate) enum Sampler<'a> {
    Nearest(&'a Volume),
    Linear(&'a Volume),
    Spline {
        coefficients: Vec<f64>,
        size: [usize; 3],
    },
}

impl<'a> Sampler<'a> {
    pub(crate) fn new(volume: &'a Volume, interpolation: Interpolation) -> Self {
        match interpolation {
            Interpolation::Nearest => Self::Nearest(volume),
            Interpolation::Linear => Self::Linear(volume),
            Interpolation::Spline => Self::Spline {
                coefficients: bspline_coefficients(volume),
                size: volume.size(),
            },
        }
    }

    fn size(&self) -> [usize; 3] {
        match self {
            Self::Nearest(v) | Self::Linear(v) => v.size(),
            Self::Spline { size, .. } => *size,
        }
    }

    /// Interpolated value at a continuous index, `None` outside the buffer.
    ///
    /// The buffer spans `[-0.5, n - 0.5]` on each axis.
    pub(crate) fn sample(&self, index: DVec3) -> Option<f32> {
        let size = self.size();
        let coords = index.to_array();
        for axis in 0..3 {
            let c = coords[axis];
            if !(c >= -0.5 - INSIDE_EPSILON && c <= size[axis] as f64 - 0.5 + INSIDE_EPSILON) {
                return None;
            }
        }

        Some(match self {
            Self::Nearest(volume) => {
                let idx = std::array::from_fn(|axis| {
                    (coords[axis].round().max(0.0) as usize).min(size[axis] - 1)
                });
                volume.get(idx)
            }
            Self::Linear(volume) => trilinear(volume, coords),
            Self::Spline { coefficients, size } => bspline(coefficients, *size, coords),
        })
    }
}

const INSIDE_EPSILON: f64 = 1e-9;

fn trilinear(volume: &Volume, coords: [f64; 3]) -> f32 {
    let size = volume.size();
    let mut base = [0_usize; 3];
    let mut next = [0_usize; 3];
    let mut frac = [0.0_f64; 3];
    for axis in 0..3 {
        let last = size[axis] - 1;
        let c = coords[axis].clamp(0.0, last as f64);
        let f = c.floor();
        base[axis] = f as usize;
        next[axis] = (base[axis] + 1).min(last);
        frac[axis] = c - f;
    }

    let mut acc = 0.0_f64;
    for corner in 0..8 {
        let mut weight = 1.0;
        let mut idx = [0_usize; 3];
        for axis in 0..3 {
            if corner >> axis & 1 == 1 {
                weight *= frac[axis];
                idx[axis] = next[axis];
            } else {
                weight *= 1.0 - frac[axis];
                idx[axis] = base[axis];
            }
        }
        if weight != 0.0 {
            acc += weight * volume.get(idx) as f64;
        }
    }
    acc as f32
}

/// Pole of the cubic B-spline prefilter.
const SPLINE_POLE: f64 = -0.267_949_192_431_122_7; // sqrt(3) - 2
const SPLINE_TOLERANCE: f64 = 1e-10;

/// Convert samples to cubic B-spline coefficients with mirror boundaries.
fn bspline_coefficients(volume: &Volume) -> Vec<f64> {
    let size = volume.size();
    let mut coefficients: Vec<f64> = volume.samples().iter().map(|&v| v as f64).collect();
    let strides = [1, size[0], size[0] * size[1]];
    let mut line = Vec::new();

    for axis in 0..3 {
        let n = size[axis];
        if n < 2 {
            continue;
        }
        let stride = strides[axis];
        let (a, b) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        for j in 0..size[b] {
            for i in 0..size[a] {
                let start = i * strides[a] + j * strides[b];
                line.clear();
                line.extend((0..n).map(|k| coefficients[start + k * stride]));
                prefilter_line(&mut line);
                for (k, &c) in line.iter().enumerate() {
                    coefficients[start + k * stride] = c;
                }
            }
        }
    }
    coefficients
}

fn prefilter_line(c: &mut [f64]) {
    let n = c.len();
    let z = SPLINE_POLE;
    let lambda = (1.0 - z) * (1.0 - 1.0 / z);
    for v in c.iter_mut() {
        *v *= lambda;
    }

    // Causal initialization.
    let horizon = (SPLINE_TOLERANCE.ln() / z.abs().ln()).ceil() as usize;
    if horizon < n {
        let mut zn = z;
        let mut sum = c[0];
        for &v in c.iter().take(horizon).skip(1) {
            sum += zn * v;
            zn *= z;
        }
        c[0] = sum;
    } else {
        let iz = 1.0 / z;
        let mut zn = z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for &v in c.iter().take(n - 1).skip(1) {
            sum += (zn + z2n) * v;
            zn *= z;
            z2n *= iz;
        }
        c[0] = sum / (1.0 - zn * zn);
    }
    for k in 1..n {
        c[k] += z * c[k - 1];
    }

    // Anti-causal initialization.
    c[n - 1] = (z / (z * z - 1.0)) * (z * c[n - 2] + c[n - 1]);
    for k in (0..n - 1).rev() {
        c[k] = z * (c[k + 1] - c[k]);
    }
}

fn mirror(index: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n as isize - 2;
    let i = index.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}

fn cubic_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        (1.0 - t).powi(3) / 6.0,
        (4.0 - 6.0 * t2 + 3.0 * t3) / 6.0,
        (1.0 + 3.0 * t + 3.0 * t2 - 3.0 * t3) / 6.0,
        t3 / 6.0,
    ]
}

fn bspline(coefficients: &[f64], size: [usize; 3], coords: [f64; 3]) -> f32 {
    let mut indices = [[0_usize; 4]; 3];
    let mut weights = [[0.0_f64; 4]; 3];
    for axis in 0..3 {
        let f = coords[axis].floor();
        weights[axis] = cubic_weights(coords[axis] - f);
        let first = f as isize - 1;
        for k in 0..4 {
            indices[axis][k] = mirror(first + k as isize, size[axis]);
        }
    }

    let mut acc = 0.0;
    for (kz, wz) in weights[2].iter().enumerate() {
        let z = indices[2][kz];
        for (ky, wy) in weights[1].iter().enumerate() {
            let y = indices[1][ky];
            let row = size[0] * (y + size[1] * z);
            for (kx, wx) in weights[0].iter().enumerate() {
                acc += wz * wy * wx * coefficients[row + indices[0][kx]];
            }
        }
    }
    acc as f32
}
