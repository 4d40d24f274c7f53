//! Separable Gaussian blur and neighbourhood median.

use crate::error::KernelError;
use crate::image::Volume;

/// Kernel half-width is `ceil(TRUNCATE * sigma)` voxels.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Largest median window, in voxels.
const MAX_MEDIAN_WINDOW: usize = 1 << 20;

/// Normalized 1-D Gaussian kernel for a sigma given in voxels.
///
/// The half-width is capped at `max_radius`.
fn gaussian_kernel_1d(sigma: f64, max_radius: usize) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma).ceil().min(max_radius as f64) as usize;
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma2).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Reflect an out-of-range index back into `[0, len)` (`d c b a | a b c d | d c b a`).
#[inline]
fn reflect_index(idx: isize, len: usize) -> usize {
    let n = len as isize;
    let period = 2 * n;
    let i = idx.rem_euclid(period);
    if i >= n { (period - 1 - i) as usize } else { i as usize }
}

/// Convolve every line along `axis` with `kernel`.
fn convolve_axis(data: &mut [f64], size: [usize; 3], axis: usize, kernel: &[f64]) {
    let n = size[axis];
    let radius = kernel.len() / 2;
    let strides = [1, size[0], size[0] * size[1]];
    let stride = strides[axis];
    let (a, b) = match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };

    let mut padded = vec![0.0_f64; n + 2 * radius];
    for j in 0..size[b] {
        for i in 0..size[a] {
            let start = i * strides[a] + j * strides[b];
            for (p, slot) in padded.iter_mut().enumerate() {
                let src = reflect_index(p as isize - radius as isize, n);
                *slot = data[start + src * stride];
            }
            for k in 0..n {
                let window = &padded[k..k + kernel.len()];
                data[start + k * stride] = window.iter().zip(kernel).map(|(v, w)| v * w).sum();
            }
        }
    }
}

/// Gaussian smoothing with `sigma` in physical units.
///
/// The blur is applied separably, one axis at a time, with the sigma converted
/// to voxels through each axis' spacing. Axes of length one are left alone.
pub fn gaussian_blur(image: &Volume, sigma: f64) -> Result<Volume, KernelError> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(KernelError::InvalidArgument(format!(
            "gaussian sigma must be positive, got {sigma}"
        )));
    }

    let size = image.size();
    let spacing = image.spacing().to_array();
    let mut data: Vec<f64> = image.samples().iter().map(|&v| v as f64).collect();

    for axis in 0..3 {
        let sigma_voxels = sigma / spacing[axis];
        if size[axis] < 2 || sigma_voxels < 1e-3 {
            continue;
        }
        // Reflection repeats the line beyond its length, so a wider kernel adds nothing.
        let kernel = gaussian_kernel_1d(sigma_voxels, size[axis]);
        convolve_axis(&mut data, size, axis, &kernel);
    }

    let samples = data.into_iter().map(|v| v as f32).collect();
    Ok(Volume::from_array(samples, image)?)
}

/// Median over a `(2r+1)` box per axis; the border is clamped (zero-flux).
pub fn median_filter(image: &Volume, radius: [usize; 3]) -> Result<Volume, KernelError> {
    if radius == [0, 0, 0] {
        return Ok(image.clone());
    }

    let [nx, ny, nz] = image.size();
    let window_len = radius
        .iter()
        .try_fold(1usize, |len, r| {
            r.checked_mul(2)
                .and_then(|d| d.checked_add(1))
                .and_then(|w| len.checked_mul(w))
        })
        .filter(|&len| len <= MAX_MEDIAN_WINDOW)
        .ok_or_else(|| KernelError::InvalidArgument(format!("median radius {radius:?} is too large")))?;
    let mut window = Vec::with_capacity(window_len);
    let mut samples = Vec::with_capacity(image.samples().len());

    let clamp = |c: usize, offset: isize, n: usize| -> usize {
        (c as isize + offset).clamp(0, n as isize - 1) as usize
    };
    let [rx, ry, rz] = radius.map(|r| r as isize);

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                window.clear();
                for dz in -rz..=rz {
                    let zz = clamp(z, dz, nz);
                    for dy in -ry..=ry {
                        let yy = clamp(y, dy, ny);
                        for dx in -rx..=rx {
                            let xx = clamp(x, dx, nx);
                            window.push(image.get([xx, yy, zz]));
                        }
                    }
                }
                let mid = window.len() / 2;
                let (_, median, _) = window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
                samples.push(*median);
            }
        }
    }

    Ok(Volume::from_array(samples, image)?)
}
