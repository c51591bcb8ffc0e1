use docvis_core::Grid;
use image::GrayImage;
use rayon::prelude::*;

use crate::error::{ImgprocError, ImgprocResult};

/// 5-tap Sobel smoothing and first-derivative taps
const SOBEL5_SMOOTH: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
const SOBEL5_DERIV: [f64; 5] = [-1.0, -2.0, 0.0, 2.0, 1.0];

/// Mirror an out-of-range index back into `0..n` without repeating the edge
/// sample (`gfedcb|abcdefgh|gfedcba`).
#[inline]
pub fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

/// Normalized Gaussian taps for an odd `ksize`.
///
/// Small apertures use the fixed binomial tables, larger ones derive sigma
/// from the aperture as `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize) -> ImgprocResult<Vec<f64>> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(ImgprocError::InvalidKernelSize(ksize));
    }
    let taps = match ksize {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {
            let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
            let half = (ksize / 2) as isize;
            let raw: Vec<f64> = (-half..=half)
                .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
                .collect();
            let sum: f64 = raw.iter().sum();
            raw.into_iter().map(|v| v / sum).collect()
        }
    };
    Ok(taps)
}

/// Correlate a 1-D signal with `kernel` using reflect-101 borders
pub fn correlate_1d(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let half = (kernel.len() / 2) as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &w)| w * signal[reflect101(i as isize + k as isize - half, n)])
                .sum()
        })
        .collect()
}

/// Gaussian smoothing of a projection profile
pub fn smooth_1d(signal: &[f64], ksize: usize) -> ImgprocResult<Vec<f64>> {
    let kernel = gaussian_kernel(ksize)?;
    Ok(correlate_1d(signal, &kernel))
}

/// Separable correlation: `kx` along rows, then `ky` along columns
pub fn separable_filter(src: &Grid, kx: &[f64], ky: &[f64]) -> Grid {
    let (w, h) = (src.width(), src.height());
    if w == 0 || h == 0 {
        return src.clone();
    }

    let mut horizontal = vec![0.0; w * h];
    horizontal
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out)| {
            let filtered = correlate_1d(src.row(y), kx);
            out.copy_from_slice(&filtered);
        });

    let half = (ky.len() / 2) as isize;
    let mut vertical = vec![0.0; w * h];
    vertical.par_chunks_mut(w).enumerate().for_each(|(y, out)| {
        for (x, o) in out.iter_mut().enumerate() {
            *o = ky
                .iter()
                .enumerate()
                .map(|(k, &wgt)| {
                    let yy = reflect101(y as isize + k as isize - half, h);
                    wgt * horizontal[yy * w + x]
                })
                .sum();
        }
    });

    Grid::from_vec(w, h, vertical).unwrap_or_else(|| Grid::new(w, h))
}

/// Gaussian blur with a square `ksize` aperture
pub fn gaussian_blur(src: &Grid, ksize: usize) -> ImgprocResult<Grid> {
    let kernel = gaussian_kernel(ksize)?;
    Ok(separable_filter(src, &kernel, &kernel))
}

/// Horizontal and vertical derivatives with a 5x5 Sobel aperture
pub fn sobel5(src: &Grid) -> (Grid, Grid) {
    let dx = separable_filter(src, &SOBEL5_DERIV, &SOBEL5_SMOOTH);
    let dy = separable_filter(src, &SOBEL5_SMOOTH, &SOBEL5_DERIV);
    (dx, dy)
}

/// Normalized box blur over a `(2r+1)^2` window, reflect-101 borders
pub fn box_blur(img: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    let size = 2 * radius as usize + 1;
    let taps = vec![1.0 / size as f64; size];
    separable_filter(&Grid::from_gray(img), &taps, &taps).to_gray()
}
