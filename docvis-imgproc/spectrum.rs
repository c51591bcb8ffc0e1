use docvis_core::Grid;
use image::{GrayImage, Luma};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{ImgprocError, ImgprocResult};

/// Forward 2-D DFT of a real grid, rows first then columns
pub fn fft2(src: &Grid) -> ImgprocResult<Vec<Complex<f64>>> {
    let (w, h) = (src.width(), src.height());
    if w == 0 || h == 0 {
        return Err(ImgprocError::EmptyImage);
    }

    let mut planner = FftPlanner::<f64>::new();
    let mut data: Vec<Complex<f64>> = src
        .as_slice()
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect();

    let row_fft = planner.plan_fft_forward(w);
    for row in data.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let col_fft = planner.plan_fft_forward(h);
    let mut column = vec![Complex::new(0.0, 0.0); h];
    for x in 0..w {
        for (y, c) in column.iter_mut().enumerate() {
            *c = data[y * w + x];
        }
        col_fft.process(&mut column);
        for (y, c) in column.iter().enumerate() {
            data[y * w + x] = *c;
        }
    }

    Ok(data)
}

/// Move the zero-frequency term to `(w / 2, h / 2)`
pub fn fftshift<T: Copy>(data: &[T], width: usize, height: usize) -> Vec<T> {
    let (sx, sy) = (width / 2, height / 2);
    let mut out = Vec::with_capacity(data.len());
    for y in 0..height {
        let src_y = (y + height - sy) % height;
        for x in 0..width {
            let src_x = (x + width - sx) % width;
            out.push(data[src_y * width + src_x]);
        }
    }
    out
}

/// Centred log-magnitude spectrum `20 * ln|F|` of a grayscale image
pub fn magnitude_spectrum(img: &GrayImage) -> ImgprocResult<Grid> {
    let grid = Grid::from_gray(img);
    let (w, h) = (grid.width(), grid.height());
    let shifted = fftshift(&fft2(&grid)?, w, h);
    let magnitude = shifted.iter().map(|c| 20.0 * c.norm().ln()).collect();
    Grid::from_vec(w, h, magnitude).ok_or(ImgprocError::EmptyImage)
}

/// 255 wherever the spectrum exceeds `threshold`, else 0
pub fn threshold_mask(spectrum: &Grid, threshold: f64) -> GrayImage {
    let (w, h) = (spectrum.width() as u32, spectrum.height() as u32);
    GrayImage::from_fn(w, h, |x, y| {
        if spectrum.get(x as usize, y as usize) > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Binary mask of the dominant spectral energy of `img`
pub fn spectrum_mask(img: &GrayImage, threshold: f64) -> ImgprocResult<GrayImage> {
    let spectrum = magnitude_spectrum(img)?;
    Ok(threshold_mask(&spectrum, threshold))
}
