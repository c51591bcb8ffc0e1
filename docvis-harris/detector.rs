use docvis_core::{Corner, Grid};
use docvis_imgproc::filter::{gaussian_blur, sobel5};
use image::GrayImage;
use rayon::prelude::*;

use crate::config::HarrisConfig;
use crate::error::{HarrisError, HarrisResult};

/// Summed-area table with a zero first row and column
struct Integral {
    stride: usize,
    data: Vec<f64>,
}

impl Integral {
    fn new(values: &[f64], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut data = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            for x in 0..width {
                row_sum += values[y * width + x];
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row_sum;
            }
        }
        Self { stride, data }
    }

    /// Sum over the inclusive box `[x0, x1] x [y0, y1]`
    #[inline]
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = self.stride;
        self.data[(y1 + 1) * s + x1 + 1] - self.data[y0 * s + x1 + 1] - self.data[(y1 + 1) * s + x0]
            + self.data[y0 * s + x0]
    }
}

/// Harris corner detector.
///
/// Every pixel whose min-max normalised response exceeds the threshold is
/// reported; there is no non-maximum suppression, so a physical corner
/// usually yields a small cluster of adjacent points.
#[derive(Debug, Clone)]
pub struct HarrisDetector {
    cfg: HarrisConfig,
}

impl HarrisDetector {
    pub fn new(cfg: HarrisConfig) -> HarrisResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &HarrisConfig {
        &self.cfg
    }

    fn check_size(&self, img: &GrayImage) -> HarrisResult<()> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(HarrisError::InvalidImageSize { width, height });
        }
        let min_size = self.cfg.min_image_size();
        if width < min_size || height < min_size {
            return Err(HarrisError::ImageTooSmall {
                width,
                height,
                min_size,
            });
        }
        Ok(())
    }

    /// Raw response `det(M) - k * trace(M)^2` at every pixel.
    ///
    /// Pixels closer than `offset` to an edge keep 0.
    pub fn response_map(&self, img: &GrayImage) -> HarrisResult<Grid> {
        self.check_size(img)?;
        let (w, h) = (img.width() as usize, img.height() as usize);

        let smoothed = gaussian_blur(&Grid::from_gray(img), self.cfg.blur_ksize)
            .map_err(|_| HarrisError::InvalidBlurSize(self.cfg.blur_ksize))?;
        let (dx, dy) = sobel5(&smoothed);

        let (gx, gy) = (dx.as_slice(), dy.as_slice());
        let xx: Vec<f64> = gx.iter().map(|v| v * v).collect();
        let yy: Vec<f64> = gy.iter().map(|v| v * v).collect();
        let xy: Vec<f64> = gx.iter().zip(gy).map(|(a, b)| a * b).collect();
        let (sxx, syy, sxy) = (
            Integral::new(&xx, w, h),
            Integral::new(&yy, w, h),
            Integral::new(&xy, w, h),
        );

        let o = self.cfg.offset;
        let k = self.cfg.k;
        let mut response = Grid::new(w, h);
        response
            .as_mut_slice()
            .par_chunks_mut(w)
            .enumerate()
            .filter(|(y, _)| *y >= o && *y + o < h)
            .for_each(|(y, row)| {
                for (x, r) in row.iter_mut().enumerate().take(w - o).skip(o) {
                    let (x0, y0, x1, y1) = (x - o, y - o, x + o, y + o);
                    let a = sxx.sum(x0, y0, x1, y1);
                    let b = syy.sum(x0, y0, x1, y1);
                    let c = sxy.sum(x0, y0, x1, y1);
                    let det = a * b - c * c;
                    let trace = a + b;
                    *r = det - k * trace * trace;
                }
            });

        Ok(response)
    }

    /// Response rescaled to [0, 1]; a flat response becomes all zeros
    pub fn normalized_response(&self, img: &GrayImage) -> HarrisResult<Grid> {
        let mut response = self.response_map(img)?;
        let (lo, hi) = response.min_max().unwrap_or((0.0, 0.0));
        let range = hi - lo;
        response.as_mut_slice().par_iter_mut().for_each(|v| {
            *v = if range > 0.0 { (*v - lo) / range } else { 0.0 };
        });
        Ok(response)
    }

    /// Corners in raster order
    pub fn detect(&self, img: &GrayImage) -> HarrisResult<Vec<Corner>> {
        let response = self.normalized_response(img)?;
        let (w, h) = (response.width(), response.height());
        let o = self.cfg.offset;
        let threshold = self.cfg.threshold;

        let corners: Vec<Corner> = (o..h - o)
            .into_par_iter()
            .flat_map_iter(|y| {
                let row = response.row(y);
                (o..w - o)
                    .filter(move |&x| row[x] > threshold)
                    .map(move |x| Corner::new(x as u32, y as u32))
            })
            .collect();

        log::debug!(
            "harris: {} corners above {} in {}x{}",
            corners.len(),
            threshold,
            w,
            h
        );
        Ok(corners)
    }
}
