use image::GrayImage;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Corner point in pixel coordinates (x = column, y = row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Corner {
    pub x: u32,
    pub y: u32,
}

impl Corner {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// One mean intensity per sampled ring
pub type Descriptor = Vec<f64>;

/// Corner together with the descriptor computed around it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescribedCorner {
    pub corner: Corner,
    pub descriptor: Descriptor,
}

/// Integer line segment (x1, y1) -> (x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Slope dy/dx; a vertical segment is nudged one pixel in x first
    pub fn slope(&self) -> f64 {
        let dx = if self.x1 == self.x2 { 1 } else { self.x2 - self.x1 };
        (self.y2 - self.y1) as f64 / dx as f64
    }

    pub fn length(&self) -> f64 {
        let dx = (self.x2 - self.x1) as f64;
        let dy = (self.y2 - self.y1) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Intersection with a `width` x `height` image, `None` when empty
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Row-major grid of `f64` samples used between filter stages
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Wraps existing samples; `None` when the length does not match
    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn from_gray(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            width: w as usize,
            height: h as usize,
            data: img.as_raw().iter().map(|&v| v as f64).collect(),
        }
    }

    /// Converts back to 8 bits, rounding and saturating
    pub fn to_gray(&self) -> GrayImage {
        let raw = self
            .data
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        GrayImage::from_raw(self.width as u32, self.height as u32, raw)
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.height as u32))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data[y * self.width + x] = value;
    }

    pub fn row(&self, y: usize) -> &[f64] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// (min, max) over all samples, `None` for an empty grid
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut it = self.data.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Where intermediate images go when debugging a pipeline.
///
/// Passed explicitly into each routine instead of a process-wide flag.
/// With no directory set every `emit` is a no-op.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugOutput {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    dir: Option<PathBuf>,
}

impl DebugOutput {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn to_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Write `img` as `<dir>/<name>.png`. Failures are logged, never fatal.
    pub fn emit(&self, name: &str, img: &GrayImage) {
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("cannot create debug dir {}: {}", dir.display(), e);
            return;
        }
        let path = dir.join(format!("{name}.png"));
        match img.save(&path) {
            Ok(()) => log::debug!("wrote debug image {}", path.display()),
            Err(e) => log::warn!("cannot write debug image {}: {}", path.display(), e),
        }
    }
}

/// Process-level settings shared by every pipeline
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuntimeConfig {
    pub n_threads: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub debug: DebugOutput,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get().max(1),
            debug: DebugOutput::disabled(),
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
