use docvis_core::{Corner, DescribedCorner, Descriptor};
use image::GrayImage;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub mod matching;

pub use error::{DescriptorError, DescriptorResult};
pub use matching::{KnnMatch, Match, RatioMatcher};

/// How sample angles are laid out on each ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AngularSampling {
    /// Angles `0, n, 2n, ...` below 360 degrees
    DegreeStride(u32),
    /// `n` evenly spaced angles
    Count(u32),
}

impl AngularSampling {
    /// Sample angles in radians
    pub fn angles(&self) -> Vec<f64> {
        match *self {
            AngularSampling::DegreeStride(stride) => (0..360)
                .step_by(stride.max(1) as usize)
                .map(|deg| (deg as f64).to_radians())
                .collect(),
            AngularSampling::Count(n) => (0..n)
                .map(|i| (i as f64 * 360.0 / n as f64).to_radians())
                .collect(),
        }
    }
}

impl Default for AngularSampling {
    fn default() -> Self {
        AngularSampling::DegreeStride(8)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescriptorConfig {
    /// First ring radius (inclusive)
    pub rho_min: u32,
    /// Last ring radius (exclusive); also the border margin
    pub rho_max: u32,
    pub rho_step: u32,
    pub sampling: AngularSampling,
    /// Multiplier for odd-indexed samples before averaging
    pub odd_weight: f64,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            rho_min: 5,
            rho_max: 20,
            rho_step: 1,
            sampling: AngularSampling::default(),
            odd_weight: 1.0,
        }
    }
}

impl DescriptorConfig {
    /// Ring means with odd samples counted twice
    pub fn weighted() -> Self {
        Self {
            odd_weight: 2.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DescriptorResult<()> {
        if self.rho_step == 0 {
            return Err(DescriptorError::InvalidStep(self.rho_step));
        }
        if self.rho_min >= self.rho_max {
            return Err(DescriptorError::InvalidRadii {
                rho_min: self.rho_min,
                rho_max: self.rho_max,
            });
        }
        match self.sampling {
            AngularSampling::DegreeStride(0) => Err(DescriptorError::InvalidSampling(0)),
            AngularSampling::Count(0) => Err(DescriptorError::InvalidSampling(0)),
            _ => Ok(()),
        }
    }
}

/// Rotation-tolerant local descriptor: the mean intensity of each
/// concentric ring around a point.
///
/// Points within `rho_max` of the border get an all-zero descriptor of
/// the usual length rather than an error.
#[derive(Debug, Clone)]
pub struct CircularDescriptor {
    cfg: DescriptorConfig,
    angles: Vec<(f64, f64)>,
}

impl CircularDescriptor {
    pub fn new(cfg: DescriptorConfig) -> DescriptorResult<Self> {
        cfg.validate()?;
        let angles = cfg
            .sampling
            .angles()
            .into_iter()
            .map(|a| (a.cos(), a.sin()))
            .collect();
        Ok(Self { cfg, angles })
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.cfg
    }

    /// Number of rings, i.e. the descriptor length
    pub fn ring_count(&self) -> usize {
        let span = self.cfg.rho_max - self.cfg.rho_min;
        span.div_ceil(self.cfg.rho_step) as usize
    }

    fn near_border(&self, img: &GrayImage, corner: Corner) -> bool {
        let (cx, cy) = (corner.x as i64, corner.y as i64);
        let r = self.cfg.rho_max as i64;
        let (w, h) = (img.width() as i64, img.height() as i64);
        cx - r < 0 || cy - r < 0 || cx + r > w || cy + r > h
    }

    pub fn describe(&self, img: &GrayImage, corner: Corner) -> Descriptor {
        if self.near_border(img, corner) {
            return vec![0.0; self.ring_count()];
        }

        let (cx, cy) = (corner.x as f64, corner.y as f64);
        let (max_x, max_y) = (img.width() as f64 - 1.0, img.height() as f64 - 1.0);
        let n = self.angles.len() as f64;

        (self.cfg.rho_min..self.cfg.rho_max)
            .step_by(self.cfg.rho_step as usize)
            .map(|rho| {
                let rho = rho as f64;
                let total: f64 = self
                    .angles
                    .iter()
                    .enumerate()
                    .map(|(i, &(cos, sin))| {
                        let x = (cx + rho * cos).round().clamp(0.0, max_x) as u32;
                        let y = (cy + rho * sin).round().clamp(0.0, max_y) as u32;
                        let v = img.get_pixel(x, y)[0] as f64;
                        if i % 2 == 1 {
                            v * self.cfg.odd_weight
                        } else {
                            v
                        }
                    })
                    .sum();
                total / n
            })
            .collect()
    }

    /// Descriptors for many corners, in input order
    pub fn describe_all(&self, img: &GrayImage, corners: &[Corner]) -> Vec<DescribedCorner> {
        let described: Vec<DescribedCorner> = corners
            .par_iter()
            .map(|&corner| DescribedCorner {
                corner,
                descriptor: self.describe(img, corner),
            })
            .collect();
        let zeroed = described
            .iter()
            .filter(|d| d.descriptor.iter().all(|&v| v == 0.0))
            .count();
        log::debug!("described {} corners ({} at the border)", described.len(), zeroed);
        described
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use proptest::prelude::*;

    fn flat(value: u8) -> GrayImage {
        GrayImage::from_pixel(100, 80, Luma([value]))
    }

    #[test]
    fn test_ring_count() {
        let d = CircularDescriptor::new(DescriptorConfig::default()).unwrap();
        assert_eq!(d.ring_count(), 15);
        let d = CircularDescriptor::new(DescriptorConfig {
            rho_step: 4,
            ..DescriptorConfig::default()
        })
        .unwrap();
        assert_eq!(d.ring_count(), 4);
    }

    #[test]
    fn test_sampling_counts() {
        assert_eq!(AngularSampling::DegreeStride(8).angles().len(), 45);
        assert_eq!(AngularSampling::DegreeStride(7).angles().len(), 52);
        assert_eq!(AngularSampling::Count(12).angles().len(), 12);
    }

    #[test]
    fn test_border_corner_gives_zeros() {
        let d = CircularDescriptor::new(DescriptorConfig::default()).unwrap();
        let img = flat(200);
        for corner in [Corner::new(19, 40), Corner::new(50, 5), Corner::new(81, 40), Corner::new(50, 61)] {
            let desc = d.describe(&img, corner);
            assert_eq!(desc, vec![0.0; 15], "{:?}", corner);
        }
    }

    #[test]
    fn test_margin_is_inclusive() {
        let d = CircularDescriptor::new(DescriptorConfig::default()).unwrap();
        let img = flat(50);
        let desc = d.describe(&img, Corner::new(20, 20));
        assert!(desc.iter().all(|&v| (v - 50.0).abs() < 1e-9));
        let desc = d.describe(&img, Corner::new(80, 60));
        assert!(desc.iter().all(|&v| (v - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_odd_weighting() {
        let d = CircularDescriptor::new(DescriptorConfig::weighted()).unwrap();
        let desc = d.describe(&flat(100), Corner::new(50, 40));
        let expected = (23.0 * 100.0 + 22.0 * 200.0) / 45.0;
        for v in desc {
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rings_see_radial_structure() {
        // brightness grows with distance from (50, 40)
        let img = GrayImage::from_fn(100, 80, |x, y| {
            let dx = x as f64 - 50.0;
            let dy = y as f64 - 40.0;
            Luma([((dx * dx + dy * dy).sqrt() * 5.0).min(255.0) as u8])
        });
        let d = CircularDescriptor::new(DescriptorConfig::default()).unwrap();
        let desc = d.describe(&img, Corner::new(50, 40));
        for pair in desc.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_invalid_configs() {
        let bad = DescriptorConfig {
            rho_min: 20,
            rho_max: 20,
            ..DescriptorConfig::default()
        };
        assert!(matches!(
            CircularDescriptor::new(bad),
            Err(DescriptorError::InvalidRadii { .. })
        ));
        let bad = DescriptorConfig {
            rho_step: 0,
            ..DescriptorConfig::default()
        };
        assert!(matches!(
            CircularDescriptor::new(bad),
            Err(DescriptorError::InvalidStep(0))
        ));
        let bad = DescriptorConfig {
            sampling: AngularSampling::Count(0),
            ..DescriptorConfig::default()
        };
        assert!(CircularDescriptor::new(bad).is_err());
    }

    #[test]
    fn test_describe_all_preserves_order() {
        let d = CircularDescriptor::new(DescriptorConfig::default()).unwrap();
        let corners = vec![Corner::new(50, 40), Corner::new(2, 2), Corner::new(30, 30)];
        let out = d.describe_all(&flat(10), &corners);
        let got: Vec<Corner> = out.iter().map(|d| d.corner).collect();
        assert_eq!(got, corners);
        assert!(out[1].descriptor.iter().all(|&v| v == 0.0));
    }

    proptest! {
        #[test]
        fn prop_length_is_fixed(x in 0u32..100, y in 0u32..80, value in 0u8..=255) {
            let d = CircularDescriptor::new(DescriptorConfig::default()).unwrap();
            let desc = d.describe(&flat(value), Corner::new(x, y));
            prop_assert_eq!(desc.len(), 15);
        }
    }
}
