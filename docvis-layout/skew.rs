use std::str::FromStr;

use docvis_core::{DebugOutput, LineSegment};
use docvis_imgproc::projection::{diff, variance};
use docvis_imgproc::{
    connect_text, external_regions, full_region, rotate_expand, row_sums, spectrum_mask,
    ProbabilisticHough, Region,
};
use image::GrayImage;
use imageproc::edges::canny;
use rayon::prelude::*;

use crate::config::{CentralExclusion, SkewConfig};
use crate::error::{LayoutError, LayoutResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which estimator drives `deskew`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SkewMethod {
    /// Spectrum line estimate followed by the serial search
    #[default]
    Spectral,
    /// Mean orientation of text-like regions
    Contour,
}

impl FromStr for SkewMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spectral" | "fft" => Ok(SkewMethod::Spectral),
            "contour" | "contours" => Ok(SkewMethod::Contour),
            other => Err(format!("unknown skew method '{}' (spectral|contour)", other)),
        }
    }
}

/// Corrected page together with the rotation applied to it
#[derive(Debug, Clone)]
pub struct Deskewed {
    /// Degrees, counter-clockwise positive
    pub angle: f64,
    pub image: GrayImage,
}

/// Correction angle from the mean slope of the spectrum lines.
///
/// Text lines show up perpendicular to themselves in the spectrum, so the
/// slope angle is folded back by 90 degrees.
pub fn correction_from_slope(mean_slope: f64) -> f64 {
    let a = mean_slope.atan().to_degrees();
    if a == 0.0 {
        0.0
    } else if a > 0.0 {
        -(90.0 - a)
    } else {
        90.0 + a
    }
}

/// Mean slope of `segments`, `None` when there are none
pub fn mean_slope(segments: &[LineSegment]) -> Option<f64> {
    if segments.is_empty() {
        return None;
    }
    Some(segments.iter().map(LineSegment::slope).sum::<f64>() / segments.len() as f64)
}

/// Segments with at least one endpoint outside the excluded zone
pub fn outside_exclusion(
    segments: Vec<LineSegment>,
    exclusion: CentralExclusion,
    center: (f64, f64),
    radius: f64,
) -> Vec<LineSegment> {
    let (cx, cy) = center;
    segments
        .into_iter()
        .filter(|s| {
            !(exclusion.contains(s.x1 as f64, s.y1 as f64, cx, cy, radius)
                && exclusion.contains(s.x2 as f64, s.y2 as f64, cx, cy, radius))
        })
        .collect()
}

/// Document skew estimation and correction
#[derive(Debug, Clone)]
pub struct SkewEstimator {
    cfg: SkewConfig,
    debug: DebugOutput,
}

impl SkewEstimator {
    pub fn new(cfg: SkewConfig) -> LayoutResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            debug: DebugOutput::disabled(),
        })
    }

    pub fn with_debug(mut self, debug: DebugOutput) -> Self {
        self.debug = debug;
        self
    }

    pub fn config(&self) -> &SkewConfig {
        &self.cfg
    }

    fn connected(&self, gray: &GrayImage) -> GrayImage {
        let (connected, _) = connect_text(gray, &self.cfg.connect);
        self.debug.emit("skew_connected", &connected);
        connected
    }

    /// Frequency-domain estimate for a grayscale page
    pub fn estimate_spectral(&self, gray: &GrayImage) -> LayoutResult<f64> {
        self.spectral_angle(&self.connected(gray))
    }

    /// Frequency-domain estimate for an already connected text mask
    pub fn spectral_angle(&self, connected: &GrayImage) -> LayoutResult<f64> {
        let mask = spectrum_mask(connected, self.cfg.spectrum_threshold)?;
        self.debug.emit("skew_spectrum", &mask);
        let edges = canny(&mask, self.cfg.canny_low, self.cfg.canny_high);
        self.debug.emit("skew_edges", &edges);

        let segments = ProbabilisticHough::new(self.cfg.hough).detect(&edges);
        let found = segments.len();
        let center = ((mask.width() / 2) as f64, (mask.height() / 2) as f64);
        let kept = outside_exclusion(
            segments,
            self.cfg.exclusion,
            center,
            self.cfg.exclusion_radius,
        );
        log::debug!(
            "spectrum: {} segments, {} outside the {:?} exclusion",
            found,
            kept.len(),
            self.cfg.exclusion
        );

        let slope = mean_slope(&kept).ok_or(LayoutError::NoSkewEvidence)?;
        let angle = correction_from_slope(slope);
        log::info!("spectral skew estimate {:.2} deg", angle);
        Ok(angle)
    }

    /// Spectral energy score of `connected` rotated by `degrees`: variance of
    /// the first difference of the spectrum mask's row sums
    pub fn alignment_score(&self, connected: &GrayImage, degrees: f64) -> LayoutResult<f64> {
        let rotated = rotate_expand(connected, degrees, 0)?;
        let mask = spectrum_mask(&rotated, self.cfg.spectrum_threshold)?;
        let rows = row_sums(&mask, full_region(&mask))?;
        Ok(variance(&diff(&rows)))
    }

    /// Integer search around `estimate`, blended back with the estimate.
    ///
    /// Candidates are scored in parallel; the first best candidate wins.
    pub fn refine(&self, connected: &GrayImage, estimate: f64) -> LayoutResult<f64> {
        let half = self.cfg.search_half_width as f64;
        let lo = (estimate - half).trunc() as i64;
        let hi = (estimate + half).trunc() as i64;
        let candidates: Vec<i64> = (lo..hi).step_by(self.cfg.search_step as usize).collect();

        let scores = candidates
            .par_iter()
            .map(|&c| self.alignment_score(connected, c as f64))
            .collect::<LayoutResult<Vec<f64>>>()?;

        let mut best: Option<(i64, f64)> = None;
        for (&c, &score) in candidates.iter().zip(&scores) {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((c, score));
            }
        }
        let (serial, _) = best.ok_or(LayoutError::NoSkewEvidence)?;

        let (sw, ew) = (self.cfg.serial_weight, self.cfg.estimate_weight);
        let angle = ((sw * serial as f64 + ew * estimate) / (sw + ew)).trunc();
        log::info!(
            "serial search over {} candidates: best {} deg, final {} deg",
            candidates.len(),
            serial,
            angle
        );
        Ok(angle)
    }

    /// Contour-orientation estimate for a grayscale page
    pub fn estimate_contour(&self, gray: &GrayImage) -> LayoutResult<f64> {
        self.contour_angle(&self.connected(gray))
    }

    /// Mean orientation of the text-like regions of a connected mask
    pub fn contour_angle(&self, connected: &GrayImage) -> LayoutResult<f64> {
        let regions = external_regions(connected);
        let min_size = self.cfg.min_region_size;
        let angles: Vec<f64> = regions
            .iter()
            .filter(|r| {
                r.fill_ratio > self.cfg.min_fill_ratio
                    && r.bounds.width > min_size
                    && r.bounds.height > min_size
            })
            .map(Region::orientation)
            .collect();
        log::debug!("contours: {} of {} regions look like text", angles.len(), regions.len());

        if angles.is_empty() {
            return Err(LayoutError::NoSkewEvidence);
        }
        let angle = angles.iter().sum::<f64>() / angles.len() as f64;
        log::info!("contour skew estimate {:.2} deg", angle);
        Ok(angle)
    }

    /// Estimate the skew of `gray` and rotate it upright
    pub fn deskew(&self, gray: &GrayImage, method: SkewMethod) -> LayoutResult<Deskewed> {
        let connected = self.connected(gray);
        let angle = match method {
            SkewMethod::Spectral => {
                let estimate = self.spectral_angle(&connected)?;
                self.refine(&connected, estimate)?
            }
            SkewMethod::Contour => self.contour_angle(&connected)?,
        };
        let image = rotate_expand(gray, angle, self.cfg.fill)?;
        self.debug.emit("skew_deskewed", &image);
        Ok(Deskewed { angle, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvis_imgproc::morphology::threshold_above;
    use image::Luma;

    fn estimator() -> SkewEstimator {
        SkewEstimator::new(SkewConfig::default()).unwrap()
    }

    /// Three-pixel white lines every twelve rows on black
    fn grating() -> GrayImage {
        GrayImage::from_fn(400, 300, |x, y| {
            if (40..360).contains(&x) && (40..260).contains(&y) && y % 12 < 3 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Solid white bars, text-line sized, on black
    fn bars() -> GrayImage {
        GrayImage::from_fn(200, 160, |x, y| {
            let in_bar = (30..90).contains(&x) || (110..170).contains(&x);
            let in_row = (30..44).contains(&y) || (70..84).contains(&y) || (110..124).contains(&y);
            if in_bar && in_row {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Dark text-line bars on a light 600x600 page, ragged right edge and
    /// uneven line pitch from a fixed LCG
    fn ruled_page() -> GrayImage {
        let mut page = GrayImage::from_pixel(600, 600, Luma([235]));
        let mut state: u32 = 12345;
        let mut next = |n: u32| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (state >> 16) % n
        };
        let mut top = 60;
        while top + 16 <= 540 {
            let right = 540 - next(60);
            for y in top..top + 16 {
                for x in 60..right {
                    page.put_pixel(x, y, Luma([30]));
                }
            }
            top += 30 + next(21);
        }
        page
    }

    fn page_estimator() -> SkewEstimator {
        SkewEstimator::new(SkewConfig {
            spectrum_threshold: 219.0,
            exclusion_radius: 67.0,
            fill: 255,
            ..SkewConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_angle_rule() {
        assert_eq!(correction_from_slope(0.0), 0.0);
        // 45 degree slope folds to -45
        assert!((correction_from_slope(1.0) + 45.0).abs() < 1e-9);
        assert!((correction_from_slope(-1.0) - 45.0).abs() < 1e-9);
        // steep spectrum line, nearly level text
        let steep = 80.0f64.to_radians().tan();
        assert!((correction_from_slope(steep) + 10.0).abs() < 1e-9);
        assert!((correction_from_slope(-steep) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_slope() {
        assert_eq!(mean_slope(&[]), None);
        let segs = [LineSegment::new(0, 0, 10, 10), LineSegment::new(0, 0, 10, 30)];
        assert_eq!(mean_slope(&segs), Some(2.0));
    }

    #[test]
    fn test_band_exclusion_drops_central_segments() {
        let segs = vec![
            LineSegment::new(0, 95, 400, 105),
            LineSegment::new(200, 10, 200, 190),
            LineSegment::new(10, 0, 20, 20),
        ];
        let kept = outside_exclusion(segs, CentralExclusion::Band, (200.0, 100.0), 50.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], LineSegment::new(200, 10, 200, 190));
    }

    #[test]
    fn test_disk_exclusion_keeps_far_horizontal_segments() {
        let segs = vec![LineSegment::new(0, 100, 400, 100), LineSegment::new(190, 95, 210, 105)];
        let kept = outside_exclusion(segs, CentralExclusion::Disk, (200.0, 100.0), 50.0);
        assert_eq!(kept, vec![LineSegment::new(0, 100, 400, 100)]);
    }

    #[test]
    fn test_blank_page_has_no_evidence() {
        let img = GrayImage::new(64, 48);
        assert_eq!(
            estimator().spectral_angle(&img),
            Err(LayoutError::NoSkewEvidence)
        );
        assert_eq!(estimator().contour_angle(&img), Err(LayoutError::NoSkewEvidence));
    }

    #[test]
    fn test_refine_keeps_level_grating_level() {
        let angle = estimator().refine(&grating(), 0.0).unwrap();
        assert!(angle.abs() <= 2.0, "{}", angle);
    }

    #[test]
    fn test_refine_recovers_rotation() {
        let tilted = rotate_expand(&grating(), 5.0, 0).unwrap();
        let angle = estimator().refine(&tilted, -5.0).unwrap();
        assert!((angle + 5.0).abs() <= 2.0, "{}", angle);
    }

    #[test]
    fn test_refine_from_level_estimate() {
        let tilted = rotate_expand(&grating(), 5.0, 0).unwrap();
        let angle = estimator().refine(&tilted, 0.0).unwrap();
        assert!((angle + 5.0).abs() <= 2.0, "{}", angle);
    }

    #[test]
    fn test_spectral_estimate_of_tilted_page() {
        let page = ruled_page();
        let estimator = page_estimator();
        for tilt in [-7.0, -3.0, 5.0] {
            let tilted = rotate_expand(&page, tilt, 255).unwrap();
            let estimate = estimator.estimate_spectral(&tilted).unwrap();
            assert!((estimate + tilt).abs() <= 2.5, "tilt {}: {}", tilt, estimate);
        }
    }

    #[test]
    fn test_deskew_corrects_tilted_page() {
        let page = ruled_page();
        let estimator = page_estimator();
        for tilt in [-7.0, -5.0, -3.0, 3.0, 5.0, 7.0] {
            let tilted = rotate_expand(&page, tilt, 255).unwrap();
            let d = estimator.deskew(&tilted, SkewMethod::Spectral).unwrap();
            assert!((d.angle + tilt).abs() <= 1.0, "tilt {}: {}", tilt, d.angle);
            assert!(d.image.width() > tilted.width());
        }
    }

    #[test]
    fn test_refine_result_is_integral() {
        let angle = estimator().refine(&grating(), 3.7).unwrap();
        assert_eq!(angle, angle.trunc());
    }

    #[test]
    fn test_contour_angle_of_level_bars() {
        let angle = estimator().contour_angle(&bars()).unwrap();
        assert!(angle.abs() < 1.0, "{}", angle);
    }

    #[test]
    fn test_contour_angle_of_tilted_bars() {
        let tilted = threshold_above(&rotate_expand(&bars(), 5.0, 0).unwrap(), 127);
        let angle = estimator().contour_angle(&tilted).unwrap();
        assert!((angle + 5.0).abs() <= 2.0, "{}", angle);
    }

    #[test]
    fn test_small_blobs_are_ignored() {
        let img = GrayImage::from_fn(60, 60, |x, y| {
            if (10..15).contains(&x) && (10..15).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        assert_eq!(estimator().contour_angle(&img), Err(LayoutError::NoSkewEvidence));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("spectral".parse::<SkewMethod>(), Ok(SkewMethod::Spectral));
        assert_eq!("Contour".parse::<SkewMethod>(), Ok(SkewMethod::Contour));
        assert!("hough".parse::<SkewMethod>().is_err());
    }

    #[test]
    fn test_zero_search_window_rejected() {
        let cfg = SkewConfig {
            search_half_width: 0,
            ..SkewConfig::default()
        };
        assert!(matches!(
            SkewEstimator::new(cfg),
            Err(LayoutError::InvalidSearchWindow(0))
        ));
    }
}
