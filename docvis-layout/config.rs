use docvis_imgproc::{ConnectOptions, HoughParams, PeakOptions};

use crate::error::{LayoutError, LayoutResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which of the detected line peaks are kept, by their index in the peak list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PeakKeep {
    All,
    /// Indices 1, 3, 5, ...
    #[default]
    Odd,
    /// Indices 0, 2, 4, ...
    Even,
    EveryNth { step: usize, start: usize },
}

impl PeakKeep {
    pub fn apply(&self, peaks: &[usize]) -> Vec<usize> {
        let keep = |i: usize| match *self {
            PeakKeep::All => true,
            PeakKeep::Odd => i % 2 == 1,
            PeakKeep::Even => i % 2 == 0,
            PeakKeep::EveryNth { step, start } => i >= start && (i - start) % step.max(1) == 0,
        };
        peaks
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| keep(i).then_some(p))
            .collect()
    }
}

/// Tuning for one segmentation granularity
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelConfig {
    /// Gaussian aperture applied to the projection profile
    pub smoothing_ksize: usize,
    pub peaks: PeakOptions,
    /// Rows above the line centre included in the band
    pub band_above: u32,
    /// Rows below the line centre included in the band
    pub band_below: u32,
    /// Box blur radius applied to the band before projecting (0 = none)
    pub blur_radius: u32,
    /// Columns skipped at the left of the page
    pub inset_left: u32,
    /// Columns skipped at the right of the page
    pub inset_right: u32,
    /// Open the first span at the band start
    pub leading_edge: bool,
    /// Close the last span at the band end
    pub trailing_edge: bool,
    /// Discard the last span when there is more than one
    #[cfg_attr(feature = "serde", serde(default))]
    pub drop_final_span: bool,
}

impl LevelConfig {
    pub fn lines() -> Self {
        Self {
            smoothing_ksize: 3,
            peaks: PeakOptions::new(100.0, 20),
            band_above: 30,
            band_below: 25,
            blur_radius: 0,
            inset_left: 0,
            inset_right: 0,
            leading_edge: false,
            trailing_edge: false,
            drop_final_span: false,
        }
    }

    pub fn words() -> Self {
        Self {
            smoothing_ksize: 5,
            peaks: PeakOptions::new(15000.0, 60),
            band_above: 35,
            band_below: 25,
            blur_radius: 12,
            inset_left: 15,
            inset_right: 5,
            leading_edge: true,
            trailing_edge: true,
            drop_final_span: false,
        }
    }

    pub fn letters() -> Self {
        Self {
            smoothing_ksize: 3,
            peaks: PeakOptions::new(200.0, 30),
            band_above: 35,
            band_below: 35,
            blur_radius: 0,
            inset_left: 15,
            inset_right: 5,
            leading_edge: true,
            trailing_edge: false,
            drop_final_span: true,
        }
    }

    pub fn validate(&self) -> LayoutResult<()> {
        if self.smoothing_ksize == 0 || self.smoothing_ksize % 2 == 0 {
            return Err(LayoutError::InvalidKernelSize(self.smoothing_ksize));
        }
        if self.peaks.distance == Some(0) {
            return Err(LayoutError::InvalidPeakDistance(0));
        }
        Ok(())
    }
}

/// Projection-profile segmentation settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentationConfig {
    pub connect: ConnectOptions,
    pub lines: LevelConfig,
    pub words: LevelConfig,
    pub letters: LevelConfig,
    /// Which line peaks survive
    pub keep: PeakKeep,
    /// Shift from a kept peak to the line centre
    pub line_offset: i32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            connect: ConnectOptions::default(),
            lines: LevelConfig::lines(),
            words: LevelConfig::words(),
            letters: LevelConfig::letters(),
            keep: PeakKeep::Odd,
            line_offset: 10,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> LayoutResult<()> {
        self.lines.validate()?;
        self.words.validate()?;
        self.letters.validate()?;
        if let PeakKeep::EveryNth { step: 0, .. } = self.keep {
            return Err(LayoutError::InvalidPeakDistance(0));
        }
        Ok(())
    }
}

/// Zone around the spectrum centre whose segments are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CentralExclusion {
    /// Horizontal band `|y - cy| <= radius`
    #[default]
    Band,
    /// Disk of `radius` around the centre
    Disk,
}

impl CentralExclusion {
    /// True when the point lies inside the excluded zone
    pub fn contains(&self, x: f64, y: f64, cx: f64, cy: f64, radius: f64) -> bool {
        match self {
            CentralExclusion::Band => (y - cy).abs() <= radius,
            CentralExclusion::Disk => (x - cx).hypot(y - cy) <= radius,
        }
    }
}

/// Skew estimation and correction settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkewConfig {
    pub connect: ConnectOptions,
    /// Cut-off on `20 ln|F|`
    pub spectrum_threshold: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough: HoughParams,
    pub exclusion: CentralExclusion,
    pub exclusion_radius: f64,
    /// Candidates span `[e - half_width, e + half_width)`
    pub search_half_width: u32,
    pub search_step: u32,
    pub serial_weight: f64,
    pub estimate_weight: f64,
    /// Filled share of a region's box needed to count as text
    pub min_fill_ratio: f64,
    /// Both box sides must exceed this
    pub min_region_size: u32,
    /// Value for pixels uncovered by the final rotation
    pub fill: u8,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            connect: ConnectOptions::default(),
            spectrum_threshold: 235.0,
            canny_low: 200.0,
            canny_high: 235.0,
            hough: HoughParams::default(),
            exclusion: CentralExclusion::Band,
            exclusion_radius: 180.0,
            search_half_width: 10,
            search_step: 1,
            serial_weight: 0.5,
            estimate_weight: 0.1,
            min_fill_ratio: 0.45,
            min_region_size: 8,
            fill: 0,
        }
    }
}

impl SkewConfig {
    pub fn validate(&self) -> LayoutResult<()> {
        if self.search_step == 0 {
            return Err(LayoutError::InvalidSearchStep(self.search_step));
        }
        if self.search_half_width == 0 {
            return Err(LayoutError::InvalidSearchWindow(self.search_half_width));
        }
        let total = self.serial_weight + self.estimate_weight;
        if total.is_nan() || total <= 0.0 {
            return Err(LayoutError::InvalidWeights {
                serial: self.serial_weight,
                estimate: self.estimate_weight,
            });
        }
        Ok(())
    }
}

/// Everything the layout pipelines read, in one file
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub segmentation: SegmentationConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub skew: SkewConfig,
}

impl LayoutConfig {
    pub fn validate(&self) -> LayoutResult<()> {
        self.segmentation.validate()?;
        self.skew.validate()
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_keep_policies() {
        let peaks = [10, 20, 30, 40, 50];
        assert_eq!(PeakKeep::All.apply(&peaks), peaks.to_vec());
        assert_eq!(PeakKeep::Odd.apply(&peaks), vec![20, 40]);
        assert_eq!(PeakKeep::Even.apply(&peaks), vec![10, 30, 50]);
        assert_eq!(
            PeakKeep::EveryNth { step: 3, start: 1 }.apply(&peaks),
            vec![20, 50]
        );
    }

    #[test]
    fn test_defaults_validate() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_even_smoothing_rejected() {
        let mut cfg = SegmentationConfig::default();
        cfg.words.smoothing_ksize = 4;
        assert_eq!(cfg.validate(), Err(LayoutError::InvalidKernelSize(4)));
    }

    #[test]
    fn test_zero_weights_rejected() {
        let cfg = SkewConfig {
            serial_weight: 0.0,
            estimate_weight: 0.0,
            ..SkewConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(LayoutError::InvalidWeights { .. })));
    }

    #[test]
    fn test_exclusion_zones() {
        let band = CentralExclusion::Band;
        assert!(band.contains(1000.0, 105.0, 100.0, 100.0, 10.0));
        assert!(!band.contains(100.0, 120.0, 100.0, 100.0, 10.0));
        let disk = CentralExclusion::Disk;
        assert!(!disk.contains(1000.0, 105.0, 100.0, 100.0, 10.0));
        assert!(disk.contains(106.0, 106.0, 100.0, 100.0, 10.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_round_trip() {
        let mut cfg = LayoutConfig::default();
        cfg.segmentation.keep = PeakKeep::EveryNth { step: 2, start: 0 };
        cfg.skew.exclusion = CentralExclusion::Disk;
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(LayoutConfig::from_toml(&text).unwrap(), cfg);
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(LayoutConfig::from_json(&json).unwrap(), cfg);
    }
}
