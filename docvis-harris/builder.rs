use crate::config::HarrisConfig;
use crate::detector::HarrisDetector;
use crate::error::HarrisResult;

/// Builder for creating a `HarrisDetector`
#[derive(Debug, Clone, Default)]
pub struct HarrisBuilder {
    config: HarrisConfig,
}

impl HarrisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trace weight `k`
    pub fn k(mut self, k: f64) -> Self {
        self.config.k = k;
        self
    }

    /// Set the normalised response threshold (0-1)
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the window half-width
    pub fn offset(mut self, offset: usize) -> Self {
        self.config.offset = offset;
        self
    }

    /// Set the Gaussian pre-smoothing aperture
    pub fn blur_ksize(mut self, ksize: usize) -> Self {
        self.config.blur_ksize = ksize;
        self
    }

    pub fn preset_sensitive(mut self) -> Self {
        self.config = HarrisConfig::sensitive_preset();
        self
    }

    pub fn preset_strict(mut self) -> Self {
        self.config = HarrisConfig::strict_preset();
        self
    }

    /// Build the detector, validating the settings
    pub fn build(self) -> HarrisResult<HarrisDetector> {
        HarrisDetector::new(self.config)
    }

    pub fn summary(&self) -> String {
        self.config.summary()
    }

    pub fn from_config(config: HarrisConfig) -> Self {
        Self { config }
    }

    pub fn to_config(self) -> HarrisConfig {
        self.config
    }
}
