use crate::builder::HarrisBuilder;
use crate::error::{HarrisError, HarrisResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Harris detector settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HarrisConfig {
    /// Trace weight in `det - k * trace^2`
    pub k: f64,
    /// Cut-off on the min-max normalised response
    pub threshold: f64,
    /// Half-width of the structure-tensor window
    pub offset: usize,
    /// Aperture of the pre-smoothing Gaussian
    pub blur_ksize: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl Default for HarrisConfig {
    fn default() -> Self {
        Self {
            k: 0.04,
            threshold: 0.3,
            offset: 5,
            blur_ksize: 3,
            name: None,
            description: None,
        }
    }
}

impl HarrisConfig {
    /// Lower threshold and a tighter window, more corners on faint texture
    pub fn sensitive_preset() -> Self {
        Self {
            threshold: 0.1,
            offset: 3,
            name: Some("Sensitive".to_string()),
            description: Some("Low threshold, small window".to_string()),
            ..Self::default()
        }
    }

    /// High threshold and a wide window, only pronounced corners
    pub fn strict_preset() -> Self {
        Self {
            threshold: 0.5,
            offset: 7,
            blur_ksize: 5,
            name: Some("Strict".to_string()),
            description: Some("High threshold, wide window".to_string()),
            ..Self::default()
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    pub fn to_builder(self) -> HarrisBuilder {
        HarrisBuilder::from_config(self)
    }

    /// Smallest image side the window fits into
    pub fn min_image_size(&self) -> u32 {
        (2 * self.offset + 1) as u32
    }

    pub fn summary(&self) -> String {
        format!(
            "HarrisConfig: k={}, threshold={}, offset={}, blur_ksize={}",
            self.k, self.threshold, self.offset, self.blur_ksize
        )
    }

    pub fn validate(&self) -> HarrisResult<()> {
        if self.k.is_nan() || self.k <= 0.0 || self.k >= 0.25 {
            return Err(HarrisError::InvalidK(self.k));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(HarrisError::InvalidThreshold(self.threshold));
        }
        if self.offset == 0 {
            return Err(HarrisError::InvalidOffset(self.offset));
        }
        if self.blur_ksize == 0 || self.blur_ksize % 2 == 0 {
            return Err(HarrisError::InvalidBlurSize(self.blur_ksize));
        }
        Ok(())
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
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
