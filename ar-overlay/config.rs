use ar_core::CoreConfig;
use ar_describe::DescriptorConfig;
use ar_detect::DetectorConfig;
use ar_homography::RansacConfig;
use ar_match::MatcherConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::compositor::CompositeConfig;
use crate::error::ConfigError;

/// Complete session configuration with all stage settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Metadata
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
    pub core: CoreConfig,
    pub detector: DetectorConfig,
    pub descriptor: DescriptorConfig,
    pub matcher: MatcherConfig,
    pub ransac: RansacConfig,
    pub composite: CompositeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            version: None,
            core: CoreConfig::default(),
            detector: DetectorConfig::default(),
            descriptor: DescriptorConfig::default(),
            matcher: MatcherConfig::default(),
            ransac: RansacConfig::default(),
            composite: CompositeConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Still images: a single query against a single photo
    pub fn still_image() -> Self {
        Self::default().with_metadata("Still Image", "Query, target and AR image loaded from files")
    }

    /// Live video: stricter gate and a cheaper detector for per-frame work
    pub fn live_video() -> Self {
        Self {
            core: CoreConfig { min_match_count: 40, ..CoreConfig::default() },
            detector: DetectorConfig::fast_preset(),
            ..Self::default()
        }
        .with_metadata("Live Video", "Per-frame overlay on a camera or frame sequence")
    }

    /// Only overlay when the query is unmistakably present
    pub fn strict() -> Self {
        Self {
            core: CoreConfig { min_match_count: 200, ..CoreConfig::default() },
            detector: DetectorConfig::quality_preset(),
            ransac: RansacConfig { reproj_threshold: 3.0, ..RansacConfig::default() },
            ..Self::default()
        }
        .with_metadata("Strict", "High match count and tight reprojection threshold")
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "SessionConfig[{}]: min_matches={}, ratio={:.2}, threads={}, levels={}x{:.2}, max_features={}, trees={}, checks={}, reproj={:.1}px, interp={:?}",
            self.name.as_deref().unwrap_or("custom"),
            self.core.min_match_count,
            self.core.ratio,
            self.core.n_threads,
            self.detector.n_levels,
            self.detector.scale_factor,
            self.detector.max_features,
            self.matcher.trees,
            self.matcher.checks,
            self.ransac.reproj_threshold,
            self.composite.interpolation,
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.core.ratio > 0.0 && self.core.ratio <= 1.0) {
            return Err(ConfigError::InvalidRatio(self.core.ratio));
        }
        if self.core.n_threads == 0 {
            return Err(ConfigError::InvalidThreadCount);
        }
        self.detector.validate()?;
        self.descriptor.validate()?;
        self.matcher.validate()?;
        self.ransac.validate()?;
        self.composite.validate()?;
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
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
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `.json` or `.toml`, picked by file extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::load_toml(path),
            _ => Self::load_json(path),
        }
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
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
    fn test_presets() {
        assert_eq!(SessionConfig::default().core.min_match_count, 10);
        assert_eq!(SessionConfig::still_image().core.min_match_count, 10);
        assert_eq!(SessionConfig::live_video().core.min_match_count, 40);
        assert_eq!(SessionConfig::strict().core.min_match_count, 200);
        for cfg in [SessionConfig::still_image(), SessionConfig::live_video(), SessionConfig::strict()] {
            assert!(cfg.validate().is_ok(), "{}", cfg.summary());
        }
    }

    #[test]
    fn test_metadata_and_summary() {
        let cfg = SessionConfig::default().with_metadata("Poster", "Cinema poster overlay");
        assert_eq!(cfg.name.as_deref(), Some("Poster"));
        assert!(cfg.summary().contains("Poster"));
        assert!(cfg.summary().contains("min_matches=10"));
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = SessionConfig::default();
        cfg.core.ratio = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidRatio(0.0)));

        let mut cfg = SessionConfig::default();
        cfg.core.n_threads = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidThreadCount));

        let mut cfg = SessionConfig::default();
        cfg.matcher.trees = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Matcher(_))));

        let mut cfg = SessionConfig::default();
        cfg.ransac.reproj_threshold = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Ransac(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_and_toml_round_trip() {
        let cfg = SessionConfig::live_video();
        let back = SessionConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
        let back = SessionConfig::from_toml(&cfg.to_toml().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_invalid_json_is_rejected_on_load() {
        let mut cfg = SessionConfig::default();
        cfg.core.ratio = 2.0;
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(SessionConfig::from_json(&json).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("ar-overlay-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cfg = SessionConfig::strict();

        cfg.save_json(dir.join("strict.json")).unwrap();
        cfg.save_toml(dir.join("strict.toml")).unwrap();
        assert_eq!(SessionConfig::load(dir.join("strict.json")).unwrap(), cfg);
        assert_eq!(SessionConfig::load(dir.join("strict.toml")).unwrap(), cfg);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
