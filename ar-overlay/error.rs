use ar_describe::DescribeError;
use ar_detect::DetectError;
use ar_homography::HomographyError;
use ar_match::MatchError;

/// Invalid session configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidRatio(f32),
    InvalidThreadCount,
    InvalidExtentRatio(f64),
    Detector(DetectError),
    Descriptor(DescribeError),
    Matcher(MatchError),
    Ransac(HomographyError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidRatio(r) => write!(f, "Invalid ratio-test threshold: {} (must be in (0, 1])", r),
            ConfigError::InvalidThreadCount => write!(f, "Thread count must be > 0"),
            ConfigError::InvalidExtentRatio(r) => {
                write!(f, "Invalid quad extent ratio: {} (must be finite and >= 1)", r)
            }
            ConfigError::Detector(e) => write!(f, "Detector config: {}", e),
            ConfigError::Descriptor(e) => write!(f, "Descriptor config: {}", e),
            ConfigError::Matcher(e) => write!(f, "Matcher config: {}", e),
            ConfigError::Ransac(e) => write!(f, "RANSAC config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<DetectError> for ConfigError {
    fn from(err: DetectError) -> Self {
        ConfigError::Detector(err)
    }
}

impl From<DescribeError> for ConfigError {
    fn from(err: DescribeError) -> Self {
        ConfigError::Descriptor(err)
    }
}

impl From<MatchError> for ConfigError {
    fn from(err: MatchError) -> Self {
        ConfigError::Matcher(err)
    }
}

impl From<HomographyError> for ConfigError {
    fn from(err: HomographyError) -> Self {
        ConfigError::Ransac(err)
    }
}

/// Session construction failures. The per-frame path never returns these.
#[derive(Debug)]
pub enum OverlayError {
    Config(ConfigError),
    EmptyImage { role: &'static str },
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::Config(e) => write!(f, "Configuration error: {}", e),
            OverlayError::EmptyImage { role } => write!(f, "The {} image has zero width or height", role),
        }
    }
}

impl std::error::Error for OverlayError {}

impl From<ConfigError> for OverlayError {
    fn from(err: ConfigError) -> Self {
        OverlayError::Config(err)
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_nest_under_config() {
        let err: OverlayError = ConfigError::from(DetectError::InvalidLevels(0)).into();
        assert!(matches!(err, OverlayError::Config(ConfigError::Detector(_))));
        assert_eq!(
            err.to_string(),
            "Configuration error: Detector config: Invalid pyramid level count: 0 (must be 1-16)"
        );
    }

    #[test]
    fn test_empty_image_names_its_role() {
        let err = OverlayError::EmptyImage { role: "AR" };
        assert_eq!(err.to_string(), "The AR image has zero width or height");
    }
}
