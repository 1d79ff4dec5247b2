#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    InvalidImageSize { width: u32, height: u32 },
    ImageTooSmall { width: u32, height: u32, min_size: u32 },
    InvalidLevels(usize),
    InvalidScaleFactor(f32),
    InvalidSigma(f32),
    InvalidWindowRadius(usize),
    InvalidPatchSize(usize),
    InvalidBorder { border: usize, min_border: usize },
    InvalidMaxFeatures,
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            DetectError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
            DetectError::InvalidLevels(n) => {
                write!(f, "Invalid pyramid level count: {} (must be 1-16)", n)
            }
            DetectError::InvalidScaleFactor(s) => {
                write!(f, "Invalid pyramid scale factor: {} (must be in (1, 2])", s)
            }
            DetectError::InvalidSigma(s) => {
                write!(f, "Invalid blur sigma: {} (must be finite and > 0)", s)
            }
            DetectError::InvalidWindowRadius(r) => {
                write!(f, "Invalid structure tensor window radius: {} (must be 1-4)", r)
            }
            DetectError::InvalidPatchSize(p) => {
                write!(f, "Invalid orientation patch size: {} (must be odd and >= 3)", p)
            }
            DetectError::InvalidBorder { border, min_border } => {
                write!(f, "Border {} too small for response window (minimum {})", border, min_border)
            }
            DetectError::InvalidMaxFeatures => write!(f, "Maximum feature count must be > 0"),
        }
    }
}

impl std::error::Error for DetectError {}

pub type DetectResult<T> = Result<T, DetectError>;
