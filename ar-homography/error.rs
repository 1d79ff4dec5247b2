#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    TooFewPoints { needed: usize, got: usize },
    LengthMismatch { src: usize, dst: usize },
    DegenerateConfiguration,
    SingularFit,
    NoConsensus { best_inliers: usize, needed: usize },
    InvalidThreshold(f64),
    InvalidConfidence(f64),
    InvalidIterations,
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HomographyError::TooFewPoints { needed, got } => {
                write!(f, "Need at least {} point pairs, got {}", needed, got)
            }
            HomographyError::LengthMismatch { src, dst } => {
                write!(f, "Point count mismatch: {} source vs {} destination", src, dst)
            }
            HomographyError::DegenerateConfiguration => write!(f, "Degenerate point configuration"),
            HomographyError::SingularFit => write!(f, "Fitted transform is singular or non-finite"),
            HomographyError::NoConsensus { best_inliers, needed } => {
                write!(f, "No consensus: best model has {} inliers (need {})", best_inliers, needed)
            }
            HomographyError::InvalidThreshold(t) => {
                write!(f, "Invalid reprojection threshold: {} (must be finite and > 0)", t)
            }
            HomographyError::InvalidConfidence(c) => write!(f, "Invalid confidence: {} (must be in (0, 1))", c),
            HomographyError::InvalidIterations => write!(f, "Maximum iteration count must be > 0"),
        }
    }
}

impl std::error::Error for HomographyError {}

pub type HomographyResult<T> = Result<T, HomographyError>;
