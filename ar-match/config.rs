#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    InvalidTreeCount(usize),
    InvalidChecks(usize),
    InvalidLeafSize(usize),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::InvalidTreeCount(n) => write!(f, "Invalid kd-tree count: {} (must be 1-32)", n),
            MatchError::InvalidChecks(n) => write!(f, "Invalid search checks: {} (must be > 0)", n),
            MatchError::InvalidLeafSize(n) => write!(f, "Invalid leaf size: {} (must be > 0)", n),
        }
    }
}

impl std::error::Error for MatchError {}

pub type MatchResult<T> = Result<T, MatchError>;

/// Randomized kd-forest search settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatcherConfig {
    pub trees: usize,
    /// Distance evaluations per query once every tree has been descended
    pub checks: usize,
    pub leaf_size: usize,
    pub seed: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { trees: 5, checks: 50, leaf_size: 4, seed: 0x5eed }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> MatchResult<()> {
        if self.trees == 0 || self.trees > 32 {
            return Err(MatchError::InvalidTreeCount(self.trees));
        }
        if self.checks == 0 {
            return Err(MatchError::InvalidChecks(self.checks));
        }
        if self.leaf_size == 0 {
            return Err(MatchError::InvalidLeafSize(self.leaf_size));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "MatcherConfig: trees={}, checks={}, leaf_size={}, seed={:#x}",
            self.trees, self.checks, self.leaf_size, self.seed
        )
    }
}
