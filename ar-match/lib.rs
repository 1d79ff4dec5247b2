//! Descriptor correspondence search.
//!
//! [`KdForestMatcher`] is the default approximate matcher; [`BruteForceMatcher`]
//! gives exact neighbours through the same [`ar_core::DescriptorMatcher`]
//! interface. [`ratio_test`] filters either one's k=2 output.

pub mod brute;
pub mod config;
pub mod kdforest;
pub mod ratio;

pub use brute::BruteForceMatcher;
pub use config::{MatchError, MatchResult, MatcherConfig};
pub use kdforest::{KdForest, KdForestMatcher};
pub use ratio::ratio_test;

use ar_core::Descriptor;

/// Squared Euclidean distance between two descriptors
#[inline]
pub fn squared_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
