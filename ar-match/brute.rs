use ar_core::{Correspondence, Descriptor, DescriptorMatcher};
use rayon::prelude::*;

use crate::squared_distance;

/// Exhaustive Euclidean k-nearest-neighbour search
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl DescriptorMatcher for BruteForceMatcher {
    fn knn_match(&self, query: &[Descriptor], target: &[Descriptor], k: usize) -> Vec<Vec<Correspondence>> {
        query
            .par_iter()
            .enumerate()
            .map(|(query_idx, q)| {
                let mut scored: Vec<(f32, usize)> = target
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (squared_distance(q, t), i))
                    .collect();
                scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                scored.truncate(k);
                scored
                    .into_iter()
                    .map(|(d, target_idx)| Correspondence { query_idx, target_idx, distance: d.sqrt() })
                    .collect()
            })
            .collect()
    }
}
