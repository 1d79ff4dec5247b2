use ar_core::Correspondence;

/// Keep the nearest neighbour of each pair iff `d1 < ratio * d2`.
/// Entries with fewer than two neighbours contribute nothing.
pub fn ratio_test(knn: &[Vec<Correspondence>], ratio: f32) -> Vec<Correspondence> {
    knn.iter()
        .filter_map(|pair| match pair.as_slice() {
            [best, second, ..] if best.distance < ratio * second.distance => Some(*best),
            _ => None,
        })
        .collect()
}
