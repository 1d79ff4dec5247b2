//! Randomized kd-forest with best-bin-first search.
//!
//! Every tree partitions the same descriptor set. At each node the split
//! dimension is drawn at random among the highest-variance dimensions and the
//! split value is the mean along it, so the trees differ and together cover
//! regions a single tree would miss. A search descends every tree once, then
//! keeps expanding the closest unexplored branches of all trees from one
//! shared priority queue until the check budget is spent.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ar_core::{Correspondence, Descriptor, DescriptorMatcher, DESCRIPTOR_LEN};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::{MatchResult, MatcherConfig};
use crate::squared_distance;

/// Split dimension is drawn among this many highest-variance dimensions
const RAND_DIM: usize = 5;
/// Mean and variance are estimated on at most this many points per node
const SAMPLE_MEAN: usize = 100;

#[derive(Debug, Clone)]
enum Node {
    Leaf(Vec<usize>),
    Split { dim: usize, value: f32, left: usize, right: usize },
}

/// Node arena for one tree; index 0 is the root
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

/// Unexplored branch ordered by its accumulated split distance
#[derive(Debug, Clone, Copy)]
struct Branch {
    dist: f32,
    tree: usize,
    node: usize,
}

impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap, ties broken by position for determinism
        other
            .dist
            .total_cmp(&self.dist)
            .then(other.tree.cmp(&self.tree))
            .then(other.node.cmp(&self.node))
    }
}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Branch {}

/// k best candidates sorted by (squared distance, index)
struct KnnSet {
    k: usize,
    items: Vec<(f32, usize)>,
}

impl KnnSet {
    fn new(k: usize) -> Self {
        Self { k, items: Vec::with_capacity(k + 1) }
    }

    fn insert(&mut self, dist: f32, idx: usize) {
        if self.k == 0 {
            return;
        }
        if self.items.len() == self.k {
            if let Some(&(worst, worst_idx)) = self.items.last() {
                if (dist, idx) >= (worst, worst_idx) {
                    return;
                }
            }
        }
        let pos = self
            .items
            .partition_point(|&(d, i)| d.total_cmp(&dist).then(i.cmp(&idx)) == Ordering::Less);
        self.items.insert(pos, (dist, idx));
        self.items.truncate(self.k);
    }
}

/// Search index over a fixed descriptor set
pub struct KdForest<'a> {
    points: &'a [Descriptor],
    trees: Vec<Tree>,
    checks: usize,
}

impl<'a> KdForest<'a> {
    /// Build `cfg.trees` randomized trees over `points`
    pub fn build(points: &'a [Descriptor], cfg: &MatcherConfig) -> MatchResult<Self> {
        cfg.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let all: Vec<usize> = (0..points.len()).collect();

        let trees = (0..cfg.trees)
            .map(|_| {
                let mut nodes = Vec::new();
                build_node(points, all.clone(), cfg.leaf_size, &mut rng, &mut nodes);
                Tree { nodes }
            })
            .collect();

        Ok(Self { points, trees, checks: cfg.checks })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Approximate k nearest neighbours as `(index, euclidean distance)`, closest first
    pub fn search_knn(&self, query: &Descriptor, k: usize) -> Vec<(usize, f32)> {
        if self.points.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut result = KnnSet::new(k);
        let mut visited = vec![false; self.points.len()];
        let mut heap = BinaryHeap::new();
        let mut checks = 0usize;

        for tree in 0..self.trees.len() {
            self.descend(tree, 0, 0.0, query, &mut result, &mut visited, &mut heap, &mut checks);
        }

        while checks < self.checks {
            let Some(branch) = heap.pop() else { break };
            self.descend(branch.tree, branch.node, branch.dist, query, &mut result, &mut visited, &mut heap, &mut checks);
        }

        result.items.into_iter().map(|(d, i)| (i, d.sqrt())).collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        tree: usize,
        mut node: usize,
        dist: f32,
        query: &Descriptor,
        result: &mut KnnSet,
        visited: &mut [bool],
        heap: &mut BinaryHeap<Branch>,
        checks: &mut usize,
    ) {
        let nodes = &self.trees[tree].nodes;
        loop {
            match &nodes[node] {
                Node::Split { dim, value, left, right } => {
                    let diff = query[*dim] - value;
                    let (near, far) = if diff < 0.0 { (*left, *right) } else { (*right, *left) };
                    heap.push(Branch { dist: dist + diff * diff, tree, node: far });
                    node = near;
                }
                Node::Leaf(indices) => {
                    for &idx in indices {
                        if visited[idx] {
                            continue;
                        }
                        visited[idx] = true;
                        *checks += 1;
                        result.insert(squared_distance(query, &self.points[idx]), idx);
                    }
                    return;
                }
            }
        }
    }
}

fn build_node(
    points: &[Descriptor],
    indices: Vec<usize>,
    leaf_size: usize,
    rng: &mut ChaCha8Rng,
    nodes: &mut Vec<Node>,
) -> usize {
    let id = nodes.len();
    nodes.push(Node::Leaf(Vec::new()));

    let Some((dim, value)) = choose_split(points, &indices, leaf_size, rng) else {
        nodes[id] = Node::Leaf(indices);
        return id;
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices.iter().partition(|&&i| points[i][dim] < value);
    if left_idx.is_empty() || right_idx.is_empty() {
        nodes[id] = Node::Leaf(indices);
        return id;
    }

    let left = build_node(points, left_idx, leaf_size, rng, nodes);
    let right = build_node(points, right_idx, leaf_size, rng, nodes);
    nodes[id] = Node::Split { dim, value, left, right };
    id
}

/// Random dimension among the top-variance ones and the mean along it
fn choose_split(
    points: &[Descriptor],
    indices: &[usize],
    leaf_size: usize,
    rng: &mut ChaCha8Rng,
) -> Option<(usize, f32)> {
    if indices.len() <= leaf_size {
        return None;
    }

    let sample = &indices[..indices.len().min(SAMPLE_MEAN)];
    let n = sample.len() as f32;

    let mut mean = [0.0f32; DESCRIPTOR_LEN];
    for &i in sample {
        for (m, v) in mean.iter_mut().zip(points[i].iter()) {
            *m += v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut var = [0.0f32; DESCRIPTOR_LEN];
    for &i in sample {
        for ((s, v), m) in var.iter_mut().zip(points[i].iter()).zip(mean.iter()) {
            *s += (v - m) * (v - m);
        }
    }

    let mut dims: Vec<usize> = (0..DESCRIPTOR_LEN).filter(|&d| var[d] > 0.0).collect();
    if dims.is_empty() {
        return None;
    }
    dims.sort_by(|&a, &b| var[b].total_cmp(&var[a]).then(a.cmp(&b)));
    dims.truncate(RAND_DIM);

    let dim = dims[rng.random_range(0..dims.len())];
    Some((dim, mean[dim]))
}

/// [`DescriptorMatcher`] that indexes the target descriptors with a [`KdForest`]
#[derive(Debug, Clone)]
pub struct KdForestMatcher {
    cfg: MatcherConfig,
}

impl KdForestMatcher {
    pub fn new(cfg: MatcherConfig) -> MatchResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.cfg
    }
}

impl Default for KdForestMatcher {
    fn default() -> Self {
        Self { cfg: MatcherConfig::default() }
    }
}

impl DescriptorMatcher for KdForestMatcher {
    fn knn_match(&self, query: &[Descriptor], target: &[Descriptor], k: usize) -> Vec<Vec<Correspondence>> {
        let forest = match KdForest::build(target, &self.cfg) {
            Ok(forest) => forest,
            Err(_) => return vec![Vec::new(); query.len()],
        };
        debug!("Built kd-forest of {} trees over {} descriptors", self.cfg.trees, forest.len());

        query
            .par_iter()
            .enumerate()
            .map(|(query_idx, q)| {
                forest
                    .search_knn(q, k)
                    .into_iter()
                    .map(|(target_idx, distance)| Correspondence { query_idx, target_idx, distance })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BruteForceMatcher;

    fn random_descriptors(n: usize, seed: u64) -> Vec<Descriptor> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut d = [0.0f32; DESCRIPTOR_LEN];
                for v in d.iter_mut() {
                    *v = rng.random_range(0.0..1.0);
                }
                d
            })
            .collect()
    }

    #[test]
    fn test_finds_exact_twin() {
        let target = random_descriptors(300, 1);
        let query: Vec<Descriptor> = vec![target[17], target[250], target[0]];
        let knn = KdForestMatcher::default().knn_match(&query, &target, 2);
        assert_eq!(knn[0][0].target_idx, 17);
        assert_eq!(knn[1][0].target_idx, 250);
        assert_eq!(knn[2][0].target_idx, 0);
        assert!(knn.iter().all(|m| m[0].distance == 0.0 && m.len() == 2));
    }

    #[test]
    fn test_unbounded_checks_match_brute_force() {
        let target = random_descriptors(120, 2);
        let query = random_descriptors(20, 3);
        let cfg = MatcherConfig { checks: usize::MAX, ..MatcherConfig::default() };
        let approx = KdForestMatcher::new(cfg).unwrap().knn_match(&query, &target, 2);
        let exact = BruteForceMatcher::new().knn_match(&query, &target, 2);
        for (a, e) in approx.iter().zip(exact.iter()) {
            let a_idx: Vec<usize> = a.iter().map(|c| c.target_idx).collect();
            let e_idx: Vec<usize> = e.iter().map(|c| c.target_idx).collect();
            assert_eq!(a_idx, e_idx);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let target = random_descriptors(200, 4);
        let query = random_descriptors(30, 5);
        let m = KdForestMatcher::default();
        assert_eq!(m.knn_match(&query, &target, 2), m.knn_match(&query, &target, 2));
    }

    #[test]
    fn test_identical_points_form_leaf() {
        let target = vec![[0.5f32; DESCRIPTOR_LEN]; 10];
        let forest = KdForest::build(&target, &MatcherConfig::default()).unwrap();
        assert!(forest.trees.iter().all(|t| t.nodes.len() == 1));
        let knn = forest.search_knn(&[0.5; DESCRIPTOR_LEN], 2);
        assert_eq!(knn, vec![(0, 0.0), (1, 0.0)]);
    }

    #[test]
    fn test_empty_target() {
        let query = random_descriptors(3, 6);
        let knn = KdForestMatcher::default().knn_match(&query, &[], 2);
        assert_eq!(knn.len(), 3);
        assert!(knn.iter().all(|m| m.is_empty()));
    }

    #[test]
    fn test_invalid_config() {
        let cfg = MatcherConfig { trees: 0, ..MatcherConfig::default() };
        assert!(KdForestMatcher::new(cfg).is_err());
    }
}
