//! Bagged CART regression trees (variance reduction, bootstrap rows, all
//! features considered at every split).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ForecastConfig;
use crate::error::ForecastError;

#[derive(Clone, Copy, Debug)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl From<&ForecastConfig> for ForestParams {
    fn from(c: &ForecastConfig) -> Self {
        Self {
            n_trees: c.n_trees,
            max_depth: c.max_depth,
            min_samples_split: c.min_samples_split,
            seed: c.seed,
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Fits on the rows named by `sample` (repeats allowed).
    pub fn fit(x: &[Vec<f64>], y: &[f64], sample: &[usize], params: &ForestParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, sample.to_vec(), 0, params);
        tree
    }

    fn grow(&mut self, x: &[Vec<f64>], y: &[f64], rows: Vec<usize>, depth: usize, params: &ForestParams) -> usize {
        let id = self.nodes.len();
        let mean = rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len().max(1) as f64;
        self.nodes.push(Node::Leaf(mean));

        if depth >= params.max_depth || rows.len() < params.min_samples_split.max(2) {
            return id;
        }

        let parent_sse = sse(rows.iter().map(|&r| y[r]));
        if parent_sse <= f64::EPSILON * mean.abs().max(1.0) {
            return id;
        }

        let Some(best) = best_split(x, y, &rows) else {
            return id;
        };
        if best.sse >= parent_sse {
            return id;
        }

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| x[r][best.feature] <= best.threshold);

        let left = self.grow(x, y, left_rows, depth + 1, params);
        let right = self.grow(x, y, right_rows, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

fn sse(values: impl Iterator<Item = f64>) -> f64 {
    let (n, sum, sum_sq) = values.fold((0.0, 0.0, 0.0), |(n, s, q), v| (n + 1.0, s + v, q + v * v));
    if n == 0.0 {
        0.0
    } else {
        (sum_sq - sum * sum / n).max(0.0)
    }
}

/// Lowest combined SSE over every feature and midpoint threshold.
fn best_split(x: &[Vec<f64>], y: &[f64], rows: &[usize]) -> Option<SplitCandidate> {
    let n_features = x.get(rows[0])?.len();
    let total: f64 = rows.iter().map(|&r| y[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
    let n = rows.len() as f64;

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = rows.to_vec();

    for feature in 0..n_features {
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for i in 0..sorted.len() - 1 {
            let yi = y[sorted[i]];
            left_sum += yi;
            left_sq += yi * yi;

            let here = x[sorted[i]][feature];
            let next = x[sorted[i + 1]][feature];
            if here == next {
                continue;
            }

            let left_n = (i + 1) as f64;
            let right_n = n - left_n;
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let split_sse = (left_sq - left_sum * left_sum / left_n).max(0.0)
                + (right_sq - right_sum * right_sum / right_n).max(0.0);

            if best.as_ref().map_or(true, |b| split_sse < b.sse) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    sse: split_sse,
                });
            }
        }
    }

    best
}

#[derive(Clone, Debug)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Deterministic for a given seed and training set.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self, ForecastError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::Model(format!(
                "training set mismatch: {} rows, {} targets",
                x.len(),
                y.len()
            )));
        }
        let width = x[0].len();
        if width == 0 || x.iter().any(|row| row.len() != width) {
            return Err(ForecastError::Model("ragged or empty feature rows".into()));
        }
        if params.n_trees == 0 {
            return Err(ForecastError::Model("n_trees must be positive".into()));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, params)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForestParams {
        ForestParams::from(&ForecastConfig::default())
    }

    #[test]
    fn test_tree_learns_step_function() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        let all: Vec<usize> = (0..20).collect();

        let tree = RegressionTree::fit(&x, &y, &all, &params());
        assert_eq!(tree.predict(&[3.0]), 1.0);
        assert_eq!(tree.predict(&[15.0]), 5.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let y = vec![200.0; 10];

        let forest = RandomForest::fit(&x, &y, &params()).unwrap();
        assert_eq!(forest.n_trees(), 100);
        assert!((forest.predict(&[42.0, 7.0]) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_depth_is_bounded() {
        let x: Vec<Vec<f64>> = (0..200).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..200).map(|i| (i as f64).sin()).collect();
        let all: Vec<usize> = (0..200).collect();

        let p = ForestParams { max_depth: 3, ..params() };
        assert!(RegressionTree::fit(&x, &y, &all, &p).depth() <= 3);
    }

    #[test]
    fn test_seeded_forest_is_deterministic() {
        let x: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<f64> = (0..50).map(|i| (i as f64) * 1.5 + (i % 3) as f64).collect();

        let a = RandomForest::fit(&x, &y, &params()).unwrap();
        let b = RandomForest::fit(&x, &y, &params()).unwrap();
        assert_eq!(a.predict(&[25.5, 3.0]), b.predict(&[25.5, 3.0]));
    }

    #[test]
    fn test_rejects_mismatched_training_set() {
        let x = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            RandomForest::fit(&x, &[1.0], &params()),
            Err(ForecastError::Model(_))
        ));
        assert!(RandomForest::fit(&[], &[], &params()).is_err());
    }
}
