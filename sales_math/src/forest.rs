//! Regression trees and a bootstrap-aggregated random forest
//!
//! Trees are grown with the squared-error criterion. Every split considers all
//! features; candidate thresholds are midpoints between consecutive distinct
//! values and samples with `x <= threshold` go left.

use crate::{matrix_width, MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Growth limits for a single regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// Maximum depth, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted CART regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    cost: f64,
}

impl RegressionTree {
    /// Fit a tree on every row of `features`
    pub fn fit(features: &[Vec<f64>], targets: &[f64], params: &TreeParams) -> Result<Self> {
        let n_features = validate_training_set(features, targets)?;
        validate_params(params)?;
        Ok(Self::grow(features, targets, (0..targets.len()).collect(), params, n_features))
    }

    /// Fit on a (possibly repeating) subset of rows; inputs must already be validated
    fn grow(
        features: &[Vec<f64>],
        targets: &[f64],
        samples: Vec<usize>,
        params: &TreeParams,
        n_features: usize,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            n_features,
        };
        tree.grow_node(features, targets, samples, params, 0);
        tree
    }

    fn grow_node(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        samples: Vec<usize>,
        params: &TreeParams,
        depth: usize,
    ) -> usize {
        let id = self.nodes.len();
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().map(|&i| targets[i]).sum();
        let sum_sq: f64 = samples.iter().map(|&i| targets[i] * targets[i]).sum();
        let value = sum / n;
        self.nodes.push(Node::Leaf { value });

        let impurity = (sum_sq - sum * sum / n).max(0.0);
        let depth_reached = params.max_depth.map_or(false, |max| depth >= max);
        if samples.len() < params.min_samples_split
            || depth_reached
            || impurity <= 1e-12 * sum_sq.max(1.0)
        {
            return id;
        }

        let split = match self.best_split(features, targets, &samples, params) {
            Some(split) => split,
            None => return id,
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| features[i][split.feature] <= split.threshold);

        let left_id = self.grow_node(features, targets, left, params, depth + 1);
        let right_id = self.grow_node(features, targets, right, params, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };

        id
    }

    /// Lowest summed squared error split over all features; the first
    /// candidate wins on ties
    fn best_split(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        samples: &[usize],
        params: &TreeParams,
    ) -> Option<SplitCandidate> {
        let n = samples.len();
        let total_sum: f64 = samples.iter().map(|&i| targets[i]).sum();
        let total_sq: f64 = samples.iter().map(|&i| targets[i] * targets[i]).sum();
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.n_features {
            let mut order = samples.to_vec();
            order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let y = targets[order[pos]];
                left_sum += y;
                left_sq += y * y;

                let here = features[order[pos]][feature];
                let next = features[order[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let cost = (left_sq - left_sum * left_sum / n_left as f64).max(0.0)
                    + (right_sq - right_sum * right_sum / n_right as f64).max(0.0);

                if best.as_ref().map_or(true, |b| cost < b.cost) {
                    let mut threshold = (here + next) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        cost,
                    });
                }
            }
        }

        best
    }

    /// Predict a single feature row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Random forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Seed for bootstrap sampling
    pub seed: u64,
    /// Draw a bootstrap sample per tree; when false every tree sees all rows
    pub bootstrap: bool,
    /// Per-tree growth limits
    pub tree: TreeParams,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            seed: 42,
            bootstrap: true,
            tree: TreeParams::default(),
        }
    }
}

impl ForestConfig {
    /// Set number of trees
    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Untrained random forest regressor
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    config: ForestConfig,
}

/// Trained random forest; predictions average all trees
#[derive(Debug, Clone)]
pub struct TrainedForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Create a new regressor
    pub fn new(config: ForestConfig) -> Result<Self> {
        if config.n_estimators == 0 {
            return Err(MathError::InvalidInput(
                "Forest needs at least one tree".to_string(),
            ));
        }
        validate_params(&config.tree)?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Train the forest. Trees are grown in parallel; each one gets a seed
    /// drawn in order from the forest seed, so the result does not depend on
    /// thread scheduling.
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TrainedForest> {
        let n_features = validate_training_set(features, targets)?;
        let n = targets.len();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let tree_seeds: Vec<u64> = (0..self.config.n_estimators).map(|_| rng.gen()).collect();

        let trees: Vec<RegressionTree> = tree_seeds
            .par_iter()
            .map(|&seed| {
                let samples: Vec<usize> = if self.config.bootstrap {
                    let mut tree_rng = StdRng::seed_from_u64(seed);
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::grow(features, targets, samples, &self.config.tree, n_features)
            })
            .collect();

        Ok(TrainedForest { trees, n_features })
    }
}

impl TrainedForest {
    /// Predict every row of `features`
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let width = matrix_width(features)?;
        if width != self.n_features {
            return Err(MathError::InvalidInput(format!(
                "Model was trained on {} features, got {}",
                self.n_features, width
            )));
        }

        Ok(features.iter().map(|row| self.predict_row(row)).collect())
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Trees in training order
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

fn validate_training_set(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    let width = matrix_width(features)?;
    if features.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Feature rows ({}) don't match targets ({})",
            features.len(),
            targets.len()
        )));
    }
    if targets.iter().any(|t| !t.is_finite()) || features.iter().flatten().any(|v| !v.is_finite())
    {
        return Err(MathError::InvalidInput(
            "Training data contains non-finite values".to_string(),
        ));
    }
    Ok(width)
}

fn validate_params(params: &TreeParams) -> Result<()> {
    if params.min_samples_split < 2 {
        return Err(MathError::InvalidInput(
            "min_samples_split must be at least 2".to_string(),
        ));
    }
    if params.min_samples_leaf == 0 {
        return Err(MathError::InvalidInput(
            "min_samples_leaf must be positive".to_string(),
        ));
    }
    Ok(())
}
