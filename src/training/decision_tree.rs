//! Regression tree used as the gradient boosting base learner

use crate::error::{EvalError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Least-squares regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Best split found for one feature: (feature, threshold, variance reduction)
type SplitCandidate = (usize, f64, f64);

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(EvalError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(EvalError::TrainingError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let leaf = || TreeNode::Leaf {
            value: mean_of(y, indices),
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_constant(y, indices);
        if should_stop {
            return leaf();
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, indices) else {
            return leaf();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += gain * n_samples as f64;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Sorted sweep per feature; features are scanned in parallel
    fn find_best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len() as f64;
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_impurity = total_sq / n - (total_sum / n).powi(2);
        let min_leaf = self.min_samples_leaf;

        let feature_results: Vec<Option<SplitCandidate>> = (0..self.n_features)
            .into_par_iter()
            .map(|feature_idx| {
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut left_sum = 0.0f64;
                let mut left_sq = 0.0f64;
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..order.len() - 1 {
                    let yi = y[order[pos]];
                    left_sum += yi;
                    left_sq += yi * yi;

                    let left_count = pos + 1;
                    let right_count = order.len() - left_count;
                    if left_count < min_leaf || right_count < min_leaf {
                        continue;
                    }

                    let here = x[[order[pos], feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if next <= here {
                        continue;
                    }

                    let lc = left_count as f64;
                    let rc = right_count as f64;
                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let left_imp = left_sq / lc - (left_sum / lc).powi(2);
                    let right_imp = right_sq / rc - (right_sum / rc).powi(2);
                    let gain = parent_impurity - (lc * left_imp + rc * right_imp) / n;

                    if gain > best.map_or(1e-15, |(g, _)| g) {
                        best = Some((gain, (here + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // First feature wins ties so results do not depend on scheduling
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<SplitCandidate>, cand| match acc {
                Some(best) if best.2 >= cand.2 => Some(best),
                _ => Some(cand),
            })
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(EvalError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(EvalError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => return *value,
                        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                            node = if row[*feature_idx] <= *threshold { &**left } else { &**right };
                        }
                    }
                }
            })
            .collect())
    }

    /// Normalized variance-reduction importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

fn mean_of(y: &Array1<f64>, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn is_constant(y: &Array1<f64>, indices: &[usize]) -> bool {
    match indices.first() {
        None => true,
        Some(&first) => indices.iter().all(|&i| (y[i] - y[first]).abs() < 1e-12),
    }
}
