//! Typed hyperparameter search space for gradient boosting

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::SearchConfig;
use crate::error::{EvalError, Result};
use crate::training::GradientBoostingConfig;

/// Candidate values for each boosting hyperparameter.
///
/// A combination is one value per list; combinations are enumerated in
/// mixed-radix order with `subsample` varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingSearchSpace {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub subsample: Vec<f64>,
}

impl Default for BoostingSearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200, 300],
            learning_rate: vec![0.01, 0.05, 0.1, 0.2],
            max_depth: vec![2, 3, 4, 5],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
            subsample: vec![0.8, 1.0],
        }
    }
}

impl BoostingSearchSpace {
    /// A space holding exactly one combination
    pub fn single(params: &GradientBoostingConfig) -> Self {
        Self {
            n_estimators: vec![params.n_estimators],
            learning_rate: vec![params.learning_rate],
            max_depth: vec![params.max_depth],
            min_samples_split: vec![params.min_samples_split],
            min_samples_leaf: vec![params.min_samples_leaf],
            subsample: vec![params.subsample],
        }
    }

    fn radices(&self) -> [usize; 6] {
        [
            self.n_estimators.len(),
            self.learning_rate.len(),
            self.max_depth.len(),
            self.min_samples_split.len(),
            self.min_samples_leaf.len(),
            self.subsample.len(),
        ]
    }

    /// Number of distinct combinations
    pub fn n_combinations(&self) -> usize {
        self.radices().iter().product()
    }

    /// Reject empty lists and any combination outside its legal domain.
    ///
    /// Each value is checked on its own; since every parameter's domain is
    /// independent, this validates the whole cross product.
    pub fn validate(&self) -> Result<()> {
        let names = [
            "n_estimators",
            "learning_rate",
            "max_depth",
            "min_samples_split",
            "min_samples_leaf",
            "subsample",
        ];
        for (name, len) in names.iter().zip(self.radices()) {
            if len == 0 {
                return Err(EvalError::ConfigError(format!(
                    "search space for {} has no candidates",
                    name
                )));
            }
        }

        let base = self.combination_at(0)?;
        for &v in &self.n_estimators {
            GradientBoostingConfig { n_estimators: v, ..base.clone() }.validate()?;
        }
        for &v in &self.learning_rate {
            GradientBoostingConfig { learning_rate: v, ..base.clone() }.validate()?;
        }
        for &v in &self.max_depth {
            GradientBoostingConfig { max_depth: v, ..base.clone() }.validate()?;
        }
        for &v in &self.min_samples_split {
            GradientBoostingConfig { min_samples_split: v, ..base.clone() }.validate()?;
        }
        for &v in &self.min_samples_leaf {
            GradientBoostingConfig { min_samples_leaf: v, ..base.clone() }.validate()?;
        }
        for &v in &self.subsample {
            GradientBoostingConfig { subsample: v, ..base.clone() }.validate()?;
        }
        Ok(())
    }

    /// Decode the combination at `index` in enumeration order
    pub fn combination_at(&self, index: usize) -> Result<GradientBoostingConfig> {
        let total = self.n_combinations();
        if index >= total {
            return Err(EvalError::InvalidParameter {
                name: "combination index".to_string(),
                value: index.to_string(),
                reason: format!("space has {} combinations", total),
            });
        }

        let radices = self.radices();
        let mut digits = [0usize; 6];
        let mut rest = index;
        for (digit, &radix) in digits.iter_mut().zip(radices.iter()).rev() {
            *digit = rest % radix;
            rest /= radix;
        }

        Ok(GradientBoostingConfig {
            n_estimators: self.n_estimators[digits[0]],
            learning_rate: self.learning_rate[digits[1]],
            max_depth: self.max_depth[digits[2]],
            min_samples_split: self.min_samples_split[digits[3]],
            min_samples_leaf: self.min_samples_leaf[digits[4]],
            subsample: self.subsample[digits[5]],
            ..Default::default()
        })
    }

    /// Every combination in enumeration order
    pub fn grid(&self) -> Result<Vec<GradientBoostingConfig>> {
        (0..self.n_combinations())
            .map(|i| self.combination_at(i))
            .collect()
    }

    /// Draw `n_iter` distinct combinations.
    ///
    /// When `n_iter` covers the whole space, the full grid is returned in
    /// enumeration order.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n_iter: usize,
        rng: &mut R,
    ) -> Result<Vec<GradientBoostingConfig>> {
        let total = self.n_combinations();
        if n_iter >= total {
            return self.grid();
        }
        index::sample(rng, total, n_iter)
            .into_iter()
            .map(|i| self.combination_at(i))
            .collect()
    }

    /// Narrow the space around a winning combination.
    ///
    /// `n_estimators` gets `{w, min(w + step, cap)}` and `max_depth` gets
    /// `{w, min(w + 1, cap)}`; every other parameter is pinned. The winner
    /// is always the first combination of the result.
    pub fn refine_around(winner: &GradientBoostingConfig, config: &SearchConfig) -> Self {
        let mut space = Self::single(winner);

        let more_trees = (winner.n_estimators + config.n_estimators_step).min(config.max_n_estimators);
        if more_trees > winner.n_estimators {
            space.n_estimators.push(more_trees);
        }
        let deeper = (winner.max_depth + 1).min(config.max_depth_cap);
        if deeper > winner.max_depth {
            space.max_depth.push(deeper);
        }
        space
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_default_space() {
        let space = BoostingSearchSpace::default();
        assert_eq!(space.n_combinations(), 4 * 4 * 4 * 3 * 3 * 2);
        assert!(space.validate().is_ok());
    }

    #[test]
    fn test_combination_order() {
        let space = BoostingSearchSpace::default();
        let first = space.combination_at(0).unwrap();
        assert_eq!(first.n_estimators, 50);
        assert_eq!(first.subsample, 0.8);

        let second = space.combination_at(1).unwrap();
        assert_eq!(second.subsample, 1.0);
        assert_eq!(second.n_estimators, 50);

        let last = space.combination_at(space.n_combinations() - 1).unwrap();
        assert_eq!(last.n_estimators, 300);
        assert_eq!(last.min_samples_leaf, 4);
        assert!(space.combination_at(space.n_combinations()).is_err());
    }

    #[test]
    fn test_sample_without_replacement() {
        let space = BoostingSearchSpace::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let samples = space.sample(20, &mut rng).unwrap();

        assert_eq!(samples.len(), 20);
        let distinct: HashSet<String> = samples.iter().map(|p| format!("{:?}", p)).collect();
        assert_eq!(distinct.len(), 20);
    }

    #[test]
    fn test_sample_is_seeded() {
        let space = BoostingSearchSpace::default();
        let a = space.sample(10, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = space.sample(10, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_small_space_returns_grid() {
        let space = BoostingSearchSpace {
            n_estimators: vec![10, 20],
            max_depth: vec![2],
            learning_rate: vec![0.1],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
            subsample: vec![1.0],
        };
        let samples = space.sample(50, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert_eq!(samples, space.grid().unwrap());
    }

    #[test]
    fn test_validate_rejects_bad_candidates() {
        let empty = BoostingSearchSpace {
            max_depth: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let bad_rate = BoostingSearchSpace {
            learning_rate: vec![0.1, 2.0],
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());
    }

    #[test]
    fn test_refine_contains_winner() {
        let winner = GradientBoostingConfig {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.05,
            ..Default::default()
        };
        let refined = BoostingSearchSpace::refine_around(&winner, &SearchConfig::default());

        assert_eq!(refined.n_estimators, vec![100, 150]);
        assert_eq!(refined.max_depth, vec![3, 4]);
        assert_eq!(refined.learning_rate, vec![0.05]);
        assert_eq!(refined.n_combinations(), 4);
        assert_eq!(refined.combination_at(0).unwrap(), winner);
    }

    #[test]
    fn test_refine_respects_caps() {
        let winner = GradientBoostingConfig {
            n_estimators: 500,
            max_depth: 8,
            ..Default::default()
        };
        let refined = BoostingSearchSpace::refine_around(&winner, &SearchConfig::default());
        assert_eq!(refined.n_estimators, vec![500]);
        assert_eq!(refined.max_depth, vec![8]);
        assert_eq!(refined.n_combinations(), 1);
    }
}
