//! Two-stage hyperparameter search
//!
//! A seeded random search over the coarse space is followed by an
//! exhaustive grid around its winner. Every candidate is scored by the
//! mean negative RMSE over the same k-fold splits.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::SearchConfig;
use super::search_space::BoostingSearchSpace;
use crate::error::{EvalError, Result};
use crate::evaluation::metrics::root_mean_squared_error;
use crate::training::{fit_predict_fold, CVSplit, Estimator, GradientBoostingConfig, KFold, ModelFactory};

/// Search stage a trial belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Coarse,
    Refined,
}

/// Result of evaluating one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub stage: SearchStage,
    pub params: GradientBoostingConfig,
    /// Mean negative RMSE across folds; `-inf` for failed trials
    pub mean_score: f64,
    /// Population standard deviation of the fold scores
    pub std_score: f64,
    /// Negative RMSE of each fold
    pub fold_scores: Vec<f64>,
    pub duration_secs: f64,
    /// Reused from an earlier trial with identical parameters
    pub cached: bool,
    pub error: Option<String>,
}

impl TrialResult {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Mean cross-validated RMSE, for successful trials
    pub fn mean_rmse(&self) -> Option<f64> {
        if self.is_failed() {
            None
        } else {
            Some(-self.mean_score)
        }
    }
}

/// All trials of one search, with the best of each stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    trials: Vec<TrialResult>,
    best_coarse_idx: Option<usize>,
    best_refined_idx: Option<usize>,
    pub total_duration_secs: f64,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trial. A later trial replaces its stage's best only when
    /// strictly better, so ties keep the first.
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();

        if !result.is_failed() {
            let best = match result.stage {
                SearchStage::Coarse => &mut self.best_coarse_idx,
                SearchStage::Refined => &mut self.best_refined_idx,
            };
            let is_better = match *best {
                None => true,
                Some(best_idx) => result.mean_score > self.trials[best_idx].mean_score,
            };
            if is_better {
                *best = Some(idx);
            }
        }

        self.trials.push(result);
    }

    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    pub fn n_trials(&self) -> usize {
        self.trials.len()
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| t.is_failed()).count()
    }

    pub fn best_trial(&self, stage: SearchStage) -> Option<&TrialResult> {
        let idx = match stage {
            SearchStage::Coarse => self.best_coarse_idx,
            SearchStage::Refined => self.best_refined_idx,
        };
        idx.map(|i| &self.trials[i])
    }

    /// Refined best when refinement ran, otherwise coarse best
    pub fn winner(&self) -> Option<&TrialResult> {
        self.best_trial(SearchStage::Refined)
            .or_else(|| self.best_trial(SearchStage::Coarse))
    }

    /// Successful trials by descending score, stable on ties
    pub fn top_trials(&self, n: usize) -> Vec<&TrialResult> {
        let mut ok: Vec<&TrialResult> = self.trials.iter().filter(|t| !t.is_failed()).collect();
        ok.sort_by(|a, b| b.mean_score.total_cmp(&a.mean_score));
        ok.truncate(n);
        ok
    }

    fn cached_trial(&self, params: &GradientBoostingConfig) -> Option<&TrialResult> {
        self.trials
            .iter()
            .find(|t| !t.is_failed() && &t.params == params)
    }
}

/// How the final hyperparameters were obtained
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The search completed
    Optimized {
        best_params: GradientBoostingConfig,
        coarse_best_rmse: f64,
        refined_best_rmse: Option<f64>,
    },
    /// The search failed and the default parameters were fitted instead
    FallbackDefault {
        params: GradientBoostingConfig,
        reason: String,
    },
}

/// Search outcome plus the estimator fitted on the full training set
#[derive(Debug)]
pub struct SearchResult {
    pub outcome: SearchOutcome,
    pub estimator: Box<dyn Estimator>,
    pub study: Study,
}

impl SearchResult {
    pub fn best_params(&self) -> &GradientBoostingConfig {
        match &self.outcome {
            SearchOutcome::Optimized { best_params, .. } => best_params,
            SearchOutcome::FallbackDefault { params, .. } => params,
        }
    }

    /// Whether the fallback path was taken
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, SearchOutcome::FallbackDefault { .. })
    }
}

struct StageBest {
    params: GradientBoostingConfig,
    rmse: f64,
}

/// Coarse random search followed by grid refinement
pub struct TwoStageSearch {
    factory: Arc<dyn ModelFactory>,
    config: SearchConfig,
    space: BoostingSearchSpace,
}

impl TwoStageSearch {
    pub fn new(factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            factory,
            config: SearchConfig::default(),
            space: BoostingSearchSpace::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_space(mut self, space: BoostingSearchSpace) -> Self {
        self.space = space;
        self
    }

    /// Run the search and fit the winner on `(x, y)`.
    ///
    /// An invalid configuration or search space is an error. Any failure
    /// after that falls back to [`GradientBoostingConfig::default`]; only
    /// a failure to fit the fallback is returned as an error.
    pub fn run(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchResult> {
        self.config.validate()?;
        self.space.validate()?;

        let start = Instant::now();
        let mut study = Study::new();
        let searched = self.search(x, y, &mut study);
        study.total_duration_secs = start.elapsed().as_secs_f64();

        match searched {
            Ok((coarse, refined, estimator)) => {
                info!(
                    trials = study.n_trials(),
                    failed = study.n_failed(),
                    coarse_rmse = coarse.rmse,
                    refined_rmse = ?refined.as_ref().map(|r| r.rmse),
                    "Search complete"
                );
                let best_params = refined.as_ref().map_or(&coarse.params, |r| &r.params).clone();
                Ok(SearchResult {
                    outcome: SearchOutcome::Optimized {
                        best_params,
                        coarse_best_rmse: coarse.rmse,
                        refined_best_rmse: refined.map(|r| r.rmse),
                    },
                    estimator,
                    study,
                })
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(reason = %reason, "Search failed; fitting default parameters");

                let params = self.seeded(GradientBoostingConfig::default());
                let mut estimator = self.factory.build(&params)?;
                estimator.fit(x, y).map_err(|fit_err| {
                    EvalError::TrainingError(format!(
                        "default parameters failed to fit after search failure ({}): {}",
                        reason, fit_err
                    ))
                })?;

                Ok(SearchResult {
                    outcome: SearchOutcome::FallbackDefault { params, reason },
                    estimator,
                    study,
                })
            }
        }
    }

    fn search(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        study: &mut Study,
    ) -> Result<(StageBest, Option<StageBest>, Box<dyn Estimator>)> {
        let splits = KFold::new(self.config.cv_folds)
            .with_random_state(self.config.random_state)
            .split(x.nrows())?;
        let pool = self.thread_pool()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let candidates: Vec<_> = self
            .space
            .sample(self.config.n_iter, &mut rng)?
            .into_iter()
            .map(|params| self.seeded(params))
            .collect();
        info!(candidates = candidates.len(), folds = splits.len(), "Coarse search");
        self.run_stage(SearchStage::Coarse, &candidates, x, y, &splits, pool.as_ref(), study);

        let coarse = stage_best(study, SearchStage::Coarse)?;
        info!(rmse = coarse.rmse, params = ?coarse.params, "Coarse winner");

        let refined = if self.config.refine {
            let grid: Vec<_> = BoostingSearchSpace::refine_around(&coarse.params, &self.config)
                .grid()?
                .into_iter()
                .map(|params| self.seeded(params))
                .collect();
            info!(candidates = grid.len(), "Refinement search");
            self.run_stage(SearchStage::Refined, &grid, x, y, &splits, pool.as_ref(), study);
            Some(stage_best(study, SearchStage::Refined)?)
        } else {
            None
        };

        let winner = refined.as_ref().map_or(&coarse.params, |r| &r.params);
        let mut estimator = self.factory.build(winner)?;
        estimator
            .fit(x, y)
            .map_err(|e| EvalError::SearchError(format!("refit of winning parameters failed: {}", e)))?;

        Ok((coarse, refined, estimator))
    }

    /// Candidates are fit with the search seed, so that is the seed reported
    fn seeded(&self, params: GradientBoostingConfig) -> GradientBoostingConfig {
        GradientBoostingConfig {
            random_state: Some(self.config.random_state),
            ..params
        }
    }

    fn thread_pool(&self) -> Result<Option<rayon::ThreadPool>> {
        if self.config.n_jobs == 0 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.n_jobs)
            .build()
            .map(Some)
            .map_err(|e| EvalError::SearchError(format!("failed to build thread pool: {}", e)))
    }

    /// Score every candidate on every split and record one trial per
    /// candidate, in candidate order. Candidates already scored are reused.
    #[allow(clippy::too_many_arguments)]
    fn run_stage(
        &self,
        stage: SearchStage,
        candidates: &[GradientBoostingConfig],
        x: &Array2<f64>,
        y: &Array1<f64>,
        splits: &[CVSplit],
        pool: Option<&rayon::ThreadPool>,
        study: &mut Study,
    ) {
        let pending: Vec<usize> = (0..candidates.len())
            .filter(|&i| study.cached_trial(&candidates[i]).is_none())
            .collect();

        let jobs: Vec<(usize, &CVSplit)> = pending
            .iter()
            .flat_map(|&c| splits.iter().map(move |s| (c, s)))
            .collect();

        let factory = self.factory.as_ref();
        let evaluate = || -> Vec<(Result<f64>, f64)> {
            jobs.par_iter()
                .map(|&(c, split)| {
                    let started = Instant::now();
                    let rmse = fit_predict_fold(factory, &candidates[c], x, y, split)
                        .and_then(|fold| root_mean_squared_error(&fold.actual, &fold.predicted));
                    (rmse, started.elapsed().as_secs_f64())
                })
                .collect()
        };
        let results = match pool {
            Some(pool) => pool.install(evaluate),
            None => evaluate(),
        };

        let n_folds = splits.len();
        for (i, params) in candidates.iter().enumerate() {
            let trial_id = study.n_trials();

            let trial = if let Some(prior) = study.cached_trial(params) {
                TrialResult {
                    trial_id,
                    stage,
                    duration_secs: 0.0,
                    cached: true,
                    ..prior.clone()
                }
            } else {
                let pos = pending.iter().position(|&p| p == i).unwrap_or(0);
                let chunk = &results[pos * n_folds..(pos + 1) * n_folds];
                summarize(trial_id, stage, params.clone(), chunk)
            };

            match &trial.error {
                Some(err) => warn!(trial = trial_id, stage = ?stage, error = %err, "Trial failed"),
                None => debug!(trial = trial_id, stage = ?stage, rmse = -trial.mean_score, "Trial scored"),
            }
            study.add_trial(trial);
        }
    }
}

fn summarize(
    trial_id: usize,
    stage: SearchStage,
    params: GradientBoostingConfig,
    folds: &[(Result<f64>, f64)],
) -> TrialResult {
    let duration_secs: f64 = folds.iter().map(|(_, d)| d).sum();
    let mut fold_scores = Vec::with_capacity(folds.len());
    let mut error = None;

    for (rmse, _) in folds {
        match rmse {
            Ok(v) if v.is_finite() => fold_scores.push(-v),
            Ok(v) => {
                error.get_or_insert_with(|| format!("non-finite fold RMSE {}", v));
            }
            Err(e) => {
                error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if error.is_some() || fold_scores.is_empty() {
        return TrialResult {
            trial_id,
            stage,
            params,
            mean_score: f64::NEG_INFINITY,
            std_score: 0.0,
            fold_scores,
            duration_secs,
            cached: false,
            error: Some(error.unwrap_or_else(|| "no folds evaluated".to_string())),
        };
    }

    let n = fold_scores.len() as f64;
    let mean = fold_scores.iter().sum::<f64>() / n;
    let std = (fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt();

    TrialResult {
        trial_id,
        stage,
        params,
        mean_score: mean,
        std_score: std,
        fold_scores,
        duration_secs,
        cached: false,
        error: None,
    }
}

fn stage_best(study: &Study, stage: SearchStage) -> Result<StageBest> {
    study
        .best_trial(stage)
        .and_then(|t| {
            t.mean_rmse().map(|rmse| StageBest {
                params: t.params.clone(),
                rmse,
            })
        })
        .ok_or_else(|| EvalError::SearchError(format!("every {:?} candidate failed", stage)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::GradientBoostingFactory;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 2), |(r, c)| ((r * 7 + c * 3) % 17) as f64);
        let y = x.column(0).mapv(|v| v * 1.5) + x.column(1).mapv(|v| (v * 0.3).sin());
        (x, y)
    }

    fn small_space() -> BoostingSearchSpace {
        BoostingSearchSpace {
            n_estimators: vec![5, 10],
            learning_rate: vec![0.1, 0.3],
            max_depth: vec![2, 3],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
            subsample: vec![1.0],
        }
    }

    fn search() -> TwoStageSearch {
        TwoStageSearch::new(Arc::new(GradientBoostingFactory::new(Some(42))))
            .with_space(small_space())
            .with_config(
                SearchConfig::new()
                    .with_n_iter(4)
                    .with_cv_folds(3)
                    .with_n_jobs(2),
            )
    }

    fn trial(id: usize, stage: SearchStage, score: f64) -> TrialResult {
        TrialResult {
            trial_id: id,
            stage,
            params: GradientBoostingConfig::default(),
            mean_score: score,
            std_score: 0.0,
            fold_scores: vec![score],
            duration_secs: 0.0,
            cached: false,
            error: None,
        }
    }

    #[test]
    fn test_study_ties_keep_first() {
        let mut study = Study::new();
        study.add_trial(trial(0, SearchStage::Coarse, -2.0));
        study.add_trial(trial(1, SearchStage::Coarse, -1.0));
        study.add_trial(trial(2, SearchStage::Coarse, -1.0));

        assert_eq!(study.best_trial(SearchStage::Coarse).unwrap().trial_id, 1);
        assert!(study.best_trial(SearchStage::Refined).is_none());
        assert_eq!(study.winner().unwrap().trial_id, 1);
    }

    #[test]
    fn test_failed_trials_never_win() {
        let mut study = Study::new();
        let mut failed = trial(0, SearchStage::Coarse, f64::NEG_INFINITY);
        failed.error = Some("boom".to_string());
        study.add_trial(failed);

        assert!(study.best_trial(SearchStage::Coarse).is_none());
        assert_eq!(study.n_failed(), 1);
        assert!(study.top_trials(5).is_empty());
    }

    #[test]
    fn test_two_stage_search() {
        let (x, y) = data();
        let result = search().run(&x, &y).unwrap();

        assert!(!result.is_degraded());
        match &result.outcome {
            SearchOutcome::Optimized {
                coarse_best_rmse,
                refined_best_rmse,
                ..
            } => {
                let refined = refined_best_rmse.unwrap();
                assert!(refined <= *coarse_best_rmse);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let coarse = result.study.trials().iter().filter(|t| t.stage == SearchStage::Coarse).count();
        assert_eq!(coarse, 4);
        assert!(result.estimator.predict(&x).is_ok());
    }

    #[test]
    fn test_refined_reuses_coarse_winner() {
        let (x, y) = data();
        let result = search().run(&x, &y).unwrap();

        let coarse_best = result.study.best_trial(SearchStage::Coarse).unwrap();
        let reused = result
            .study
            .trials()
            .iter()
            .find(|t| t.stage == SearchStage::Refined && t.params == coarse_best.params)
            .unwrap();
        assert!(reused.cached);
        assert_eq!(reused.mean_score, coarse_best.mean_score);
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = data();
        let a = search().run(&x, &y).unwrap();
        let b = search().run(&x, &y).unwrap();

        assert_eq!(a.best_params(), b.best_params());
        let scores = |r: &SearchResult| r.study.trials().iter().map(|t| t.mean_score).collect::<Vec<_>>();
        assert_eq!(scores(&a), scores(&b));
    }

    #[test]
    fn test_too_few_rows_falls_back() {
        let x = Array2::from_shape_fn((2, 1), |(r, _)| r as f64);
        let y = Array1::from_vec(vec![1.0, 2.0]);

        let result = search().run(&x, &y).unwrap();
        assert!(result.is_degraded());
        assert_eq!(result.best_params(), &GradientBoostingConfig::default());
    }

    #[test]
    fn test_invalid_space_is_an_error() {
        let (x, y) = data();
        let bad = search().with_space(BoostingSearchSpace {
            subsample: vec![],
            ..small_space()
        });
        assert!(matches!(bad.run(&x, &y), Err(EvalError::ConfigError(_))));
    }
}
