//! Hyperparameter optimization
//!
//! - [`BoostingSearchSpace`] - typed candidate lists and refinement
//! - [`TwoStageSearch`] - coarse random search, then grid refinement
//! - [`Study`] - every trial of a search with per-stage bests

mod config;
mod search;
mod search_space;

pub use config::SearchConfig;
pub use search::{SearchOutcome, SearchResult, SearchStage, Study, TrialResult, TwoStageSearch};
pub use search_space::BoostingSearchSpace;
