//! Data preprocessing module
//!
//! Feature standardization fit on the training partition and reused,
//! never refit, for every other partition.

mod scaler;

pub use scaler::{ScalerParams, ScalerState, StandardScaler};
