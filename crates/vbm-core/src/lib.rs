//! # vbm-core
//!
//! Core types for vbmix: error handling, intrinsic channel/class bounds,
//! borrowed views over caller-owned volume and parameter buffers, and the
//! per-pattern sufficient statistics arena.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod stats;
pub mod types;

pub use error::{Error, Result};
pub use stats::{
    PatternStats, PatternStatsMut, StatsLen, SufficientStatistics, observed_count, space_needed,
    try_zeroed,
};
pub use types::{
    GmmParams, MAX_CHANNELS, MAX_CLASSES, PassSummary, Stride, TissuePriors, Volume, VolumeDims,
    check_bounds,
};
