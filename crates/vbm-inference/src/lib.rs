//! # vbm-inference
//!
//! Volume passes of a variational Bayesian Gaussian mixture over
//! multi-channel images with missing channels.
//!
//! Every voxel is classified using the marginal of the mixture over the
//! channels it actually observes. Three passes share this machinery:
//!
//! - [`compute_sufficient_statistics`]: per-pattern zeroth, first and second
//!   moments for the M-step.
//! - [`compute_responsibilities`]: tissue responsibility maps.
//! - [`compute_inu_gradients`]: gradient and Hessian of the objective with
//!   respect to a per-channel log bias field.
//!
//! Each pass comes in three forms: `try_*` returns a typed
//! [`vbm_core::Result`], the plain form returns `NaN` on failure (and logs a
//! warning), and `*_with_config` selects threads and slab size. Outputs are
//! left untouched whenever a call fails.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod inu;
pub mod maps;
pub mod pass;
pub mod pattern;
pub mod responsibility;
pub mod suffstats;
pub mod voxel;

pub use config::PassConfig;
pub use pass::PassInputs;
pub use pattern::{ChannelIndex, Marginal, PatternTable};
pub use responsibility::{Normal, ResponsibilityKernel, StudentT};

use vbm_core::{Error, Result, space_needed};

fn or_nan(what: &str, result: Result<f64>) -> f64 {
    match result {
        Ok(ll) => ll,
        Err(e) => {
            log::warn!("{what} failed: {e}");
            f64::NAN
        }
    }
}

/// Accumulate sufficient statistics into `s0`, `s1`, `s2`.
///
/// The buffers must be sized by [`vbm_core::space_needed`] and are
/// overwritten. Returns the total log-likelihood of contributing voxels.
pub fn try_compute_sufficient_statistics(
    inputs: &PassInputs<'_>,
    s0: &mut [f64],
    s1: &mut [f64],
    s2: &mut [f64],
    config: &PassConfig,
) -> Result<f64> {
    inputs.validate()?;
    let need = space_needed(inputs.n_channels(), inputs.n_classes());
    if (s0.len(), s1.len(), s2.len()) != (need.s0, need.s1, need.s2) {
        return Err(Error::Validation(format!(
            "statistics buffers must hold ({}, {}, {}) elements, got ({}, {}, {})",
            need.s0,
            need.s1,
            need.s2,
            s0.len(),
            s1.len(),
            s2.len()
        )));
    }
    let table = PatternTable::build(&inputs.params)?;
    let (stats, summary) = suffstats::sufficient_statistics(inputs, &table, config)?;
    stats.copy_into(s0, s1, s2)?;
    Ok(summary.log_likelihood)
}

/// [`try_compute_sufficient_statistics`] returning `NaN` on failure.
pub fn compute_sufficient_statistics_with_config(
    inputs: &PassInputs<'_>,
    s0: &mut [f64],
    s1: &mut [f64],
    s2: &mut [f64],
    config: &PassConfig,
) -> f64 {
    or_nan(
        "sufficient statistics",
        try_compute_sufficient_statistics(inputs, s0, s1, s2, config),
    )
}

/// Sufficient statistics with the default [`PassConfig`]; `NaN` on failure.
pub fn compute_sufficient_statistics(
    inputs: &PassInputs<'_>,
    s0: &mut [f64],
    s1: &mut [f64],
    s2: &mut [f64],
) -> f64 {
    compute_sufficient_statistics_with_config(inputs, s0, s1, s2, &PassConfig::default())
}

/// Write tissue responsibility maps into `resp`.
///
/// `resp` holds `n_tissues - 1` volumes; `inputs.skip` selects the lattice
/// where the Normal kernel is used. Every element of `resp` is overwritten,
/// not accumulated into. Returns the total log-likelihood.
pub fn try_compute_responsibilities(
    inputs: &PassInputs<'_>,
    resp: &mut [f32],
    config: &PassConfig,
) -> Result<f64> {
    inputs.validate()?;
    let table = PatternTable::build(&inputs.params)?;
    let summary = maps::responsibility_maps(inputs, &table, resp, config)?;
    Ok(summary.log_likelihood)
}

/// [`try_compute_responsibilities`] returning `NaN` on failure.
pub fn compute_responsibilities_with_config(
    inputs: &PassInputs<'_>,
    resp: &mut [f32],
    config: &PassConfig,
) -> f64 {
    or_nan("responsibility maps", try_compute_responsibilities(inputs, resp, config))
}

/// Responsibility maps with the default [`PassConfig`]; `NaN` on failure.
pub fn compute_responsibilities(inputs: &PassInputs<'_>, resp: &mut [f32]) -> f64 {
    compute_responsibilities_with_config(inputs, resp, &PassConfig::default())
}

/// Write INU gradient and Hessian maps of channel `channel`.
///
/// Only voxels observing `channel` are written. Returns the total
/// log-likelihood.
pub fn try_compute_inu_gradients(
    inputs: &PassInputs<'_>,
    channel: usize,
    grad: &mut [f32],
    hess: &mut [f32],
    config: &PassConfig,
) -> Result<f64> {
    inputs.validate()?;
    let table = PatternTable::build(&inputs.params)?;
    let summary = inu::inu_gradients(inputs, &table, channel, grad, hess, config)?;
    Ok(summary.log_likelihood)
}

/// [`try_compute_inu_gradients`] returning `NaN` on failure.
pub fn compute_inu_gradients_with_config(
    inputs: &PassInputs<'_>,
    channel: usize,
    grad: &mut [f32],
    hess: &mut [f32],
    config: &PassConfig,
) -> f64 {
    or_nan("INU gradients", try_compute_inu_gradients(inputs, channel, grad, hess, config))
}

/// INU gradients with the default [`PassConfig`]; `NaN` on failure.
pub fn compute_inu_gradients(
    inputs: &PassInputs<'_>,
    channel: usize,
    grad: &mut [f32],
    hess: &mut [f32],
) -> f64 {
    compute_inu_gradients_with_config(inputs, channel, grad, hess, &PassConfig::default())
}
