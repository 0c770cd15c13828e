//! Gradient and Hessian of the bias-field (INU) objective for one channel.
//!
//! With a multiplicative bias `exp(b)` on channel `ic` and `x ~ N(mx, diag(vx))`,
//! the expected mixture objective has, around `b = 0`,
//!
//! ```text
//! g = W[ic,ic] vx_ic + mx_ic W[ic,:] (mx - mu) - 1
//! H = W[ic,ic] (mx_ic^2 + vx_ic) + 1          (+ g when g > 0)
//! ```
//!
//! summed over classes with weights `nu_k * p_k`. Adding a positive gradient
//! to the Hessian keeps the Newton step conservative. Outputs are written
//! only where channel `ic` is observed; other voxels keep their values.

use std::ops::Range;

use vbm_compute::slab_ranges;
use vbm_core::{Error, MAX_CLASSES, PassSummary, Result};

use crate::config::PassConfig;
use crate::pass::PassInputs;
use crate::pattern::{ChannelIndex, PatternTable};
use crate::responsibility::{Normal, responsibilities};
use crate::voxel::{Observation, load_priors};

struct InuSlab {
    writes: Vec<(usize, f32, f32)>,
    summary: PassSummary,
}

fn inu_slab(
    inputs: &PassInputs<'_>,
    table: &PatternTable,
    index: &ChannelIndex,
    extent: [usize; 3],
    planes: Range<usize>,
) -> Result<InuSlab> {
    let k = inputs.n_classes();
    let nf = inputs.volume.dims;
    let nm = inputs.priors.dims;
    let skip = inputs.skip;
    let mut writes = Vec::new();
    let mut summary = PassSummary::empty();
    let mut obs = Observation::new();
    let mut prob = [0.0f64; MAX_CLASSES];
    let prob = &mut prob[..k];

    for i2 in planes {
        for i1 in 0..extent[1] {
            let off_f = nf.index(0, i1, i2);
            let off_m = nm.index(0, i1 * skip.y, i2 * skip.z);
            for i0 in 0..extent[0] {
                let i = off_f + i0;
                let code = obs.extract(&inputs.volume, i);
                if code == 0 || !load_priors(&inputs.priors, off_m + i0 * skip.x, prob) {
                    continue;
                }
                let m = table.marginal(code);
                summary.log_likelihood += responsibilities::<Normal>(&m, obs.x(), obs.v(), prob);
                summary.n_voxels += 1;

                let Some(nc) = index.local(code) else {
                    continue;
                };
                let po = m.po;
                let x = obs.x();
                let v = obs.v();
                let (mut g, mut h) = (0.0, 0.0);
                for (kk, &pk) in prob.iter().enumerate() {
                    let mu = m.mean(kk);
                    let w = m.precision(kk);
                    let wc = &w[po * nc..po * (nc + 1)];
                    let nup = m.nu[kk] * pk;
                    let mut gk = 0.0;
                    for j in 0..po {
                        gk += (x[j] - mu[j]) * wc[j];
                    }
                    g += nup * gk;
                    h += nup * wc[nc];
                }
                let grad = g * x[nc] + h * v[nc] - 1.0;
                let mut hess = h * (x[nc] * x[nc] + v[nc]) + 1.0;
                if grad > 0.0 {
                    hess += grad;
                }
                writes.push((i, grad as f32, hess as f32));
            }
        }
    }
    Ok(InuSlab { writes, summary })
}

/// Compute INU gradient/Hessian maps for channel `channel`.
pub fn inu_gradients(
    inputs: &PassInputs<'_>,
    table: &PatternTable,
    channel: usize,
    grad: &mut [f32],
    hess: &mut [f32],
    config: &PassConfig,
) -> Result<PassSummary> {
    check_inu_inputs(inputs, channel, grad.len(), hess.len())?;
    let index = ChannelIndex::new(inputs.n_channels(), channel)?;

    let extent = inputs.skip.sampled_extent(&inputs.priors.dims, &inputs.volume.dims);
    let slabs = slab_ranges(extent[2], config.slab_depth);
    let parts = config
        .backend()
        .map_slabs(slabs.len(), |s| inu_slab(inputs, table, &index, extent, slabs[s].clone()))?;

    let mut summary = PassSummary::empty();
    let mut n_written = 0;
    for part in &parts {
        for &(i, g, h) in &part.writes {
            grad[i] = g;
            hess[i] = h;
        }
        n_written += part.writes.len();
        summary.merge(&part.summary);
    }

    log::debug!(
        "INU gradients (channel {}): {} voxels, {} written, ll={:.6}",
        channel,
        summary.n_voxels,
        n_written,
        summary.log_likelihood
    );
    Ok(summary)
}

/// Validate the channel index and output sizes of a gradient pass.
fn check_inu_inputs(
    inputs: &PassInputs<'_>,
    channel: usize,
    grad_len: usize,
    hess_len: usize,
) -> Result<()> {
    if channel >= inputs.n_channels() {
        return Err(Error::Validation(format!(
            "channel index {} out of range for {} channels",
            channel,
            inputs.n_channels()
        )));
    }
    let n = inputs.volume.dims.n_voxels();
    if grad_len != n || hess_len != n {
        return Err(Error::Validation(format!(
            "gradient and Hessian buffers must hold {} elements (got {} and {})",
            n, grad_len, hess_len
        )));
    }
    Ok(())
}
