//! Sufficient statistics pass.
//!
//! Visits the sub-lattice where the (possibly coarser) prior grid and the
//! data grid overlap, computes Normal-kernel responsibilities and adds the
//! zeroth, first and second moments of each voxel into the statistics of its
//! missing-data pattern. Voxels with no observed channel or with a
//! non-finite prior are skipped.

use std::ops::Range;

use vbm_compute::slab_ranges;
use vbm_core::{MAX_CLASSES, PassSummary, PatternStatsMut, Result, SufficientStatistics};

use crate::config::PassConfig;
use crate::pass::PassInputs;
use crate::pattern::PatternTable;
use crate::responsibility::{Normal, responsibilities};
use crate::voxel::{Observation, load_priors};

/// Add one voxel's weighted moments to its pattern statistics.
///
/// Only the lower triangle of each `s2` block is written.
#[inline]
pub fn accumulate(stats: PatternStatsMut<'_>, obs: &Observation, p: &[f64]) {
    let po = stats.po;
    let x = obs.x();
    let v = obs.v();
    for (k, &pk) in p.iter().enumerate() {
        stats.s0[k] += pk;
        let s1 = &mut stats.s1[po * k..po * (k + 1)];
        let s2 = &mut stats.s2[po * po * k..po * po * (k + 1)];
        for j in 0..po {
            let xj = x[j];
            let px = pk * xj;
            s1[j] += px;
            s2[j + po * j] += pk * (xj * xj + v[j]);
            for j1 in j + 1..po {
                s2[j1 + po * j] += px * x[j1];
            }
        }
    }
}

fn accumulate_slab(
    inputs: &PassInputs<'_>,
    table: &PatternTable,
    extent: [usize; 3],
    planes: Range<usize>,
) -> Result<(SufficientStatistics, PassSummary)> {
    let k = inputs.n_classes();
    let mut stats = SufficientStatistics::try_new(inputs.n_channels(), k)?;
    let mut summary = PassSummary::empty();

    let nf = inputs.volume.dims;
    let nm = inputs.priors.dims;
    let skip = inputs.skip;
    let mut obs = Observation::new();
    let mut prob = [0.0f64; MAX_CLASSES];
    let prob = &mut prob[..k];

    for i2 in planes {
        for i1 in 0..extent[1] {
            let off_f = nf.index(0, i1, i2);
            let off_m = nm.index(0, i1 * skip.y, i2 * skip.z);
            for i0 in 0..extent[0] {
                let code = obs.extract(&inputs.volume, off_f + i0);
                if code == 0 || !load_priors(&inputs.priors, off_m + i0 * skip.x, prob) {
                    continue;
                }
                let m = table.marginal(code);
                summary.log_likelihood += responsibilities::<Normal>(&m, obs.x(), obs.v(), prob);
                summary.n_voxels += 1;
                accumulate(stats.pattern_mut(code), &obs, prob);
            }
        }
    }
    Ok((stats, summary))
}

/// Accumulate sufficient statistics over the whole volume.
///
/// Slabs are reduced in order and the upper triangles of `s2` are filled
/// once at the end.
pub fn sufficient_statistics(
    inputs: &PassInputs<'_>,
    table: &PatternTable,
    config: &PassConfig,
) -> Result<(SufficientStatistics, PassSummary)> {
    let extent = inputs.skip.sampled_extent(&inputs.priors.dims, &inputs.volume.dims);
    let slabs = slab_ranges(extent[2], config.slab_depth);
    let partials = config
        .backend()
        .map_slabs(slabs.len(), |s| accumulate_slab(inputs, table, extent, slabs[s].clone()))?;

    let mut stats = SufficientStatistics::try_new(inputs.n_channels(), inputs.n_classes())?;
    let mut summary = PassSummary::empty();
    for (part, part_summary) in &partials {
        stats.merge(part)?;
        summary.merge(part_summary);
    }
    stats.mirror_upper();

    log::debug!(
        "sufficient statistics: {} slabs, {} voxels, mass={:.3}, ll={:.6}",
        slabs.len(),
        summary.n_voxels,
        stats.total_mass(),
        summary.log_likelihood
    );
    Ok((stats, summary))
}
