//! Responsibility map pass.
//!
//! Every voxel gets a responsibility per tissue class. On the coarse lattice
//! given by the stride the exact VB Normal kernel is used; elsewhere the
//! robust Student-t kernel. Gaussians mapping to the last tissue class are
//! not stored since that map is one minus the sum of the others.
//!
//! Voxels whose prior is invalid, or whose channels are all missing, are
//! written as NaN in every map. The two cases are not distinguished.

use std::ops::Range;

use vbm_compute::slab_ranges;
use vbm_core::{Error, MAX_CLASSES, PassSummary, Result, try_zeroed};
use vbm_prob::math::softmax_closed;

use crate::config::PassConfig;
use crate::pass::PassInputs;
use crate::pattern::PatternTable;
use crate::responsibility::{Normal, StudentT, responsibilities};
use crate::voxel::{Observation, load_priors};

struct MapSlab {
    start: usize,
    len: usize,
    block: Vec<f32>,
    summary: PassSummary,
}

fn map_slab(inputs: &PassInputs<'_>, table: &PatternTable, planes: Range<usize>) -> Result<MapSlab> {
    let k = inputs.n_classes();
    let n_maps = inputs.priors.n_tissues() - 1;
    let n_closed = inputs.priors.n_tissues().min(k);
    let dims = inputs.volume.dims;
    let start = dims.index(0, 0, planes.start);
    let len = dims.nx * dims.ny * planes.len();
    let mut block = try_zeroed::<f32>(len * n_maps)?;
    let mut summary = PassSummary::empty();

    let lkp = inputs.priors.lkp;
    let mut obs = Observation::new();
    let mut prob = [0.0f64; MAX_CLASSES];
    let prob = &mut prob[..k];

    for i2 in planes {
        for i1 in 0..dims.ny {
            for i0 in 0..dims.nx {
                let i = dims.index(i0, i1, i2);
                let li = i - start;
                let code = obs.extract(&inputs.volume, i);
                if !load_priors(&inputs.priors, i, prob) {
                    for t in 0..n_maps {
                        block[li + len * t] = f32::NAN;
                    }
                    continue;
                }
                if code == 0 {
                    // over the tissue count; the result is not stored
                    softmax_closed(&mut prob[..n_closed]);
                    for t in 0..n_maps {
                        block[li + len * t] = f32::NAN;
                    }
                    continue;
                }

                let m = table.marginal(code);
                summary.log_likelihood += if inputs.skip.on_lattice(i0, i1, i2) {
                    responsibilities::<Normal>(&m, obs.x(), obs.v(), prob)
                } else {
                    responsibilities::<StudentT>(&m, obs.x(), obs.v(), prob)
                };
                summary.n_voxels += 1;

                for (&pk, &t) in prob.iter().zip(lkp) {
                    if t < n_maps {
                        let cell = &mut block[li + len * t];
                        *cell = (*cell as f64 + pk) as f32;
                    }
                }
            }
        }
    }
    Ok(MapSlab { start, len, block, summary })
}

/// Write tissue responsibility maps for every voxel.
///
/// `resp` holds `n_tissues - 1` volumes on the data grid. The priors must be
/// sampled on that same grid.
pub fn responsibility_maps(
    inputs: &PassInputs<'_>,
    table: &PatternTable,
    resp: &mut [f32],
    config: &PassConfig,
) -> Result<PassSummary> {
    let dims = inputs.volume.dims;
    check_map_inputs(inputs, resp.len())?;

    let slabs = slab_ranges(dims.nz, config.slab_depth);
    let parts = config.backend().map_slabs(slabs.len(), |s| map_slab(inputs, table, slabs[s].clone()))?;

    let n = dims.n_voxels();
    let mut summary = PassSummary::empty();
    for part in &parts {
        for (t, src) in part.block.chunks_exact(part.len.max(1)).enumerate() {
            let dst = n * t + part.start;
            resp[dst..dst + part.len].copy_from_slice(&src[..part.len]);
        }
        summary.merge(&part.summary);
    }

    log::debug!(
        "responsibility maps: {} slabs, {} voxels, ll={:.6}",
        slabs.len(),
        summary.n_voxels,
        summary.log_likelihood
    );
    Ok(summary)
}

/// Validate the prior grid and output size of a map pass.
fn check_map_inputs(inputs: &PassInputs<'_>, resp_len: usize) -> Result<()> {
    let dims = inputs.volume.dims;
    if !inputs.priors.dims.same_grid(&dims) {
        return Err(Error::Validation(format!(
            "priors must be on the data grid {}x{}x{}, got {}x{}x{}",
            dims.nx,
            dims.ny,
            dims.nz,
            inputs.priors.dims.nx,
            inputs.priors.dims.ny,
            inputs.priors.dims.nz
        )));
    }
    let expected = dims.n_voxels() * (inputs.priors.n_tissues() - 1);
    if resp_len != expected {
        return Err(Error::Validation(format!(
            "responsibility buffer must hold {} elements, got {}",
            expected, resp_len
        )));
    }
    Ok(())
}
