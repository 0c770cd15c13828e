//! Per-voxel reads: observed channels and tissue priors.

use vbm_core::{MAX_CHANNELS, TissuePriors, Volume};

/// Observed channels of one voxel, packed in increasing channel order.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Pattern code (bit `j` set when channel `j` is finite)
    pub code: usize,
    po: usize,
    x: [f64; MAX_CHANNELS],
    v: [f64; MAX_CHANNELS],
}

impl Observation {
    /// Empty observation buffer.
    pub fn new() -> Self {
        Self { code: 0, po: 0, x: [0.0; MAX_CHANNELS], v: [0.0; MAX_CHANNELS] }
    }

    /// Read voxel `i` of `volume`, returning its pattern code.
    ///
    /// A channel counts as observed when its mean is finite; its variance is
    /// taken as-is.
    #[inline]
    pub fn extract(&mut self, volume: &Volume<'_>, i: usize) -> usize {
        let n = volume.dims.n_voxels();
        let mut code = 0;
        let mut j1 = 0;
        for j in 0..volume.n_channels() {
            let o = i + n * j;
            let m = volume.mean[o] as f64;
            if m.is_finite() {
                self.x[j1] = m;
                self.v[j1] = volume.var[o] as f64;
                code |= 1 << j;
                j1 += 1;
            }
        }
        self.code = code;
        self.po = j1;
        code
    }

    /// Number of observed channels.
    #[inline]
    pub fn po(&self) -> usize {
        self.po
    }

    /// Observed means.
    #[inline]
    pub fn x(&self) -> &[f64] {
        &self.x[..self.po]
    }

    /// Observed variances.
    #[inline]
    pub fn v(&self) -> &[f64] {
        &self.v[..self.po]
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill `p` with the log priors of every Gaussian at prior-grid voxel `i`.
///
/// Returns `false` as soon as a non-finite prior is met; `p` is then only
/// partially written.
#[inline]
pub fn load_priors(priors: &TissuePriors<'_>, i: usize, p: &mut [f64]) -> bool {
    let n = priors.dims.n_voxels();
    for (pk, &t) in p.iter_mut().zip(priors.lkp) {
        let lp = priors.log_prior[n * t + i] as f64;
        if !lp.is_finite() {
            return false;
        }
        *pk = lp;
    }
    true
}
