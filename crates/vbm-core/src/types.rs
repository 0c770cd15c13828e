//! Common data types for vbmix
//!
//! All volumes are column-major: voxel `(i0, i1, i2)` of channel `c` lives at
//! `i0 + nx * (i1 + ny * i2) + nx * ny * nz * c`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound (exclusive) on the number of image channels.
///
/// Pattern codes are `P`-bit masks and must stay exactly representable.
pub const MAX_CHANNELS: usize = 50;

/// Upper bound (exclusive) on the number of mixture classes.
pub const MAX_CLASSES: usize = 128;

/// Check the intrinsic channel/class bounds before anything is allocated.
pub fn check_bounds(n_channels: usize, n_classes: usize) -> Result<()> {
    if n_channels >= MAX_CHANNELS {
        return Err(Error::Validation(format!(
            "channel count {} exceeds limit (must be < {})",
            n_channels, MAX_CHANNELS
        )));
    }
    if n_classes >= MAX_CLASSES {
        return Err(Error::Validation(format!(
            "class count {} exceeds limit (must be < {})",
            n_classes, MAX_CLASSES
        )));
    }
    if n_classes == 0 {
        return Err(Error::Validation("class count must be at least 1".to_string()));
    }
    Ok(())
}

/// Dimensions of a 4-D volume `(nx, ny, nz, nc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDims {
    /// Extent along x
    pub nx: usize,
    /// Extent along y
    pub ny: usize,
    /// Extent along z
    pub nz: usize,
    /// Number of volumes stacked along the fourth axis
    pub nc: usize,
}

impl VolumeDims {
    /// Create a new set of dimensions
    pub fn new(nx: usize, ny: usize, nz: usize, nc: usize) -> Self {
        Self { nx, ny, nz, nc }
    }

    /// Voxels in one 3-D volume.
    #[inline]
    pub fn n_voxels(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Total number of elements (`n_voxels * nc`).
    #[inline]
    pub fn len(&self) -> usize {
        self.n_voxels() * self.nc
    }

    /// `true` when the volume holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of voxel `(i0, i1, i2)` within one 3-D volume.
    #[inline]
    pub fn index(&self, i0: usize, i1: usize, i2: usize) -> usize {
        i0 + self.nx * (i1 + self.ny * i2)
    }

    /// `true` when both dims describe the same 3-D grid.
    pub fn same_grid(&self, other: &VolumeDims) -> bool {
        self.nx == other.nx && self.ny == other.ny && self.nz == other.nz
    }
}

impl From<[usize; 4]> for VolumeDims {
    fn from(d: [usize; 4]) -> Self {
        Self::new(d[0], d[1], d[2], d[3])
    }
}

/// Integer sampling stride in x, y and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stride {
    /// Stride along x
    pub x: usize,
    /// Stride along y
    pub y: usize,
    /// Stride along z
    pub z: usize,
}

impl Stride {
    /// Create a stride; every component must be at least 1.
    pub fn new(x: usize, y: usize, z: usize) -> Result<Self> {
        let stride = Self { x, y, z };
        stride.validate()?;
        Ok(stride)
    }

    /// Check that every component is at least 1.
    pub fn validate(&self) -> Result<()> {
        if self.x == 0 || self.y == 0 || self.z == 0 {
            return Err(Error::Validation(format!(
                "stride components must be >= 1, got ({}, {}, {})",
                self.x, self.y, self.z
            )));
        }
        Ok(())
    }

    /// Unit stride (every voxel).
    pub fn unit() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }

    /// `true` when `(i0, i1, i2)` sits on the coarse lattice.
    #[inline]
    pub fn on_lattice(&self, i0: usize, i1: usize, i2: usize) -> bool {
        i0 % self.x == 0 && i1 % self.y == 0 && i2 % self.z == 0
    }

    /// Extent of the sampled sub-lattice: `min(prior / stride, data)` per axis.
    pub fn sampled_extent(&self, prior: &VolumeDims, data: &VolumeDims) -> [usize; 3] {
        [
            (prior.nx / self.x).min(data.nx),
            (prior.ny / self.y).min(data.ny),
            (prior.nz / self.z).min(data.nz),
        ]
    }
}

impl TryFrom<[usize; 3]> for Stride {
    type Error = Error;

    fn try_from(s: [usize; 3]) -> Result<Self> {
        Self::new(s[0], s[1], s[2])
    }
}

/// Multi-channel intensity volume: per-channel expectation and variance.
#[derive(Debug, Clone, Copy)]
pub struct Volume<'a> {
    /// Dimensions; `nc` is the channel count `P`
    pub dims: VolumeDims,
    /// `E[f]`, non-finite entries mark missing channels
    pub mean: &'a [f32],
    /// `diag(Var[f])`
    pub var: &'a [f32],
}

impl<'a> Volume<'a> {
    /// Wrap mean/variance buffers after checking their lengths.
    pub fn new(dims: VolumeDims, mean: &'a [f32], var: &'a [f32]) -> Result<Self> {
        let volume = Self { dims, mean, var };
        volume.validate()?;
        Ok(volume)
    }

    /// Check buffer lengths against the dimensions.
    pub fn validate(&self) -> Result<()> {
        let n = self.dims.len();
        if self.mean.len() != n || self.var.len() != n {
            return Err(Error::Validation(format!(
                "volume buffers must hold {} elements (mean={}, var={})",
                n,
                self.mean.len(),
                self.var.len()
            )));
        }
        Ok(())
    }

    /// Number of channels `P`.
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.dims.nc
    }
}

/// Log tissue priors plus the Gaussian -> tissue lookup table.
#[derive(Debug, Clone, Copy)]
pub struct TissuePriors<'a> {
    /// Prior grid dimensions; `nc` is the tissue count
    pub dims: VolumeDims,
    /// Log prior volumes
    pub log_prior: &'a [f32],
    /// Tissue index of every Gaussian
    pub lkp: &'a [usize],
}

impl<'a> TissuePriors<'a> {
    /// Wrap the prior buffers after checking lengths and lookup entries.
    pub fn new(dims: VolumeDims, log_prior: &'a [f32], lkp: &'a [usize]) -> Result<Self> {
        let priors = Self { dims, log_prior, lkp };
        priors.validate()?;
        Ok(priors)
    }

    /// Check the buffer length, tissue count and lookup entries.
    pub fn validate(&self) -> Result<()> {
        let Self { dims, log_prior, lkp } = *self;
        if log_prior.len() != dims.len() {
            return Err(Error::Validation(format!(
                "log prior buffer must hold {} elements, got {}",
                dims.len(),
                log_prior.len()
            )));
        }
        if dims.nc == 0 {
            return Err(Error::Validation("at least one tissue class is required".to_string()));
        }
        if let Some((k, &t)) = lkp.iter().enumerate().find(|&(_, &t)| t >= dims.nc) {
            return Err(Error::Validation(format!(
                "lookup entry {} maps to tissue {} but only {} tissues exist",
                k, t, dims.nc
            )));
        }
        Ok(())
    }

    /// Number of tissue classes.
    #[inline]
    pub fn n_tissues(&self) -> usize {
        self.dims.nc
    }
}

/// Variational Bayesian GMM parameters over all `P` channels.
///
/// Layouts: `mu` is `P x K`, `w` is `P x P x K`, `b`, `nu` and `gam` have
/// length `K`.
#[derive(Debug, Clone, Copy)]
pub struct GmmParams<'a> {
    n_channels: usize,
    n_classes: usize,
    /// Posterior means
    pub mu: &'a [f64],
    /// Precision scaling of the means
    pub b: &'a [f64],
    /// Wishart scale matrices
    pub w: &'a [f64],
    /// Wishart degrees of freedom
    pub nu: &'a [f64],
    /// Mixing proportions
    pub gam: &'a [f64],
}

impl<'a> GmmParams<'a> {
    /// Wrap parameter buffers after checking their shapes.
    pub fn new(
        n_channels: usize,
        mu: &'a [f64],
        b: &'a [f64],
        w: &'a [f64],
        nu: &'a [f64],
        gam: &'a [f64],
    ) -> Result<Self> {
        let params = Self { n_channels, n_classes: b.len(), mu, b, w, nu, gam };
        params.validate()?;
        Ok(params)
    }

    /// Check every buffer against the channel and class counts.
    pub fn validate(&self) -> Result<()> {
        let Self { mu, b, w, nu, gam, .. } = *self;
        let k = self.n_classes;
        let p = self.n_channels;
        if b.len() != k || nu.len() != k || gam.len() != k {
            return Err(Error::Validation(format!(
                "b, nu and gam must hold {} entries (b={}, nu={}, gam={})",
                k,
                b.len(),
                nu.len(),
                gam.len()
            )));
        }
        if mu.len() != p * k {
            return Err(Error::Validation(format!(
                "mu must be {}x{} ({} elements), got {}",
                p,
                k,
                p * k,
                mu.len()
            )));
        }
        if w.len() != p * p * k {
            return Err(Error::Validation(format!(
                "W must be {}x{}x{} ({} elements), got {}",
                p,
                p,
                k,
                p * p * k,
                w.len()
            )));
        }
        Ok(())
    }

    /// Number of channels `P`.
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Number of Gaussians `K`.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean of class `k`.
    #[inline]
    pub fn mean(&self, k: usize) -> &'a [f64] {
        let p = self.n_channels;
        &self.mu[p * k..p * (k + 1)]
    }

    /// Wishart scale matrix of class `k` (`P x P`, column-major).
    #[inline]
    pub fn precision(&self, k: usize) -> &'a [f64] {
        let pp = self.n_channels * self.n_channels;
        &self.w[pp * k..pp * (k + 1)]
    }
}

/// Outcome of one volume pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Summed per-voxel log-likelihood
    pub log_likelihood: f64,
    /// Voxels that contributed a likelihood term
    pub n_voxels: usize,
}

impl PassSummary {
    /// Empty summary (identity for [`PassSummary::merge`]).
    pub fn empty() -> Self {
        Self { log_likelihood: 0.0, n_voxels: 0 }
    }

    /// Fold another partial summary into this one.
    pub fn merge(&mut self, other: &PassSummary) {
        self.log_likelihood += other.log_likelihood;
        self.n_voxels += other.n_voxels;
    }
}
