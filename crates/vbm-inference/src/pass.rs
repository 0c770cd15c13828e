//! Inputs shared by the three volume passes.

use vbm_core::{Error, GmmParams, Result, Stride, TissuePriors, Volume, check_bounds};

/// Everything a volume pass reads: image data, mixture parameters, priors
/// and the sampling stride.
#[derive(Debug, Clone, Copy)]
pub struct PassInputs<'a> {
    /// Channel means and variances
    pub volume: Volume<'a>,
    /// Full-channel VB-GMM parameters
    pub params: GmmParams<'a>,
    /// Log tissue priors and the Gaussian -> tissue lookup
    pub priors: TissuePriors<'a>,
    /// Prior-grid sampling stride (statistics/gradients) or Normal-kernel
    /// lattice (responsibility maps)
    pub skip: Stride,
}

impl<'a> PassInputs<'a> {
    /// Bundle and validate pass inputs.
    pub fn new(
        volume: Volume<'a>,
        params: GmmParams<'a>,
        priors: TissuePriors<'a>,
        skip: Stride,
    ) -> Result<Self> {
        let inputs = Self { volume, params, priors, skip };
        inputs.validate()?;
        Ok(inputs)
    }

    /// Check bounds, every buffer against its dimensions, and cross-buffer
    /// consistency.
    ///
    /// Fields are public, so the entry points run this again before any work.
    pub fn validate(&self) -> Result<()> {
        let p = self.params.n_channels();
        let k = self.params.n_classes();
        check_bounds(p, k)?;
        self.params.validate()?;
        self.volume.validate()?;
        self.priors.validate()?;
        self.skip.validate()?;
        if self.volume.n_channels() != p {
            return Err(Error::Validation(format!(
                "volume has {} channels but the model has {}",
                self.volume.n_channels(),
                p
            )));
        }
        if self.priors.lkp.len() != k {
            return Err(Error::Validation(format!(
                "lookup table has {} entries but the model has {} Gaussians",
                self.priors.lkp.len(),
                k
            )));
        }
        Ok(())
    }

    /// Number of channels `P`.
    pub fn n_channels(&self) -> usize {
        self.params.n_channels()
    }

    /// Number of Gaussians `K`.
    pub fn n_classes(&self) -> usize {
        self.params.n_classes()
    }
}
