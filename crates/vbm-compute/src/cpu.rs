//! CPU compute backend
//!
//! Volume passes are split into slabs of consecutive z-planes. Each slab is
//! evaluated independently, possibly on a Rayon worker, and the per-slab
//! results are returned in slab order so that callers can reduce them
//! sequentially. Reduction order therefore never depends on the thread count.

use std::ops::Range;

use rayon::prelude::*;
use vbm_core::{Error, Result};

/// CPU compute backend using Rayon for parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuBackend {
    /// Number of threads (0 = Rayon's global pool, 1 = run inline)
    pub n_threads: usize,
}

impl CpuBackend {
    /// Create a new CPU backend on the global pool
    pub fn new() -> Self {
        Self { n_threads: 0 }
    }

    /// Create a CPU backend with specified thread count
    pub fn with_threads(n_threads: usize) -> Self {
        Self { n_threads }
    }

    /// Backend name
    pub fn name(&self) -> &str {
        "CPU"
    }

    /// Evaluate `f` for every slab index in `0..n_slabs`, returning results in order.
    pub fn map_slabs<T, F>(&self, n_slabs: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        match self.n_threads {
            1 => (0..n_slabs).map(f).collect(),
            0 => (0..n_slabs).into_par_iter().map(f).collect(),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;
                log::debug!("CPU backend: {} slabs on a {}-thread pool", n_slabs, n);
                pool.install(|| (0..n_slabs).into_par_iter().map(f).collect())
            }
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `0..n` into consecutive ranges of at most `depth` elements.
pub fn slab_ranges(n: usize, depth: usize) -> Vec<Range<usize>> {
    let depth = depth.max(1);
    (0..n).step_by(depth).map(|start| start..(start + depth).min(n)).collect()
}
