//! Execution settings shared by the volume passes.

use serde::{Deserialize, Serialize};
use vbm_compute::CpuBackend;

/// Configuration for a volume pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    /// Worker threads (0 = Rayon's global pool, 1 = run on the calling thread)
    pub n_threads: usize,
    /// Consecutive z-planes evaluated by one task
    pub slab_depth: usize,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self { n_threads: 0, slab_depth: 8 }
    }
}

impl PassConfig {
    /// Run on the calling thread only.
    pub fn serial() -> Self {
        Self { n_threads: 1, ..Self::default() }
    }

    /// Set the worker thread count.
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Set the slab depth (clamped to at least one plane).
    pub fn with_slab_depth(mut self, slab_depth: usize) -> Self {
        self.slab_depth = slab_depth.max(1);
        self
    }

    /// Backend executing the slabs.
    pub fn backend(&self) -> CpuBackend {
        CpuBackend::with_threads(self.n_threads)
    }
}
