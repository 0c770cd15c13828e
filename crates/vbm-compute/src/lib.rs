//! # vbm-compute
//!
//! Compute kernels for vbmix.
//!
//! This crate provides:
//! - **linalg**: Cholesky decomposition with a trace-relative diagonal floor,
//!   triangular solves and inversion with log-determinant, for the small
//!   symmetric precision/covariance matrices of the mixture model
//! - **cpu**: a Rayon-backed executor that evaluates volume slabs in parallel
//!   and hands results back in slab order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cpu;
pub mod linalg;

pub use cpu::{CpuBackend, slab_ranges};
