//! Probability building blocks for vbmix.
//!
//! This crate hosts the scalar numerics shared by the responsibility kernels:
//! - a table-driven approximate exponential and the softmax variants built on it
//! - an asymptotic digamma approximation
//! - normalising constants of Gaussian-Wishart expectations and Student-t marginals

pub mod digamma;
pub mod math;
pub mod wishart;
