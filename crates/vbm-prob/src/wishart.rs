//! Normalising constants for Gaussian-Wishart expectations.
//!
//! With `Lambda ~ Wishart(W, nu)` over `po` dimensions and `mu | Lambda ~
//! N(m, (b Lambda)^-1)`, the variational expectation of a Normal log-density
//! splits into a data-independent constant and a Mahalanobis term. The
//! constants here are the data-independent parts; `ld` is always
//! `log det W`.

use std::f64::consts::{LN_2, PI};

use statrs::function::gamma::ln_gamma;

use crate::digamma::digamma;

/// `E[log det Lambda] = sum_{j<po} psi((nu - j)/2) + po log 2 + log det W`.
pub fn expected_log_det(nu: f64, po: usize, ld: f64) -> f64 {
    let mut eld = 0.0;
    for j in 0..po {
        eld += digamma((nu - j as f64) * 0.5);
    }
    eld + po as f64 * LN_2 + ld
}

/// Constant of `E[log N(x | mu, Lambda^-1)] + log gam` under the Gaussian-Wishart.
///
/// `0.5 * (E[log det Lambda] - po * (log 2pi + 1/b)) + log_gam`
pub fn normal_constant(nu: f64, b: f64, po: usize, ld: f64, log_gam: f64) -> f64 {
    let eld = expected_log_det(nu, po, ld);
    0.5 * (eld - po as f64 * ((2.0 * PI).ln() + 1.0 / b)) + log_gam
}

/// Constant of the predictive Student-t log-density plus `log_gam`.
///
/// The predictive has `tau = nu + 1 - po` degrees of freedom and precision
/// `W * tau * b / (1 + b)`:
///
/// `lnG((nu+1)/2) - lnG(tau/2) + 0.5 * log det(precision) - 0.5 * po * log(tau pi) + log_gam`
pub fn student_constant(nu: f64, b: f64, po: usize, ld: f64, log_gam: f64) -> f64 {
    let p = po as f64;
    let tau = nu + 1.0 - p;
    let ld1 = ld + p * (tau * b / (b + 1.0)).ln();
    ln_gamma(0.5 * (nu + 1.0)) - ln_gamma(0.5 * tau) + 0.5 * ld1 - 0.5 * p * (tau * PI).ln()
        + log_gam
}
