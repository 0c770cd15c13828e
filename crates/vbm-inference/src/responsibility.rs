//! Responsibility kernels.
//!
//! Both kernels take the log priors of one voxel in `p`, add a per-class
//! log-likelihood term and normalise in place with a softmax. The returned
//! log-sum-exp is the voxel's contribution to the total log-likelihood.

use vbm_prob::math::softmax;

use crate::pattern::Marginal;

/// Expected squared Mahalanobis distance under observation uncertainty:
///
/// `(x - mu)^T W (x - mu) + trace(W diag(v))`
#[inline]
pub fn expected_distance(po: usize, mu: &[f64], w: &[f64], x: &[f64], v: &[f64]) -> f64 {
    let mut d = 0.0;
    for j in 0..po {
        let wj = &w[po * j..po * (j + 1)];
        let r = x[j] - mu[j];
        d += wj[j] * (r * r + v[j]);
        for i in j + 1..po {
            d += 2.0 * r * wj[i] * (x[i] - mu[i]);
        }
    }
    d
}

/// Per-class log-likelihood term of a responsibility kernel.
pub trait ResponsibilityKernel {
    /// Log-likelihood of class `k` given the expected squared distance `d2`.
    fn log_likelihood(m: &Marginal<'_>, k: usize, d2: f64) -> f64;
}

/// VB Gaussian mixture: `conN - nu/2 * d2`.
#[derive(Debug, Clone, Copy)]
pub struct Normal;

impl ResponsibilityKernel for Normal {
    #[inline]
    fn log_likelihood(m: &Marginal<'_>, k: usize, d2: f64) -> f64 {
        m.con_n[k] - 0.5 * m.nu[k] * d2
    }
}

/// Predictive Student-t mixture: `conT - (nu+1)/2 * log(1 + b/(b+1) * d2)`.
///
/// Heavier tails than [`Normal`]; accounts for uncertainty in the class
/// parameters. See Bishop, PRML, eqns. 10.78-10.82 and B.68-B.72.
#[derive(Debug, Clone, Copy)]
pub struct StudentT;

impl ResponsibilityKernel for StudentT {
    #[inline]
    fn log_likelihood(m: &Marginal<'_>, k: usize, d2: f64) -> f64 {
        let b = m.b[k];
        m.con_t[k] - 0.5 * (m.nu[k] + 1.0) * (1.0 + b / (b + 1.0) * d2).ln()
    }
}

/// Turn log priors `p` into responsibilities under kernel `R`.
///
/// Returns the log-sum-exp of the unnormalised log posteriors.
#[inline]
pub fn responsibilities<R: ResponsibilityKernel>(
    m: &Marginal<'_>,
    x: &[f64],
    v: &[f64],
    p: &mut [f64],
) -> f64 {
    for (k, pk) in p.iter_mut().enumerate() {
        let d2 = expected_distance(m.po, m.mean(k), m.precision(k), x, v);
        *pk += R::log_likelihood(m, k, d2);
    }
    softmax(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternTable;
    use approx::assert_abs_diff_eq;
    use vbm_core::GmmParams;

    #[test]
    fn test_expected_distance_matches_quadratic_form() {
        let w = [2.0, 0.5, 0.5, 1.0];
        let mu = [1.0, -1.0];
        let x = [2.0, 1.0];
        let v = [0.1, 0.3];
        // r = (1, 2): r^T W r = 2 + 2*0.5*2 + 4 = 8; trace(W diag v) = 0.2 + 0.3
        assert_abs_diff_eq!(expected_distance(2, &mu, &w, &x, &v), 8.5, epsilon = 1e-14);
        assert_eq!(expected_distance(0, &[], &[], &[], &[]), 0.0);
    }

    #[test]
    fn test_kernels_normalise() {
        let mu = [0.0, 0.0, 3.0, 3.0];
        let w = [1.0, 0.2, 0.2, 1.0, 2.0, 0.0, 0.0, 2.0];
        let b = [5.0, 5.0];
        let nu = [6.0, 6.0];
        let gam = [0.5, 0.5];
        let params = GmmParams::new(2, &mu, &b, &w, &nu, &gam).unwrap();
        let table = PatternTable::build(&params).unwrap();

        for code in 1..4 {
            let m = table.marginal(code);
            let x = vec![1.0; m.po];
            let v = vec![0.0; m.po];
            let mut pn = [0.5f64.ln(); 2];
            let mut pt = pn;
            responsibilities::<Normal>(&m, &x, &v, &mut pn);
            responsibilities::<StudentT>(&m, &x, &v, &mut pt);
            assert_abs_diff_eq!(pn.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(pt.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            // x = 1 is closer to class 0
            assert!(pn[0] > pn[1]);
            assert!(pt[0] > pt[1]);
        }
    }

    #[test]
    fn test_student_t_has_heavier_tails() {
        let mu = [0.0, 1.0];
        let w = [4.0, 1.0];
        let b = [20.0, 20.0];
        let nu = [4.0, 4.0];
        let gam = [0.5, 0.5];
        let params = GmmParams::new(1, &mu, &b, &w, &nu, &gam).unwrap();
        let table = PatternTable::build(&params).unwrap();
        let m = table.marginal(1);

        // far out: the tight class 0 should keep more mass under the t kernel
        let x = [-8.0];
        let mut pn = [0.0; 2];
        let mut pt = [0.0; 2];
        responsibilities::<Normal>(&m, &x, &[0.0], &mut pn);
        responsibilities::<StudentT>(&m, &x, &[0.0], &mut pt);
        assert!(pt[0] > pn[0]);
    }
}
