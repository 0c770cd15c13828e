//! Approximate exponential and softmax helpers used by the responsibility kernels.

use std::sync::LazyLock;

/// `exp(i)` for integer `i` in `[-128, 127]`, indexed by `i + 128`.
static EXP_TABLE: LazyLock<[f64; 256]> = LazyLock::new(|| {
    let mut table = [0.0; 256];
    for (i, e) in table.iter_mut().enumerate() {
        *e = (i as f64 - 128.0).exp();
    }
    table
});

/// Fast approximate `exp(x)`.
///
/// Splits `x = i + r` with `i = round(x)` (ties to even) and evaluates
/// `exp(i) * exp(r)`, where `exp(i)` comes from a precomputed table and
/// `exp(r)` from a truncated continued fraction:
///
/// `exp(r) ~ 1 + 2r / (2 - r + r^2/6)`
///
/// Relative error stays below `5e-5`. Inputs are expected in `[-128, 127]`;
/// below `log(eps) ~ -36` the result is already negligible next to 1, so the
/// integer part is clamped to that range. `exp(-inf)` is exactly zero.
#[inline]
pub fn fast_exp(x: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        return 0.0;
    }
    let i = (x.round_ties_even() as i64).clamp(-128, 127);
    let r = x - i as f64;
    let rr = r * r;
    EXP_TABLE[(i + 128) as usize] * (1.0 + 2.0 * r / (2.0 - r + rr / 6.0))
}

/// In-place softmax: `p <- exp(p) / sum(exp(p))`.
///
/// The running maximum is subtracted before exponentiating. Returns
/// `log(sum(exp(p)))` of the input, i.e. the log-sum-exp.
#[inline]
pub fn softmax(p: &mut [f64]) -> f64 {
    let Some((&first, rest)) = p.split_first() else {
        return f64::NEG_INFINITY;
    };
    let mut mx = first;
    for &q in rest {
        if q > mx {
            mx = q;
        }
    }
    let mut s = 0.0;
    for q in p.iter_mut() {
        *q = fast_exp(*q - mx);
        s += *q;
    }
    for q in p.iter_mut() {
        *q /= s;
    }
    s.ln() + mx
}

/// In-place softmax with an implicit extra logit fixed at zero:
/// `p <- exp(p) / (sum(exp(p)) + 1)`.
///
/// The extra term stands for a null class that is not stored. Returns the
/// log-sum-exp over `[p, 0]`.
#[inline]
pub fn softmax_closed(p: &mut [f64]) -> f64 {
    let mut mx = 0.0;
    for &q in p.iter() {
        if q > mx {
            mx = q;
        }
    }
    let mut s = fast_exp(-mx);
    for q in p.iter_mut() {
        *q = fast_exp(*q - mx);
        s += *q;
    }
    for q in p.iter_mut() {
        *q /= s;
    }
    s.ln() + mx
}
