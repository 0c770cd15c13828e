//! Marginal Gaussian-Wishart parameters for every missing-data pattern.
//!
//! Pattern `code` is a `P`-bit mask of observed channels. For each class the
//! full covariance `W^-1` is restricted to the observed channels (kept in
//! increasing channel order) and inverted back, which is exactly the
//! marginal of the joint posterior. Degrees of freedom drop by the number of
//! missing channels.
//!
//! All per-pattern arrays live in one flat arena; [`Marginal`] is an
//! offset-based view into it. The table is built once per call and is
//! read-only afterwards, so it can be shared across worker threads.

use vbm_compute::linalg::invert;
use vbm_core::{Error, GmmParams, Result, check_bounds, observed_count, space_needed, try_zeroed};
use vbm_prob::wishart::{normal_constant, student_constant};

#[derive(Debug, Clone, Copy)]
struct Offsets {
    po: usize,
    mu: usize,
    b: usize,
    w: usize,
    nu: usize,
    log_gam: usize,
    con_n: usize,
    con_t: usize,
}

/// Marginal parameters of all classes for one pattern.
#[derive(Debug, Clone, Copy)]
pub struct Marginal<'a> {
    /// Observed channel count
    pub po: usize,
    /// Means, `Po x K`
    pub mu: &'a [f64],
    /// Mean precision scaling, length `K`
    pub b: &'a [f64],
    /// Marginal Wishart scales, `Po x Po x K`
    pub w: &'a [f64],
    /// Marginal degrees of freedom `nu - (P - Po)`, length `K`
    pub nu: &'a [f64],
    /// Log mixing weights, length `K`
    pub log_gam: &'a [f64],
    /// Normal responsibility constants, length `K`
    pub con_n: &'a [f64],
    /// Student-t responsibility constants, length `K`
    pub con_t: &'a [f64],
}

impl<'a> Marginal<'a> {
    /// Number of classes.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.b.len()
    }

    /// Mean of class `k` over the observed channels.
    #[inline]
    pub fn mean(&self, k: usize) -> &'a [f64] {
        &self.mu[self.po * k..self.po * (k + 1)]
    }

    /// Marginal scale matrix of class `k` (`Po x Po`, column-major).
    #[inline]
    pub fn precision(&self, k: usize) -> &'a [f64] {
        let pp = self.po * self.po;
        &self.w[pp * k..pp * (k + 1)]
    }
}

/// Read-only table of [`Marginal`] parameters indexed by pattern code.
#[derive(Debug, Clone)]
pub struct PatternTable {
    n_channels: usize,
    n_classes: usize,
    buf: Vec<f64>,
    offsets: Vec<Offsets>,
}

impl PatternTable {
    /// Derive the marginals of every pattern from full-channel parameters.
    pub fn build(params: &GmmParams<'_>) -> Result<Self> {
        let p = params.n_channels();
        let k = params.n_classes();
        check_bounds(p, k)?;

        let n_codes = 1usize << p;
        let len = space_needed(p, k);

        let mut offsets = Vec::new();
        offsets.try_reserve_exact(n_codes)?;
        let mut o = 0usize;
        for code in 0..n_codes {
            let po = observed_count(code);
            let mut take = |n: usize| {
                let start = o;
                o += n;
                start
            };
            offsets.push(Offsets {
                po,
                mu: take(k * po),
                b: take(k),
                w: take(k * po * po),
                nu: take(k),
                log_gam: take(k),
                con_n: take(k),
                con_t: take(k),
            });
        }
        debug_assert_eq!(o, 5 * len.s0 + len.s1 + len.s2);

        let mut buf = try_zeroed(o)?;
        let mut cov = try_zeroed(p * p)?;
        let mut sub = try_zeroed(p * p)?;
        let mut scratch = try_zeroed(p * (p + 1))?;

        for kk in 0..k {
            let log_gam = params.gam[kk].ln();
            let b = params.b[kk];
            let mu = params.mean(kk);
            invert(p, params.precision(kk), &mut cov, &mut scratch);

            for (code, off) in offsets.iter().enumerate() {
                let po = off.po;
                let nu = params.nu[kk] - (p - po) as f64;
                buf[off.nu + kk] = nu;
                buf[off.b + kk] = b;
                buf[off.log_gam + kk] = log_gam;

                let mut j1 = 0;
                for j in (0..p).filter(|&j| code & (1 << j) != 0) {
                    buf[off.mu + j1 + po * kk] = mu[j];
                    let mut i1 = 0;
                    for i in (0..p).filter(|&i| code & (1 << i) != 0) {
                        sub[i1 + po * j1] = cov[i + p * j];
                        i1 += 1;
                    }
                    j1 += 1;
                }

                let w_start = off.w + po * po * kk;
                let w = &mut buf[w_start..w_start + po * po];
                let ld = invert(po, &sub[..po * po], w, &mut scratch);

                buf[off.con_n + kk] = normal_constant(nu, b, po, ld, log_gam);
                buf[off.con_t + kk] = student_constant(nu, b, po, ld, log_gam);
            }
        }

        log::debug!("built marginal table: P={}, K={}, {} patterns, {} values", p, k, n_codes, o);
        Ok(Self { n_channels: p, n_classes: k, buf, offsets })
    }

    /// Number of channels `P`.
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Number of classes `K`.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of patterns (`2^P`).
    pub fn n_patterns(&self) -> usize {
        self.offsets.len()
    }

    /// Marginal parameters for pattern `code`.
    #[inline]
    pub fn marginal(&self, code: usize) -> Marginal<'_> {
        let off = &self.offsets[code];
        let k = self.n_classes;
        let po = off.po;
        let buf = &self.buf;
        Marginal {
            po,
            mu: &buf[off.mu..off.mu + k * po],
            b: &buf[off.b..off.b + k],
            w: &buf[off.w..off.w + k * po * po],
            nu: &buf[off.nu..off.nu + k],
            log_gam: &buf[off.log_gam..off.log_gam + k],
            con_n: &buf[off.con_n..off.con_n + k],
            con_t: &buf[off.con_t..off.con_t + k],
        }
    }
}

/// Position of one channel inside every pattern's observed subset.
#[derive(Debug, Clone)]
pub struct ChannelIndex {
    channel: usize,
    local: Vec<Option<usize>>,
}

impl ChannelIndex {
    /// Index channel `ic` across all `2^p` patterns.
    pub fn new(p: usize, ic: usize) -> Result<Self> {
        if ic >= p {
            return Err(Error::Validation(format!(
                "channel index {} out of range for {} channels",
                ic, p
            )));
        }
        let n_codes = 1usize << p;
        let mut local = Vec::new();
        local.try_reserve_exact(n_codes)?;
        let below = (1usize << ic) - 1;
        for code in 0..n_codes {
            if code & (1 << ic) != 0 {
                local.push(Some(observed_count(code & below)));
            } else {
                local.push(None);
            }
        }
        Ok(Self { channel: ic, local })
    }

    /// The indexed channel.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Local position of the channel under `code`, or `None` when it is missing.
    #[inline]
    pub fn local(&self, code: usize) -> Option<usize> {
        self.local[code]
    }
}
