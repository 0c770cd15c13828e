//! Sufficient statistics laid out per missing-data pattern.
//!
//! Patterns are enumerated in code order `0..2^P`. For every pattern with
//! `Po` observed channels the arena holds, class after class, one `s0`
//! scalar, a `Po` vector `s1` and a `Po x Po` matrix `s2`. The layout is
//! shared with callers who hand in pre-sized flat buffers, so both
//! [`space_needed`] and the enumeration order are part of the contract.

use serde::{Deserialize, Serialize};

use crate::types::check_bounds;
use crate::{Error, Result};

/// Element counts of the `s0`, `s1` and `s2` buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsLen {
    /// Zeroth moments
    pub s0: usize,
    /// First moments
    pub s1: usize,
    /// Second moments
    pub s2: usize,
}

/// Number of observed channels in pattern `code`.
#[inline]
pub fn observed_count(code: usize) -> usize {
    code.count_ones() as usize
}

/// Binomial coefficient `C(n, m)`, saturating at `usize::MAX`.
pub fn binomial(n: usize, m: usize) -> usize {
    if m > n {
        return 0;
    }
    let m = m.min(n - m);
    let mut c: u128 = 1;
    for i in 0..m {
        // Exact at every step: c * (n - i) is divisible by (i + 1).
        c = c * (n - i) as u128 / (i + 1) as u128;
    }
    usize::try_from(c).unwrap_or(usize::MAX)
}

/// Space required for the sufficient statistics of `p` channels and `k` classes.
///
/// For each subset size `m`, `K * C(P, m)` class blocks of `1`, `m` and `m^2`
/// elements respectively.
pub fn space_needed(p: usize, k: usize) -> StatsLen {
    let mut len = StatsLen { s0: 0, s1: 0, s2: 0 };
    for m in 0..=p {
        let nel = k.saturating_mul(binomial(p, m));
        len.s0 = len.s0.saturating_add(nel);
        len.s1 = len.s1.saturating_add(nel.saturating_mul(m));
        len.s2 = len.s2.saturating_add(nel.saturating_mul(m * m));
    }
    len
}

/// Allocate a zero-filled buffer, reporting allocation failure as an error.
pub fn try_zeroed<T: Clone + Default>(n: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)?;
    v.resize(n, T::default());
    Ok(v)
}

/// Borrowed statistics of one pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternStats<'a> {
    /// Observed channel count
    pub po: usize,
    /// `K` zeroth moments
    pub s0: &'a [f64],
    /// `K * Po` first moments
    pub s1: &'a [f64],
    /// `K * Po * Po` second moments
    pub s2: &'a [f64],
}

impl<'a> PatternStats<'a> {
    /// First moment of class `k`.
    pub fn class_s1(&self, k: usize) -> &'a [f64] {
        &self.s1[self.po * k..self.po * (k + 1)]
    }

    /// Second moment of class `k` (`Po x Po`, column-major).
    pub fn class_s2(&self, k: usize) -> &'a [f64] {
        let pp = self.po * self.po;
        &self.s2[pp * k..pp * (k + 1)]
    }
}

/// Mutable statistics of one pattern.
#[derive(Debug)]
pub struct PatternStatsMut<'a> {
    /// Observed channel count
    pub po: usize,
    /// `K` zeroth moments
    pub s0: &'a mut [f64],
    /// `K * Po` first moments
    pub s1: &'a mut [f64],
    /// `K * Po * Po` second moments
    pub s2: &'a mut [f64],
}

/// Owned arena of per-pattern, per-class sufficient statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficientStatistics {
    n_channels: usize,
    n_classes: usize,
    s0: Vec<f64>,
    s1: Vec<f64>,
    s2: Vec<f64>,
    offsets: Vec<[usize; 3]>,
}

impl SufficientStatistics {
    /// Zero-initialised statistics for `p` channels and `k` classes.
    pub fn try_new(p: usize, k: usize) -> Result<Self> {
        check_bounds(p, k)?;
        let len = space_needed(p, k);
        let n_codes = 1usize << p;

        let mut offsets = Vec::new();
        offsets.try_reserve_exact(n_codes)?;
        let (mut o0, mut o1, mut o2) = (0usize, 0usize, 0usize);
        for code in 0..n_codes {
            let po = observed_count(code);
            offsets.push([o0, o1, o2]);
            o0 += k;
            o1 += k * po;
            o2 += k * po * po;
        }
        debug_assert_eq!((o0, o1, o2), (len.s0, len.s1, len.s2));

        Ok(Self {
            n_channels: p,
            n_classes: k,
            s0: try_zeroed(len.s0)?,
            s1: try_zeroed(len.s1)?,
            s2: try_zeroed(len.s2)?,
            offsets,
        })
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

    /// Buffer lengths of this arena.
    pub fn len(&self) -> StatsLen {
        StatsLen { s0: self.s0.len(), s1: self.s1.len(), s2: self.s2.len() }
    }

    /// `true` when no element is stored (never the case for `K >= 1`).
    pub fn is_empty(&self) -> bool {
        self.s0.is_empty()
    }

    /// Flat zeroth moments.
    pub fn s0(&self) -> &[f64] {
        &self.s0
    }

    /// Flat first moments.
    pub fn s1(&self) -> &[f64] {
        &self.s1
    }

    /// Flat second moments.
    pub fn s2(&self) -> &[f64] {
        &self.s2
    }

    /// Statistics of pattern `code`.
    pub fn pattern(&self, code: usize) -> PatternStats<'_> {
        let po = observed_count(code);
        let k = self.n_classes;
        let [o0, o1, o2] = self.offsets[code];
        PatternStats {
            po,
            s0: &self.s0[o0..o0 + k],
            s1: &self.s1[o1..o1 + k * po],
            s2: &self.s2[o2..o2 + k * po * po],
        }
    }

    /// Mutable statistics of pattern `code`.
    pub fn pattern_mut(&mut self, code: usize) -> PatternStatsMut<'_> {
        let po = observed_count(code);
        let k = self.n_classes;
        let [o0, o1, o2] = self.offsets[code];
        PatternStatsMut {
            po,
            s0: &mut self.s0[o0..o0 + k],
            s1: &mut self.s1[o1..o1 + k * po],
            s2: &mut self.s2[o2..o2 + k * po * po],
        }
    }

    /// Elementwise sum of another partial arena into this one.
    pub fn merge(&mut self, other: &SufficientStatistics) -> Result<()> {
        if self.n_channels != other.n_channels || self.n_classes != other.n_classes {
            return Err(Error::Validation(format!(
                "cannot merge statistics of shape (P={}, K={}) into (P={}, K={})",
                other.n_channels, other.n_classes, self.n_channels, self.n_classes
            )));
        }
        for (a, b) in self.s0.iter_mut().zip(&other.s0) {
            *a += b;
        }
        for (a, b) in self.s1.iter_mut().zip(&other.s1) {
            *a += b;
        }
        for (a, b) in self.s2.iter_mut().zip(&other.s2) {
            *a += b;
        }
        Ok(())
    }

    /// Copy the lower triangle of every `s2` block into its upper triangle.
    pub fn mirror_upper(&mut self) {
        for code in 1..self.n_patterns() {
            let stats = self.pattern_mut(code);
            let po = stats.po;
            for block in stats.s2.chunks_exact_mut(po * po) {
                for j in 0..po {
                    for j1 in j + 1..po {
                        block[j + po * j1] = block[j1 + po * j];
                    }
                }
            }
        }
    }

    /// Total responsibility mass over all patterns and classes.
    pub fn total_mass(&self) -> f64 {
        self.s0.iter().sum()
    }

    /// Copy the arena into caller-owned flat buffers sized by [`space_needed`].
    pub fn copy_into(&self, s0: &mut [f64], s1: &mut [f64], s2: &mut [f64]) -> Result<()> {
        if s0.len() != self.s0.len() || s1.len() != self.s1.len() || s2.len() != self.s2.len() {
            return Err(Error::Validation(format!(
                "statistics buffers must hold ({}, {}, {}) elements, got ({}, {}, {})",
                self.s0.len(),
                self.s1.len(),
                self.s2.len(),
                s0.len(),
                s1.len(),
                s2.len()
            )));
        }
        s0.copy_from_slice(&self.s0);
        s1.copy_from_slice(&self.s1);
        s2.copy_from_slice(&self.s2);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_binomial_small() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(5, 5), 1);
        assert_eq!(binomial(3, 4), 0);
        assert_eq!(binomial(49, 24), 63_205_303_218_876);
    }

    #[test]
    fn test_space_needed_p2() {
        // codes 0..4 have Po = 0, 1, 1, 2
        let len = space_needed(2, 3);
        assert_eq!(len, StatsLen { s0: 12, s1: 12, s2: 18 });
    }

    #[test]
    fn test_single_channel_has_two_patterns() {
        let s = SufficientStatistics::try_new(1, 2).unwrap();
        assert_eq!(s.n_patterns(), 2);
        assert_eq!(s.pattern(0).po, 0);
        assert_eq!(s.pattern(1).po, 1);
        assert_eq!(s.pattern(1).s2.len(), 2);
    }

    #[test]
    fn test_mirror_upper() {
        let mut s = SufficientStatistics::try_new(2, 1).unwrap();
        {
            let st = s.pattern_mut(3);
            st.s2[0] = 1.0;
            st.s2[1] = 5.0;
            st.s2[3] = 2.0;
        }
        s.mirror_upper();
        assert_eq!(s.pattern(3).class_s2(0), &[1.0, 5.0, 5.0, 2.0]);
    }

    #[test]
    fn test_merge_shape_mismatch() {
        let mut a = SufficientStatistics::try_new(2, 2).unwrap();
        let b = SufficientStatistics::try_new(2, 3).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_copy_into_rejects_wrong_sizes() {
        let s = SufficientStatistics::try_new(2, 2).unwrap();
        let mut s0 = vec![0.0; 8];
        let mut s1 = vec![0.0; 8];
        let mut s2 = vec![0.0; 11];
        assert!(s.copy_into(&mut s0, &mut s1, &mut s2).is_err());
    }

    #[test]
    fn test_rejects_too_many_channels() {
        assert!(matches!(SufficientStatistics::try_new(50, 2), Err(Error::Validation(_))));
    }

    proptest! {
        // The closed-form sizing must agree with the per-pattern layout walk.
        #[test]
        fn prop_space_needed_matches_layout(p in 0usize..=10, k in 1usize..=20) {
            let len = space_needed(p, k);
            let s = SufficientStatistics::try_new(p, k).unwrap();
            let (mut n0, mut n1, mut n2) = (0usize, 0usize, 0usize);
            for code in 0..s.n_patterns() {
                let st = s.pattern(code);
                n0 += st.s0.len();
                n1 += st.s1.len();
                n2 += st.s2.len();
            }
            prop_assert_eq!((n0, n1, n2), (len.s0, len.s1, len.s2));
            prop_assert_eq!(s.len(), len);
        }
    }
}
