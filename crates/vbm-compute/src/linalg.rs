//! Dense symmetric linear algebra for small `n x n` matrices.
//!
//! Matrices are flat slices of length `n * n`. The decomposition reads the
//! triangle `a[i*n + j]` (`j >= i`) and writes the Cholesky factor into the
//! opposite triangle `a[j*n + i]` (`j > i`); its diagonal goes into a separate
//! vector. For symmetric input the storage order (row/column-major) does not
//! matter.

use vbm_core::{Result, try_zeroed};

/// Cholesky decomposition with a diagonal floor.
///
/// Pivots below `(1e-7 * (1e-40 + trace(a)))^2` are raised to that floor, so
/// singular or indefinite input still yields a finite factor.
pub fn cholesky(n: usize, a: &mut [f64], diag: &mut [f64]) {
    let mut floor = 1e-40;
    for i in 0..n {
        floor += a[i * n + i];
    }
    floor *= 1e-7;
    floor *= floor;

    for i in 0..n {
        for j in i..n {
            let mut sm = a[i * n + j];
            for k in (0..i).rev() {
                sm -= a[i * n + k] * a[j * n + k];
            }
            if i == j {
                if sm <= floor {
                    sm = floor;
                }
                diag[i] = sm.sqrt();
            } else {
                a[j * n + i] = sm / diag[i];
            }
        }
    }
}

/// Solve `A x = b` from a factor produced by [`cholesky`].
///
/// `x` holds `b` on entry and the solution on return.
pub fn cholesky_solve(n: usize, a: &[f64], diag: &[f64], x: &mut [f64]) {
    for i in 0..n {
        let mut sm = x[i];
        for k in (0..i).rev() {
            sm -= a[i * n + k] * x[k];
        }
        x[i] = sm / diag[i];
    }
    for i in (0..n).rev() {
        let mut sm = x[i];
        for k in i + 1..n {
            sm -= a[k * n + i] * x[k];
        }
        x[i] = sm / diag[i];
    }
}

/// Invert `w` into `s` and return `-2 * sum(log(diag))`, i.e. `log det(w^-1)`.
///
/// `scratch` must hold at least `n * (n + 1)` elements.
pub fn invert(n: usize, w: &[f64], s: &mut [f64], scratch: &mut [f64]) -> f64 {
    let nn = n * n;
    let (t, rest) = scratch.split_at_mut(nn);
    let diag = &mut rest[..n];
    t.copy_from_slice(&w[..nn]);
    cholesky(n, t, diag);

    let mut ld = 0.0;
    for j in 0..n {
        ld += diag[j].ln();
        let col = &mut s[j * n..(j + 1) * n];
        col.fill(0.0);
        col[j] = 1.0;
        cholesky_solve(n, t, diag, col);
    }
    -2.0 * ld
}

/// Allocating form of [`invert`]: returns `(w^-1, log det(w^-1))`.
pub fn inverse(n: usize, w: &[f64]) -> Result<(Vec<f64>, f64)> {
    let mut s = try_zeroed(n * n)?;
    let mut scratch = try_zeroed(n * (n + 1))?;
    let ld = invert(n, w, &mut s, &mut scratch);
    Ok((s, ld))
}
