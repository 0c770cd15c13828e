//! Digamma function.

/// Digamma `psi(z)` for `z > 0`.
///
/// Shifts the argument upward with `psi(z) = psi(z + 1) - 1/z` until `z >= 7`,
/// then evaluates the asymptotic series in `1 / (z - 1/2)`.
pub fn digamma(mut z: f64) -> f64 {
    let mut f = 0.0;
    while z < 7.0 {
        f -= 1.0 / z;
        z += 1.0;
    }
    z -= 0.5;
    let r = 1.0 / z;
    let r2 = r * r;
    let r4 = r2 * r2;
    f + z.ln() + (1.0 / 24.0) * r2 - (7.0 / 960.0) * r4 + (31.0 / 8064.0) * r4 * r2
        - (127.0 / 30720.0) * r4 * r4
}
