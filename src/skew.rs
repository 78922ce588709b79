//! The isomorphism between 3-vectors and 3×3 skew-symmetric generators (the so(3) Lie algebra).
//!
//! [`hat`] maps `v` to the matrix `[v]×` with `[v]× · x = v × x`; [`vee`] recovers `v`.
//! [`hat_commute`] and [`vee_adj`] are the same pair for the opposite commutator ordering, ie,
//! `hat_commute(v) · x = x × v`.

use crate::error::{Error, Result};
use crate::util::{ensure_finite, within, DEFAULT_TOLERANCE};
use crate::{Matrix3, Vector3};

/// Maps a 3-vector to its skew-symmetric generator.
///
/// ```
/// # use motion_algebra::{skew::hat, Vector3};
/// let x = Vector3::x();
/// let y = Vector3::y();
/// assert_eq!(hat(&x) * y, x.cross(&y));
/// ```
pub fn hat(v: &Vector3) -> Matrix3 {
    Matrix3::new(
        0., -v.z, v.y, //
        v.z, 0., -v.x, //
        -v.y, v.x, 0.,
    )
}

/// Recovers the vector that generated a skew-symmetric matrix.
///
/// The matrix must be skew-symmetric to within [`DEFAULT_TOLERANCE`]; see
/// [`vee_with_tolerance`].
pub fn vee(m: &Matrix3) -> Result<Vector3> {
    vee_with_tolerance(m, DEFAULT_TOLERANCE)
}

/// Like [`vee`], but with an explicit bound on the largest entry of `M + Mᵀ`.
pub fn vee_with_tolerance(m: &Matrix3, tolerance: f64) -> Result<Vector3> {
    ensure_finite(m.iter())?;

    let deviation = (m + m.transpose()).amax();
    if !within(deviation, tolerance) {
        log::debug!("rejecting non-skew-symmetric matrix, max |M + Mᵀ| = {deviation:e}");
        return Err(Error::NotSkewSymmetric { deviation });
    }

    Ok(extract(m))
}

/// Generator for the opposite commutator ordering: `-hat(v)`.
pub fn hat_commute(v: &Vector3) -> Matrix3 {
    -hat(v)
}

/// Inverse of [`hat_commute`]: `vee(-M)`, with the same validation as [`vee`].
pub fn vee_adj(m: &Matrix3) -> Result<Vector3> {
    vee(&-m)
}

/// Reads `(M[2][1], M[0][2], M[1][0])` without checking that `m` is skew-symmetric.
///
/// Only for matrices this crate computed itself and that are skew by construction.
pub(crate) fn extract(m: &Matrix3) -> Vector3 {
    Vector3::new(m[(2, 1)], m[(0, 2)], m[(1, 0)])
}
