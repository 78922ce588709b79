//! Conversions between unit quaternions and rotation matrices.
//!
//! Quaternions are nalgebra [`Quaternion`]s, ie, `(w, i, j, k)` with `w` the scalar part. `q` and
//! `-q` describe the same rotation. [`mat_to_quaternion`] always returns the representative with
//! `w ≥ 0`, so comparisons across implementations should compare the rotation matrices instead of
//! the raw components.

use crate::{Matrix3, Quaternion};

/// Rotation matrix of a unit quaternion.
///
/// The quaternion is used as given and is _not_ renormalized; a non-unit quaternion yields a
/// matrix that is not orthonormal.
pub fn quaternion_to_mat(q: &Quaternion) -> Matrix3 {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, xz, yz) = (x * y, x * z, y * z);
    let (wx, wy, wz) = (w * x, w * y, w * z);

    Matrix3::new(
        1. - 2. * (yy + zz),
        2. * (xy - wz),
        2. * (xz + wy),
        2. * (xy + wz),
        1. - 2. * (xx + zz),
        2. * (yz - wx),
        2. * (xz - wy),
        2. * (yz + wx),
        1. - 2. * (xx + yy),
    )
}

/// Unit quaternion of a rotation matrix, with `w ≥ 0`.
///
/// Uses Shepperd's method: the component whose square is largest (picked through the largest of
/// the trace and the three diagonal entries) is computed from a square root, and the other three
/// are divided by it. That component is never smaller than 1/2, which keeps the extraction stable
/// for rotations by π where the scalar part vanishes.
///
/// The matrix is assumed to be a rotation; see [`So3::set_mat`](crate::So3::set_mat) for a
/// validating constructor.
pub fn mat_to_quaternion(r: &Matrix3) -> Quaternion {
    let trace = r.trace();
    let (r00, r11, r22) = (r[(0, 0)], r[(1, 1)], r[(2, 2)]);

    let q = if trace >= r00 && trace >= r11 && trace >= r22 {
        // s = 4w
        let s = 2. * (1. + trace).sqrt();
        Quaternion::new(
            0.25 * s,
            (r[(2, 1)] - r[(1, 2)]) / s,
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(1, 0)] - r[(0, 1)]) / s,
        )
    } else if r00 >= r11 && r00 >= r22 {
        // s = 4x
        let s = 2. * (1. + r00 - r11 - r22).sqrt();
        Quaternion::new(
            (r[(2, 1)] - r[(1, 2)]) / s,
            0.25 * s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
        )
    } else if r11 >= r22 {
        // s = 4y
        let s = 2. * (1. + r11 - r00 - r22).sqrt();
        Quaternion::new(
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            0.25 * s,
            (r[(1, 2)] + r[(2, 1)]) / s,
        )
    } else {
        // s = 4z
        let s = 2. * (1. + r22 - r00 - r11).sqrt();
        Quaternion::new(
            (r[(1, 0)] - r[(0, 1)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
            (r[(1, 2)] + r[(2, 1)]) / s,
            0.25 * s,
        )
    };

    if q.w < 0. {
        -q
    } else {
        q
    }
}
