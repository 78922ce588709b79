//! The rotation group SO(3).
//!
//! [`So3`] stores exactly one representation, the 3×3 rotation matrix. Quaternion, rotation vector
//! and Euler angle forms are computed from it on demand, so they can never drift apart.

use crate::error::{Error, Result};
use crate::lie::LieGroup;
use crate::quaternion::{mat_to_quaternion, quaternion_to_mat};
use crate::skew::hat;
use crate::util::{ensure_finite, matrix_from_rows, matrix_to_rows, within, DEFAULT_TOLERANCE};
use crate::{Matrix3, Quaternion, Vector3};
use nalgebra::Rotation3;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Mul, Neg};
use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this rotation angle (in the quaternion's vector norm, ie, `sin(θ/2)`), [`So3::log`] uses
/// the first-order form.
const SMALL_HALF_ANGLE_SINE: f64 = 1e-8;

/// A rotation in 3D: an orthonormal 3×3 matrix with determinant +1.
///
/// Rotations compose with `*` (or [`So3::compose`]) using the usual matrix convention, ie,
/// `(a * b).apply(x) == a.apply(b.apply(x))`.
///
/// ```
/// # use motion_algebra::{So3, Vector3};
/// # use std::f64::consts::FRAC_PI_2;
/// let quarter_turn = So3::from_axis_angle(&Vector3::z(), FRAC_PI_2).unwrap();
/// let rotated = quarter_turn.apply(&Vector3::x());
/// assert!((rotated - Vector3::y()).norm() < 1e-12);
/// ```
///
/// <div class="warning">
///
/// With the `serde` feature, rotations serialize as their matrix and deserialize through
/// [`So3::set_mat`], so a document holding a non-rotation fails to deserialize.
///
/// </div>
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Matrix3", into = "Matrix3"))]
pub struct So3 {
    matrix: Matrix3,
}

impl So3 {
    /// The identity rotation.
    pub fn eye() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// The identity rotation (alias of [`So3::eye`]).
    pub fn identity() -> Self {
        Self::eye()
    }

    /// Constructs the rotation by `angle` radians about `axis` using Rodrigues' formula
    /// `R = I + sin(θ)·K + (1 - cos θ)·K²` with `K = hat(axis / |axis|)`.
    ///
    /// `axis` need not be unit length. A zero `angle` yields the identity for any axis. Otherwise
    /// an axis whose largest component is zero or subnormal cannot be normalized and fails with
    /// [`Error::DegenerateAxis`].
    pub fn from_axis_angle(axis: &Vector3, angle: f64) -> Result<Self> {
        ensure_finite(axis.iter().chain([angle].iter()))?;

        if angle == 0. {
            return Ok(Self::eye());
        }

        match unit_axis(axis) {
            Some((unit, _)) => Ok(Self::rodrigues(&unit, angle)),
            None => {
                let norm = axis.norm();
                log::debug!("rejecting rotation axis of norm {norm:e} for angle {angle}");
                Err(Error::DegenerateAxis { norm, angle })
            }
        }
    }

    /// Constructs the rotation whose axis is the direction of `v` and whose angle is `|v|`.
    ///
    /// The zero vector (and any vector too short to carry a direction) is the identity. Fails
    /// with [`Error::NonFinite`] if any component is NaN or infinite.
    pub fn from_rotation_vector(v: &Vector3) -> Result<Self> {
        ensure_finite(v.iter())?;
        Ok(Self::from_finite_rotation_vector(v))
    }

    /// [`So3::from_rotation_vector`] for a vector already known to be finite.
    pub(crate) fn from_finite_rotation_vector(v: &Vector3) -> Self {
        match unit_axis(v) {
            Some((unit, angle)) => Self::rodrigues(&unit, angle),
            None => {
                log::trace!("rotation vector {v:?} has no direction, using identity");
                Self::eye()
            }
        }
    }

    /// Exponential map from so(3).
    ///
    /// With `Some(angle)`, `v` is an axis (normalized internally) and this is exactly
    /// [`So3::from_axis_angle`]. With `None`, `v` is a rotation vector whose norm is the angle,
    /// and this is exactly [`So3::from_rotation_vector`].
    pub fn exp(v: &Vector3, angle: Option<f64>) -> Result<Self> {
        match angle {
            Some(angle) => Self::from_axis_angle(v, angle),
            None => Self::from_rotation_vector(v),
        }
    }

    /// Logarithm map to so(3): the rotation vector with angle in `[0, π]`.
    ///
    /// Goes through the quaternion so that both the small-angle limit and the angle π (where
    /// `sin θ` vanishes) stay well conditioned.
    pub fn log(&self) -> Vector3 {
        let q = self.quaternion();
        let v = q.imag();
        let half_sine = v.norm();

        if half_sine < SMALL_HALF_ANGLE_SINE {
            // θ/sin(θ/2) -> 2/cos(θ/2) as θ -> 0; w ≥ 0 so w is close to 1 here
            v * (2. / q.w)
        } else {
            v * (2. * half_sine.atan2(q.w) / half_sine)
        }
    }

    /// Constructs a rotation from `[roll, pitch, yaw]` in radians.
    ///
    /// The convention is fixed to `R = Rz(yaw) · Ry(pitch) · Rx(roll)`, ie, extrinsic rotations
    /// about X, then Y, then Z (equivalently, intrinsic Z-Y'-X'' Tait-Bryan angles). This is the
    /// same convention as [`nalgebra::Rotation3::from_euler_angles`]. At a pitch of ±π/2 roll and
    /// yaw act about the same axis (gimbal lock); this is not special-cased. Non-finite angles
    /// fail with [`Error::NonFinite`].
    pub fn from_euler(angles: [f64; 3]) -> Result<Self> {
        ensure_finite(angles.iter())?;
        let [roll, pitch, yaw] = angles;
        Ok(Self::rodrigues(&Vector3::z(), yaw)
            * Self::rodrigues(&Vector3::y(), pitch)
            * Self::rodrigues(&Vector3::x(), roll))
    }

    /// The `[roll, pitch, yaw]` angles in radians that [`So3::from_euler`] maps to this rotation.
    ///
    /// Pitch is in `[-π/2, π/2]`, roll and yaw in `(-π, π]`.
    pub fn to_euler(&self) -> [f64; 3] {
        let (roll, pitch, yaw) = Rotation3::from_matrix_unchecked(self.matrix).euler_angles();
        [roll, pitch, yaw]
    }

    /// Constructs a rotation from intrinsic yaw, pitch, and roll Tait-Bryan angles.
    ///
    /// Yaw is about Z, pitch about the Y axis after yaw, and roll about the X axis after yaw and
    /// pitch. This is the same rotation as [`So3::from_euler`] with `[roll, pitch, yaw]`.
    #[doc(alias = "from_ypr")]
    pub fn from_tait_bryan_angles(
        yaw: impl Into<Angle>,
        pitch: impl Into<Angle>,
        roll: impl Into<Angle>,
    ) -> Result<Self> {
        Self::from_euler([
            roll.into().get::<radian>(),
            pitch.into().get::<radian>(),
            yaw.into().get::<radian>(),
        ])
    }

    /// The `(yaw, pitch, roll)` angles that [`So3::from_tait_bryan_angles`] maps to this rotation.
    pub fn to_tait_bryan_angles(&self) -> (Angle, Angle, Angle) {
        let [roll, pitch, yaw] = self.to_euler();
        (
            Angle::new::<radian>(yaw),
            Angle::new::<radian>(pitch),
            Angle::new::<radian>(roll),
        )
    }

    /// Constructs a rotation from an existing rotation matrix.
    ///
    /// Fails with [`Error::NotRotation`] unless `R·Rᵀ = I` and `det R = 1` to within
    /// [`DEFAULT_TOLERANCE`]. The matrix is stored as given.
    pub fn set_mat(matrix: &Matrix3) -> Result<Self> {
        Self::set_mat_with_tolerance(matrix, DEFAULT_TOLERANCE)
    }

    /// Like [`So3::set_mat`], but with an explicit tolerance.
    pub fn set_mat_with_tolerance(matrix: &Matrix3, tolerance: f64) -> Result<Self> {
        ensure_finite(matrix.iter())?;

        let orthonormality = (matrix * matrix.transpose() - Matrix3::identity()).amax();
        let determinant = matrix.determinant();
        if !within(orthonormality, tolerance) || !within((determinant - 1.).abs(), tolerance) {
            log::debug!(
                "rejecting non-rotation matrix, max |R·Rᵀ - I| = {orthonormality:e}, det = {determinant}"
            );
            return Err(Error::NotRotation {
                orthonormality,
                determinant,
            });
        }

        Ok(Self { matrix: *matrix })
    }

    /// Constructs a rotation from a unit quaternion `(w, i, j, k)`.
    ///
    /// Fails with [`Error::NotUnitQuaternion`] unless the norm is 1 to within
    /// [`DEFAULT_TOLERANCE`]. The accepted quaternion is renormalized before conversion.
    pub fn set_quaternion(q: &Quaternion) -> Result<Self> {
        Self::set_quaternion_with_tolerance(q, DEFAULT_TOLERANCE)
    }

    /// Like [`So3::set_quaternion`], but with an explicit tolerance.
    pub fn set_quaternion_with_tolerance(q: &Quaternion, tolerance: f64) -> Result<Self> {
        ensure_finite(q.coords.iter())?;

        let norm = q.norm();
        if !within((norm - 1.).abs(), tolerance) {
            log::debug!("rejecting quaternion of norm {norm}");
            return Err(Error::NotUnitQuaternion { norm });
        }

        Ok(Self {
            matrix: quaternion_to_mat(&q.normalize()),
        })
    }

    /// Constructs a rotation from row-major rows, eg, `&[[f64; 3]; 3]` or `&[Vec<f64>]`.
    ///
    /// Fails with [`Error::DimensionMismatch`] unless the input is 3×3, then validates like
    /// [`So3::set_mat`].
    pub fn from_rows<R>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        Self::set_mat(&matrix_from_rows::<3, _>(rows)?)
    }

    /// The 3×3 rotation matrix.
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// The 3×3 rotation matrix (alias of [`So3::matrix`]).
    pub fn mat(&self) -> Matrix3 {
        self.matrix
    }

    /// The rotation matrix as row-major nested arrays.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        matrix_to_rows(&self.matrix)
    }

    /// The inverse rotation, ie, the transpose.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// The matrix of the inverse rotation.
    pub fn mat_inv(&self) -> Matrix3 {
        self.inverse().matrix()
    }

    /// The adjoint action on so(3), which for a rotation is the rotation matrix itself.
    pub fn mat_adj(&self) -> Matrix3 {
        self.matrix
    }

    /// The adjoint action of the inverse rotation.
    pub fn mat_inv_adj(&self) -> Matrix3 {
        self.inverse().mat_adj()
    }

    /// Composes two rotations: `self · other`. The same operation as `*`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Rotates a vector: `R · v`.
    pub fn apply(&self, v: &Vector3) -> Vector3 {
        self.matrix * v
    }

    /// The unit quaternion of this rotation, with non-negative scalar part.
    pub fn quaternion(&self) -> Quaternion {
        mat_to_quaternion(&self.matrix)
    }

    /// Rodrigues' formula for a unit axis.
    fn rodrigues(unit_axis: &Vector3, angle: f64) -> Self {
        let k = hat(unit_axis);
        // 1 - cos θ without the cancellation near θ = 0
        let versine = 2. * (0.5 * angle).sin().powi(2);
        Self {
            matrix: Matrix3::identity() + k * angle.sin() + k * k * versine,
        }
    }
}

/// The normalized direction and length of `v`, or `None` if `v` is too short to normalize.
///
/// `v` is scaled by its largest component first so that neither the norm nor the direction
/// over- or underflow.
fn unit_axis(v: &Vector3) -> Option<(Vector3, f64)> {
    let scale = v.amax();
    if !(scale >= f64::MIN_POSITIVE) {
        return None;
    }

    let scaled = v / scale;
    let norm = scaled.norm();
    Some((scaled / norm, norm * scale))
}

impl Default for So3 {
    fn default() -> Self {
        Self::eye()
    }
}

impl TryFrom<Matrix3> for So3 {
    type Error = Error;

    fn try_from(matrix: Matrix3) -> Result<Self> {
        Self::set_mat(&matrix)
    }
}

impl From<So3> for Matrix3 {
    fn from(rotation: So3) -> Self {
        rotation.matrix
    }
}

impl Display for So3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let q = self.quaternion();
        write!(
            f,
            "Quaternion: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}]",
            q.w, q.i, q.j, q.k
        )
    }
}

impl Neg for So3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.inverse()
    }
}

impl Mul<So3> for So3 {
    type Output = Self;

    fn mul(self, rhs: So3) -> Self::Output {
        self.compose(&rhs)
    }
}

impl Mul<&So3> for &So3 {
    type Output = So3;

    fn mul(self, rhs: &So3) -> Self::Output {
        self.compose(rhs)
    }
}

impl Mul<Vector3> for So3 {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Self::Output {
        self.apply(&rhs)
    }
}

impl LieGroup for So3 {
    type Matrix = Matrix3;

    fn identity() -> Self {
        So3::eye()
    }

    fn compose(&self, other: &Self) -> Self {
        So3::compose(self, other)
    }

    fn inverse(&self) -> Self {
        So3::inverse(self)
    }

    fn to_matrix(&self) -> Self::Matrix {
        self.matrix
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for So3 {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        Matrix3::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.matrix.abs_diff_eq(&other.matrix, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for So3 {
    fn default_max_relative() -> Self::Epsilon {
        Matrix3::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.matrix.relative_eq(&other.matrix, epsilon, max_relative)
    }
}
