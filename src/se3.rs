//! The rigid-motion group SE(3).
//!
//! Twists (elements of se(3)) are 6-vectors `[ω, v]`: angular velocity first, then linear
//! velocity. The same ordering is used by [`Se3::adjoint`] and by the 6×6 CMTM.

use crate::error::{Error, Result};
use crate::lie::LieGroup;
use crate::skew::{hat as skew_hat, vee_with_tolerance as skew_vee};
use crate::so3::So3;
use crate::util::{ensure_finite, matrix_from_rows, matrix_to_rows, within, DEFAULT_TOLERANCE};
use crate::{Matrix3, Matrix4, Matrix6, Vector3, Vector6};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Mul, Neg};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this rotation angle the twist Jacobians are evaluated from their Taylor series.
const SERIES_ANGLE: f64 = 1e-2;

/// A rigid motion: a rotation `R` followed by a translation `t`, ie, `x ↦ R·x + t`.
///
/// Its homogeneous form is the 4×4 matrix `[[R, t], [0, 1]]`, and composition with `*` (or
/// [`Se3::compose`]) agrees with the product of those matrices.
///
/// ```
/// # use motion_algebra::{Se3, Vector3};
/// # use std::f64::consts::FRAC_PI_2;
/// let pose = Se3::from_axis_angle_translation(
///     &Vector3::z(),
///     FRAC_PI_2,
///     &Vector3::new(0.5, -0.25, 1.25),
/// )
/// .unwrap();
/// let moved = pose * Vector3::x();
/// assert!((moved - Vector3::new(0.5, 0.75, 1.25)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Parts"))]
pub struct Se3 {
    rotation: So3,
    translation: Vector3,
}

/// Unvalidated serde form of [`Se3`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct Parts {
    rotation: So3,
    translation: Vector3,
}

#[cfg(feature = "serde")]
impl TryFrom<Parts> for Se3 {
    type Error = Error;

    fn try_from(parts: Parts) -> Result<Self> {
        Self::from_parts(parts.rotation, parts.translation)
    }
}

impl Se3 {
    /// Assembles a rigid motion from its rotation and translation.
    ///
    /// Fails with [`Error::NonFinite`] if the translation has a NaN or infinite component.
    pub fn from_parts(rotation: So3, translation: Vector3) -> Result<Self> {
        ensure_finite(translation.iter())?;
        Ok(Self {
            rotation,
            translation,
        })
    }

    /// The identity motion.
    pub fn identity() -> Self {
        Self {
            rotation: So3::eye(),
            translation: Vector3::zeros(),
        }
    }

    /// The identity motion (alias of [`Se3::identity`]).
    pub fn eye() -> Self {
        Self::identity()
    }

    /// Rotation by `angle` about `axis` (see [`So3::from_axis_angle`]), then translation.
    pub fn from_axis_angle_translation(
        axis: &Vector3,
        angle: f64,
        translation: &Vector3,
    ) -> Result<Self> {
        ensure_finite(translation.iter())?;
        Self::from_parts(So3::from_axis_angle(axis, angle)?, *translation)
    }

    /// Constructs a rigid motion from a homogeneous 4×4 matrix.
    ///
    /// Fails with [`Error::NotHomogeneous`] unless the bottom row is `[0, 0, 0, 1]`, and with
    /// [`Error::NotRotation`] unless the upper-left block is a rotation, both to within
    /// [`DEFAULT_TOLERANCE`].
    pub fn from_matrix(matrix: &Matrix4) -> Result<Self> {
        Self::from_matrix_with_tolerance(matrix, DEFAULT_TOLERANCE)
    }

    /// Like [`Se3::from_matrix`], but with an explicit tolerance.
    pub fn from_matrix_with_tolerance(matrix: &Matrix4, tolerance: f64) -> Result<Self> {
        ensure_finite(matrix.iter())?;
        ensure_bottom_row(matrix, [0., 0., 0., 1.], tolerance)?;

        let rotation =
            So3::set_mat_with_tolerance(&matrix.fixed_view::<3, 3>(0, 0).into_owned(), tolerance)?;
        let translation = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        Ok(Self {
            rotation,
            translation,
        })
    }

    /// Constructs a rigid motion from row-major rows of a homogeneous matrix.
    ///
    /// Fails with [`Error::DimensionMismatch`] unless the input is 4×4, then validates like
    /// [`Se3::from_matrix`].
    pub fn from_rows<R>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        Self::from_matrix(&matrix_from_rows::<4, _>(rows)?)
    }

    /// The homogeneous 4×4 matrix `[[R, t], [0, 1]]`.
    pub fn matrix(&self) -> Matrix4 {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation.matrix());
        matrix
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.translation);
        matrix
    }

    /// The homogeneous 4×4 matrix (alias of [`Se3::matrix`]).
    pub fn mat(&self) -> Matrix4 {
        self.matrix()
    }

    /// The homogeneous matrix as row-major nested arrays.
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        matrix_to_rows(&self.matrix())
    }

    pub fn rotation(&self) -> &So3 {
        &self.rotation
    }

    pub fn translation(&self) -> Vector3 {
        self.translation
    }

    /// Composes two motions: `self · other`, ie, `other` is applied first.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation.compose(&other.rotation),
            translation: self.rotation.apply(&other.translation) + self.translation,
        }
    }

    /// The inverse motion `(Rᵀ, -Rᵀ·t)`.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -rotation.apply(&self.translation),
        }
    }

    /// Transforms a point: `R·p + t`.
    pub fn apply(&self, point: &Vector3) -> Vector3 {
        self.rotation.apply(point) + self.translation
    }

    /// Maps a twist `[ω, v]` to its se(3) generator `[[hat(ω), v], [0, 0]]`.
    pub fn hat(twist: &Vector6) -> Matrix4 {
        let (omega, v) = split(twist);
        let mut generator = Matrix4::zeros();
        generator
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&skew_hat(&omega));
        generator.fixed_view_mut::<3, 1>(0, 3).copy_from(&v);
        generator
    }

    /// Recovers the twist of an se(3) generator.
    ///
    /// The upper-left block must be skew-symmetric and the bottom row zero, to within
    /// [`DEFAULT_TOLERANCE`].
    pub fn vee(generator: &Matrix4) -> Result<Vector6> {
        Self::vee_with_tolerance(generator, DEFAULT_TOLERANCE)
    }

    /// Like [`Se3::vee`], but with an explicit tolerance.
    pub fn vee_with_tolerance(generator: &Matrix4, tolerance: f64) -> Result<Vector6> {
        ensure_finite(generator.iter())?;
        ensure_bottom_row(generator, [0.; 4], tolerance)?;

        let omega = skew_vee(&generator.fixed_view::<3, 3>(0, 0).into_owned(), tolerance)?;
        let v = generator.fixed_view::<3, 1>(0, 3).into_owned();
        Ok(join(&omega, &v))
    }

    /// Exponential map from se(3).
    ///
    /// The twist is multiplied by `scale` (1 when `None`) before exponentiation. The rotation is
    /// `exp(ω)` and the translation is `V·v` with the left Jacobian
    /// `V = I + A·hat(ω) + B·hat(ω)²`, `A = (1 - cos θ)/θ²`, `B = (θ - sin θ)/θ³`.
    ///
    /// Fails with [`Error::NonFinite`] if the scaled twist has a NaN or infinite component.
    pub fn exp(twist: &Vector6, scale: Option<f64>) -> Result<Self> {
        let scaled = twist * scale.unwrap_or(1.);
        ensure_finite(scaled.iter())?;

        let (omega, v) = split(&scaled);
        Ok(Self {
            rotation: So3::from_finite_rotation_vector(&omega),
            translation: left_jacobian(&omega) * v,
        })
    }

    /// Logarithm map to se(3), the inverse of [`Se3::exp`] for rotation angles below π.
    pub fn log(&self) -> Vector6 {
        let omega = self.rotation.log();
        let theta = omega.norm();
        let k = skew_hat(&omega);

        let c = if theta < SERIES_ANGLE {
            log::trace!("using series for inverse left Jacobian at angle {theta:e}");
            let theta2 = theta * theta;
            1. / 12. + theta2 / 720. + theta2 * theta2 / 30240.
        } else {
            let half = 0.5 * theta;
            (1. - half * half.cos() / half.sin()) / (theta * theta)
        };
        let inverse_jacobian = Matrix3::identity() - k * 0.5 + k * k * c;

        join(&omega, &(inverse_jacobian * self.translation))
    }

    /// The adjoint action on twists `[ω, v]`: `[[R, 0], [hat(t)·R, R]]`.
    pub fn adjoint(&self) -> Matrix6 {
        let r = self.rotation.matrix();
        let mut adjoint = Matrix6::zeros();
        adjoint.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        adjoint.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
        adjoint
            .fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&(skew_hat(&self.translation) * r));
        adjoint
    }

    /// The adjoint action (alias of [`Se3::adjoint`]).
    pub fn mat_adj(&self) -> Matrix6 {
        self.adjoint()
    }

    /// The adjoint action of the inverse motion.
    pub fn mat_inv_adj(&self) -> Matrix6 {
        self.inverse().adjoint()
    }
}

fn split(twist: &Vector6) -> (Vector3, Vector3) {
    (
        twist.fixed_rows::<3>(0).into_owned(),
        twist.fixed_rows::<3>(3).into_owned(),
    )
}

fn join(omega: &Vector3, v: &Vector3) -> Vector6 {
    Vector6::new(omega.x, omega.y, omega.z, v.x, v.y, v.z)
}

fn ensure_bottom_row(matrix: &Matrix4, expected: [f64; 4], tolerance: f64) -> Result<()> {
    let bottom_row = [
        matrix[(3, 0)],
        matrix[(3, 1)],
        matrix[(3, 2)],
        matrix[(3, 3)],
    ];
    let deviation = bottom_row
        .iter()
        .zip(expected)
        .map(|(actual, expected)| (actual - expected).abs())
        .fold(0., f64::max);

    if within(deviation, tolerance) {
        Ok(())
    } else {
        log::debug!("rejecting 4×4 matrix with bottom row {bottom_row:?}, expected {expected:?}");
        Err(Error::NotHomogeneous { bottom_row })
    }
}

/// `V = I + A·K + B·K²` for `K = hat(ω)`.
fn left_jacobian(omega: &Vector3) -> Matrix3 {
    let theta = omega.norm();
    let k = skew_hat(omega);

    let (a, b) = if theta < SERIES_ANGLE {
        log::trace!("using series for left Jacobian at angle {theta:e}");
        left_jacobian_series(theta)
    } else {
        left_jacobian_closed_form(theta)
    };

    Matrix3::identity() + k * a + k * k * b
}

/// Taylor expansion of the left Jacobian coefficients `(A, B)` about `θ = 0`.
fn left_jacobian_series(theta: f64) -> (f64, f64) {
    let theta2 = theta * theta;
    let theta4 = theta2 * theta2;
    (
        0.5 - theta2 / 24. + theta4 / 720.,
        1. / 6. - theta2 / 120. + theta4 / 5040.,
    )
}

/// The left Jacobian coefficients `(A, B)`; loses precision in `B` as `θ` approaches 0.
fn left_jacobian_closed_form(theta: f64) -> (f64, f64) {
    let theta2 = theta * theta;
    (
        2. * (0.5 * theta).sin().powi(2) / theta2,
        (theta - theta.sin()) / (theta2 * theta),
    )
}

impl Display for Se3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let r = self.rotation.log();
        let t = self.translation;
        write!(
            f,
            "rotation vector: [{:.4}, {:.4}, {:.4}], translation: [{:.4}, {:.4}, {:.4}]",
            r.x, r.y, r.z, t.x, t.y, t.z
        )
    }
}

impl Neg for Se3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.inverse()
    }
}

impl Mul<Se3> for Se3 {
    type Output = Self;

    fn mul(self, rhs: Se3) -> Self::Output {
        self.compose(&rhs)
    }
}

impl Mul<&Se3> for &Se3 {
    type Output = Se3;

    fn mul(self, rhs: &Se3) -> Self::Output {
        self.compose(rhs)
    }
}

impl Mul<Vector3> for Se3 {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Self::Output {
        self.apply(&rhs)
    }
}

impl LieGroup for Se3 {
    type Matrix = Matrix4;

    fn identity() -> Self {
        Se3::identity()
    }

    fn compose(&self, other: &Self) -> Self {
        Se3::compose(self, other)
    }

    fn inverse(&self) -> Self {
        Se3::inverse(self)
    }

    fn to_matrix(&self) -> Self::Matrix {
        self.matrix()
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Se3 {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        Matrix4::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.rotation.abs_diff_eq(&other.rotation, epsilon)
            && self.translation.abs_diff_eq(&other.translation, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Se3 {
    fn default_max_relative() -> Self::Epsilon {
        Matrix4::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.rotation.relative_eq(&other.rotation, epsilon, max_relative)
            && self
                .translation
                .relative_eq(&other.translation, epsilon, max_relative)
    }
}
