//! Compounded motion-tangent maps (CMTM).
//!
//! A CMTM transforms tangent vectors (angular velocities for [`RotationalCmtm`], twists
//! `[ω, v]` for [`Cmtm`]) between frames consistently with a rotation or rigid motion. Its base
//! matrix is the adjoint of the generating group element, so
//! `Cmtm::from_se3(a) * Cmtm::from_se3(b)` is `Cmtm::from_se3(a * b)`.
//!
//! A CMTM may additionally carry the time derivatives `ξ, ξ', …` of the body velocity of a moving
//! frame. It then also transforms the time derivatives of tangent vectors: the block matrix
//! returned by [`GenericCmtm::block_matrix`] maps the stacked vector `[x, x', x''/2!, …]` of one
//! frame to that of the other.

use crate::error::{Error, Result};
use crate::lie::LieGroup;
use crate::se3::Se3;
use crate::skew::{extract, hat};
use crate::so3::So3;
use crate::util::ensure_finite;
use crate::{Matrix3, Matrix6, Vector3, Vector6};
use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Mul;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

/// A CMTM over `DIM`-dimensional tangent vectors.
///
/// Only `DIM = 3` ([`RotationalCmtm`]) and `DIM = 6` ([`Cmtm`]) have a [`TangentAlgebra`], and
/// therefore composition, inversion, and block matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericCmtm<const DIM: usize> {
    matrix: SMatrix<f64, DIM, DIM>,
    /// `derivatives[i]` is the `i`-th time derivative of the body velocity.
    derivatives: Vec<SVector<f64, DIM>>,
}

/// CMTM of a rigid motion, acting on twists `[ω, v]`.
pub type Cmtm = GenericCmtm<6>;

/// CMTM of a rotation, acting on angular velocities.
pub type RotationalCmtm = GenericCmtm<3>;

/// The Lie algebra structure a CMTM needs from its tangent space.
pub trait TangentAlgebra<const DIM: usize> {
    /// The generator `ad(ξ)` of the adjoint action for a tangent vector `ξ`.
    fn tangent_hat(v: &SVector<f64, DIM>) -> SMatrix<f64, DIM, DIM>;

    /// Reads back `ξ` from `ad(ξ)`, without validation.
    fn tangent_vee(m: &SMatrix<f64, DIM, DIM>) -> SVector<f64, DIM>;

    /// Inverse of a base matrix, using its adjoint structure.
    fn invert_base(m: &SMatrix<f64, DIM, DIM>) -> SMatrix<f64, DIM, DIM>;
}

impl TangentAlgebra<3> for RotationalCmtm {
    fn tangent_hat(v: &Vector3) -> Matrix3 {
        hat(v)
    }

    fn tangent_vee(m: &Matrix3) -> Vector3 {
        extract(m)
    }

    fn invert_base(m: &Matrix3) -> Matrix3 {
        m.transpose()
    }
}

impl TangentAlgebra<6> for Cmtm {
    /// `[[hat(ω), 0], [hat(v), hat(ω)]]`.
    fn tangent_hat(v: &Vector6) -> Matrix6 {
        let omega_hat = hat(&v.fixed_rows::<3>(0).into_owned());
        let v_hat = hat(&v.fixed_rows::<3>(3).into_owned());

        let mut m = Matrix6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&omega_hat);
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&omega_hat);
        m.fixed_view_mut::<3, 3>(3, 0).copy_from(&v_hat);
        m
    }

    fn tangent_vee(m: &Matrix6) -> Vector6 {
        let omega = extract(&m.fixed_view::<3, 3>(0, 0).into_owned());
        let v = extract(&m.fixed_view::<3, 3>(3, 0).into_owned());
        Vector6::new(omega.x, omega.y, omega.z, v.x, v.y, v.z)
    }

    /// `[[R, 0], [S, R]]⁻¹ = [[Rᵀ, 0], [-Rᵀ·S·Rᵀ, Rᵀ]]`.
    fn invert_base(m: &Matrix6) -> Matrix6 {
        let rt = m.fixed_view::<3, 3>(0, 0).transpose();
        let s = m.fixed_view::<3, 3>(3, 0).into_owned();

        let mut inverse = Matrix6::zeros();
        inverse.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
        inverse.fixed_view_mut::<3, 3>(3, 3).copy_from(&rt);
        inverse
            .fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&(-rt * s * rt));
        inverse
    }
}

impl<const DIM: usize> GenericCmtm<DIM> {
    /// The identity map, carrying no derivatives.
    pub fn identity() -> Self {
        Self {
            matrix: SMatrix::identity(),
            derivatives: Vec::new(),
        }
    }

    /// The base matrix, ie, the adjoint of the generating group element.
    pub fn matrix(&self) -> SMatrix<f64, DIM, DIM> {
        self.matrix
    }

    /// The base matrix (alias of [`GenericCmtm::matrix`]).
    pub fn mat(&self) -> SMatrix<f64, DIM, DIM> {
        self.matrix
    }

    /// The body velocity derivatives this map carries.
    pub fn derivatives(&self) -> &[SVector<f64, DIM>] {
        &self.derivatives
    }

    /// The highest order a block matrix can be built for: `derivatives().len() + 1`.
    pub fn order(&self) -> usize {
        self.derivatives.len() + 1
    }

    /// Transforms a tangent vector with the base matrix.
    pub fn apply(&self, x: &SVector<f64, DIM>) -> SVector<f64, DIM> {
        self.matrix * x
    }

    fn checked_order(&self, order: Option<usize>) -> Result<usize> {
        match order {
            None => Ok(self.order()),
            Some(requested) if requested == 0 || requested > self.order() => {
                log::debug!(
                    "rejecting block matrix of order {requested}, available 1..={}",
                    self.order()
                );
                Err(Error::InvalidOrder {
                    requested,
                    available: self.order(),
                })
            }
            Some(requested) => Ok(requested),
        }
    }
}

impl<const DIM: usize> GenericCmtm<DIM>
where
    Self: TangentAlgebra<DIM>,
{
    /// A map with base matrix `matrix` carrying the given derivatives.
    fn with_derivatives(
        matrix: SMatrix<f64, DIM, DIM>,
        derivatives: Vec<SVector<f64, DIM>>,
    ) -> Self {
        Self {
            matrix,
            derivatives,
        }
    }

    /// The series blocks `M_0, …, M_{order-1}` with
    /// `M_p = (1/p) Σ_{i<p} M_{p-1-i} · ad(ξ^(i) / i!)`.
    ///
    /// Derivatives beyond those this map carries count as zero, so `order` may exceed
    /// [`GenericCmtm::order`].
    fn series(&self, order: usize) -> Vec<SMatrix<f64, DIM, DIM>> {
        let generators: Vec<_> = (0..order.saturating_sub(1))
            .map(|i| match self.derivatives.get(i) {
                Some(d) => Self::tangent_hat(&(d / factorial(i))),
                None => SMatrix::zeros(),
            })
            .collect();

        let mut blocks = Vec::with_capacity(order);
        blocks.push(self.matrix);
        for p in 1..order {
            let sum = (0..p).fold(SMatrix::<f64, DIM, DIM>::zeros(), |acc, i| {
                acc + blocks[p - 1 - i] * generators[i]
            });
            blocks.push(sum / p as f64);
        }
        blocks
    }

    /// Recovers the map whose series is `blocks`, inverting the recursion in
    /// [`GenericCmtm::series`] one derivative at a time.
    fn from_series(blocks: &[SMatrix<f64, DIM, DIM>]) -> Self {
        let base = blocks[0];
        let base_inverse = Self::invert_base(&base);

        let mut generators: Vec<SMatrix<f64, DIM, DIM>> = Vec::with_capacity(blocks.len());
        for p in 1..blocks.len() {
            // p·M_p = Σ_{i<p} M_{p-1-i} · G_i, solved for G_{p-1}
            let known = (0..p - 1).fold(SMatrix::<f64, DIM, DIM>::zeros(), |acc, i| {
                acc + blocks[p - 1 - i] * generators[i]
            });
            generators.push(base_inverse * (blocks[p] * p as f64 - known));
        }

        let derivatives = generators
            .iter()
            .enumerate()
            .map(|(i, g)| Self::tangent_vee(g) * factorial(i))
            .collect();

        Self::with_derivatives(base, derivatives)
    }

    /// Composes two maps: `self · other`.
    ///
    /// The base matrices multiply. With derivatives, the series multiply as a Cauchy product
    /// `C_p = Σ_{i≤p} A_i · B_{p-i}` up to the larger of the two orders, with the shorter
    /// operand's missing derivatives taken as zero, and the derivatives of the result are
    /// recovered from that product. The result therefore carries the derivatives of the composed
    /// motion, which are not the order-wise sums of the operands' derivatives.
    ///
    /// For operands of equal order, `block(a * b) == block(a) · block(b)`. For unequal orders the
    /// same holds once the shorter operand is padded with zero derivatives.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        if self.derivatives.is_empty() && other.derivatives.is_empty() {
            return Self::with_derivatives(self.matrix * other.matrix, Vec::new());
        }

        let order = self.order().max(other.order());
        let a = self.series(order);
        let b = other.series(order);
        let product: Vec<_> = (0..order)
            .map(|p| {
                (0..=p).fold(SMatrix::<f64, DIM, DIM>::zeros(), |acc, i| {
                    acc + a[i] * b[p - i]
                })
            })
            .collect();

        Self::from_series(&product)
    }

    /// The inverse map, including derivatives, such that `block(a) · block(a⁻¹) == I`.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let base_inverse = Self::invert_base(&self.matrix);
        if self.derivatives.is_empty() {
            return Self::with_derivatives(base_inverse, Vec::new());
        }

        let blocks = self.series(self.order());
        let mut inverse = Vec::with_capacity(blocks.len());
        inverse.push(base_inverse);
        for p in 1..blocks.len() {
            let sum = (1..=p).fold(SMatrix::<f64, DIM, DIM>::zeros(), |acc, i| {
                acc + blocks[i] * inverse[p - i]
            });
            inverse.push(-(base_inverse * sum));
        }

        Self::from_series(&inverse)
    }

    /// The lower block-triangular Toeplitz matrix with `M_0, …, M_{order-1}` on its block
    /// diagonals, of size `DIM·order`.
    ///
    /// `None` builds the full order. Fails with [`Error::InvalidOrder`] for order 0 or above
    /// [`GenericCmtm::order`].
    pub fn block_matrix(&self, order: Option<usize>) -> Result<DMatrix<f64>> {
        let order = self.checked_order(order)?;
        let blocks = self.series(order);

        let mut matrix = DMatrix::zeros(DIM * order, DIM * order);
        for row in 0..order {
            for col in 0..=row {
                matrix
                    .view_mut((row * DIM, col * DIM), (DIM, DIM))
                    .copy_from(&blocks[row - col]);
            }
        }
        Ok(matrix)
    }

    /// Transforms a stacked vector `[x, x', x''/2!, …]` with the full block matrix.
    ///
    /// Fails with [`Error::DimensionMismatch`] unless `x` has `DIM · order()` entries.
    pub fn apply_block(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        let expected = DIM * self.order();
        if x.len() != expected {
            log::debug!("rejecting stacked vector of length {}, expected {expected}", x.len());
            return Err(Error::DimensionMismatch {
                expected,
                actual: x.len(),
            });
        }

        Ok(self.block_matrix(None)? * x)
    }
}

impl RotationalCmtm {
    /// The map of a rotation, ie, the rotation matrix acting on angular velocities.
    pub fn from_so3(rotation: &So3) -> Self {
        Self::with_derivatives(rotation.matrix(), Vec::new())
    }

    /// Like [`RotationalCmtm::from_so3`], carrying angular velocity derivatives
    /// `ω, ω', …`. Fails with [`Error::NonFinite`] if any derivative has a NaN or infinite
    /// component.
    pub fn from_so3_with_derivatives(rotation: &So3, derivatives: Vec<Vector3>) -> Result<Self> {
        ensure_finite(derivatives.iter().flat_map(|d| d.iter()))?;
        Ok(Self::with_derivatives(rotation.matrix(), derivatives))
    }
}

impl Cmtm {
    /// The map of a rigid motion, ie, its adjoint `[[R, 0], [hat(t)·R, R]]`.
    pub fn from_se3(transform: &Se3) -> Self {
        Self::with_derivatives(transform.adjoint(), Vec::new())
    }

    /// Like [`Cmtm::from_se3`], carrying twist derivatives `ξ, ξ', …`. Fails with
    /// [`Error::NonFinite`] if any derivative has a NaN or infinite component.
    pub fn from_se3_with_derivatives(transform: &Se3, derivatives: Vec<Vector6>) -> Result<Self> {
        ensure_finite(derivatives.iter().flat_map(|d| d.iter()))?;
        Ok(Self::with_derivatives(transform.adjoint(), derivatives))
    }
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

impl<const DIM: usize> Default for GenericCmtm<DIM> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<const DIM: usize> Display for GenericCmtm<DIM> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CMTM of order {} with base matrix:{}", self.order(), self.matrix)
    }
}

impl<const DIM: usize> Mul<GenericCmtm<DIM>> for GenericCmtm<DIM>
where
    GenericCmtm<DIM>: TangentAlgebra<DIM>,
{
    type Output = Self;

    fn mul(self, rhs: GenericCmtm<DIM>) -> Self::Output {
        self.compose(&rhs)
    }
}

impl<const DIM: usize> Mul<&GenericCmtm<DIM>> for GenericCmtm<DIM>
where
    GenericCmtm<DIM>: TangentAlgebra<DIM>,
{
    type Output = Self;

    fn mul(self, rhs: &GenericCmtm<DIM>) -> Self::Output {
        self.compose(rhs)
    }
}

impl<const DIM: usize> Mul<GenericCmtm<DIM>> for &GenericCmtm<DIM>
where
    GenericCmtm<DIM>: TangentAlgebra<DIM>,
{
    type Output = GenericCmtm<DIM>;

    fn mul(self, rhs: GenericCmtm<DIM>) -> Self::Output {
        self.compose(&rhs)
    }
}

impl<const DIM: usize> Mul<&GenericCmtm<DIM>> for &GenericCmtm<DIM>
where
    GenericCmtm<DIM>: TangentAlgebra<DIM>,
{
    type Output = GenericCmtm<DIM>;

    fn mul(self, rhs: &GenericCmtm<DIM>) -> Self::Output {
        self.compose(rhs)
    }
}

impl<const DIM: usize> LieGroup for GenericCmtm<DIM>
where
    Self: TangentAlgebra<DIM>,
{
    type Matrix = SMatrix<f64, DIM, DIM>;

    fn identity() -> Self {
        GenericCmtm::identity()
    }

    fn compose(&self, other: &Self) -> Self {
        GenericCmtm::compose(self, other)
    }

    fn inverse(&self) -> Self {
        GenericCmtm::inverse(self)
    }

    fn to_matrix(&self) -> Self::Matrix {
        self.matrix
    }
}

#[cfg(any(test, feature = "approx"))]
impl<const DIM: usize> AbsDiffEq<Self> for GenericCmtm<DIM> {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.derivatives.len() == other.derivatives.len()
            && self.matrix.abs_diff_eq(&other.matrix, epsilon)
            && self
                .derivatives
                .iter()
                .zip(&other.derivatives)
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

#[cfg(any(test, feature = "approx"))]
impl<const DIM: usize> RelativeEq for GenericCmtm<DIM> {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.derivatives.len() == other.derivatives.len()
            && self.matrix.relative_eq(&other.matrix, epsilon, max_relative)
            && self
                .derivatives
                .iter()
                .zip(&other.derivatives)
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

#[cfg(test)]
mod tests {
    use super::{Cmtm, GenericCmtm, RotationalCmtm, TangentAlgebra};
    use crate::error::Error;
    use crate::se3::Se3;
    use crate::so3::tests::bounded;
    use crate::so3::So3;
    use crate::{Matrix6, Vector3, Vector6};
    use approx::assert_abs_diff_eq;
    use nalgebra::{DMatrix, DVector, SVector};
    use quickcheck::{quickcheck, Arbitrary, Gen};
    use rstest::rstest;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};

    fn any_twist(g: &mut Gen) -> Vector6 {
        Vector6::from_fn(|_, _| bounded(g, 1.))
    }

    impl Arbitrary for Cmtm {
        fn arbitrary(g: &mut Gen) -> Self {
            let n = usize::arbitrary(g) % 4;
            let derivatives = (0..n).map(|_| any_twist(g)).collect();
            Cmtm::from_se3_with_derivatives(&Se3::arbitrary(g), derivatives).unwrap()
        }
    }

    /// The same map with zero derivatives appended up to `order`.
    fn padded<const DIM: usize>(cmtm: &GenericCmtm<DIM>, order: usize) -> GenericCmtm<DIM> {
        let mut derivatives = cmtm.derivatives().to_vec();
        derivatives.resize(order.max(cmtm.order()) - 1, SVector::zeros());
        GenericCmtm {
            matrix: cmtm.matrix(),
            derivatives,
        }
    }

    fn pose() -> Se3 {
        Se3::from_axis_angle_translation(&Vector3::z(), FRAC_PI_2, &Vector3::new(0.5, -0.25, 1.25))
            .unwrap()
    }

    fn other_pose() -> Se3 {
        Se3::from_axis_angle_translation(&Vector3::y(), -FRAC_PI_6, &Vector3::new(-1., 2., 0.3))
            .unwrap()
    }

    fn xi() -> Vector6 {
        Vector6::new(0.1, -0.2, 0.3, 1., 0.5, -0.25)
    }

    fn xi_dot() -> Vector6 {
        Vector6::new(-0.05, 0.4, 0.1, 0.2, -0.3, 0.6)
    }

    fn ad(v: &Vector6) -> Matrix6 {
        Cmtm::tangent_hat(v)
    }

    #[test]
    fn base_matrix_is_adjoint() {
        let a = pose();
        let cmtm = Cmtm::from_se3(&a);
        assert_eq!(cmtm.matrix(), a.adjoint());
        assert_eq!(cmtm.mat(), a.adjoint());
        assert_eq!(cmtm.order(), 1);
        assert!(cmtm.derivatives().is_empty());
    }

    #[test]
    fn composition_is_homomorphic() {
        let (a, b) = (pose(), other_pose());
        let composed = Cmtm::from_se3(&a).compose(&Cmtm::from_se3(&b));
        assert_abs_diff_eq!(
            composed.matrix(),
            Cmtm::from_se3(&a.compose(&b)).matrix(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn mul_matches_compose() {
        let a = Cmtm::from_se3_with_derivatives(&pose(), vec![xi()]).unwrap();
        let b = Cmtm::from_se3(&other_pose());
        let composed = a.compose(&b);
        assert_eq!(&a * &b, composed);
        assert_eq!(&a * b.clone(), composed);
        assert_eq!(a.clone() * &b, composed);
        assert_eq!(a * b, composed);
    }

    #[test]
    fn rotational_cmtm_is_rotation() {
        let r = So3::from_euler([0.3, -0.2, 1.]).unwrap();
        let cmtm = RotationalCmtm::from_so3(&r);
        assert_eq!(cmtm.matrix(), r.matrix());
        assert_eq!(cmtm.apply(&Vector3::x()), r.apply(&Vector3::x()));
        assert_abs_diff_eq!(
            cmtm.inverse().matrix(),
            r.inverse().matrix(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn apply_transforms_twists_like_adjoint() {
        let a = pose();
        let cmtm = Cmtm::from_se3(&a);
        assert_eq!(cmtm.apply(&xi()), a.adjoint() * xi());
    }

    #[test]
    fn identity_has_no_derivatives() {
        let eye = Cmtm::identity();
        assert_eq!(eye.matrix(), Matrix6::identity());
        assert_eq!(eye.order(), 1);
        assert_eq!(eye.compose(&eye), eye);
        assert_eq!(Cmtm::default(), eye);
    }

    #[test]
    fn order_two_block_matrix() {
        let a = pose();
        let cmtm = Cmtm::from_se3_with_derivatives(&a, vec![xi()]).unwrap();
        let r = a.adjoint();

        let block = cmtm.block_matrix(None).unwrap();
        assert_eq!(block.shape(), (12, 12));
        assert_abs_diff_eq!(
            block.view((0, 0), (6, 6)).into_owned(),
            DMatrix::from_column_slice(6, 6, r.as_slice()),
            epsilon = 1e-15
        );
        assert_eq!(block.view((0, 6), (6, 6)).amax(), 0.);
        assert_abs_diff_eq!(
            block.view((6, 0), (6, 6)).into_owned(),
            DMatrix::from_column_slice(6, 6, (r * ad(&xi())).as_slice()),
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(
            block.view((6, 6), (6, 6)).into_owned(),
            DMatrix::from_column_slice(6, 6, r.as_slice()),
            epsilon = 1e-15
        );
    }

    #[test]
    fn order_three_block_matrix() {
        let a = pose();
        let cmtm = Cmtm::from_se3_with_derivatives(&a, vec![xi(), xi_dot()]).unwrap();
        let r = a.adjoint();
        let m2 = r * (ad(&xi_dot()) + ad(&xi()) * ad(&xi())) / 2.;

        let block = cmtm.block_matrix(None).unwrap();
        assert_eq!(block.shape(), (18, 18));
        assert_abs_diff_eq!(
            block.view((12, 0), (6, 6)).into_owned(),
            DMatrix::from_column_slice(6, 6, m2.as_slice()),
            epsilon = 1e-14
        );
        assert_abs_diff_eq!(
            block.view((12, 6), (6, 6)).into_owned(),
            DMatrix::from_column_slice(6, 6, (r * ad(&xi())).as_slice()),
            epsilon = 1e-14
        );

        let truncated = cmtm.block_matrix(Some(2)).unwrap();
        assert_eq!(truncated, block.view((0, 0), (12, 12)).into_owned());
    }

    #[rstest]
    #[case(Some(0), 0)]
    #[case(Some(3), 3)]
    #[case(Some(10), 10)]
    fn block_matrix_rejects_unavailable_order(
        #[case] order: Option<usize>,
        #[case] requested: usize,
    ) {
        let cmtm = Cmtm::from_se3_with_derivatives(&pose(), vec![xi()]).unwrap();
        assert_eq!(
            cmtm.block_matrix(order),
            Err(Error::InvalidOrder {
                requested,
                available: 2
            })
        );
    }

    #[test]
    fn tangent_generator_is_adjoint_of_twist() {
        // ad(ξ)·η is the Lie bracket [ξ, η] of twists
        let (x, y) = (xi(), xi_dot());
        let bracket = Se3::hat(&x) * Se3::hat(&y) - Se3::hat(&y) * Se3::hat(&x);
        assert_abs_diff_eq!(
            Se3::vee_with_tolerance(&bracket, 1e-12).unwrap(),
            ad(&x) * y,
            epsilon = 1e-14
        );
        assert_eq!(Cmtm::tangent_vee(&ad(&x)), x);
    }

    #[test]
    fn rotational_generator_is_hat() {
        let w = Vector3::new(0.3, -0.1, 0.7);
        assert_eq!(RotationalCmtm::tangent_hat(&w), crate::skew::hat(&w));
        assert_eq!(RotationalCmtm::tangent_vee(&crate::skew::hat(&w)), w);
    }

    #[test]
    fn closed_form_base_inverse() {
        let m = pose().adjoint();
        assert_abs_diff_eq!(
            Cmtm::invert_base(&m),
            m.try_inverse().unwrap(),
            epsilon = 1e-12
        );
        let r = other_pose().rotation().matrix();
        assert_eq!(RotationalCmtm::invert_base(&r), r.transpose());
    }

    #[test]
    fn composition_multiplies_block_matrices() {
        let a = Cmtm::from_se3_with_derivatives(&pose(), vec![xi(), xi_dot()]).unwrap();
        let b = Cmtm::from_se3_with_derivatives(&other_pose(), vec![xi_dot(), -xi()]).unwrap();
        let composed = a.compose(&b);

        assert_eq!(composed.order(), 3);
        assert_abs_diff_eq!(
            composed.block_matrix(None).unwrap(),
            a.block_matrix(None).unwrap() * b.block_matrix(None).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn composition_pads_shorter_operand() {
        let a = Cmtm::from_se3_with_derivatives(&pose(), vec![xi(), xi_dot()]).unwrap();
        let b = Cmtm::from_se3(&other_pose());
        let zeros = vec![Vector6::zeros(); 2];
        let padded = Cmtm::from_se3_with_derivatives(&other_pose(), zeros).unwrap();

        let composed = b.compose(&a);
        assert_eq!(composed.order(), 3);
        assert_abs_diff_eq!(composed, padded.compose(&a), epsilon = 1e-12);
        assert_abs_diff_eq!(
            composed.block_matrix(None).unwrap(),
            padded.block_matrix(None).unwrap() * a.block_matrix(None).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn composition_does_not_add_derivatives() {
        // the first derivative of a·b is Ad(b⁻¹)·ξ_a + ξ_b
        let a = Cmtm::from_se3_with_derivatives(&pose(), vec![xi()]).unwrap();
        let composed = a.compose(&a);
        let expected = pose().mat_inv_adj() * xi() + xi();
        assert_abs_diff_eq!(composed.derivatives()[0], expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(vec![Vector6::new(f64::NAN, 0., 0., 0., 0., 0.)])]
    #[case(vec![xi(), Vector6::new(0., 0., 0., 0., f64::INFINITY, 0.)])]
    #[case(vec![Vector6::from_element(f64::NAN)])]
    fn from_se3_with_derivatives_rejects_non_finite(#[case] derivatives: Vec<Vector6>) {
        assert_eq!(
            Cmtm::from_se3_with_derivatives(&pose(), derivatives),
            Err(Error::NonFinite)
        );
    }

    #[rstest]
    #[case(vec![Vector3::new(f64::NAN, 0., 0.)])]
    #[case(vec![Vector3::x(), Vector3::new(0., f64::NEG_INFINITY, 0.)])]
    fn from_so3_with_derivatives_rejects_non_finite(#[case] derivatives: Vec<Vector3>) {
        assert_eq!(
            RotationalCmtm::from_so3_with_derivatives(&So3::eye(), derivatives),
            Err(Error::NonFinite)
        );
    }

    #[test]
    fn constant_frame_transforms_velocity() {
        // for a frame that does not move relative to the other, the body velocity of the
        // composition is the transformed velocity
        let fixed = Cmtm::from_se3(&pose());
        let moving = Cmtm::from_se3_with_derivatives(&Se3::identity(), vec![xi()]).unwrap();
        let composed = moving.compose(&fixed);
        assert_abs_diff_eq!(
            composed.derivatives()[0],
            pose().mat_inv_adj() * xi(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn inverse_inverts_block_matrix() {
        let a = Cmtm::from_se3_with_derivatives(&pose(), vec![xi(), xi_dot(), -xi()]).unwrap();
        let inverse = a.inverse();
        assert_eq!(inverse.order(), 4);
        assert_abs_diff_eq!(
            a.block_matrix(None).unwrap() * inverse.block_matrix(None).unwrap(),
            DMatrix::identity(24, 24),
            epsilon = 1e-12
        );
        let eye = padded(&Cmtm::identity(), 4);
        assert_abs_diff_eq!(a.compose(&inverse), eye, epsilon = 1e-12);
    }

    #[test]
    fn rotational_block_matrix_composes() {
        let w = Vector3::new(0.3, -0.1, 0.7);
        let w_dot = Vector3::new(0., 0.2, -0.4);
        let a = RotationalCmtm::from_so3_with_derivatives(
            &So3::from_euler([0.1, 0.2, 0.3]).unwrap(),
            vec![w, w_dot],
        )
        .unwrap();
        let b = RotationalCmtm::from_so3_with_derivatives(
            &So3::from_euler([-1., 0.5, 2.]).unwrap(),
            vec![w_dot, -w],
        )
        .unwrap();
        let short = RotationalCmtm::from_so3_with_derivatives(
            &So3::from_euler([-1., 0.5, 2.]).unwrap(),
            vec![w_dot],
        )
        .unwrap();

        let block = a.block_matrix(Some(2)).unwrap();
        let r = a.matrix();
        assert_abs_diff_eq!(
            block.view((3, 0), (3, 3)).into_owned(),
            DMatrix::from_column_slice(3, 3, (r * crate::skew::hat(&w)).as_slice()),
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(
            (&a * &b).block_matrix(None).unwrap(),
            a.block_matrix(None).unwrap() * b.block_matrix(None).unwrap(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            (&a * &short).block_matrix(None).unwrap(),
            a.block_matrix(None).unwrap() * padded(&short, 3).block_matrix(None).unwrap(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            a.block_matrix(None).unwrap() * a.inverse().block_matrix(None).unwrap(),
            DMatrix::identity(9, 9),
            epsilon = 1e-12
        );
    }

    #[test]
    fn apply_block_checks_length() {
        let cmtm = Cmtm::from_se3_with_derivatives(&pose(), vec![xi()]).unwrap();
        let x = DVector::from_fn(12, |i, _| i as f64);
        assert_eq!(
            cmtm.apply_block(&x).unwrap(),
            cmtm.block_matrix(None).unwrap() * &x
        );
        assert_eq!(
            cmtm.apply_block(&DVector::zeros(6)),
            Err(Error::DimensionMismatch {
                expected: 12,
                actual: 6
            })
        );
    }

    #[test]
    fn display_mentions_order() {
        let cmtm =
            GenericCmtm::<3>::from_so3_with_derivatives(&So3::eye(), vec![Vector3::x()]).unwrap();
        assert!(cmtm.to_string().starts_with("CMTM of order 2 with base matrix:"));
    }

    quickcheck! {
        fn adjoint_is_homomorphism(a: Se3, b: Se3) -> () {
            assert_abs_diff_eq!(
                (Cmtm::from_se3(&a) * Cmtm::from_se3(&b)).matrix(),
                Cmtm::from_se3(&(a * b)).matrix(),
                epsilon = 1e-10
            );
        }

        fn block_matrix_is_homomorphism(a: Cmtm, b: Cmtm) -> () {
            let order = a.order().max(b.order());
            let (a, b) = (padded(&a, order), padded(&b, order));
            assert_abs_diff_eq!(
                (&a * &b).block_matrix(None).unwrap(),
                a.block_matrix(None).unwrap() * b.block_matrix(None).unwrap(),
                epsilon = 1e-8
            );
        }

        fn composition_matches_zero_padded_operands(a: Cmtm, b: Cmtm) -> () {
            let order = a.order().max(b.order());
            assert_abs_diff_eq!(
                &a * &b,
                &padded(&a, order) * &padded(&b, order),
                epsilon = 1e-10
            );
        }

        fn inverse_is_block_inverse(a: Cmtm) -> () {
            let n = 6 * a.order();
            assert_abs_diff_eq!(
                a.block_matrix(None).unwrap() * a.inverse().block_matrix(None).unwrap(),
                DMatrix::identity(n, n),
                epsilon = 1e-8
            );
        }
    }
}
