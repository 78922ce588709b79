//! The group structure shared by [`So3`](crate::So3), [`Se3`](crate::Se3) and
//! [`GenericCmtm`](crate::GenericCmtm).

/// A matrix Lie group: elements compose associatively, have inverses, and map to matrices in a
/// way that turns composition into matrix multiplication.
///
/// ```
/// # use motion_algebra::{LieGroup, So3, Vector3};
/// fn round_trip<G: LieGroup>(g: &G) -> G {
///     g.compose(&g.inverse())
/// }
///
/// let rotation = So3::from_axis_angle(&Vector3::x(), 0.3).unwrap();
/// let eye = round_trip(&rotation).to_matrix();
/// assert!((eye - <So3 as LieGroup>::identity().to_matrix()).amax() < 1e-12);
/// ```
pub trait LieGroup: Sized {
    /// The matrix representation of an element.
    type Matrix;

    fn identity() -> Self;

    /// `self · other`.
    fn compose(&self, other: &Self) -> Self;

    fn inverse(&self) -> Self;

    fn to_matrix(&self) -> Self::Matrix;
}
