//! Errors reported when an input does not describe a valid transform.
//!
//! Every constructor that accepts an already-built representation (a matrix, a quaternion, a
//! skew generator, or a row-major host value) validates it and fails with one of these variants
//! instead of propagating a value that breaks the group invariants.

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The ways an input can fail validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A slice or nested sequence had the wrong number of components.
    #[error("Dimension mismatch: expected {expected} components, got {actual}")]
    DimensionMismatch {
        /// Number of components the operation requires.
        expected: usize,
        /// Number of components that were provided.
        actual: usize,
    },

    /// An input component was NaN or infinite.
    #[error("Input contains a non-finite component")]
    NonFinite,

    /// A matrix handed to `vee` is not antisymmetric.
    #[error("Matrix is not skew-symmetric (max |M + Mᵀ| = {deviation:e})")]
    NotSkewSymmetric {
        /// Largest absolute entry of `M + Mᵀ`.
        deviation: f64,
    },

    /// A matrix is not orthonormal with determinant +1.
    #[error(
        "Matrix is not a rotation (max |R·Rᵀ - I| = {orthonormality:e}, det = {determinant})"
    )]
    NotRotation {
        /// Largest absolute entry of `R·Rᵀ - I`.
        orthonormality: f64,
        /// Determinant of the matrix.
        determinant: f64,
    },

    /// A quaternion does not have unit norm.
    #[error("Quaternion is not unit-norm (norm = {norm})")]
    NotUnitQuaternion {
        /// Norm of the rejected quaternion.
        norm: f64,
    },

    /// A 4×4 matrix does not have the bottom row its role requires: `[0, 0, 0, 1]` for a
    /// homogeneous transform, all zeros for an se(3) generator.
    #[error("Matrix has an invalid bottom row {bottom_row:?}")]
    NotHomogeneous {
        /// The offending bottom row.
        bottom_row: [f64; 4],
    },

    /// A rotation axis of (near) zero length was combined with a non-zero angle.
    #[error("Rotation axis has near-zero norm {norm:e} for non-zero angle {angle}")]
    DegenerateAxis {
        /// Norm of the provided axis.
        norm: f64,
        /// The requested rotation angle in radians.
        angle: f64,
    },

    /// A block matrix was requested for an order the transform does not carry.
    #[error("Requested order {requested}, but only orders 1..={available} are available")]
    InvalidOrder {
        /// The requested order.
        requested: usize,
        /// The highest available order.
        available: usize,
    },
}
