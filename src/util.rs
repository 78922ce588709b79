//! Validation tolerances and conversions between nalgebra values and row-major host shapes.

use crate::error::{Error, Result};
use nalgebra::{SMatrix, SVector};

/// Tolerance used by every validating constructor unless a `*_with_tolerance` variant is called.
///
/// This bounds the largest absolute entry of the residual each check computes (eg, `R·Rᵀ - I` for
/// rotations or `M + Mᵀ` for skew generators), so it is an absolute tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Fails with [`Error::NonFinite`] if any value is NaN or infinite.
pub(crate) fn ensure_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> Result<()> {
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        log::debug!("rejecting input with a non-finite component");
        Err(Error::NonFinite)
    }
}

/// Whether `deviation` is a number no larger than `tolerance`. NaN is never within tolerance.
pub(crate) fn within(deviation: f64, tolerance: f64) -> bool {
    deviation <= tolerance
}

fn ensure_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        log::debug!("rejecting input of length {actual}, expected {expected}");
        Err(Error::DimensionMismatch { expected, actual })
    }
}

/// Builds a fixed-size vector from a slice, failing unless it has exactly `N` finite entries.
///
/// ```
/// # use motion_algebra::util::vector_from_slice;
/// let v = vector_from_slice::<3>(&[0.5, -0.25, 1.0]).unwrap();
/// assert_eq!(v.y, -0.25);
/// assert!(vector_from_slice::<3>(&[0.5, -0.25]).is_err());
/// ```
pub fn vector_from_slice<const N: usize>(values: &[f64]) -> Result<SVector<f64, N>> {
    ensure_len(N, values.len())?;
    ensure_finite(values)?;
    Ok(SVector::<f64, N>::from_column_slice(values))
}

/// Builds a square matrix from row-major rows, failing unless there are exactly `N` rows of
/// exactly `N` finite entries each.
pub fn matrix_from_rows<const N: usize, R>(rows: &[R]) -> Result<SMatrix<f64, N, N>>
where
    R: AsRef<[f64]>,
{
    ensure_len(N, rows.len())?;

    let mut matrix = SMatrix::<f64, N, N>::zeros();
    for (r, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        ensure_len(N, row.len())?;
        for (c, value) in row.iter().enumerate() {
            matrix[(r, c)] = *value;
        }
    }

    ensure_finite(matrix.iter())?;
    Ok(matrix)
}

/// Copies a square matrix into row-major nested arrays.
pub fn matrix_to_rows<const N: usize>(matrix: &SMatrix<f64, N, N>) -> [[f64; N]; N] {
    let mut rows = [[0.0; N]; N];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = matrix[(r, c)];
        }
    }
    rows
}
