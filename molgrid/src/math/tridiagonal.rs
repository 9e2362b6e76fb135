use ndarray::{ArrayViewMut2, Axis};

use crate::Error;

/// Pivots smaller than this (relative to the diagonal scale) are treated as
/// zero
const PIVOT_THRESHOLD: f64 = 1e-300;

/// Solve the tridiagonal system `A X = B` in place using the Thomas
/// algorithm, for all columns of `rhs` at once.
///
/// `lower[i]` is `A[i, i - 1]` (`lower[0]` is ignored), `diagonal[i]` is
/// `A[i, i]`, and `upper[i]` is `A[i, i + 1]` (the last entry is ignored).
/// `rhs` has shape `(n, n_rhs)` and contains the solutions on success.
pub(crate) fn solve_tridiagonal(
    lower: &[f64],
    diagonal: &[f64],
    upper: &[f64],
    mut rhs: ArrayViewMut2<'_, f64>,
) -> Result<(), Error> {
    let n = diagonal.len();
    if lower.len() != n || upper.len() != n || rhs.nrows() != n {
        return Err(Error::Internal(format!(
            "inconsistent sizes in tridiagonal system: lower={}, diagonal={}, upper={}, rhs={}",
            lower.len(), n, upper.len(), rhs.nrows()
        )));
    }

    if n == 0 {
        return Ok(());
    }

    let mut modified_upper = vec![0.0; n];

    let mut pivot = diagonal[0];
    if pivot.abs() < PIVOT_THRESHOLD || !pivot.is_finite() {
        return Err(Error::Internal("zero pivot in tridiagonal system at row 0".into()));
    }
    modified_upper[0] = upper[0] / pivot;
    rhs.row_mut(0).mapv_inplace(|v| v / pivot);

    for i in 1..n {
        pivot = diagonal[i] - lower[i] * modified_upper[i - 1];
        if pivot.abs() < PIVOT_THRESHOLD || !pivot.is_finite() {
            return Err(Error::Internal(format!(
                "zero pivot in tridiagonal system at row {}", i
            )));
        }

        if i + 1 < n {
            modified_upper[i] = upper[i] / pivot;
        }

        let (previous, mut current) = rhs.view_mut().split_at(Axis(0), i);
        let previous = previous.row(i - 1);
        let mut current = current.row_mut(0);
        current.zip_mut_with(&previous, |c, &p| *c = (*c - lower[i] * p) / pivot);
    }

    for i in (0..(n - 1)).rev() {
        let (mut current, next) = rhs.view_mut().split_at(Axis(0), i + 1);
        let next = next.row(0);
        let mut current = current.row_mut(i);
        current.zip_mut_with(&next, |c, &x| *c -= modified_upper[i] * x);
    }

    return Ok(());
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    use super::*;

    #[test]
    fn multiple_right_hand_sides() {
        let lower = [0.0, 1.0, -2.0, 0.5];
        let diagonal = [4.0, 5.0, 6.0, 3.0];
        let upper = [1.0, 2.0, 1.0, 0.0];

        let expected = array![[1.0, -2.0], [2.0, 0.5], [3.0, 1.0], [4.0, -1.5]];

        let mut rhs = Array2::zeros((4, 2));
        for i in 0..4 {
            for k in 0..2 {
                let mut value = diagonal[i] * expected[[i, k]];
                if i > 0 {
                    value += lower[i] * expected[[i - 1, k]];
                }
                if i < 3 {
                    value += upper[i] * expected[[i + 1, k]];
                }
                rhs[[i, k]] = value;
            }
        }

        solve_tridiagonal(&lower, &diagonal, &upper, rhs.view_mut()).unwrap();
        for (value, expected) in rhs.iter().zip(expected.iter()) {
            assert_relative_eq!(value, expected, max_relative=1e-12);
        }
    }

    #[test]
    fn zero_pivot() {
        let lower = [0.0, 1.0];
        let diagonal = [1.0, 1.0];
        let upper = [1.0, 0.0];

        let mut rhs = Array2::ones((2, 1));
        let error = solve_tridiagonal(&lower, &diagonal, &upper, rhs.view_mut()).unwrap_err();
        assert_eq!(error.to_string(), "internal molgrid error: zero pivot in tridiagonal system at row 1");
    }
}
