//! Linear second order boundary-value problems on a finite interval.
//!
//! The equation
//!
//! ```text
//! a0(r) y(r) + a1(r) y'(r) + a2(r) y''(r) = f(r)
//! ```
//!
//! is rewritten in the variable `x = T(r)` of a [`Transform`], and
//! discretized with second order central finite differences on a mesh
//! uniform in `x`. Both ends of the interval carry a boundary condition
//! `α y + β y' = γ` (with `y'` the derivative with respect to `r`), written
//! with second order one-sided differences. The resulting tridiagonal system
//! is solved for any number of right hand sides at once.
//!
//! The radial Poisson equation in [`crate::poisson`] is one instance of such
//! problems.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::Error;
use crate::errors::check_size;
use crate::grids::Transform;
use crate::math::solve_tridiagonal;

/// Boundary condition `value * y(r) + derivative * y'(r) = target` at one
/// end of the interval. The target is given when solving the problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCondition {
    /// coefficient of `y(r)`
    pub value: f64,
    /// coefficient of `y'(r)`
    pub derivative: f64,
}

impl BoundaryCondition {
    /// Fixed value of the solution, `y(r) = target`
    pub fn dirichlet() -> BoundaryCondition {
        BoundaryCondition { value: 1.0, derivative: 0.0 }
    }

    /// Fixed derivative of the solution, `y'(r) = target`
    pub fn neumann() -> BoundaryCondition {
        BoundaryCondition { value: 0.0, derivative: 1.0 }
    }

    /// Mixed condition `value * y(r) + derivative * y'(r) = target`
    pub fn robin(value: f64, derivative: f64) -> BoundaryCondition {
        BoundaryCondition { value, derivative }
    }

    fn validate(&self, side: &str) -> Result<(), Error> {
        if !(self.value.is_finite() && self.derivative.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "the {} boundary condition has non finite coefficients", side
            )));
        }

        if self.value == 0.0 && self.derivative == 0.0 {
            return Err(Error::InvalidParameter(format!(
                "the {} boundary condition needs at least one non-zero coefficient", side
            )));
        }

        return Ok(());
    }
}

/// Express the coefficients `[a0, a1, a2]` of an equation in `r` as the
/// coefficients of the same equation in `x = T(r)`, at the point `r`.
///
/// Using `dy/dr = x' dy/dx` and `d²y/dr² = x'² d²y/dx² + x'' dy/dx`, the
/// coefficients become `[a0, a1 x' + a2 x'', a2 x'²]`.
pub fn transform_coefficients<T: Transform>(coefficients: [f64; 3], transform: &T, r: f64) -> [f64; 3] {
    let [a0, a1, a2] = coefficients;
    let d1 = transform.deriv(r);
    let d2 = transform.deriv2(r);
    return [a0, a1 * d1 + a2 * d2, a2 * d1 * d1];
}

/// Solution of a [`LinearBvp`] for multiple right hand sides
#[derive(Debug, Clone)]
pub struct BvpSolution {
    /// values of the solutions at the mesh nodes, with shape `(n_nodes,
    /// n_rhs)`
    pub values: Array2<f64>,
    /// relative residual `|A y - b| / (|A| |y| + |b|)` of the linear system
    /// for each right hand side
    pub residuals: Array1<f64>,
}

/// A linear second order boundary-value problem, discretized on a mesh
/// uniform in the transformed variable.
#[derive(Debug, Clone)]
pub struct LinearBvp {
    mesh: Vec<f64>,
    radii: Vec<f64>,
    lower: Vec<f64>,
    diagonal: Vec<f64>,
    upper: Vec<f64>,
    /// `1 / (a2 x'²)` at interior nodes, multiplying the source
    scaling: Vec<f64>,
    inner: BoundaryCondition,
    outer: BoundaryCondition,
    /// `derivative x'(r) / 2h` at the inner and outer nodes
    inner_factor: f64,
    outer_factor: f64,
}

/// `n_intervals + 1` equally spaced nodes from `start` to `stop`
pub(crate) fn uniform_mesh(start: f64, stop: f64, n_intervals: usize) -> Vec<f64> {
    let step = (stop - start) / n_intervals as f64;
    return (0..=n_intervals).map(|i| start + i as f64 * step).collect();
}

impl LinearBvp {
    /// Discretize the equation with the given `coefficients` (as a function
    /// of `r`) on `n_intervals` intervals between `x = start` and
    /// `x = stop`, where `transform` maps the variable `r` of the equation
    /// to the mesh variable `x`. The `inner` boundary condition applies at
    /// `x = start` and the `outer` one at `x = stop`.
    pub fn new<T, F>(
        transform: &T,
        start: f64,
        stop: f64,
        n_intervals: usize,
        coefficients: F,
        inner: BoundaryCondition,
        outer: BoundaryCondition,
    ) -> Result<LinearBvp, Error> where
        T: Transform,
        F: Fn(f64) -> [f64; 3],
    {
        if n_intervals < 2 {
            return Err(Error::InvalidParameter(format!(
                "boundary-value problems need at least 2 intervals, got {}", n_intervals
            )));
        }

        if !(start < stop && start.is_finite() && stop.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "invalid interval for boundary-value problem: [{}, {}]", start, stop
            )));
        }

        inner.validate("inner")?;
        outer.validate("outer")?;

        let mesh = uniform_mesh(start, stop, n_intervals);
        let radii = mesh.iter().map(|&x| transform.inverse(x)).collect::<Vec<_>>();
        if let Some(i) = radii.iter().position(|r| !r.is_finite()) {
            return Err(Error::Domain(format!(
                "the mesh node x={} is mapped to r={}", mesh[i], radii[i]
            )));
        }

        let n = mesh.len();
        let step = mesh[1] - mesh[0];
        let h2 = step * step;

        let mut lower = vec![0.0; n];
        let mut diagonal = vec![1.0; n];
        let mut upper = vec![0.0; n];
        let mut scaling = vec![0.0; n];
        for i in 1..(n - 1) {
            let r = radii[i];
            let [a0, a1, a2] = transform_coefficients(coefficients(r), transform, r);
            if a2 == 0.0 || !(a0.is_finite() && a1.is_finite() && a2.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "the coefficients of the equation must be finite, and y'' must not vanish, got [{}, {}, {}] at r={}",
                    a0, a1, a2, r
                )));
            }

            let s = 1.0 / a2;
            lower[i] = 1.0 / h2 - 0.5 * a1 * s / step;
            diagonal[i] = -2.0 / h2 + a0 * s;
            upper[i] = 1.0 / h2 + 0.5 * a1 * s / step;
            scaling[i] = s;
        }

        // the one-sided derivative at the boundary uses the node after the
        // first neighbor, which is eliminated with the neighbor's equation
        let mut inner_factor = 0.0;
        if inner.derivative != 0.0 {
            inner_factor = inner.derivative * transform.deriv(radii[0]) / (2.0 * step);
            let (l, d, u) = (lower[1], diagonal[1], upper[1]);
            if inner_factor == 0.0 || !inner_factor.is_finite() || u == 0.0 {
                return Err(Error::Domain(format!(
                    "can not apply a derivative boundary condition at r={}", radii[0]
                )));
            }
            diagonal[0] = inner.value / inner_factor * u - 3.0 * u + l;
            upper[0] = 4.0 * u + d;
        } else {
            diagonal[0] = 1.0;
            upper[0] = 0.0;
        }

        let mut outer_factor = 0.0;
        if outer.derivative != 0.0 {
            outer_factor = outer.derivative * transform.deriv(radii[n - 1]) / (2.0 * step);
            let (l, d, u) = (lower[n - 2], diagonal[n - 2], upper[n - 2]);
            if outer_factor == 0.0 || !outer_factor.is_finite() || l == 0.0 {
                return Err(Error::Domain(format!(
                    "can not apply a derivative boundary condition at r={}", radii[n - 1]
                )));
            }
            lower[n - 1] = -4.0 * l - d;
            diagonal[n - 1] = outer.value * l / outer_factor + 3.0 * l - u;
        } else {
            lower[n - 1] = 0.0;
            diagonal[n - 1] = 1.0;
        }

        return Ok(LinearBvp {
            mesh: mesh,
            radii: radii,
            lower: lower,
            diagonal: diagonal,
            upper: upper,
            scaling: scaling,
            inner: inner,
            outer: outer,
            inner_factor: inner_factor,
            outer_factor: outer_factor,
        });
    }

    /// Get the nodes of the mesh, in the transformed variable `x`
    pub fn mesh(&self) -> &[f64] {
        &self.mesh
    }

    /// Get the nodes of the mesh, in the variable `r` of the equation
    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Solve the problem for all columns of `source`, containing `f(r)` at
    /// the mesh nodes (shape `(n_nodes, n_rhs)`). `inner_targets` and
    /// `outer_targets` contain the right hand side of the boundary
    /// conditions for each column.
    pub fn solve(
        &self,
        source: ArrayView2<'_, f64>,
        inner_targets: ArrayView1<'_, f64>,
        outer_targets: ArrayView1<'_, f64>,
    ) -> Result<BvpSolution, Error> {
        let n = self.mesh.len();
        check_size(n, source.nrows())?;
        check_size(source.ncols(), inner_targets.len())?;
        check_size(source.ncols(), outer_targets.len())?;

        let mut rhs = Array2::zeros(source.raw_dim());
        for i in 1..(n - 1) {
            let mut row = rhs.row_mut(i);
            row.assign(&source.row(i));
            row *= self.scaling[i];
        }

        for (k, &target) in inner_targets.iter().enumerate() {
            rhs[[0, k]] = if self.inner.derivative == 0.0 {
                target / self.inner.value
            } else {
                target * self.upper[1] / self.inner_factor + rhs[[1, k]]
            };
        }

        for (k, &target) in outer_targets.iter().enumerate() {
            rhs[[n - 1, k]] = if self.outer.derivative == 0.0 {
                target / self.outer.value
            } else {
                target * self.lower[n - 2] / self.outer_factor - rhs[[n - 2, k]]
            };
        }

        let expected = rhs.clone();
        solve_tridiagonal(&self.lower, &self.diagonal, &self.upper, rhs.view_mut())?;

        let residuals = (0..rhs.ncols())
            .map(|k| self.residual(rhs.column(k), expected.column(k)))
            .collect();

        return Ok(BvpSolution {
            values: rhs,
            residuals: residuals,
        });
    }

    /// Solve the problem for a single source function `f(r)`
    pub fn solve_function<F>(&self, source: F, inner_target: f64, outer_target: f64) -> Result<BvpSolution, Error> where
        F: Fn(f64) -> f64,
    {
        let source = Array2::from_shape_fn((self.radii.len(), 1), |(i, _)| source(self.radii[i]));
        return self.solve(
            source.view(),
            ndarray::arr1(&[inner_target]).view(),
            ndarray::arr1(&[outer_target]).view(),
        );
    }

    /// Relative residual `|A y - b| / (|A| |y| + |b|)` in infinity norm
    fn residual(&self, solution: ArrayView1<'_, f64>, expected: ArrayView1<'_, f64>) -> f64 {
        let n = self.diagonal.len();
        let mut residual = 0.0_f64;
        let mut matrix_norm = 0.0_f64;
        for i in 0..n {
            let mut row = self.diagonal[i] * solution[i];
            let mut row_norm = self.diagonal[i].abs();
            if i > 0 {
                row += self.lower[i] * solution[i - 1];
                row_norm += self.lower[i].abs();
            }
            if i + 1 < n {
                row += self.upper[i] * solution[i + 1];
                row_norm += self.upper[i].abs();
            }
            residual = residual.max((row - expected[i]).abs());
            matrix_norm = matrix_norm.max(row_norm);
        }

        let solution_norm = solution.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
        let rhs_norm = expected.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
        let scale = matrix_norm * solution_norm + rhs_norm;
        if scale == 0.0 {
            return 0.0;
        }

        return residual / scale;
    }
}
