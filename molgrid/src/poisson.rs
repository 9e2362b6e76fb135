//! Electrostatic potential of a charge density sampled on an atomic grid.
//!
//! The density is projected on real spherical harmonics, and for each
//! channel `(l, m)` the radial Poisson equation
//!
//! ```text
//! u''(r) - l (l + 1) / r² u(r) = -4π r ρ_lm(r)
//! ```
//!
//! is solved for `u_lm = r V_lm` as a two-point [`LinearBvp`], on a mesh
//! uniform in the canonical coordinate `x` of the radial transform. The
//! inner boundary condition is `u' = (l + 1) u / r` (or `u = 0` at the
//! origin), and the outer one matches the multipole expansion of the
//! potential outside of the density.
//!
//! The multipoles entering the outer boundary condition come from the
//! radial quadrature, while the equation sees the splined density. A large
//! difference between the two means that the radial grid does not resolve
//! the density, and is reported as an [`Error::Convergence`].
//!
//! The solver goes through three stages, each represented by its own type:
//! [`PoissonSolver`] → [`DecomposedDensity`] → [`SolvedPotential`].

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{Error, Vector3D};
use crate::grids::{AtomicGrid, InverseTransform, OneDQuadrature, RadialTransform};
use crate::math::{CubicSpline, channel_count, channel_index, channels, FOUR_PI};
use crate::interpolation::{EvaluationBuffer, evaluate_all, sum_expansion, unsupported_derivative};
use crate::ode::{uniform_mesh, BoundaryCondition, LinearBvp};

/// Options for the radial Poisson solver
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct PoissonOptions {
    /// Maximal angular momentum used in the expansion of the density and
    /// the potential
    pub max_angular: usize,
    /// Number of intervals in the finite differences mesh
    pub mesh_size: usize,
    /// Largest acceptable residual, i.e. the larger of the relative residual
    /// of the linear systems and the relative difference between the
    /// quadrature and spline multipoles of each channel
    pub tolerance: f64,
    /// Start the mesh at `x = -1` (i.e. at the smallest radius of the
    /// transform) instead of at the innermost shell of the grid
    pub include_origin: bool,
}

impl Default for PoissonOptions {
    fn default() -> PoissonOptions {
        PoissonOptions {
            max_angular: 4,
            mesh_size: 1000,
            tolerance: 1e-4,
            include_origin: true,
        }
    }
}

/// Radial Poisson solver for a single atomic grid, before any density has
/// been given.
#[derive(Debug, Clone, Copy)]
pub struct PoissonSolver<'a> {
    grid: &'a AtomicGrid,
    options: PoissonOptions,
}

impl<'a> PoissonSolver<'a> {
    /// Create a new solver for densities sampled on `grid`
    pub fn new(grid: &'a AtomicGrid, options: PoissonOptions) -> Result<PoissonSolver<'a>, Error> {
        if options.mesh_size < 2 {
            return Err(Error::InvalidParameter(format!(
                "the Poisson mesh needs at least 2 intervals, got {}", options.mesh_size
            )));
        }

        if !(options.tolerance > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "the Poisson tolerance must be positive, got {}", options.tolerance
            )));
        }

        if grid.n_shells() < 2 {
            return Err(Error::InvalidParameter(format!(
                "the Poisson solver needs at least 2 radial shells, got {}", grid.n_shells()
            )));
        }

        return Ok(PoissonSolver { grid, options });
    }

    /// Get the options of this solver
    pub fn options(&self) -> &PoissonOptions {
        &self.options
    }

    /// Project the `density` (sampled on the points of the grid) on
    /// spherical harmonics, and fit the radial part of each channel
    #[time_graph::instrument(name = "PoissonSolver::decompose")]
    pub fn decompose(self, density: ArrayView1<'_, f64>) -> Result<DecomposedDensity<'a>, Error> {
        let max_angular = self.options.max_angular;
        let components = self.grid.radial_component(density, max_angular)?;
        let charge = self.grid.integrate(density)?;

        // ∫ r^(l + 2) ρ_lm(r) dr, using the radial quadrature, and the same
        // integral over the sum of |ρ_lm| of all channels as a scale
        let radial = self.grid.radial();
        let mut multipoles = Array1::zeros(channel_count(max_angular));
        let mut scales = Array1::zeros(max_angular + 1);
        for (shell, (&r, &weight)) in radial.points().iter().zip(radial.weights()).enumerate() {
            let magnitude = components.row(shell).iter().map(|v| v.abs()).sum::<f64>();
            for l in 0..=max_angular {
                scales[l] += weight * r.powi(l as i32 + 2) * magnitude;
            }

            for (l, m) in channels(max_angular) {
                let lm = channel_index(l, m);
                multipoles[lm] += weight * r.powi(l as i32 + 2) * components[[shell, lm]];
            }
        }

        let mut order = (0..radial.size()).collect::<Vec<_>>();
        let canonical = radial.canonical_points();
        order.sort_by(|&a, &b| canonical[a].total_cmp(&canonical[b]));
        let knots = order.iter().map(|&shell| canonical[shell]).collect();
        let density = CubicSpline::natural(knots, components.select(Axis(0), &order))?;

        return Ok(DecomposedDensity {
            grid: self.grid,
            options: self.options,
            density: density,
            multipoles: multipoles,
            scales: scales,
            charge: charge,
        });
    }
}

/// Charge density projected on spherical harmonics, ready to be solved
#[derive(Debug, Clone)]
pub struct DecomposedDensity<'a> {
    grid: &'a AtomicGrid,
    options: PoissonOptions,
    /// radial components of the density as a function of `x`
    density: CubicSpline,
    multipoles: Array1<f64>,
    /// `∫ r^(l + 2) Σ_lm |ρ_lm(r)| dr` for each `l`
    scales: Array1<f64>,
    charge: f64,
}

impl<'a> DecomposedDensity<'a> {
    /// Get the total charge of the density
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Get the radial multipoles `q_lm = ∫ r^(l + 2) ρ_lm(r) dr` of the
    /// density, with channels ordered as in [`crate::math::channel_index`]
    pub fn multipoles(&self) -> ArrayView1<'_, f64> {
        self.multipoles.view()
    }

    /// Get the radial components `ρ_lm` of the density at distance `r` from
    /// the center. The components are constant below the innermost shell,
    /// and zero beyond the outermost one.
    pub fn radial_density(&self, r: f64) -> Array1<f64> {
        let mut values = Array1::zeros(self.density.n_outputs());
        let transform = self.grid.radial().transform();
        if r <= transform.transform(self.density.stop()) {
            let x = self.canonical(r);
            self.density.compute(x, values.view_mut(), None);
        }
        return values;
    }

    fn canonical(&self, r: f64) -> f64 {
        let x = self.grid.radial().transform().inverse(r);
        return x.clamp(self.density.start(), self.density.stop());
    }

    /// Get the multipoles `∫ r^(l + 2) ρ_lm(x) φ'(x) dx` of the splined
    /// density between `x_start` and the outermost shell, with the density
    /// constant below the innermost shell
    fn spline_multipoles(&self, x_start: f64) -> Result<Array1<f64>, Error> {
        let transform = self.grid.radial().transform();
        let gauss = OneDQuadrature::GaussLegendre { points: 8 }.build()?;

        let mut bounds = Vec::with_capacity(self.density.knots().len() + 1);
        if x_start < self.density.start() {
            bounds.push(x_start);
        }
        bounds.extend_from_slice(self.density.knots());

        let angular = channels(self.options.max_angular).map(|(l, _)| l).collect::<Vec<_>>();
        let mut multipoles = Array1::zeros(angular.len());
        let mut values = Array1::zeros(angular.len());
        for interval in bounds.windows(2) {
            let center = 0.5 * (interval[0] + interval[1]);
            let half_width = 0.5 * (interval[1] - interval[0]);
            for (&t, &weight) in gauss.points().iter().zip(gauss.weights()) {
                let x = center + half_width * t;
                let r = transform.transform(x);
                let jacobian = half_width * weight * transform.deriv(x);
                self.density.compute(x.max(self.density.start()), values.view_mut(), None);
                for (lm, &l) in angular.iter().enumerate() {
                    multipoles[lm] += jacobian * r.powi(l as i32 + 2) * values[lm];
                }
            }
        }

        return Ok(multipoles);
    }

    /// Solve the radial Poisson equations for all channels
    #[time_graph::instrument(name = "DecomposedDensity::solve")]
    pub fn solve(self) -> Result<SolvedPotential, Error> {
        let max_angular = self.options.max_angular;
        let n_intervals = self.options.mesh_size;
        let transform = *self.grid.radial().transform();
        let inverse = InverseTransform::new(transform);

        let x_start = if self.options.include_origin {
            transform.canonical_domain().0
        } else {
            self.density.start()
        };
        let x_stop = self.density.stop();
        let mesh = uniform_mesh(x_start, x_stop, n_intervals);
        let radii = mesh.iter().map(|&x| transform.transform(x)).collect::<Vec<_>>();
        let inner_radius = radii[0];
        let outer_radius = radii[n_intervals];

        // density at the mesh nodes, constant below the innermost shell
        let mut density = Array2::zeros((mesh.len(), channel_count(max_angular)));
        for (&x, row) in mesh.iter().zip(density.axis_iter_mut(Axis(0))) {
            let x = x.clamp(self.density.start(), self.density.stop());
            self.density.compute(x, row, None);
        }

        let spline_multipoles = self.spline_multipoles(x_start)?;

        let degrees = self.grid.degrees();
        let mut solutions = Array2::zeros(density.raw_dim());
        let mut residuals = Array1::zeros(channel_count(max_angular));
        for l in 0..=max_angular {
            let failed = || Error::Convergence { l: l, m: 0, residual: f64::INFINITY };

            let resolving = degrees.iter().filter(|&&degree| degree / 2 >= l).count();
            if resolving < 2 {
                return Err(failed());
            }

            // u'(r) = (l + 1) u(r) / r close to the origin
            let inner = if inner_radius > 0.0 {
                BoundaryCondition::robin(-((l + 1) as f64) / inner_radius, 1.0)
            } else {
                BoundaryCondition::dirichlet()
            };

            let l_factor = (l * (l + 1)) as f64;
            let bvp = LinearBvp::new(
                &inverse, x_start, x_stop, n_intervals,
                |r| [-l_factor / (r * r), 0.0, 1.0],
                inner,
                BoundaryCondition::dirichlet(),
            ).map_err(|_| failed())?;

            let first = channel_index(l, -(l as isize));
            let last = channel_index(l, l as isize) + 1;
            let source = Array2::from_shape_fn((mesh.len(), last - first), |(i, k)| {
                -FOUR_PI * radii[i] * density[[i, first + k]]
            });

            // u(r) = 4π / (2l + 1) q_lm / r^l outside of the density
            let factor = FOUR_PI / (2 * l + 1) as f64 / outer_radius.powi(l as i32);
            let outer_targets = self.multipoles.slice(s![first..last]).mapv(|q| factor * q);
            let inner_targets = Array1::zeros(last - first);

            let solution = bvp.solve(source.view(), inner_targets.view(), outer_targets.view())
                .map_err(|_| failed())?;

            for (i, m) in (-(l as isize)..=(l as isize)).enumerate() {
                let lm = channel_index(l, m);
                let mismatch = if self.scales[l] > 0.0 {
                    (self.multipoles[lm] - spline_multipoles[lm]).abs() / self.scales[l]
                } else {
                    0.0
                };

                let mut residual = solution.residuals[i];
                if mismatch > residual {
                    residual = mismatch;
                }
                if !(residual <= self.options.tolerance) {
                    return Err(Error::Convergence { l, m, residual });
                }
                residuals[lm] = residual;
            }

            solutions.slice_mut(s![.., first..last]).assign(&solution.values);
        }

        debug!(
            "solved radial Poisson equations up to l={} on {} mesh nodes, largest residual is {:e}",
            max_angular, mesh.len(), residuals.iter().fold(0.0_f64, |a, &b| a.max(b))
        );

        return SolvedPotential::new(
            self.grid.center(),
            transform,
            max_angular,
            mesh,
            solutions,
            &self.multipoles,
            residuals,
            self.charge,
        );
    }
}

/// Electrostatic potential obtained by solving the radial Poisson equation
#[derive(Debug, Clone)]
pub struct SolvedPotential {
    center: Vector3D,
    transform: RadialTransform,
    max_angular: usize,
    /// `u_lm = r V_lm` as a function of `x`
    solution: CubicSpline,
    /// first mesh node with a non-zero radius, and the radius there
    inner_x: f64,
    inner_radius: f64,
    /// `V_lm` at `inner_radius`
    inner_potential: Array1<f64>,
    /// last mesh node and the corresponding radius
    outer_x: f64,
    outer_radius: f64,
    /// `4π / (2l + 1) q_lm`, giving the potential outside of the mesh
    multipoles: Array1<f64>,
    /// angular momentum of each channel
    angular: Vec<usize>,
    residuals: Array1<f64>,
    charge: f64,
}

impl SolvedPotential {
    #[allow(clippy::too_many_arguments)]
    fn new(
        center: Vector3D,
        transform: RadialTransform,
        max_angular: usize,
        mesh: Vec<f64>,
        solutions: Array2<f64>,
        multipoles: &Array1<f64>,
        residuals: Array1<f64>,
        charge: f64,
    ) -> Result<SolvedPotential, Error> {
        let first = if transform.transform(mesh[0]) > 0.0 { 0 } else { 1 };
        let inner_x = mesh[first];
        let inner_radius = transform.transform(inner_x);
        let inner_potential = solutions.row(first).mapv(|u| u / inner_radius);

        let outer_x = mesh[mesh.len() - 1];
        let outer_radius = transform.transform(outer_x);

        let angular = channels(max_angular).map(|(l, _)| l).collect::<Vec<_>>();
        let multipoles = Array1::from_shape_fn(multipoles.len(), |lm| {
            FOUR_PI / (2 * angular[lm] + 1) as f64 * multipoles[lm]
        });

        let solution = CubicSpline::natural(mesh, solutions)?;

        return Ok(SolvedPotential {
            center: center,
            transform: transform,
            max_angular: max_angular,
            solution: solution,
            inner_x: inner_x,
            inner_radius: inner_radius,
            inner_potential: inner_potential,
            outer_x: outer_x,
            outer_radius: outer_radius,
            multipoles: multipoles,
            angular: angular,
            residuals: residuals,
            charge: charge,
        });
    }

    /// Get the residual of each channel, ordered as in
    /// [`crate::math::channel_index`]. This is the larger of the relative
    /// residual of the linear system and the relative difference between the
    /// quadrature and spline multipoles of the channel.
    pub fn residuals(&self) -> ArrayView1<'_, f64> {
        self.residuals.view()
    }

    /// Get the total charge of the density used to create this potential
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Get the radial components `V_lm` of the potential at distance `r`
    /// from the center, with channels ordered as in
    /// [`crate::math::channel_index`]
    pub fn radial_potential(&self, r: f64) -> Array1<f64> {
        let mut buffer = EvaluationBuffer::new(self.max_angular);
        self.radial_potential_into(r, &mut buffer, false);
        return buffer.coefficients;
    }

    /// Evaluate the potential at the given `points`, with shape
    /// `(n_points, 3)`
    pub fn potential(&self, points: ArrayView2<'_, f64>) -> Result<Array1<f64>, Error> {
        let (values, _) = evaluate_all(points, self.max_angular, false, |point, buffer| {
            self.evaluate_point(point, buffer, false)
        })?;
        return Ok(values);
    }

    /// Evaluate the gradient of the potential at the given `points`, with
    /// shape `(n_points, 3)`
    pub fn gradient(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, Error> {
        let (_, gradients) = evaluate_all(points, self.max_angular, true, |point, buffer| {
            self.evaluate_point(point, buffer, true)
        })?;
        return Ok(gradients);
    }

    /// Evaluate the potential (`derivative = 0`, with shape `(n_points,
    /// 1)`) or its gradient (`derivative = 1`, with shape `(n_points, 3)`)
    pub fn compute(&self, points: ArrayView2<'_, f64>, derivative: usize) -> Result<Array2<f64>, Error> {
        return match derivative {
            0 => Ok(self.potential(points)?.insert_axis(Axis(1))),
            1 => self.gradient(points),
            _ => Err(unsupported_derivative(derivative)),
        };
    }

    /// Set `V_lm(r)` and `dV_lm/dr` in `buffer`
    fn radial_potential_into(&self, r: f64, buffer: &mut EvaluationBuffer, gradient: bool) {
        if r >= self.outer_radius {
            for (lm, &l) in self.angular.iter().enumerate() {
                let v = self.multipoles[lm] / r.powi(l as i32 + 1);
                buffer.coefficients[lm] = v;
                buffer.derivatives[lm] = -((l + 1) as f64) * v / r;
            }
        } else if r <= self.inner_radius {
            let scaled = r / self.inner_radius;
            for (lm, &l) in self.angular.iter().enumerate() {
                let v = self.inner_potential[lm];
                buffer.coefficients[lm] = v * scaled.powi(l as i32);
                buffer.derivatives[lm] = if l == 0 {
                    0.0
                } else {
                    l as f64 * v * scaled.powi(l as i32 - 1) / self.inner_radius
                };
            }
        } else {
            let x = self.transform.inverse(r).clamp(self.inner_x, self.outer_x);
            if gradient {
                self.solution.compute(x, buffer.coefficients.view_mut(), Some(buffer.derivatives.view_mut()));
                let d1 = self.transform.deriv(x);
                for lm in 0..self.angular.len() {
                    let v = buffer.coefficients[lm] / r;
                    buffer.coefficients[lm] = v;
                    buffer.derivatives[lm] = (buffer.derivatives[lm] / d1 - v) / r;
                }
            } else {
                self.solution.compute(x, buffer.coefficients.view_mut(), None);
                buffer.coefficients /= r;
            }
        }
    }

    fn evaluate_point(&self, point: Vector3D, buffer: &mut EvaluationBuffer, gradient: bool) -> (f64, Vector3D) {
        let displacement = point - self.center;
        self.radial_potential_into(displacement.norm(), buffer, gradient);
        return sum_expansion(buffer, displacement, gradient);
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    use crate::{AtomicGrid, RadialGrid, OneDQuadrature, RadialTransform, Vector3D, Error};
    use super::*;

    fn atomic_grid(center: Vector3D, degree: usize) -> AtomicGrid {
        let radial = RadialGrid::new(
            OneDQuadrature::GaussChebyshevType2 { points: 80 },
            RadialTransform::Becke { rmin: 1e-4, scale: 1.5 },
        ).unwrap();
        AtomicGrid::uniform(radial, degree, center).unwrap()
    }

    /// unit charge gaussian plus a dipolar part `z exp(-r²)`
    fn density(grid: &AtomicGrid, center: Vector3D, dipole: f64) -> Array1<f64> {
        grid.points().rows().into_iter().map(|point| {
            let d = Vector3D::from_row(point) - center;
            let gaussian = f64::exp(-d.norm2());
            gaussian / PI.powf(1.5) + dipole * d[2] * gaussian
        }).collect()
    }

    fn exact_potential(point: Vector3D, center: Vector3D, dipole: f64) -> f64 {
        let d = point - center;
        let r = d.norm();
        let erf = libm::erf(r);
        let d_erf_r = 2.0 / PI.sqrt() * f64::exp(-r * r) / r - erf / (r * r);
        // the dipolar density is -1/2 ∂z exp(-r²)
        erf / r - dipole * 0.5 * PI.powf(1.5) * (d[2] / r) * d_erf_r
    }

    fn test_points(center: Vector3D) -> Array2<f64> {
        Array2::from_shape_fn((50, 3), |(i, j)| {
            let r = 0.2 + 6.0 * i as f64 / 49.0;
            let theta = 0.3 + 0.055 * i as f64;
            let phi = 1.3 * i as f64;
            let direction = [
                f64::sin(theta) * f64::cos(phi),
                f64::sin(theta) * f64::sin(phi),
                f64::cos(theta),
            ];
            center[j] + r * direction[j]
        })
    }

    #[test]
    fn gaussian_potential() {
        let center = Vector3D::new(0.1, 0.2, -0.3);
        let grid = atomic_grid(center, 11);
        let density = density(&grid, center, 0.7);

        let options = PoissonOptions { max_angular: 2, ..Default::default() };
        let decomposed = PoissonSolver::new(&grid, options).unwrap().decompose(density.view()).unwrap();
        assert_relative_eq!(decomposed.charge(), 1.0, max_relative=1e-10);

        let potential = decomposed.solve().unwrap();
        assert_eq!(potential.residuals().len(), 9);
        assert!(potential.residuals().iter().all(|&r| r < 1e-4));

        let points = test_points(center);
        let values = potential.potential(points.view()).unwrap();
        for (point, value) in points.rows().into_iter().zip(&values) {
            let point = Vector3D::from_row(point);
            assert_relative_eq!(*value, exact_potential(point, center, 0.7), epsilon=1e-4);
        }
    }

    #[test]
    fn potential_gradient() {
        let center = Vector3D::zero();
        let grid = atomic_grid(center, 11);
        let density = density(&grid, center, 0.5);

        let options = PoissonOptions { max_angular: 2, ..Default::default() };
        let potential = PoissonSolver::new(&grid, options).unwrap()
            .decompose(density.view()).unwrap()
            .solve().unwrap();

        let points = test_points(center);
        let gradients = potential.gradient(points.view()).unwrap();

        let delta = 1e-6;
        for (i, point) in points.rows().into_iter().enumerate() {
            for k in 0..3 {
                let mut displaced = Array2::zeros((2, 3));
                displaced.row_mut(0).assign(&point);
                displaced.row_mut(1).assign(&point);
                displaced[[0, k]] += delta;
                displaced[[1, k]] -= delta;
                let values = potential.potential(displaced.view()).unwrap();
                let finite_difference = (values[0] - values[1]) / (2.0 * delta);
                assert_relative_eq!(gradients[[i, k]], finite_difference, epsilon=1e-6);
            }
        }

        let computed = potential.compute(points.view(), 1).unwrap();
        assert_eq!(computed, gradients);
    }

    #[test]
    fn far_field_and_inner_mesh() {
        let center = Vector3D::zero();
        let grid = atomic_grid(center, 7);
        let density = density(&grid, center, 0.0);

        for include_origin in [true, false] {
            let options = PoissonOptions { max_angular: 1, include_origin, ..Default::default() };
            let potential = PoissonSolver::new(&grid, options).unwrap()
                .decompose(density.view()).unwrap()
                .solve().unwrap();

            // outside of the mesh, the potential is the one of a point charge
            let far = ndarray::arr2(&[[1e4, 0.0, 0.0], [0.0, -2e4, 0.0]]);
            let values = potential.potential(far.view()).unwrap();
            assert_relative_eq!(values[0], 1e-4, max_relative=1e-8);
            assert_relative_eq!(values[1], 5e-5, max_relative=1e-8);

            let points = test_points(center);
            let values = potential.potential(points.view()).unwrap();
            for (point, value) in points.rows().into_iter().zip(&values) {
                let point = Vector3D::from_row(point);
                assert_relative_eq!(*value, exact_potential(point, center, 0.0), epsilon=1e-4);
            }

            // close to the origin the potential is 2 / sqrt(π)
            let origin = ndarray::arr2(&[[0.0, 0.0, 0.0]]);
            let value = potential.potential(origin.view()).unwrap()[0];
            assert_relative_eq!(value, 2.0 / PI.sqrt(), max_relative=1e-4);
        }
    }

    #[test]
    fn multipoles() {
        let center = Vector3D::zero();
        let grid = atomic_grid(center, 11);
        let density = density(&grid, center, 1.0);

        let decomposed = PoissonSolver::new(&grid, PoissonOptions::default()).unwrap()
            .decompose(density.view()).unwrap();

        // q_00 = Q / sqrt(4π), and ∫ z² exp(-r²) = π^(3/2) / 2 gives q_10
        let multipoles = decomposed.multipoles();
        assert_relative_eq!(multipoles[0], 1.0 / (4.0 * PI).sqrt(), max_relative=1e-10);
        let y10 = f64::sqrt(3.0 / (4.0 * PI));
        assert_relative_eq!(multipoles[channel_index(1, 0)], y10 * 0.5 * PI.powf(1.5), max_relative=1e-10);
        assert_relative_eq!(multipoles[channel_index(1, 1)], 0.0, epsilon=1e-12);

        let radial = decomposed.radial_density(1.0);
        assert_relative_eq!(radial[0], (4.0 * PI).sqrt() * f64::exp(-1.0) / PI.powf(1.5), max_relative=1e-4);
        assert!(decomposed.radial_density(1e6).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn errors() {
        let grid = atomic_grid(Vector3D::zero(), 11);
        let options = PoissonOptions { mesh_size: 1, ..Default::default() };
        let error = PoissonSolver::new(&grid, options).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: the Poisson mesh needs at least 2 intervals, got 1");

        // degree 3 grids only resolve l <= 1
        let grid = atomic_grid(Vector3D::zero(), 3);
        let values = density(&grid, Vector3D::zero(), 0.0);
        let options = PoissonOptions { max_angular: 2, ..Default::default() };
        let error = PoissonSolver::new(&grid, options).unwrap()
            .decompose(values.view()).unwrap()
            .solve().unwrap_err();
        assert!(matches!(error, Error::Convergence { l: 2, m: 0, .. }));
        assert_eq!(
            error.to_string(),
            "failed to solve the radial boundary-value problem for channel l=2 m=0 (residual is inf)"
        );

        let grid = atomic_grid(Vector3D::zero(), 11);
        let values = density(&grid, Vector3D::zero(), 0.0);
        let potential = PoissonSolver::new(&grid, PoissonOptions::default()).unwrap()
            .decompose(values.view()).unwrap()
            .solve().unwrap();
        assert!(potential.compute(grid.points(), 2).is_err());
    }

    #[test]
    fn under_resolved_radial_grid() {
        let radial = RadialGrid::new(
            OneDQuadrature::GaussChebyshevType2 { points: 4 },
            RadialTransform::Becke { rmin: 1e-4, scale: 1.5 },
        ).unwrap();
        let grid = AtomicGrid::uniform(radial, 11, Vector3D::zero()).unwrap();
        let values = density(&grid, Vector3D::zero(), 0.0);

        let error = PoissonSolver::new(&grid, PoissonOptions::default()).unwrap()
            .decompose(values.view()).unwrap()
            .solve().unwrap_err();

        match error {
            Error::Convergence { l, m, residual } => {
                assert_eq!((l, m), (0, 0));
                assert!(residual > 1.0);
            }
            _ => panic!("unexpected error: {}", error),
        }
    }

    #[test]
    fn radial_equation_residual() {
        let grid = atomic_grid(Vector3D::zero(), 11);
        let values = density(&grid, Vector3D::zero(), 0.7);

        let options = PoissonOptions { max_angular: 2, ..Default::default() };
        let decomposed = PoissonSolver::new(&grid, options).unwrap().decompose(values.view()).unwrap();
        let potential = decomposed.clone().solve().unwrap();

        // u = r V_lm solves u'' - l (l + 1) u / r² = -4π r ρ_lm
        let u = |r: f64| potential.radial_potential(r) * r;
        let delta = 1e-3;
        for i in 0..20 {
            let r = 0.3 + 0.15 * i as f64;
            let second = (u(r + delta) - 2.0 * u(r) + u(r - delta)) / (delta * delta);
            let center = u(r);
            let rho = decomposed.radial_density(r);
            for (l, m) in channels(2) {
                let lm = channel_index(l, m);
                let residual = second[lm] - (l * (l + 1)) as f64 * center[lm] / (r * r) + FOUR_PI * r * rho[lm];
                assert!(residual.abs() < 1e-3, "residual is {} for l={} m={} at r={}", residual, l, m, r);
            }
        }

        // outside of the mesh, V_lm = 4π / (2l + 1) q_lm / r^(l + 1)
        let r = 1e4;
        let radial = potential.radial_potential(r);
        let multipoles = decomposed.multipoles();
        let lm = channel_index(1, 0);
        assert_relative_eq!(radial[lm], FOUR_PI / 3.0 * multipoles[lm] / (r * r), max_relative=1e-12);
    }
}
