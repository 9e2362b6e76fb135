use std::cell::RefCell;

use log::warn;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::{Error, Vector3D};
use crate::errors::check_size;
use crate::grids::{AtomicGrid, RadialTransform};
use crate::math::{CubicSpline, SphericalHarmonicsBuffer, channel_count, channels};

/// Scratch memory used when evaluating interpolation models on one thread
pub(crate) struct EvaluationBuffer {
    pub(crate) harmonics: SphericalHarmonicsBuffer,
    pub(crate) coefficients: Array1<f64>,
    pub(crate) derivatives: Array1<f64>,
}

impl EvaluationBuffer {
    pub(crate) fn new(max_angular: usize) -> EvaluationBuffer {
        let n_channels = channel_count(max_angular);
        EvaluationBuffer {
            harmonics: SphericalHarmonicsBuffer::new(max_angular),
            coefficients: Array1::zeros(n_channels),
            derivatives: Array1::zeros(n_channels),
        }
    }
}

/// Interpolation of a function sampled on an [`AtomicGrid`], as an expansion
/// on real spherical harmonics with radial coefficients given by cubic
/// splines:
///
/// ```text
/// f(r) = Σ_lm c_lm(|r - C|) Y_lm(r - C)
/// ```
///
/// The splines are natural cubic splines in the canonical coordinate `x` of
/// the radial transform, going through the angular projection of the
/// function on each shell. Below the innermost shell at `r_in`, the
/// coefficients behave like `c_lm(r_in) (r / r_in)^l`, and beyond the
/// outermost shell the model is zero.
#[derive(Debug, Clone)]
pub struct InterpolationModel {
    center: Vector3D,
    transform: RadialTransform,
    max_angular: usize,
    spline: CubicSpline,
    /// angular momentum of each channel
    angular: Vec<usize>,
    /// radius of the innermost shell
    rmin: f64,
    /// radius of the outermost shell
    rmax: f64,
}

impl InterpolationModel {
    /// Fit a model of `values` sampled on the points of `grid`, using
    /// spherical harmonics up to `max_angular`.
    #[time_graph::instrument(name = "InterpolationModel::new")]
    pub fn new(grid: &AtomicGrid, values: ArrayView1<'_, f64>, max_angular: usize) -> Result<InterpolationModel, Error> {
        let resolved = grid.degrees().into_iter().max().unwrap_or(0) / 2;
        if max_angular > resolved {
            warn!(
                "interpolation with max_angular={} on a grid which only resolves \
                spherical harmonics up to l={}, higher channels will be zero",
                max_angular, resolved
            );
        }

        let components = grid.radial_component(values, max_angular)?;

        let radial = grid.radial();
        let mut order = (0..radial.size()).collect::<Vec<_>>();
        let canonical = radial.canonical_points();
        order.sort_by(|&a, &b| canonical[a].total_cmp(&canonical[b]));

        let knots = order.iter().map(|&shell| canonical[shell]).collect::<Vec<_>>();
        let components = components.select(Axis(0), &order);
        let spline = CubicSpline::natural(knots, components)?;

        let transform = *radial.transform();
        return Ok(InterpolationModel {
            center: grid.center(),
            transform: transform,
            max_angular: max_angular,
            rmin: transform.transform(spline.start()),
            rmax: transform.transform(spline.stop()),
            spline: spline,
            angular: channels(max_angular).map(|(l, _)| l).collect(),
        });
    }

    /// Get the center of the atomic grid used to create this model
    pub fn center(&self) -> Vector3D {
        self.center
    }

    /// Get the maximal angular momentum used in this model
    pub fn max_angular(&self) -> usize {
        self.max_angular
    }

    /// Get the radial coefficients of this model at distance `r` from the
    /// center, with channels ordered as in [`crate::math::channel_index`]
    pub fn radial_coefficients(&self, r: f64) -> Array1<f64> {
        let mut buffer = EvaluationBuffer::new(self.max_angular);
        self.coefficients_at(r, &mut buffer, false);
        return buffer.coefficients;
    }

    /// Evaluate the model at the given `points`, with shape `(n_points, 3)`
    pub fn evaluate(&self, points: ArrayView2<'_, f64>) -> Result<Array1<f64>, Error> {
        let (values, _) = evaluate_all(points, self.max_angular, false, |point, buffer| {
            self.evaluate_point(point, buffer, false)
        })?;
        return Ok(values);
    }

    /// Evaluate the gradient of the model at the given `points`, with shape
    /// `(n_points, 3)`
    pub fn gradient(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, Error> {
        let (_, gradients) = evaluate_all(points, self.max_angular, true, |point, buffer| {
            self.evaluate_point(point, buffer, true)
        })?;
        return Ok(gradients);
    }

    /// Evaluate the model (`derivative = 0`, giving an array with shape
    /// `(n_points, 1)`) or its gradient (`derivative = 1`, shape `(n_points,
    /// 3)`) at the given `points`.
    pub fn compute(&self, points: ArrayView2<'_, f64>, derivative: usize) -> Result<Array2<f64>, Error> {
        return match derivative {
            0 => Ok(self.evaluate(points)?.insert_axis(Axis(1))),
            1 => self.gradient(points),
            _ => Err(unsupported_derivative(derivative)),
        };
    }

    /// Set `buffer.coefficients` (and optionally `buffer.derivatives`, with
    /// respect to `r`) at distance `r` from the center
    fn coefficients_at(&self, r: f64, buffer: &mut EvaluationBuffer, gradient: bool) -> bool {
        // points on the outermost shell can be slightly outside due to rounding
        if r > self.rmax * (1.0 + 1e-12) {
            return false;
        }

        if r < self.rmin {
            self.spline.compute(self.spline.start(), buffer.coefficients.view_mut(), None);
            let scaled = r / self.rmin;
            for (lm, &l) in self.angular.iter().enumerate() {
                let inner = buffer.coefficients[lm];
                buffer.coefficients[lm] = inner * scaled.powi(l as i32);
                if gradient {
                    buffer.derivatives[lm] = if l == 0 {
                        0.0
                    } else {
                        l as f64 * inner * scaled.powi(l as i32 - 1) / self.rmin
                    };
                }
            }
        } else {
            let x = self.transform.inverse(r).clamp(self.spline.start(), self.spline.stop());
            if gradient {
                self.spline.compute(x, buffer.coefficients.view_mut(), Some(buffer.derivatives.view_mut()));
                buffer.derivatives /= self.transform.deriv(x);
            } else {
                self.spline.compute(x, buffer.coefficients.view_mut(), None);
            }
        }

        return true;
    }

    /// Evaluate the model (and optionally its gradient) at a single point
    fn evaluate_point(&self, point: Vector3D, buffer: &mut EvaluationBuffer, gradient: bool) -> (f64, Vector3D) {
        let displacement = point - self.center;
        if !self.coefficients_at(displacement.norm(), buffer, gradient) {
            return (0.0, Vector3D::zero());
        }
        return sum_expansion(buffer, displacement, gradient);
    }
}

/// Sum the expansion `Σ_lm c_lm(r) Y_lm(r̂)` at `displacement` from the
/// center, and optionally its gradient. The radial coefficients `c_lm` and
/// their derivatives with respect to `r` must already be in `buffer`.
pub(crate) fn sum_expansion(buffer: &mut EvaluationBuffer, displacement: Vector3D, gradient: bool) -> (f64, Vector3D) {
    let r = displacement.norm();
    let direction = displacement.normalized();
    buffer.harmonics.compute(direction, gradient);
    let harmonics = buffer.harmonics.values.as_slice();

    let value = buffer.coefficients.iter().zip(harmonics).map(|(c, y)| c * y).sum::<f64>();
    if !gradient {
        return (value, Vector3D::zero());
    }

    let mut radial_part = 0.0;
    let mut angular_part = Vector3D::zero();
    let [gx, gy, gz] = &buffer.harmonics.gradients;
    for lm in 0..harmonics.len() {
        radial_part += buffer.derivatives[lm] * harmonics[lm];
        let c = buffer.coefficients[lm];
        angular_part += c * Vector3D::new(gx.as_slice()[lm], gy.as_slice()[lm], gz.as_slice()[lm]);
    }

    let mut total = radial_part * direction;
    if r > 0.0 {
        total += angular_part / r;
    }

    return (value, total);
}

pub(crate) fn unsupported_derivative(derivative: usize) -> Error {
    Error::UnsupportedOperation(format!(
        "only derivatives of order 0 and 1 are available, got {}",
        derivative
    ))
}

/// Evaluate `function` on all `points` in parallel, returning the values and
/// the gradients (if `gradient` is true, otherwise the gradients are zero)
pub(crate) fn evaluate_all<F>(
    points: ArrayView2<'_, f64>,
    max_angular: usize,
    gradient: bool,
    function: F,
) -> Result<(Array1<f64>, Array2<f64>), Error>
    where F: Fn(Vector3D, &mut EvaluationBuffer) -> (f64, Vector3D) + Sync,
{
    check_size(3, points.ncols())?;

    let n_points = points.nrows();
    let mut values = Array1::zeros(n_points);
    let mut gradients = if gradient {
        Array2::zeros((n_points, 3))
    } else {
        Array2::zeros((n_points, 0))
    };

    let buffers = ThreadLocal::new();
    Zip::from(&mut values)
        .and(gradients.axis_iter_mut(Axis(0)))
        .and(points.axis_iter(Axis(0)))
        .into_par_iter()
        .for_each(|(value, mut gradient_row, point)| {
            let mut buffer = buffers.get_or(|| {
                RefCell::new(EvaluationBuffer::new(max_angular))
            }).borrow_mut();

            let (v, g) = function(Vector3D::from_row(point), &mut buffer);
            *value = v;
            if gradient {
                gradient_row[0] = g[0];
                gradient_row[1] = g[1];
                gradient_row[2] = g[2];
            }
        });

    return Ok((values, gradients));
}

/// Interpolation of a function sampled on a [`crate::MolecularGrid`], as a
/// sum of atom-centered [`InterpolationModel`].
///
/// Each atomic model is fitted to the function multiplied by the
/// atoms-in-molecule weight of the corresponding atom, so the sum over atoms
/// reproduces the full function.
#[derive(Debug, Clone)]
pub struct MolecularInterpolation {
    models: Vec<InterpolationModel>,
    max_angular: usize,
}

impl MolecularInterpolation {
    /// Fit one model per atom, using `values[i]` sampled on `grids[i]`
    #[time_graph::instrument(name = "MolecularInterpolation::new")]
    pub fn new(grids: &[AtomicGrid], values: &[ArrayView1<'_, f64>], max_angular: usize) -> Result<MolecularInterpolation, Error> {
        check_size(grids.len(), values.len())?;

        let models = grids.par_iter()
            .zip(values.par_iter())
            .map(|(grid, values)| InterpolationModel::new(grid, values.view(), max_angular))
            .collect::<Result<Vec<_>, _>>()?;

        return Ok(MolecularInterpolation {
            models: models,
            max_angular: max_angular,
        });
    }

    /// Get the atomic models making this interpolation
    pub fn models(&self) -> &[InterpolationModel] {
        &self.models
    }

    /// Evaluate the interpolated function at the given `points`, with shape
    /// `(n_points, 3)`
    pub fn evaluate(&self, points: ArrayView2<'_, f64>) -> Result<Array1<f64>, Error> {
        let (values, _) = evaluate_all(points, self.max_angular, false, |point, buffer| {
            self.evaluate_point(point, buffer, false)
        })?;
        return Ok(values);
    }

    /// Evaluate the gradient of the interpolated function at the given
    /// `points`, with shape `(n_points, 3)`
    pub fn gradient(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, Error> {
        let (_, gradients) = evaluate_all(points, self.max_angular, true, |point, buffer| {
            self.evaluate_point(point, buffer, true)
        })?;
        return Ok(gradients);
    }

    /// Same as [`InterpolationModel::compute`], for the full molecule
    pub fn compute(&self, points: ArrayView2<'_, f64>, derivative: usize) -> Result<Array2<f64>, Error> {
        return match derivative {
            0 => Ok(self.evaluate(points)?.insert_axis(Axis(1))),
            1 => self.gradient(points),
            _ => Err(unsupported_derivative(derivative)),
        };
    }

    fn evaluate_point(&self, point: Vector3D, buffer: &mut EvaluationBuffer, gradient: bool) -> (f64, Vector3D) {
        let mut value = 0.0;
        let mut total_gradient = Vector3D::zero();
        for model in &self.models {
            let (v, g) = model.evaluate_point(point, buffer, gradient);
            value += v;
            total_gradient += g;
        }
        return (value, total_gradient);
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use ndarray::Array2;

    use crate::{AtomicGrid, RadialGrid, OneDQuadrature, RadialTransform, Vector3D};
    use crate::math::channel_index;

    fn atomic_grid(center: Vector3D) -> AtomicGrid {
        let radial = RadialGrid::new(
            OneDQuadrature::GaussChebyshevType2 { points: 80 },
            RadialTransform::Becke { rmin: 0.0, scale: 1.0 },
        ).unwrap();
        AtomicGrid::uniform(radial, 11, center).unwrap()
    }

    /// f(r) = exp(-r²) (1 + x + y z), relative to `center`
    fn function(point: Vector3D, center: Vector3D) -> f64 {
        let d = point - center;
        f64::exp(-d.norm2()) * (1.0 + d[0] + d[1] * d[2])
    }

    fn function_gradient(point: Vector3D, center: Vector3D) -> Vector3D {
        let d = point - center;
        let e = f64::exp(-d.norm2());
        let f = 1.0 + d[0] + d[1] * d[2];
        Vector3D::new(
            e * (1.0 - 2.0 * d[0] * f),
            e * (d[2] - 2.0 * d[1] * f),
            e * (d[1] - 2.0 * d[2] * f),
        )
    }

    fn off_grid_points(center: Vector3D) -> Array2<f64> {
        Array2::from_shape_fn((60, 3), |(i, j)| {
            let r = 0.3 + 2.5 * i as f64 / 59.0;
            let theta = 0.4 + 0.05 * i as f64;
            let phi = 0.9 * i as f64;
            let direction = [
                f64::sin(theta) * f64::cos(phi),
                f64::sin(theta) * f64::sin(phi),
                f64::cos(theta),
            ];
            center[j] + r * direction[j]
        })
    }

    #[test]
    fn reproduce_grid_values() {
        let center = Vector3D::new(0.2, -0.1, 0.4);
        let grid = atomic_grid(center);
        let values = grid.points().rows().into_iter()
            .map(|p| function(Vector3D::from_row(p), center))
            .collect::<ndarray::Array1<f64>>();

        let model = grid.interpolate(values.view(), 4).unwrap();
        let interpolated = model.evaluate(grid.points()).unwrap();
        for (actual, expected) in interpolated.iter().zip(&values) {
            assert_relative_eq!(actual, expected, epsilon=1e-10);
        }
    }

    #[test]
    fn off_grid_values_and_gradients() {
        let center = Vector3D::new(0.2, -0.1, 0.4);
        let grid = atomic_grid(center);
        let values = grid.points().rows().into_iter()
            .map(|p| function(Vector3D::from_row(p), center))
            .collect::<ndarray::Array1<f64>>();
        let model = grid.interpolate(values.view(), 4).unwrap();

        let points = off_grid_points(center);
        let interpolated = model.evaluate(points.view()).unwrap();
        let gradients = model.gradient(points.view()).unwrap();
        for (i, point) in points.rows().into_iter().enumerate() {
            let point = Vector3D::from_row(point);
            assert_relative_eq!(interpolated[i], function(point, center), epsilon=1e-4);

            let expected = function_gradient(point, center);
            for k in 0..3 {
                assert_relative_eq!(gradients[[i, k]], expected[k], epsilon=2e-3);
            }
        }

        let computed = model.compute(points.view(), 0).unwrap();
        assert_eq!(computed.shape(), [60, 1]);
        assert_eq!(computed.column(0), interpolated);
        assert_eq!(model.compute(points.view(), 1).unwrap(), gradients);
    }

    #[test]
    fn outside_of_the_grid() {
        let grid = atomic_grid(Vector3D::zero());
        let values = grid.points().rows().into_iter()
            .map(|p| 2.0 + Vector3D::from_row(p)[2])
            .collect::<ndarray::Array1<f64>>();
        let model = grid.interpolate(values.view(), 2).unwrap();

        // beyond the last shell
        let far = ndarray::arr2(&[[1e5, 0.0, 0.0]]);
        assert_eq!(model.evaluate(far.view()).unwrap()[0], 0.0);
        assert_eq!(model.gradient(far.view()).unwrap().row(0).to_vec(), [0.0, 0.0, 0.0]);

        // below the first shell, the l = 1 channels vanish linearly
        let origin = ndarray::arr2(&[[0.0, 0.0, 0.0]]);
        let value = model.evaluate(origin.view()).unwrap()[0];
        assert_relative_eq!(value, 2.0, max_relative=1e-10);

        let coefficients = model.radial_coefficients(0.0);
        assert_relative_eq!(coefficients[channel_index(0, 0)], 2.0 * f64::sqrt(4.0 * PI), max_relative=1e-10);
        assert_eq!(coefficients[channel_index(1, 0)], 0.0);

        let first_shell = grid.radial().points()[0];
        let coefficients = model.radial_coefficients(0.5 * first_shell);
        assert_relative_eq!(
            coefficients[channel_index(1, 0)],
            f64::sqrt(4.0 * PI / 3.0) * 0.5 * first_shell,
            max_relative=1e-10
        );

        let inside = ndarray::arr2(&[[1e-3 * first_shell, 0.0, 0.0], [0.0, 0.0, -0.5 * first_shell]]);
        let values = model.evaluate(inside.view()).unwrap();
        assert_relative_eq!(values[0], 2.0, max_relative=1e-10);
        assert_relative_eq!(values[1], 2.0 - 0.5 * first_shell, max_relative=1e-10);

        let gradients = model.gradient(inside.view()).unwrap();
        for i in 0..2 {
            assert_relative_eq!(gradients[[i, 0]], 0.0, epsilon=1e-10);
            assert_relative_eq!(gradients[[i, 1]], 0.0, epsilon=1e-10);
            assert_relative_eq!(gradients[[i, 2]], 1.0, epsilon=1e-10);
        }
    }

    #[test]
    fn unsupported_derivative() {
        let grid = atomic_grid(Vector3D::zero());
        let values = ndarray::Array1::ones(grid.size());
        let model = grid.interpolate(values.view(), 0).unwrap();

        let error = model.compute(grid.points(), 2).unwrap_err();
        assert_eq!(
            error.to_string(),
            "unsupported operation: only derivatives of order 0 and 1 are available, got 2"
        );
    }
}
