//! Multipole moments of functions sampled on a grid.

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::errors::check_size;
use crate::math::{SphericalHarmonicsBuffer, channel_index, FOUR_PI};

/// Number of points handled together in a parallel task
const CHUNK_SIZE: usize = 1024;

/// Kind of multipole moments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum MomentKind {
    /// Cartesian moments `∫ (x - X)^nx (y - Y)^ny (z - Z)^nz f(r) dr` for
    /// `nx + ny + nz <= max_order`
    Cartesian,
    /// Spherical moments `∫ R_lm(r - C) f(r) dr` with the regular solid
    /// harmonics in Racah normalization `R_lm(r) = sqrt(4π / (2l + 1)) r^l
    /// Y_lm(r̂)`, for `l <= max_order`
    Spherical,
    /// Radial moments `∫ |r - C|^n f(r) dr` for `n <= max_order`
    Radial,
    /// Products of radial and angular parts, `∫ |r - C|^n sqrt(4π / (2l + 1))
    /// Y_lm(r̂) f(r) dr` for `n <= max_order` and `l <= max_order`
    RadialSpherical,
}

/// A single entry in the list of moments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MomentOrder {
    Cartesian { nx: usize, ny: usize, nz: usize },
    Spherical { l: usize, m: isize },
    Radial { n: usize },
    RadialSpherical { n: usize, l: usize, m: isize },
}

/// Values of `m` for a given `l`, in the order `0, 1, -1, 2, -2, ...`
fn m_values(l: usize) -> impl Iterator<Item = isize> {
    std::iter::once(0).chain((1..=l as isize).flat_map(|m| [m, -m]))
}

impl MomentKind {
    /// Get all the orders of this kind up to `max_order`, in the order used
    /// for the values in [`Moments`]
    pub fn orders(&self, max_order: usize) -> Vec<MomentOrder> {
        let mut orders = Vec::new();
        match self {
            MomentKind::Cartesian => {
                for l in 0..=max_order {
                    for nx in (0..=l).rev() {
                        for ny in (0..=(l - nx)).rev() {
                            orders.push(MomentOrder::Cartesian { nx, ny, nz: l - nx - ny });
                        }
                    }
                }
            }
            MomentKind::Spherical => {
                for l in 0..=max_order {
                    orders.extend(m_values(l).map(|m| MomentOrder::Spherical { l, m }));
                }
            }
            MomentKind::Radial => {
                orders.extend((0..=max_order).map(|n| MomentOrder::Radial { n }));
            }
            MomentKind::RadialSpherical => {
                for n in 0..=max_order {
                    for l in 0..=max_order {
                        orders.extend(m_values(l).map(|m| MomentOrder::RadialSpherical { n, l, m }));
                    }
                }
            }
        }
        return orders;
    }

    fn needs_harmonics(&self) -> bool {
        matches!(self, MomentKind::Spherical | MomentKind::RadialSpherical)
    }
}

/// Multipole moments of a set of functions around a set of centers
#[derive(Debug, Clone)]
pub struct Moments {
    /// the moments which have been computed
    pub orders: Vec<MomentOrder>,
    /// values of the moments, with shape `(n_orders, n_centers, n_functions)`
    pub values: Array3<f64>,
}

impl Moments {
    /// Get the moment with the given `order` for all functions around the
    /// center `center`, if this order was computed
    pub fn get(&self, order: MomentOrder, center: usize) -> Option<ArrayView1<'_, f64>> {
        let index = self.orders.iter().position(|&o| o == order)?;
        return Some(self.values.slice(ndarray::s![index, center, ..]));
    }
}

/// Evaluate all basis functions for one displacement from a center
struct BasisEvaluator {
    orders: Vec<MomentOrder>,
    max_order: usize,
    harmonics: Option<SphericalHarmonicsBuffer>,
    /// powers of x, y, z and r up to `max_order`
    powers: Array2<f64>,
}

impl BasisEvaluator {
    fn new(kind: MomentKind, max_order: usize) -> BasisEvaluator {
        BasisEvaluator {
            orders: kind.orders(max_order),
            max_order: max_order,
            harmonics: if kind.needs_harmonics() {
                Some(SphericalHarmonicsBuffer::new(max_order))
            } else {
                None
            },
            powers: Array2::zeros((4, max_order + 1)),
        }
    }

    fn compute(&mut self, displacement: Vector3D, basis: &mut [f64]) {
        let r = displacement.norm();
        let components = [displacement[0], displacement[1], displacement[2], r];
        for (mut row, value) in self.powers.rows_mut().into_iter().zip(components) {
            row[0] = 1.0;
            for k in 1..=self.max_order {
                row[k] = row[k - 1] * value;
            }
        }

        if let Some(ref mut harmonics) = self.harmonics {
            harmonics.compute(displacement.normalized(), false);
        }

        for (value, order) in basis.iter_mut().zip(&self.orders) {
            *value = match *order {
                MomentOrder::Cartesian { nx, ny, nz } => {
                    self.powers[[0, nx]] * self.powers[[1, ny]] * self.powers[[2, nz]]
                }
                MomentOrder::Radial { n } => self.powers[[3, n]],
                MomentOrder::Spherical { l, m } => {
                    self.powers[[3, l]] * racah_harmonic(self.harmonics.as_ref(), l, m)
                }
                MomentOrder::RadialSpherical { n, l, m } => {
                    self.powers[[3, n]] * racah_harmonic(self.harmonics.as_ref(), l, m)
                }
            };
        }
    }
}

#[inline]
fn racah_harmonic(harmonics: Option<&SphericalHarmonicsBuffer>, l: usize, m: isize) -> f64 {
    let value = harmonics.map_or(0.0, |h| h.values.as_slice()[channel_index(l, m)]);
    return f64::sqrt(FOUR_PI / (2 * l + 1) as f64) * value;
}

/// Compute the moments of `values` (shape `(n_functions, n_points)`) using
/// the grid `points` and `weights`, around all `centers`
#[time_graph::instrument(name = "moments::compute")]
pub(crate) fn compute(
    points: ArrayView2<'_, f64>,
    weights: ArrayView1<'_, f64>,
    values: ArrayView2<'_, f64>,
    centers: &[Vector3D],
    max_order: usize,
    kind: MomentKind,
) -> Result<Moments, Error> {
    check_size(weights.len(), points.nrows())?;
    check_size(weights.len(), values.ncols())?;

    let orders = kind.orders(max_order);
    let n_orders = orders.len();
    let n_centers = centers.len();
    let n_functions = values.nrows();
    let shape = (n_orders, n_centers, n_functions);

    let chunks = (0..weights.len()).step_by(CHUNK_SIZE).collect::<Vec<_>>();
    let moments = chunks.into_par_iter()
        .fold(
            || (Array3::<f64>::zeros(shape), BasisEvaluator::new(kind, max_order), vec![0.0; n_orders]),
            |(mut moments, mut evaluator, mut basis), start| {
                let stop = usize::min(start + CHUNK_SIZE, weights.len());
                for i in start..stop {
                    let point = Vector3D::from_row(points.row(i));
                    let function_values = values.column(i);
                    for (c, center) in centers.iter().enumerate() {
                        evaluator.compute(point - center, &mut basis);
                        for (o, &b) in basis.iter().enumerate() {
                            let factor = weights[i] * b;
                            let mut output = moments.index_axis_mut(Axis(0), o);
                            let mut output = output.index_axis_mut(Axis(0), c);
                            output.scaled_add(factor, &function_values);
                        }
                    }
                }
                (moments, evaluator, basis)
            },
        )
        .map(|(moments, _, _)| moments)
        .reduce(|| Array3::zeros(shape), |a, b| a + b);

    return Ok(Moments {
        orders: orders,
        values: moments,
    });
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    use super::*;

    #[test]
    fn orders() {
        let orders = MomentKind::Cartesian.orders(2);
        let expected = [
            (0, 0, 0),
            (1, 0, 0), (0, 1, 0), (0, 0, 1),
            (2, 0, 0), (1, 1, 0), (1, 0, 1), (0, 2, 0), (0, 1, 1), (0, 0, 2),
        ];
        assert_eq!(orders.len(), expected.len());
        for (order, (nx, ny, nz)) in orders.iter().zip(expected) {
            assert_eq!(*order, MomentOrder::Cartesian { nx, ny, nz });
        }

        let orders = MomentKind::Spherical.orders(2);
        let expected = [(0, 0), (1, 0), (1, 1), (1, -1), (2, 0), (2, 1), (2, -1), (2, 2), (2, -2)];
        for (order, (l, m)) in orders.iter().zip(expected) {
            assert_eq!(*order, MomentOrder::Spherical { l, m });
        }

        assert_eq!(MomentKind::Radial.orders(3).len(), 4);
        assert_eq!(MomentKind::RadialSpherical.orders(2).len(), 3 * 9);
    }

    #[test]
    fn point_charges() {
        // three point "charges", integrated with unit weights
        let points = ndarray::arr2(&[[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, -1.0]]);
        let weights = ndarray::arr1(&[1.0, 1.0, 1.0]);
        let values = ndarray::arr2(&[[1.0, -1.0, 2.0], [1.0, 1.0, 1.0]]);

        let centers = [Vector3D::zero(), Vector3D::new(1.0, 0.0, 0.0)];
        let moments = compute(points.view(), weights.view(), values.view(), &centers, 2, MomentKind::Cartesian).unwrap();
        assert_eq!(moments.values.shape(), [10, 2, 2]);

        let charge = moments.get(MomentOrder::Cartesian { nx: 0, ny: 0, nz: 0 }, 0).unwrap();
        assert_eq!(charge.to_vec(), [2.0, 3.0]);

        let dipole_z = moments.get(MomentOrder::Cartesian { nx: 0, ny: 0, nz: 1 }, 0).unwrap();
        assert_eq!(dipole_z.to_vec(), [-2.0, -1.0]);

        let dipole_x = moments.get(MomentOrder::Cartesian { nx: 1, ny: 0, nz: 0 }, 1).unwrap();
        assert_eq!(dipole_x.to_vec(), [0.0 - 1.0 * -1.0 + 2.0 * -1.0, -2.0]);

        // Racah-normalized l=1 harmonics are x, y, z
        let spherical = compute(points.view(), weights.view(), values.view(), &centers, 1, MomentKind::Spherical).unwrap();
        for (m, cartesian) in [(0, (0, 0, 1)), (1, (1, 0, 0)), (-1, (0, 1, 0))] {
            let (nx, ny, nz) = cartesian;
            let expected = moments.get(MomentOrder::Cartesian { nx, ny, nz }, 0).unwrap();
            let actual = spherical.get(MomentOrder::Spherical { l: 1, m }, 0).unwrap();
            for (a, e) in actual.iter().zip(expected) {
                assert_relative_eq!(a, e, epsilon=1e-14);
            }
        }

        let radial = compute(points.view(), weights.view(), values.view(), &centers, 2, MomentKind::Radial).unwrap();
        let r2 = radial.get(MomentOrder::Radial { n: 2 }, 0).unwrap();
        assert_relative_eq!(r2[0], 1.0 - 4.0 + 2.0, epsilon=1e-14);
        assert_relative_eq!(r2[1], 1.0 + 4.0 + 1.0, epsilon=1e-14);
    }

    #[test]
    fn many_points() {
        // more points than a single parallel chunk
        let n_points = 3 * CHUNK_SIZE + 17;
        let points = Array2::from_shape_fn((n_points, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64 - 5.0);
        let weights = Array1::from_elem(n_points, 0.5);
        let values = Array2::ones((1, n_points));

        let moments = compute(points.view(), weights.view(), values.view(), &[Vector3D::zero()], 1, MomentKind::RadialSpherical).unwrap();
        let monopole = moments.get(MomentOrder::RadialSpherical { n: 0, l: 0, m: 0 }, 0).unwrap();
        assert_relative_eq!(monopole[0], 0.5 * n_points as f64, max_relative=1e-12);
    }

    #[test]
    fn size_mismatch() {
        let points = Array2::zeros((4, 3));
        let weights = Array1::ones(4);
        let values = Array2::zeros((2, 5));
        let error = compute(points.view(), weights.view(), values.view(), &[], 1, MomentKind::Radial).unwrap_err();
        assert_eq!(error.to_string(), "size mismatch: expected an array with 4 values, got 5");
    }
}
