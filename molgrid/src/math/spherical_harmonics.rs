use std::f64::consts::{PI, SQRT_2};

use crate::Vector3D;

/// Number of `(l, m)` channels with `l <= max_angular`
#[inline]
pub fn channel_count(max_angular: usize) -> usize {
    (max_angular + 1) * (max_angular + 1)
}

/// Linear index of the `(l, m)` channel in arrays storing all channels with
/// `-l <= m <= l`, ordered by increasing `l` then increasing `m`.
#[inline]
pub fn channel_index(l: usize, m: isize) -> usize {
    debug_assert!(m.unsigned_abs() <= l);
    return ((l * l + l) as isize + m) as usize;
}

/// Iterate over all `(l, m)` channels up to `max_angular`, in the order
/// defined by [`channel_index`].
pub fn channels(max_angular: usize) -> impl Iterator<Item = (usize, isize)> {
    (0..=max_angular).flat_map(|l| {
        let l_signed = l as isize;
        (-l_signed..=l_signed).map(move |m| (l, m))
    })
}

/// Storage for `0 <= m <= l <= l_max`, row by row
#[derive(Clone, Debug)]
struct TriangularArray {
    max_angular: usize,
    data: Vec<f64>,
}

impl TriangularArray {
    fn new(max_angular: usize) -> TriangularArray {
        TriangularArray {
            max_angular: max_angular,
            data: vec![0.0; (max_angular + 1) * (max_angular + 2) / 2],
        }
    }

    /// Get the `(l, m)` entry, or zero when `m > l`
    #[inline]
    fn get(&self, l: usize, m: usize) -> f64 {
        if m > l {
            0.0
        } else {
            self.data[l * (l + 1) / 2 + m]
        }
    }

    #[inline]
    fn set(&mut self, l: usize, m: usize, value: f64) {
        debug_assert!(l <= self.max_angular && m <= l);
        self.data[l * (l + 1) / 2 + m] = value;
    }
}

/// One value per `(l, m)` channel for `0 <= l <= l_max`, `-l <= m <= l`.
/// The array can be indexed with `[l, m]`, and the underlying storage
/// follows [`channel_index`].
///
/// ```
/// # use molgrid::math::SphericalHarmonicsArray;
/// let mut array = SphericalHarmonicsArray::new(8);
/// array[[6, 3]] = 3.0;
/// array[[6, -3]] = -3.0;
/// assert_eq!(array.as_slice()[molgrid::math::channel_index(6, -3)], -3.0);
/// ```
#[derive(Clone, Debug)]
pub struct SphericalHarmonicsArray {
    max_angular: usize,
    data: Vec<f64>,
}

impl SphericalHarmonicsArray {
    /// Create a new array for channels up to `max_angular`, filled with zeros
    pub fn new(max_angular: usize) -> SphericalHarmonicsArray {
        SphericalHarmonicsArray {
            max_angular: max_angular,
            data: vec![0.0; channel_count(max_angular)],
        }
    }

    pub fn max_angular(&self) -> usize {
        self.max_angular
    }

    /// Get all values in this array, ordered according to [`channel_index`]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Set the `(l, m)` and `(l, -m)` entries at once
    #[inline]
    fn set_pair(&mut self, l: usize, m: usize, positive: f64, negative: f64) {
        let center = l * l + l;
        self.data[center + m] = positive;
        self.data[center - m] = negative;
    }
}

impl std::ops::Index<[isize; 2]> for SphericalHarmonicsArray {
    type Output = f64;
    fn index(&self, [l, m]: [isize; 2]) -> &f64 {
        debug_assert!(l as usize <= self.max_angular);
        &self.data[channel_index(l as usize, m)]
    }
}

impl std::ops::IndexMut<[isize; 2]> for SphericalHarmonicsArray {
    fn index_mut(&mut self, [l, m]: [isize; 2]) -> &mut f64 {
        debug_assert!(l as usize <= self.max_angular);
        &mut self.data[channel_index(l as usize, m)]
    }
}

/// Real spherical harmonics (orthonormal on the unit sphere, without
/// Condon-Shortley phase) and their Cartesian gradients.
///
/// The harmonics are evaluated as regular solid harmonics on the unit
/// sphere, `R_l^m(x, y, z) = N_lm Q_l^m(z, r) C_m(x, y)`, where `C_m` and
/// `S_m` are the real and imaginary parts of `(x + i y)^m` and `Q_l^m` are
/// homogeneous polynomials following the recurrence of associated Legendre
/// polynomials:
///
/// ```text
/// Q_m^m = (2m - 1) Q_{m-1}^{m-1}
/// Q_{m+1}^m = (2m + 1) z Q_m^m
/// (l - m) Q_l^m = (2l - 1) z Q_{l-1}^m - (l + m - 1) r² Q_{l-2}^m
/// ```
///
/// Gradients use `∂Q_l^m/∂x = -x Q_{l-1}^{m+1}`, `∂Q_l^m/∂z = (l + m)
/// Q_{l-1}^m`, and are projected on the sphere: they are the derivatives of
/// `Y_l^m(r / |r|)` at `|r| = 1`, and must be divided by `|r|` for points
/// away from the unit sphere.
#[derive(Debug, Clone)]
pub struct SphericalHarmonics {
    max_angular: usize,
    /// `N_lm`, including the `√2` for `m > 0`
    normalization: TriangularArray,
    /// `Q_l^m` at the current direction
    q: TriangularArray,
    /// `C_m` and `S_m` at the current direction
    cos_m: Vec<f64>,
    sin_m: Vec<f64>,
}

impl SphericalHarmonics {
    /// Create a calculator for harmonics up to `max_angular`
    pub fn new(max_angular: usize) -> SphericalHarmonics {
        let mut normalization = TriangularArray::new(max_angular);
        for l in 0..=max_angular {
            let mut factorial_ratio = 1.0;
            for m in 0..=l {
                // (l - m)! / (l + m)!
                if m > 0 {
                    factorial_ratio /= ((l + m) * (l - m + 1)) as f64;
                }

                let mut value = f64::sqrt((2 * l + 1) as f64 / (4.0 * PI) * factorial_ratio);
                if m > 0 {
                    value *= SQRT_2;
                }
                normalization.set(l, m, value);
            }
        }

        SphericalHarmonics {
            max_angular: max_angular,
            normalization: normalization,
            q: TriangularArray::new(max_angular),
            cos_m: vec![0.0; max_angular + 1],
            sin_m: vec![0.0; max_angular + 1],
        }
    }

    /// Get the maximal angular degree computed by this calculator
    pub fn max_angular(&self) -> usize {
        self.max_angular
    }

    fn compute_polynomials(&mut self, direction: Vector3D) {
        let [x, y, z] = [direction[0], direction[1], direction[2]];

        self.cos_m[0] = 1.0;
        self.sin_m[0] = 0.0;
        for m in 1..=self.max_angular {
            self.cos_m[m] = x * self.cos_m[m - 1] - y * self.sin_m[m - 1];
            self.sin_m[m] = x * self.sin_m[m - 1] + y * self.cos_m[m - 1];
        }

        // r = 1 in the recurrence
        let mut diagonal = 1.0;
        for m in 0..=self.max_angular {
            if m > 0 {
                diagonal *= (2 * m - 1) as f64;
            }
            self.q.set(m, m, diagonal);

            if m == self.max_angular {
                break;
            }
            self.q.set(m + 1, m, (2 * m + 1) as f64 * z * diagonal);

            for l in (m + 2)..=self.max_angular {
                let value = (2 * l - 1) as f64 * z * self.q.get(l - 1, m)
                    - (l + m - 1) as f64 * self.q.get(l - 2, m);
                self.q.set(l, m, value / (l - m) as f64);
            }
        }
    }

    /// Evaluate all spherical harmonics for the given `direction`, and store
    /// the results in `values`. If `gradients` is `Some`, then this function
    /// also computes Cartesian gradients and store them in `gradients`.
    pub fn compute(
        &mut self,
        direction: Vector3D,
        values: &mut SphericalHarmonicsArray,
        gradients: Option<&mut [SphericalHarmonicsArray; 3]>
    ) {
        assert!(
            (direction.norm2() - 1.0).abs() < 1e-9,
            "expected the direction vector to be normalized in spherical harmonics"
        );
        assert_eq!(
            values.max_angular, self.max_angular,
            "wrong size for the values array, expected max_angular to be {}, got {}",
            self.max_angular, values.max_angular,
        );

        self.compute_polynomials(direction);

        let q = &self.q;
        let (c, s) = (&self.cos_m, &self.sin_m);
        for l in 0..=self.max_angular {
            values.data[l * l + l] = self.normalization.get(l, 0) * q.get(l, 0);
            for m in 1..=l {
                let radial = self.normalization.get(l, m) * q.get(l, m);
                values.set_pair(l, m, radial * c[m], radial * s[m]);
            }
        }

        let [gx, gy, gz] = match gradients {
            Some(gradients) => gradients,
            None => return,
        };

        for gradient in [&*gx, &*gy, &*gz] {
            assert_eq!(
                gradient.max_angular, self.max_angular,
                "wrong size for one gradient array, expected max_angular to be {}, got {}",
                self.max_angular, gradient.max_angular,
            );
        }

        let [x, y, z] = [direction[0], direction[1], direction[2]];
        for l in 0..=self.max_angular {
            // gradient of the solid harmonic, minus its radial part `l Y r̂`
            let radial_factor = l as f64;
            let lm1 = l.saturating_sub(1);
            let has_lower = l > 0;

            let n = self.normalization.get(l, 0);
            let q_up = if has_lower { q.get(lm1, 1) } else { 0.0 };
            let q_z = if has_lower { l as f64 * q.get(lm1, 0) } else { 0.0 };
            let value = values.data[l * l + l];
            gx.data[l * l + l] = -n * x * q_up - radial_factor * value * x;
            gy.data[l * l + l] = -n * y * q_up - radial_factor * value * y;
            gz.data[l * l + l] = n * q_z - radial_factor * value * z;

            for m in 1..=l {
                let n = self.normalization.get(l, m);
                let q_lm = q.get(l, m);
                let q_up = if has_lower { q.get(lm1, m + 1) } else { 0.0 };
                let q_z = if has_lower { (l + m) as f64 * q.get(lm1, m) } else { 0.0 };
                let mf = m as f64;

                let cos_value = values.data[l * l + l + m];
                let sin_value = values.data[l * l + l - m];

                set_gradient_pair(
                    [&mut *gx, &mut *gy, &mut *gz], l, m,
                    [
                        n * (-x * q_up * c[m] + mf * q_lm * c[m - 1]) - radial_factor * cos_value * x,
                        n * (-y * q_up * c[m] - mf * q_lm * s[m - 1]) - radial_factor * cos_value * y,
                        n * q_z * c[m] - radial_factor * cos_value * z,
                    ],
                    [
                        n * (-x * q_up * s[m] + mf * q_lm * s[m - 1]) - radial_factor * sin_value * x,
                        n * (-y * q_up * s[m] + mf * q_lm * c[m - 1]) - radial_factor * sin_value * y,
                        n * q_z * s[m] - radial_factor * sin_value * z,
                    ],
                );
            }
        }
    }
}

/// Store the gradients of the `(l, m)` and `(l, -m)` harmonics
#[inline]
fn set_gradient_pair(
    gradients: [&mut SphericalHarmonicsArray; 3],
    l: usize,
    m: usize,
    positive: [f64; 3],
    negative: [f64; 3],
) {
    for (k, gradient) in gradients.into_iter().enumerate() {
        gradient.set_pair(l, m, positive[k], negative[k]);
    }
}

/// Spherical harmonics calculator together with pre-allocated storage for
/// values and gradients. One of these is kept per thread when evaluating
/// expansions in parallel.
#[derive(Debug, Clone)]
pub(crate) struct SphericalHarmonicsBuffer {
    code: SphericalHarmonics,
    pub(crate) values: SphericalHarmonicsArray,
    /// one array each for x/y/z
    pub(crate) gradients: [SphericalHarmonicsArray; 3],
}

impl SphericalHarmonicsBuffer {
    pub(crate) fn new(max_angular: usize) -> SphericalHarmonicsBuffer {
        SphericalHarmonicsBuffer {
            code: SphericalHarmonics::new(max_angular),
            values: SphericalHarmonicsArray::new(max_angular),
            gradients: [
                SphericalHarmonicsArray::new(max_angular),
                SphericalHarmonicsArray::new(max_angular),
                SphericalHarmonicsArray::new(max_angular),
            ],
        }
    }

    pub(crate) fn max_angular(&self) -> usize {
        self.code.max_angular
    }

    /// Compute the harmonics (and optionally their gradients) along
    /// `direction`, storing the results in `self.values` and `self.gradients`
    pub(crate) fn compute(&mut self, direction: Vector3D, gradients: bool) {
        if gradients {
            self.code.compute(direction, &mut self.values, Some(&mut self.gradients));
        } else {
            self.code.compute(direction, &mut self.values, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use super::*;

    #[test]
    fn channel_indexes() {
        let max_angular = 12;
        let mut seen = HashSet::new();
        for (expected, (l, m)) in channels(max_angular).enumerate() {
            let index = channel_index(l, m);
            assert_eq!(index, expected);
            seen.insert(index);
        }
        assert_eq!(seen.len(), channel_count(max_angular));
        assert_eq!(channel_index(0, 0), 0);
        assert_eq!(channel_index(1, -1), 1);
        assert_eq!(channel_index(2, 2), 8);
    }

    #[test]
    fn low_order_values() {
        let mut spherical_harmonics = SphericalHarmonics::new(2);
        let mut values = SphericalHarmonicsArray::new(2);

        let direction = Vector3D::new(1.0, -2.0, 2.5).normalized();
        let (x, y, z) = (direction[0], direction[1], direction[2]);
        spherical_harmonics.compute(direction, &mut values, None);

        let c1 = f64::sqrt(3.0 / (4.0 * PI));
        assert_relative_eq!(values[[0, 0]], 0.5 / f64::sqrt(PI), max_relative=1e-14);
        assert_relative_eq!(values[[1, -1]], c1 * y, max_relative=1e-14);
        assert_relative_eq!(values[[1, 0]], c1 * z, max_relative=1e-14);
        assert_relative_eq!(values[[1, 1]], c1 * x, max_relative=1e-14);

        let c2 = 0.5 * f64::sqrt(15.0 / PI);
        assert_relative_eq!(values[[2, -2]], c2 * x * y, max_relative=1e-13);
        assert_relative_eq!(values[[2, -1]], c2 * y * z, max_relative=1e-13);
        assert_relative_eq!(values[[2, 0]], 0.25 * f64::sqrt(5.0 / PI) * (3.0 * z * z - 1.0), max_relative=1e-13);
        assert_relative_eq!(values[[2, 1]], c2 * x * z, max_relative=1e-13);
        assert_relative_eq!(values[[2, 2]], 0.5 * c2 * (x * x - y * y), max_relative=1e-13);
    }

    #[test]
    fn finite_differences() {
        let directions = [
            Vector3D::new(1.0, 0.0, 0.0),
            Vector3D::new(0.0, 1.0, 0.0),
            Vector3D::new(0.0, 0.0, 1.0),
            Vector3D::new(1.0, 1.0, 1.0),
            Vector3D::new(1.0, -3.0, 9.0),
            Vector3D::new(-452.0, 825.0, 22.0),
        ];

        let max_angular = 16;
        let mut buffer = SphericalHarmonicsBuffer::new(max_angular);
        let mut shifted = SphericalHarmonicsBuffer::new(max_angular);

        let delta = 1e-9;
        for direction in directions {
            let direction = direction.normalized();
            buffer.compute(direction, true);

            for axis in 0..3 {
                let mut displaced = direction;
                displaced[axis] += delta;
                shifted.compute(displaced.normalized(), false);

                for (l, m) in channels(max_angular) {
                    let (l, m) = (l as isize, m);
                    let finite_difference = (shifted.values[[l, m]] - buffer.values[[l, m]]) / delta;
                    assert_relative_eq!(
                        finite_difference, buffer.gradients[axis][[l, m]],
                        epsilon=1e-5, max_relative=1e-5
                    );
                }
            }
        }
    }

    mod bad {
        use super::super::{SphericalHarmonics, SphericalHarmonicsArray};
        use crate::Vector3D;

        #[test]
        #[should_panic = "wrong size for the values array, expected max_angular to be 3, got 5"]
        fn value_array_size() {
            let mut spherical_harmonics = SphericalHarmonics::new(3);
            let mut values = SphericalHarmonicsArray::new(5);

            spherical_harmonics.compute(Vector3D::new(1.0, 0.0, 0.0), &mut values, None);
        }

        #[test]
        #[should_panic = "expected the direction vector to be normalized"]
        fn non_normalized_direction() {
            let mut spherical_harmonics = SphericalHarmonics::new(3);
            let mut values = SphericalHarmonicsArray::new(3);

            spherical_harmonics.compute(Vector3D::new(1.0, 1.0, 1.0), &mut values, None);
        }
    }
}
