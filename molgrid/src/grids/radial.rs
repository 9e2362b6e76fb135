use ndarray::{Array1, ArrayView1};

use crate::Error;
use crate::errors::check_size;

use super::{OneDGrid, OneDQuadrature};

/// Smooth and monotonic one-dimensional maps, with their first three
/// derivatives
pub trait Transform {
    /// Map `x` to the transformed variable
    fn transform(&self, x: f64) -> f64;
    /// Map a transformed value back to `x`
    fn inverse(&self, y: f64) -> f64;
    /// First derivative of the map, evaluated at `x`
    fn deriv(&self, x: f64) -> f64;
    /// Second derivative of the map, evaluated at `x`
    fn deriv2(&self, x: f64) -> f64;
    /// Third derivative of the map, evaluated at `x`
    fn deriv3(&self, x: f64) -> f64;
}

/// Monotonic maps from the canonical `[-1, 1]` interval to the radial
/// half-line. [`RadialTransform::Identity`] is the exception, and maps
/// `[0, ∞)` to itself.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum RadialTransform {
    /// Becke transform `r = R (1 + x) / (1 - x) + r_min`, mapping `[-1, 1)` to
    /// `[r_min, ∞)`
    Becke {
        /// smallest radius, reached at `x = -1`
        rmin: f64,
        /// scale `R` of the transform, half of the points are inside
        /// `r_min + R`
        scale: f64,
    },
    /// Linear map from `[-1, 1]` to `[r_min, r_max]`
    LinearFinite {
        /// radius at `x = -1`
        rmin: f64,
        /// radius at `x = 1`
        rmax: f64,
    },
    /// Handy-Boys transform `r = R ((1 + x) / (1 - x))^m`
    Handy {
        /// scale `R` of the transform
        scale: f64,
        /// exponent `m` of the transform
        power: f64,
    },
    /// `r = x`, for one-dimensional rules already defined on `[0, ∞)` such as
    /// Gauss-Laguerre
    Identity,
}

impl RadialTransform {
    /// Check that the parameters of this transform are valid
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            RadialTransform::Becke { rmin, scale } => {
                if !(rmin >= 0.0 && rmin.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "rmin must be positive or zero in Becke transform, got {}", rmin
                    )));
                }
                if !(scale > 0.0 && scale.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "scale must be strictly positive in Becke transform, got {}", scale
                    )));
                }
            }
            RadialTransform::LinearFinite { rmin, rmax } => {
                if !(rmin >= 0.0 && rmax > rmin && rmax.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "expected 0 <= rmin < rmax in linear transform, got rmin={} and rmax={}", rmin, rmax
                    )));
                }
            }
            RadialTransform::Handy { scale, power } => {
                if !(scale > 0.0 && scale.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "scale must be strictly positive in Handy transform, got {}", scale
                    )));
                }
                if !(power > 0.0 && power.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "power must be strictly positive in Handy transform, got {}", power
                    )));
                }
            }
            RadialTransform::Identity => {}
        }

        return Ok(());
    }

    /// Get the range of radii covered by this transform
    pub fn domain(&self) -> (f64, f64) {
        match *self {
            RadialTransform::Becke { rmin, .. } => (rmin, f64::INFINITY),
            RadialTransform::LinearFinite { rmin, rmax } => (rmin, rmax),
            RadialTransform::Handy { .. } |
            RadialTransform::Identity => (0.0, f64::INFINITY),
        }
    }

    /// Get the interval of canonical coordinates this transform accepts
    pub fn canonical_domain(&self) -> (f64, f64) {
        match self {
            RadialTransform::Identity => (0.0, f64::INFINITY),
            _ => (-1.0, 1.0),
        }
    }

    /// Map the canonical coordinate `x` to a radius
    pub fn transform(&self, x: f64) -> f64 {
        match *self {
            RadialTransform::Becke { rmin, scale } => scale * (1.0 + x) / (1.0 - x) + rmin,
            RadialTransform::LinearFinite { rmin, rmax } => 0.5 * (rmax - rmin) * (1.0 + x) + rmin,
            RadialTransform::Handy { scale, power } => {
                scale * f64::powf((1.0 + x) / (1.0 - x), power)
            }
            RadialTransform::Identity => x,
        }
    }

    /// Map a radius back to the canonical coordinate
    pub fn inverse(&self, r: f64) -> f64 {
        match *self {
            RadialTransform::Becke { rmin, scale } => (r - rmin - scale) / (r - rmin + scale),
            RadialTransform::LinearFinite { rmin, rmax } => 2.0 * (r - rmin) / (rmax - rmin) - 1.0,
            RadialTransform::Handy { scale, power } => {
                let u = f64::powf(r / scale, 1.0 / power);
                (u - 1.0) / (u + 1.0)
            }
            RadialTransform::Identity => r,
        }
    }

    /// First derivative `dr/dx` of the transform
    pub fn deriv(&self, x: f64) -> f64 {
        match *self {
            RadialTransform::Becke { scale, .. } => 2.0 * scale / ((1.0 - x) * (1.0 - x)),
            RadialTransform::LinearFinite { rmin, rmax } => 0.5 * (rmax - rmin),
            RadialTransform::Handy { scale, power } => {
                let [u, du, _, _] = handy_variable(x);
                scale * power * f64::powf(u, power - 1.0) * du
            }
            RadialTransform::Identity => 1.0,
        }
    }

    /// Second derivative `d²r/dx²` of the transform
    pub fn deriv2(&self, x: f64) -> f64 {
        match *self {
            RadialTransform::Becke { scale, .. } => 4.0 * scale / (1.0 - x).powi(3),
            RadialTransform::LinearFinite { .. } |
            RadialTransform::Identity => 0.0,
            RadialTransform::Handy { scale, power } => {
                let [u, du, d2u, _] = handy_variable(x);
                let m = power;
                scale * m * (
                    (m - 1.0) * f64::powf(u, m - 2.0) * du * du
                    + f64::powf(u, m - 1.0) * d2u
                )
            }
        }
    }

    /// Third derivative `d³r/dx³` of the transform
    pub fn deriv3(&self, x: f64) -> f64 {
        match *self {
            RadialTransform::Becke { scale, .. } => 12.0 * scale / (1.0 - x).powi(4),
            RadialTransform::LinearFinite { .. } |
            RadialTransform::Identity => 0.0,
            RadialTransform::Handy { scale, power } => {
                let [u, du, d2u, d3u] = handy_variable(x);
                let m = power;
                scale * m * (
                    (m - 1.0) * (m - 2.0) * f64::powf(u, m - 3.0) * du * du * du
                    + 3.0 * (m - 1.0) * f64::powf(u, m - 2.0) * du * d2u
                    + f64::powf(u, m - 1.0) * d3u
                )
            }
        }
    }

    /// Apply this transform to a canonical one-dimensional grid, producing
    /// radii and weights `w φ'(x)`. If `descending` is true, the shells are
    /// ordered from the largest to the smallest radius.
    pub fn transform_grid(&self, grid: &OneDGrid, descending: bool) -> Result<RadialGrid, Error> {
        self.validate()?;

        let (start, stop) = grid.domain();
        let (lower, upper) = self.canonical_domain();
        if start < lower || stop > upper {
            return Err(Error::Domain(format!(
                "radial transform {:?} is defined on [{}, {}], but the grid covers [{}, {}]",
                self, lower, upper, start, stop
            )));
        }

        let mut canonical = grid.points().to_vec();
        let mut weights = grid.weights().to_vec();
        if descending {
            canonical.reverse();
            weights.reverse();
        }

        let mut points = Vec::with_capacity(canonical.len());
        for (x, weight) in canonical.iter().zip(weights.iter_mut()) {
            let r = self.transform(*x);
            *weight *= self.deriv(*x);
            if !(r >= 0.0 && r.is_finite() && weight.is_finite()) {
                return Err(Error::Domain(format!(
                    "radial transform {:?} gives r={} and weight={} at x={}",
                    self, r, weight, x
                )));
            }
            points.push(r);
        }

        return Ok(RadialGrid {
            canonical: Array1::from(canonical),
            points: Array1::from(points),
            weights: Array1::from(weights),
            transform: *self,
            descending: descending,
        });
    }
}

impl Transform for RadialTransform {
    fn transform(&self, x: f64) -> f64 {
        RadialTransform::transform(self, x)
    }

    fn inverse(&self, r: f64) -> f64 {
        RadialTransform::inverse(self, r)
    }

    fn deriv(&self, x: f64) -> f64 {
        RadialTransform::deriv(self, x)
    }

    fn deriv2(&self, x: f64) -> f64 {
        RadialTransform::deriv2(self, x)
    }

    fn deriv3(&self, x: f64) -> f64 {
        RadialTransform::deriv3(self, x)
    }
}

/// Inverse of another [`Transform`]. The derivatives of the inverse map are
/// obtained from the derivatives of the wrapped one, evaluated at
/// `x = inner.inverse(r)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseTransform<T> {
    inner: T,
}

impl<T: Transform> InverseTransform<T> {
    /// Create the inverse of `transform`
    pub fn new(transform: T) -> InverseTransform<T> {
        InverseTransform { inner: transform }
    }

    /// Get the transform this is the inverse of
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transform> Transform for InverseTransform<T> {
    fn transform(&self, r: f64) -> f64 {
        self.inner.inverse(r)
    }

    fn inverse(&self, x: f64) -> f64 {
        self.inner.transform(x)
    }

    fn deriv(&self, r: f64) -> f64 {
        1.0 / self.inner.deriv(self.inner.inverse(r))
    }

    fn deriv2(&self, r: f64) -> f64 {
        let x = self.inner.inverse(r);
        let d1 = self.inner.deriv(x);
        return -self.inner.deriv2(x) / (d1 * d1 * d1);
    }

    fn deriv3(&self, r: f64) -> f64 {
        let x = self.inner.inverse(r);
        let d1 = self.inner.deriv(x);
        let d2 = self.inner.deriv2(x);
        let d3 = self.inner.deriv3(x);
        return (3.0 * d2 * d2 - d1 * d3) / d1.powi(5);
    }
}

/// Compute `u = (1 + x) / (1 - x)` and its first three derivatives
#[inline]
fn handy_variable(x: f64) -> [f64; 4] {
    let one_minus_x = 1.0 - x;
    let u = (1.0 + x) / one_minus_x;
    let du = 2.0 / (one_minus_x * one_minus_x);
    let d2u = 4.0 / one_minus_x.powi(3);
    let d3u = 12.0 / one_minus_x.powi(4);
    return [u, du, d2u, d3u];
}

/// Radial grid obtained by transforming a canonical one-dimensional grid
#[derive(Debug, Clone)]
pub struct RadialGrid {
    canonical: Array1<f64>,
    points: Array1<f64>,
    weights: Array1<f64>,
    transform: RadialTransform,
    descending: bool,
}

impl RadialGrid {
    /// Build the `quadrature` rule and map it with `transform`, with shells
    /// in increasing radius order
    pub fn new(quadrature: OneDQuadrature, transform: RadialTransform) -> Result<RadialGrid, Error> {
        let grid = quadrature.build()?;
        return transform.transform_grid(&grid, false);
    }

    /// Get the radii of the shells
    pub fn points(&self) -> ArrayView1<'_, f64> {
        self.points.view()
    }

    /// Get the integration weights of the shells, including the jacobian of
    /// the transform (but not the `r²` volume factor)
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// Get the canonical coordinates the shells were generated from
    pub fn canonical_points(&self) -> ArrayView1<'_, f64> {
        self.canonical.view()
    }

    /// Get the transform used to create this grid
    pub fn transform(&self) -> &RadialTransform {
        &self.transform
    }

    /// Are the shells ordered from the largest radius to the smallest?
    pub fn is_descending(&self) -> bool {
        self.descending
    }

    /// Get the number of shells in this grid
    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Compute `∫ f(r) dr` for a function sampled on the shells
    pub fn integrate(&self, values: ArrayView1<'_, f64>) -> Result<f64, Error> {
        check_size(self.size(), values.len())?;
        return Ok(self.weights.dot(&values));
    }
}
