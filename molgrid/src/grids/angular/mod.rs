use log::info;
use ndarray::{ArrayView1, ArrayView2};

use crate::Error;
use crate::errors::check_size;

mod lebedev;
use self::lebedev::{LebedevRule, LEBEDEV_RULES};

/// Quadrature on the unit sphere, using one of the tabulated Lebedev-Laikov
/// rules. Weights sum to `4π`.
///
/// Requested degrees and sizes are rounded up to the closest available rule;
/// the realized values are available with [`AngularGrid::degree`] and
/// [`AngularGrid::size`].
#[derive(Debug, Clone, Copy)]
pub struct AngularGrid {
    rule: &'static LebedevRule,
}

impl AngularGrid {
    /// Largest degree of the available rules
    pub fn max_degree() -> usize {
        LEBEDEV_RULES.last().map_or(0, |rule| rule.degree)
    }

    /// Largest number of points of the available rules
    pub fn max_size() -> usize {
        LEBEDEV_RULES.last().map_or(0, |rule| rule.weights.len())
    }

    /// Get the smallest rule integrating exactly all spherical harmonics up to
    /// `degree`
    pub fn from_degree(degree: usize) -> Result<AngularGrid, Error> {
        let rule = LEBEDEV_RULES.iter().find(|rule| rule.degree >= degree);
        let rule = rule.ok_or(Error::UnsupportedDegree {
            requested: degree,
            maximal: AngularGrid::max_degree(),
        })?;

        if rule.degree != degree {
            info!(
                "requested angular degree {} is not available, using the Lebedev rule of degree {} ({} points)",
                degree, rule.degree, rule.weights.len()
            );
        }

        return Ok(AngularGrid { rule });
    }

    /// Get the smallest rule with at least `size` points
    pub fn from_size(size: usize) -> Result<AngularGrid, Error> {
        let rule = LEBEDEV_RULES.iter().find(|rule| rule.weights.len() >= size);
        let rule = rule.ok_or_else(|| Error::InvalidSize(format!(
            "the largest available angular grid has {} points, got a request for {}",
            AngularGrid::max_size(), size
        )))?;

        if rule.weights.len() != size {
            info!(
                "no Lebedev rule with {} points, using the one with {} points (degree {})",
                size, rule.weights.len(), rule.degree
            );
        }

        return Ok(AngularGrid { rule });
    }

    /// Get the degree of this rule: all spherical harmonics with `l` up to
    /// this value are integrated exactly
    pub fn degree(&self) -> usize {
        self.rule.degree
    }

    /// Get the number of points in this rule
    pub fn size(&self) -> usize {
        self.rule.weights.len()
    }

    /// Get the points on the unit sphere, as an array of shape `(size, 3)`
    pub fn points(&self) -> ArrayView2<'static, f64> {
        self.rule.points.view()
    }

    /// Get the weights, summing to `4π`
    pub fn weights(&self) -> ArrayView1<'static, f64> {
        self.rule.weights.view()
    }

    /// Integrate a function sampled on the points of this grid
    pub fn integrate(&self, values: ArrayView1<'_, f64>) -> Result<f64, Error> {
        check_size(self.size(), values.len())?;
        return Ok(self.rule.weights.dot(&values));
    }
}
