use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::errors::check_size;

use super::AimWeights;

/// Atoms closer than this are considered to be at the same position
const DEGENERATE_DISTANCE: f64 = 1e-8;

/// Becke's fuzzy Voronoi partition of space, from A. D. Becke, J. Chem.
/// Phys. 88, 2547 (1988).
///
/// The boundary between two atoms is smoothed by iterating `order` times the
/// polynomial `p(μ) = 3μ/2 - μ³/2` on the elliptical coordinate `μ`. When
/// atomic radii are given, the boundary is shifted towards the smaller atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeckeWeights {
    order: usize,
}

impl Default for BeckeWeights {
    fn default() -> BeckeWeights {
        BeckeWeights { order: 3 }
    }
}

/// Geometric data shared by all points
struct Pairs {
    n_atoms: usize,
    /// `1 / |A - B|`
    inverse_distances: Array2<f64>,
    /// size adjustment `a_AB`
    adjustments: Array2<f64>,
}

impl BeckeWeights {
    /// Create Becke weights with the given smoothing order, which must be
    /// at least 1
    pub fn new(order: usize) -> Result<BeckeWeights, Error> {
        if order == 0 {
            return Err(Error::InvalidParameter(
                "the order of Becke weights must be at least 1".into()
            ));
        }
        return Ok(BeckeWeights { order });
    }

    /// Get the smoothing order of these weights
    pub fn order(&self) -> usize {
        self.order
    }

    fn pairs(centers: &[Vector3D], radii: &[f64]) -> Result<Pairs, Error> {
        if !radii.is_empty() {
            check_size(centers.len(), radii.len())?;
            if let Some(radius) = radii.iter().find(|&&r| !(r > 0.0 && r.is_finite())) {
                return Err(Error::InvalidParameter(format!(
                    "atomic radii must be strictly positive, got {}", radius
                )));
            }
        }

        let n_atoms = centers.len();
        let mut inverse_distances = Array2::zeros((n_atoms, n_atoms));
        let mut adjustments = Array2::zeros((n_atoms, n_atoms));
        for a in 0..n_atoms {
            for b in 0..n_atoms {
                if a == b {
                    continue;
                }

                let distance = centers[a].distance(&centers[b]);
                if distance < DEGENERATE_DISTANCE {
                    return Err(Error::DegenerateGeometry {
                        first: usize::min(a, b),
                        second: usize::max(a, b),
                        distance: distance,
                    });
                }
                inverse_distances[[a, b]] = 1.0 / distance;

                if !radii.is_empty() {
                    let chi = radii[a] / radii[b];
                    let u = (chi - 1.0) / (chi + 1.0);
                    let adjustment = u / (u * u - 1.0);
                    adjustments[[a, b]] = adjustment.clamp(-0.5, 0.5);
                }
            }
        }

        return Ok(Pairs { n_atoms, inverse_distances, adjustments });
    }

    /// Smooth step going from 1 at `nu = -1` to 0 at `nu = 1`
    #[inline]
    fn switching(&self, nu: f64) -> f64 {
        let mut f = nu;
        for _ in 0..self.order {
            f = 1.5 * f - 0.5 * f * f * f;
        }
        return 0.5 * (1.0 - f);
    }

    /// Compute the normalized weights of all atoms at a single point, using
    /// `distances` as scratch space
    fn point_weights(
        &self,
        point: ArrayView1<'_, f64>,
        centers: &[Vector3D],
        pairs: &Pairs,
        distances: &mut [f64],
        mut weights: ArrayViewMut1<'_, f64>,
    ) {
        let point = Vector3D::from_row(point);
        for (distance, center) in distances.iter_mut().zip(centers) {
            *distance = point.distance(center);
        }

        for a in 0..pairs.n_atoms {
            let mut cell = 1.0;
            for b in 0..pairs.n_atoms {
                if a == b {
                    continue;
                }
                let mu = (distances[a] - distances[b]) * pairs.inverse_distances[[a, b]];
                let nu = mu + pairs.adjustments[[a, b]] * (1.0 - mu * mu);
                cell *= self.switching(nu);
                if cell == 0.0 {
                    break;
                }
            }
            weights[a] = cell;
        }

        let total = weights.sum();
        if total > 0.0 {
            weights /= total;
        } else {
            // can not happen with a valid switching function, attribute the
            // point to the closest atom
            weights.fill(0.0);
            let closest = distances.iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map_or(0, |(i, _)| i);
            weights[closest] = 1.0;
        }
    }
}

impl AimWeights for BeckeWeights {
    #[time_graph::instrument(name = "BeckeWeights::compute")]
    fn compute(&self, points: ArrayView2<'_, f64>, centers: &[Vector3D], radii: &[f64]) -> Result<Array2<f64>, Error> {
        let pairs = BeckeWeights::pairs(centers, radii)?;

        let mut weights = Array2::zeros((points.nrows(), centers.len()));
        Zip::from(weights.axis_iter_mut(Axis(0)))
            .and(points.axis_iter(Axis(0)))
            .into_par_iter()
            .for_each_init(
                || vec![0.0; centers.len()],
                |distances, (weights, point)| {
                    self.point_weights(point, centers, &pairs, distances, weights);
                }
            );

        return Ok(weights);
    }

    #[time_graph::instrument(name = "BeckeWeights::compute_for_owners")]
    fn compute_for_owners(
        &self,
        points: ArrayView2<'_, f64>,
        centers: &[Vector3D],
        radii: &[f64],
        owners: &[usize],
    ) -> Result<Array1<f64>, Error> {
        check_size(points.nrows(), owners.len())?;
        if let Some(&owner) = owners.iter().find(|&&owner| owner >= centers.len()) {
            return Err(Error::InvalidParameter(format!(
                "owner atom {} is out of bounds for {} atoms", owner, centers.len()
            )));
        }

        let pairs = BeckeWeights::pairs(centers, radii)?;

        let weights = points.axis_iter(Axis(0))
            .into_par_iter()
            .zip(owners.par_iter())
            .map_init(
                || (vec![0.0; centers.len()], Array1::zeros(centers.len())),
                |(distances, all_weights), (point, &owner)| {
                    self.point_weights(point, centers, &pairs, distances, all_weights.view_mut());
                    all_weights[owner]
                }
            )
            .collect::<Vec<f64>>();

        return Ok(Array1::from(weights));
    }
}
