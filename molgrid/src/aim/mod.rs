//! Atoms-in-molecule weights, splitting space between atoms.

use ndarray::{Array1, Array2, ArrayView2};

use crate::{Error, Vector3D};

mod becke;
pub use self::becke::BeckeWeights;

/// Partition of space between atoms. For every point, the weights of all
/// atoms must be positive and sum to one.
pub trait AimWeights: std::fmt::Debug + Send + Sync {
    /// Compute the weight of every atom at every point. `points` has shape
    /// `(n_points, 3)`, `radii` contains one radius per center (or is empty
    /// to treat all atoms as having the same size). The result has shape
    /// `(n_points, n_atoms)`.
    fn compute(&self, points: ArrayView2<'_, f64>, centers: &[Vector3D], radii: &[f64]) -> Result<Array2<f64>, Error>;

    /// Compute the weight of a single atom (the "owner") at every point,
    /// with `owners[i]` giving the atom used for point `i`.
    fn compute_for_owners(
        &self,
        points: ArrayView2<'_, f64>,
        centers: &[Vector3D],
        radii: &[f64],
        owners: &[usize],
    ) -> Result<Array1<f64>, Error> {
        crate::errors::check_size(points.nrows(), owners.len())?;
        if let Some(&owner) = owners.iter().find(|&&owner| owner >= centers.len()) {
            return Err(Error::InvalidParameter(format!(
                "owner atom {} is out of bounds for {} atoms", owner, centers.len()
            )));
        }

        let weights = self.compute(points, centers, radii)?;
        return Ok(owners.iter().enumerate().map(|(i, &owner)| weights[[i, owner]]).collect());
    }
}
