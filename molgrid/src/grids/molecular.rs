use std::ops::Range;

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::errors::check_size;
use crate::aim::{AimWeights, BeckeWeights};
use crate::moments::{MomentKind, Moments};
use crate::interpolation::MolecularInterpolation;
use crate::parameters::GridParameters;

use super::AtomicGrid;

/// Integration grid over a whole molecule, made of one atomic grid per atom
/// combined with atoms-in-molecule weights.
///
/// The weights of the molecular grid are the atomic grid weights multiplied
/// by the atoms-in-molecule weight of the atom owning each point. When
/// created with `store = true`, the atomic grids are kept around, enabling
/// per-atom operations such as [`MolecularGrid::atom_moments`] and
/// [`MolecularGrid::interpolate`].
#[derive(Debug, Clone)]
pub struct MolecularGrid {
    centers: Vec<Vector3D>,
    atomic_grids: Option<Vec<AtomicGrid>>,
    /// start of the points of each atom, with an additional final entry
    offsets: Vec<usize>,
    /// index of the atom owning each point
    owners: Vec<usize>,
    points: Array2<f64>,
    aim_weights: Array1<f64>,
    weights: Array1<f64>,
}

impl MolecularGrid {
    /// Create a molecular grid from the atomic grids of all atoms. `radii`
    /// are the atomic radii used by `aim` (or an empty slice), and `store`
    /// controls whether the atomic grids are kept.
    #[time_graph::instrument(name = "MolecularGrid::new")]
    pub fn new(
        atomic_grids: Vec<AtomicGrid>,
        aim: &dyn AimWeights,
        radii: &[f64],
        store: bool,
    ) -> Result<MolecularGrid, Error> {
        if atomic_grids.is_empty() {
            return Err(Error::InvalidParameter(
                "can not create a molecular grid without atoms".into()
            ));
        }

        let centers = atomic_grids.iter().map(|grid| grid.center()).collect::<Vec<_>>();

        let mut offsets = Vec::with_capacity(atomic_grids.len() + 1);
        offsets.push(0);
        for grid in &atomic_grids {
            offsets.push(offsets[offsets.len() - 1] + grid.size());
        }
        let n_points = offsets[offsets.len() - 1];

        let mut points = Array2::zeros((n_points, 3));
        let mut grid_weights = Array1::zeros(n_points);
        let mut owners = Vec::with_capacity(n_points);
        for (atom, grid) in atomic_grids.iter().enumerate() {
            let range = offsets[atom]..offsets[atom + 1];
            points.slice_mut(s![range.clone(), ..]).assign(&grid.points());
            grid_weights.slice_mut(s![range]).assign(&grid.weights());
            owners.extend(std::iter::repeat(atom).take(grid.size()));
        }

        let aim_weights = aim.compute_for_owners(points.view(), &centers, radii, &owners)?;
        let weights = &grid_weights * &aim_weights;

        debug!(
            "built molecular grid with {} atoms and {} points",
            atomic_grids.len(), n_points
        );

        return Ok(MolecularGrid {
            centers: centers,
            atomic_grids: if store { Some(atomic_grids) } else { None },
            offsets: offsets,
            owners: owners,
            points: points,
            aim_weights: aim_weights,
            weights: weights,
        });
    }

    /// Create a molecular grid for the atoms with the given `atomic_numbers`
    /// and `coordinates`, according to `parameters`. Atomic grids are built
    /// in parallel.
    pub fn from_parameters(
        atomic_numbers: &[usize],
        coordinates: &[Vector3D],
        parameters: &GridParameters,
    ) -> Result<MolecularGrid, Error> {
        check_size(atomic_numbers.len(), coordinates.len())?;

        let radial = parameters.radial.build()?;
        let atomic_grids = atomic_numbers.par_iter()
            .zip(coordinates.par_iter())
            .map(|(&atomic_number, &center)| {
                let schedule = parameters.angular.schedule(atomic_number)?;
                AtomicGrid::new(radial.clone(), &schedule, center)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let (aim, radii) = parameters.aim.build(atomic_numbers)?;
        return MolecularGrid::new(atomic_grids, aim.as_ref(), &radii, parameters.store);
    }

    /// Create a molecular grid using parameters given as a JSON string, see
    /// [`GridParameters`] for the format.
    pub fn from_json(atomic_numbers: &[usize], coordinates: &[Vector3D], parameters: &str) -> Result<MolecularGrid, Error> {
        let parameters = serde_json::from_str::<GridParameters>(parameters)?;
        return MolecularGrid::from_parameters(atomic_numbers, coordinates, &parameters);
    }

    /// Create a molecular grid using [`BeckeWeights`] with default order and
    /// the given atomic radii
    pub fn with_becke_weights(atomic_grids: Vec<AtomicGrid>, radii: &[f64], store: bool) -> Result<MolecularGrid, Error> {
        MolecularGrid::new(atomic_grids, &BeckeWeights::default(), radii, store)
    }

    /// Get the number of points in this grid
    pub fn size(&self) -> usize {
        self.weights.len()
    }

    /// Get the number of atoms in this grid
    pub fn n_atoms(&self) -> usize {
        self.centers.len()
    }

    /// Get the positions of the atoms
    pub fn centers(&self) -> &[Vector3D] {
        &self.centers
    }

    /// Get all the points of this grid, as an array of shape `(size, 3)`
    pub fn points(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }

    /// Get the integration weights, including atoms-in-molecule weights
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// Get the atoms-in-molecule weight of each point, for the atom owning
    /// this point
    pub fn aim_weights(&self) -> ArrayView1<'_, f64> {
        self.aim_weights.view()
    }

    /// Get the index of the atom owning each point
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Get the indexes of the points coming from the grid of `atom`
    pub fn atom_indices(&self, atom: usize) -> Range<usize> {
        self.offsets[atom]..self.offsets[atom + 1]
    }

    /// Are the atomic grids stored in this molecular grid?
    pub fn stores_atomic_grids(&self) -> bool {
        self.atomic_grids.is_some()
    }

    /// Get the atomic grid of `atom`. This requires creating the molecular
    /// grid with `store = true`.
    pub fn atom_grid(&self, atom: usize) -> Result<&AtomicGrid, Error> {
        let grids = self.stored_grids("access atomic grids")?;
        return grids.get(atom).ok_or_else(|| Error::InvalidParameter(format!(
            "atom index {} is out of bounds for {} atoms", atom, grids.len()
        )));
    }

    fn stored_grids(&self, operation: &str) -> Result<&[AtomicGrid], Error> {
        match self.atomic_grids {
            Some(ref grids) => Ok(grids),
            None => Err(Error::UnsupportedOperation(format!(
                "can not {} on a molecular grid created without storing atomic grids, \
                use `store = true` when creating the grid",
                operation
            ))),
        }
    }

    /// Integrate a function sampled on the points of this grid
    pub fn integrate(&self, values: ArrayView1<'_, f64>) -> Result<f64, Error> {
        check_size(self.size(), values.len())?;
        return Ok(self.weights.dot(&values));
    }

    /// Compute multipole moments of functions sampled on this grid around
    /// the given `centers`. `values` has shape `(n_functions, size)`.
    pub fn moments(
        &self,
        values: ArrayView2<'_, f64>,
        centers: &[Vector3D],
        max_order: usize,
        kind: MomentKind,
    ) -> Result<Moments, Error> {
        crate::moments::compute(self.points(), self.weights(), values, centers, max_order, kind)
    }

    /// Compute the multipole moments of the contribution of each atom to
    /// functions sampled on this grid, around the atom's center.
    ///
    /// `values` has shape `(n_functions, size)`, the result contains one
    /// entry per atom. This requires creating the molecular grid with
    /// `store = true`.
    pub fn atom_moments(
        &self,
        values: ArrayView2<'_, f64>,
        max_order: usize,
        kind: MomentKind,
    ) -> Result<Vec<Moments>, Error> {
        let grids = self.stored_grids("compute per-atom moments")?;
        check_size(self.size(), values.ncols())?;

        return grids.iter().enumerate().map(|(atom, grid)| {
            let range = self.atom_indices(atom);
            crate::moments::compute(
                grid.points(),
                self.weights.slice(s![range.clone()]),
                values.slice(s![.., range]),
                &[grid.center()],
                max_order,
                kind,
            )
        }).collect();
    }

    /// Fit an interpolation model of a function sampled on this grid, using
    /// spherical harmonics up to `max_angular` on each atom. This requires
    /// creating the molecular grid with `store = true`.
    pub fn interpolate(&self, values: ArrayView1<'_, f64>, max_angular: usize) -> Result<MolecularInterpolation, Error> {
        let grids = self.stored_grids("interpolate functions")?;
        check_size(self.size(), values.len())?;

        let weighted = &values * &self.aim_weights;
        let slices = (0..self.n_atoms()).map(|atom| {
            weighted.slice(s![self.atom_indices(atom)])
        }).collect::<Vec<_>>();

        return MolecularInterpolation::new(grids, &slices, max_angular);
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use ndarray::Array1;

    use crate::grids::{OneDQuadrature, RadialGrid, RadialTransform};
    use super::*;

    fn atomic_grid(center: Vector3D) -> AtomicGrid {
        let radial = RadialGrid::new(
            OneDQuadrature::GaussChebyshevType2 { points: 50 },
            RadialTransform::Becke { rmin: 0.0, scale: 1.0 },
        ).unwrap();
        AtomicGrid::uniform(radial, 17, center).unwrap()
    }

    #[test]
    fn single_atom() {
        let atomic = atomic_grid(Vector3D::new(0.0, 0.2, 0.0));
        let molecular = MolecularGrid::with_becke_weights(vec![atomic.clone()], &[], true).unwrap();

        assert_eq!(molecular.size(), atomic.size());
        assert_eq!(molecular.n_atoms(), 1);
        assert!(molecular.aim_weights().iter().all(|&w| w == 1.0));

        let values = atomic.points().rows().into_iter()
            .map(|p| f64::exp(-(Vector3D::from_row(p) - atomic.center()).norm2()))
            .collect::<Array1<f64>>();
        assert_eq!(
            molecular.integrate(values.view()).unwrap(),
            atomic.integrate(values.view()).unwrap()
        );
    }

    #[test]
    fn two_gaussians() {
        let centers = [Vector3D::new(0.0, 0.0, -0.7), Vector3D::new(0.0, 0.0, 0.7)];
        let grids = centers.iter().map(|&c| atomic_grid(c)).collect();
        let molecular = MolecularGrid::with_becke_weights(grids, &[], false).unwrap();

        assert_eq!(molecular.atom_indices(1), 5500..11000);
        assert!(molecular.owners()[..5500].iter().all(|&a| a == 0));

        let values = molecular.points().rows().into_iter().map(|p| {
            let p = Vector3D::from_row(p);
            f64::exp(-(p - centers[0]).norm2()) + f64::exp(-2.0 * (p - centers[1]).norm2())
        }).collect::<Array1<f64>>();

        let expected = PI.powf(1.5) * (1.0 + 1.0 / 2.0f64.powf(1.5));
        assert_relative_eq!(molecular.integrate(values.view()).unwrap(), expected, max_relative=1e-5);
    }

    #[test]
    fn errors() {
        let molecular = MolecularGrid::with_becke_weights(vec![atomic_grid(Vector3D::zero())], &[], false).unwrap();

        let error = molecular.integrate(Array1::zeros(3).view()).unwrap_err();
        assert_eq!(error.to_string(), "size mismatch: expected an array with 5500 values, got 3");

        let error = molecular.atom_grid(0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "unsupported operation: can not access atomic grids on a molecular grid created \
            without storing atomic grids, use `store = true` when creating the grid"
        );

        let values = Array1::zeros(molecular.size());
        let error = molecular.interpolate(values.view(), 2).unwrap_err();
        assert!(matches!(error, Error::UnsupportedOperation(_)));

        let error = MolecularGrid::with_becke_weights(vec![], &[], false).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: can not create a molecular grid without atoms");
    }
}
