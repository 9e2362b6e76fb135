use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Range;

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::{Error, Vector3D};
use crate::errors::check_size;
use crate::math::{SphericalHarmonicsBuffer, channel_count, FOUR_PI};
use crate::moments::{MomentKind, Moments};
use crate::interpolation::InterpolationModel;

use super::{AngularGrid, Preset, RadialGrid};

/// How to choose the angular grid used on each radial shell of an atomic
/// grid
#[derive(Debug, Clone, PartialEq)]
pub enum AngularSchedule {
    /// Use the same angular degree on all shells
    Degree(usize),
    /// Use the same number of angular points on all shells
    Size(usize),
    /// Use an explicit angular degree for each shell
    Degrees(Vec<usize>),
    /// Use different degrees in different radial regions. A shell at
    /// distance `r` uses `degrees[k]`, where `k` is the number of `sectors`
    /// bounds `s` such that `r > s * radius`.
    Pruned {
        /// reference radius of the atom, typically the Bragg-Slater radius
        radius: f64,
        /// increasing bounds of the radial regions, as fractions of `radius`
        sectors: Vec<f64>,
        /// angular degree in each region, one more than the number of
        /// `sectors`
        degrees: Vec<usize>,
    },
    /// Use a pre-defined pruned schedule for the given element
    Preset {
        atomic_number: usize,
        preset: Preset,
    },
}

impl AngularSchedule {
    /// Get the requested angular degree of all shells at the given radii.
    /// The degrees are not yet quantized to the available rules.
    fn requested_degrees(&self, radii: ArrayView1<'_, f64>) -> Result<Vec<usize>, Error> {
        match self {
            AngularSchedule::Degree(degree) => Ok(vec![*degree; radii.len()]),
            AngularSchedule::Size(size) => {
                let degree = AngularGrid::from_size(*size)?.degree();
                Ok(vec![degree; radii.len()])
            }
            AngularSchedule::Degrees(degrees) => {
                check_size(radii.len(), degrees.len())?;
                Ok(degrees.clone())
            }
            AngularSchedule::Pruned { radius, sectors, degrees } => {
                pruned_degrees(radii, *radius, sectors, degrees)
            }
            AngularSchedule::Preset { atomic_number, preset } => {
                let (radius, sectors, degrees) = preset.schedule(*atomic_number)?;
                pruned_degrees(radii, radius, &sectors, &degrees)
            }
        }
    }
}

fn pruned_degrees(radii: ArrayView1<'_, f64>, radius: f64, sectors: &[f64], degrees: &[usize]) -> Result<Vec<usize>, Error> {
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "the reference radius of pruned grids must be positive, got {}", radius
        )));
    }

    if degrees.len() != sectors.len() + 1 {
        return Err(Error::InvalidParameter(format!(
            "pruned grids need one more degree than sectors, got {} degrees and {} sectors",
            degrees.len(), sectors.len()
        )));
    }

    if sectors.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::InvalidParameter(
            "the sectors of pruned grids must be strictly increasing".into()
        ));
    }

    let schedule = radii.iter().map(|&r| {
        let region = sectors.iter().filter(|&&bound| r > bound * radius).count();
        degrees[region]
    }).collect();

    return Ok(schedule);
}

/// A single radial shell of an atomic grid
#[derive(Debug, Clone)]
pub struct Shell {
    /// radius of the shell
    pub radius: f64,
    /// radial weight of the shell, without the `r²` factor
    pub weight: f64,
    /// angular grid used on this shell
    pub angular: AngularGrid,
    /// indexes of the points of this shell in the atomic grid
    pub indices: Range<usize>,
}

/// Atom-centered grid, made of one angular grid for each shell of a radial
/// grid
#[derive(Debug, Clone)]
pub struct AtomicGrid {
    center: Vector3D,
    radial: RadialGrid,
    angular: Vec<AngularGrid>,
    /// start of each shell in the points, with an additional final entry
    offsets: Vec<usize>,
    points: Array2<f64>,
    weights: Array1<f64>,
}

impl AtomicGrid {
    /// Create a new atomic grid centered on `center`, using the `radial` grid
    /// and picking angular grids for each shell according to `schedule`.
    #[time_graph::instrument(name = "AtomicGrid::new")]
    pub fn new(radial: RadialGrid, schedule: &AngularSchedule, center: Vector3D) -> Result<AtomicGrid, Error> {
        let requested = schedule.requested_degrees(radial.points())?;

        let mut rules = BTreeMap::new();
        let mut angular = Vec::with_capacity(requested.len());
        for degree in requested {
            let grid = match rules.get(&degree) {
                Some(grid) => *grid,
                None => {
                    let grid = AngularGrid::from_degree(degree)?;
                    rules.insert(degree, grid);
                    grid
                }
            };
            angular.push(grid);
        }

        let mut offsets = Vec::with_capacity(angular.len() + 1);
        offsets.push(0);
        for grid in &angular {
            offsets.push(offsets[offsets.len() - 1] + grid.size());
        }
        let n_points = offsets[offsets.len() - 1];

        let mut points = Array2::zeros((n_points, 3));
        let mut weights = Array1::zeros(n_points);
        for (shell, grid) in angular.iter().enumerate() {
            let r = radial.points()[shell];
            let radial_weight = radial.weights()[shell] * r * r;
            let range = offsets[shell]..offsets[shell + 1];

            let mut shell_points = points.slice_mut(s![range.clone(), ..]);
            for (mut point, direction) in shell_points.rows_mut().into_iter().zip(grid.points().rows()) {
                point[0] = center[0] + r * direction[0];
                point[1] = center[1] + r * direction[1];
                point[2] = center[2] + r * direction[2];
            }

            let mut shell_weights = weights.slice_mut(s![range]);
            shell_weights.assign(&grid.weights());
            shell_weights *= radial_weight;
        }

        debug!(
            "built atomic grid with {} radial shells and {} points",
            radial.size(), n_points
        );

        return Ok(AtomicGrid {
            center: center,
            radial: radial,
            angular: angular,
            offsets: offsets,
            points: points,
            weights: weights,
        });
    }

    /// Create an atomic grid using the same angular degree on all shells
    pub fn uniform(radial: RadialGrid, degree: usize, center: Vector3D) -> Result<AtomicGrid, Error> {
        AtomicGrid::new(radial, &AngularSchedule::Degree(degree), center)
    }

    /// Create an atomic grid with angular degrees changing between radial
    /// sectors, see [`AngularSchedule::Pruned`].
    pub fn from_pruned(
        radial: RadialGrid,
        radius: f64,
        sectors: Vec<f64>,
        degrees: Vec<usize>,
        center: Vector3D,
    ) -> Result<AtomicGrid, Error> {
        let schedule = AngularSchedule::Pruned { radius, sectors, degrees };
        AtomicGrid::new(radial, &schedule, center)
    }

    /// Create an atomic grid using the pre-defined pruning for the given
    /// element
    pub fn from_preset(radial: RadialGrid, atomic_number: usize, preset: Preset, center: Vector3D) -> Result<AtomicGrid, Error> {
        AtomicGrid::new(radial, &AngularSchedule::Preset { atomic_number, preset }, center)
    }

    /// Get the center of this grid
    pub fn center(&self) -> Vector3D {
        self.center
    }

    /// Get the radial grid used by this atomic grid
    pub fn radial(&self) -> &RadialGrid {
        &self.radial
    }

    /// Get all the points of this grid, as an array of shape `(size, 3)`
    pub fn points(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }

    /// Get the integration weights of all points
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.weights.view()
    }

    /// Get the number of points in this grid
    pub fn size(&self) -> usize {
        self.weights.len()
    }

    /// Get the number of radial shells in this grid
    pub fn n_shells(&self) -> usize {
        self.angular.len()
    }

    /// Get the angular degree realized on each shell
    pub fn degrees(&self) -> Vec<usize> {
        self.angular.iter().map(|grid| grid.degree()).collect()
    }

    /// Get the indexes of the points belonging to the shell `i`
    pub fn shell_indices(&self, i: usize) -> Range<usize> {
        self.offsets[i]..self.offsets[i + 1]
    }

    /// Get all the data related to the shell `i`
    pub fn shell(&self, i: usize) -> Shell {
        Shell {
            radius: self.radial.points()[i],
            weight: self.radial.weights()[i],
            angular: self.angular[i],
            indices: self.shell_indices(i),
        }
    }

    /// Integrate a function sampled on the points of this grid
    pub fn integrate(&self, values: ArrayView1<'_, f64>) -> Result<f64, Error> {
        check_size(self.size(), values.len())?;
        return Ok(self.weights.dot(&values));
    }

    /// Compute the spherical average `1/4π ∫ f(r, Ω) dΩ` of a function on each
    /// shell
    pub fn spherical_average(&self, values: ArrayView1<'_, f64>) -> Result<Array1<f64>, Error> {
        check_size(self.size(), values.len())?;

        let averages = (0..self.n_shells()).map(|shell| {
            let values = values.slice(s![self.shell_indices(shell)]);
            self.angular[shell].weights().dot(&values) / FOUR_PI
        }).collect();

        return Ok(averages);
    }

    /// Project a function on real spherical harmonics on each shell, giving
    /// the radial components `f_lm(r) = ∫ f(r, Ω) Y_lm(Ω) dΩ`.
    ///
    /// The result has shape `(n_shells, (max_angular + 1)²)`, with channels
    /// ordered as in [`crate::math::channel_index`]. Channels with `2 l`
    /// larger than the degree of a shell's angular grid can not be resolved
    /// by the quadrature, and are set to zero.
    #[time_graph::instrument(name = "AtomicGrid::radial_component")]
    pub fn radial_component(&self, values: ArrayView1<'_, f64>, max_angular: usize) -> Result<Array2<f64>, Error> {
        check_size(self.size(), values.len())?;

        let mut components = Array2::zeros((self.n_shells(), channel_count(max_angular)));
        let buffers = ThreadLocal::new();

        components.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(shell, components)| {
                let mut buffer = buffers.get_or(|| {
                    RefCell::new(SphericalHarmonicsBuffer::new(max_angular))
                }).borrow_mut();

                let values = values.slice(s![self.shell_indices(shell)]);
                self.project_shell(shell, values, &mut buffer, components);
            });

        return Ok(components);
    }

    /// Compute the spherical harmonics projection of `values` on one shell
    fn project_shell(
        &self,
        shell: usize,
        values: ArrayView1<'_, f64>,
        buffer: &mut SphericalHarmonicsBuffer,
        mut components: ArrayViewMut1<'_, f64>,
    ) {
        let angular = &self.angular[shell];
        let resolved = usize::min(buffer.max_angular(), angular.degree() / 2);
        let n_resolved = channel_count(resolved);

        for ((direction, &weight), &value) in angular.points().rows().into_iter().zip(angular.weights()).zip(values) {
            buffer.compute(Vector3D::from_row(direction), false);
            let harmonics = buffer.values.as_slice();
            for lm in 0..n_resolved {
                components[lm] += weight * value * harmonics[lm];
            }
        }
    }

    /// Compute multipole moments of functions sampled on this grid, see
    /// [`MomentKind`] for the available kinds.
    ///
    /// `values` has shape `(n_functions, size)`; if `centers` is empty, the
    /// moments are computed around the center of this grid.
    pub fn moments(
        &self,
        values: ArrayView2<'_, f64>,
        centers: &[Vector3D],
        max_order: usize,
        kind: MomentKind,
    ) -> Result<Moments, Error> {
        let own_center = [self.center];
        let centers = if centers.is_empty() { &own_center[..] } else { centers };
        crate::moments::compute(self.points(), self.weights(), values, centers, max_order, kind)
    }

    /// Fit an interpolation model of a function sampled on this grid, using
    /// spherical harmonics up to `max_angular`
    pub fn interpolate(&self, values: ArrayView1<'_, f64>, max_angular: usize) -> Result<InterpolationModel, Error> {
        InterpolationModel::new(self, values, max_angular)
    }
}
