//! Quadrature grids, from one-dimensional rules to molecular grids.
//!
//! Grids are built leaf-first: a [`OneDQuadrature`] on `[-1, 1]` is mapped
//! by a [`RadialTransform`] to a [`RadialGrid`], which is combined with
//! Lebedev-Laikov [`AngularGrid`]s into an [`AtomicGrid`]. Atomic grids of
//! all atoms together with atoms-in-molecule weights form a
//! [`MolecularGrid`].

mod oned;
pub use self::oned::{OneDGrid, OneDQuadrature};

mod radial;
pub use self::radial::{RadialGrid, RadialTransform, Transform, InverseTransform};

mod angular;
pub use self::angular::AngularGrid;

mod presets;
pub use self::presets::{Preset, bragg_radius, BOHR};

mod atomic;
pub use self::atomic::{AngularSchedule, AtomicGrid, Shell};

mod molecular;
pub use self::molecular::MolecularGrid;
