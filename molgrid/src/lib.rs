#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names, clippy::similar_names)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Numerical integration grids for molecular electronic-structure quantities.
//!
//! One-dimensional quadratures are mapped to the radial half-line, combined
//! with Lebedev-Laikov spherical rules into atom-centered grids, and merged
//! into a molecular grid using Becke's atoms-in-molecule partition. On top of
//! the grids, this crate provides integration, multipole moments,
//! interpolation of sampled fields, and a radial Poisson solver.

pub mod types;
pub use types::Vector3D;

pub mod math;

mod errors;
pub use self::errors::Error;

pub mod grids;
pub use grids::{OneDGrid, OneDQuadrature};
pub use grids::{RadialGrid, RadialTransform, Transform, InverseTransform};
pub use grids::AngularGrid;
pub use grids::{AngularSchedule, AtomicGrid, Preset};
pub use grids::MolecularGrid;

pub mod aim;
pub use aim::{AimWeights, BeckeWeights};

mod interpolation;
pub use interpolation::{InterpolationModel, MolecularInterpolation};

pub mod moments;
pub use moments::{MomentKind, MomentOrder, Moments};

pub mod ode;
pub use ode::{BoundaryCondition, BvpSolution, LinearBvp};

pub mod poisson;
pub use poisson::{PoissonSolver, PoissonOptions, DecomposedDensity, SolvedPotential};

mod parameters;
pub use parameters::{GridParameters, RadialParameters, AngularParameters, AimParameters};
