use crate::Error;
use crate::aim::{AimWeights, BeckeWeights};
use crate::grids::{bragg_radius, AngularSchedule, OneDQuadrature, Preset, RadialGrid, RadialTransform};

/// Parameters for the creation of a [`crate::MolecularGrid`].
///
/// ```
/// # use molgrid::GridParameters;
/// let parameters: GridParameters = serde_json::from_str(r#"{
///     "radial": {
///         "quadrature": {"type": "GaussChebyshevType2", "points": 70},
///         "transform": {"type": "Becke", "rmin": 1e-4, "scale": 1.5}
///     },
///     "angular": {"type": "Preset", "preset": "medium"},
///     "store": true
/// }"#).unwrap();
/// assert!(parameters.store);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GridParameters {
    /// Radial grid, shared by all atoms
    pub radial: RadialParameters,
    /// Choice of the angular grid on each shell
    pub angular: AngularParameters,
    /// Atoms-in-molecule weights
    #[serde(default)]
    pub aim: AimParameters,
    /// Should the atomic grids be stored in the molecular grid? This is
    /// required for per-atom moments and interpolation.
    #[serde(default)]
    pub store: bool,
}

/// Parameters of a radial grid
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RadialParameters {
    /// One-dimensional quadrature on `[-1, 1]`
    pub quadrature: OneDQuadrature,
    /// Map from `[-1, 1]` to radii
    pub transform: RadialTransform,
    /// Order the shells from the largest radius to the smallest
    #[serde(default)]
    pub descending: bool,
}

impl RadialParameters {
    /// Create the radial grid corresponding to these parameters
    pub fn build(&self) -> Result<RadialGrid, Error> {
        let grid = self.quadrature.build()?;
        return self.transform.transform_grid(&grid, self.descending);
    }
}

/// Parameters for the angular part of atomic grids
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum AngularParameters {
    /// Use the same angular degree on all shells
    Degree {
        degree: usize,
    },
    /// Use the same number of angular points on all shells
    Size {
        size: usize,
    },
    /// Pruned grid, with sectors given as fractions of the Bragg-Slater
    /// radius of each atom
    Pruned {
        /// increasing bounds of the radial regions
        sectors: Vec<f64>,
        /// angular degree in each region, one more than the number of
        /// `sectors`
        degrees: Vec<usize>,
    },
    /// Pre-defined pruned grids
    Preset {
        preset: Preset,
    },
}

impl AngularParameters {
    /// Get the angular schedule for an atom with the given atomic number
    pub fn schedule(&self, atomic_number: usize) -> Result<AngularSchedule, Error> {
        let schedule = match self {
            AngularParameters::Degree { degree } => AngularSchedule::Degree(*degree),
            AngularParameters::Size { size } => AngularSchedule::Size(*size),
            AngularParameters::Pruned { sectors, degrees } => AngularSchedule::Pruned {
                radius: bragg_radius(atomic_number)?,
                sectors: sectors.clone(),
                degrees: degrees.clone(),
            },
            AngularParameters::Preset { preset } => AngularSchedule::Preset {
                atomic_number: atomic_number,
                preset: *preset,
            },
        };

        return Ok(schedule);
    }
}

fn default_becke_order() -> usize {
    3
}

fn default_true() -> bool {
    true
}

/// Parameters of the atoms-in-molecule weights
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum AimParameters {
    /// Becke's fuzzy Voronoi partition
    Becke {
        /// number of smoothing iterations
        #[serde(default = "default_becke_order")]
        order: usize,
        /// shift the boundaries between atoms according to their radii
        #[serde(default = "default_true")]
        size_adjustment: bool,
        /// atomic radii (in bohr) to use for the size adjustment, one per
        /// atom. Bragg-Slater radii are used by default.
        #[serde(default)]
        radii: Option<Vec<f64>>,
    },
}

impl Default for AimParameters {
    fn default() -> AimParameters {
        AimParameters::Becke {
            order: default_becke_order(),
            size_adjustment: true,
            radii: None,
        }
    }
}

impl AimParameters {
    /// Create the atoms-in-molecule weights and the atomic radii to use with
    /// them, for atoms with the given atomic numbers
    pub fn build(&self, atomic_numbers: &[usize]) -> Result<(Box<dyn AimWeights>, Vec<f64>), Error> {
        match self {
            AimParameters::Becke { order, size_adjustment, radii } => {
                let becke = BeckeWeights::new(*order)?;
                let radii = if !size_adjustment {
                    Vec::new()
                } else if let Some(radii) = radii {
                    crate::errors::check_size(atomic_numbers.len(), radii.len())?;
                    radii.clone()
                } else {
                    atomic_numbers.iter()
                        .map(|&z| bragg_radius(z))
                        .collect::<Result<Vec<_>, _>>()?
                };

                return Ok((Box::new(becke), radii));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document() {
        let parameters: GridParameters = serde_json::from_str(r#"{
            "radial": {
                "quadrature": {"type": "GaussChebyshevType2", "points": 70},
                "transform": {"type": "Becke", "rmin": 1e-4, "scale": 1.5},
                "descending": false
            },
            "angular": {"type": "Preset", "preset": "medium"},
            "aim": {"type": "Becke", "order": 3},
            "store": true
        }"#).unwrap();

        assert_eq!(parameters.radial.quadrature, OneDQuadrature::GaussChebyshevType2 { points: 70 });
        assert_eq!(parameters.radial.transform, RadialTransform::Becke { rmin: 1e-4, scale: 1.5 });
        assert_eq!(parameters.angular, AngularParameters::Preset { preset: Preset::Medium });
        assert_eq!(parameters.aim, AimParameters::default());
        assert!(parameters.store);

        let radial = parameters.radial.build().unwrap();
        assert_eq!(radial.size(), 70);

        let schedule = parameters.angular.schedule(8).unwrap();
        assert_eq!(schedule, AngularSchedule::Preset { atomic_number: 8, preset: Preset::Medium });
    }

    #[test]
    fn defaults_and_errors() {
        let parameters: GridParameters = serde_json::from_str(r#"{
            "radial": {
                "quadrature": {"type": "GaussLegendre", "points": 20},
                "transform": {"type": "Handy", "scale": 1.0, "power": 2.0}
            },
            "angular": {"type": "Degree", "degree": 11}
        }"#).unwrap();
        assert!(!parameters.store);
        assert!(!parameters.radial.descending);

        let (_, radii) = parameters.aim.build(&[1, 8]).unwrap();
        assert_eq!(radii.len(), 2);

        let error = serde_json::from_str::<GridParameters>(r#"{
            "radial": {
                "quadrature": {"type": "GaussLegendre", "points": 20},
                "transform": {"type": "Handy", "scale": 1.0, "power": 2.0}
            },
            "angular": {"type": "Degree", "degree": 11},
            "unknown": 3
        }"#).unwrap_err();
        assert!(error.to_string().starts_with("unknown field `unknown`"));

        let aim = AimParameters::Becke { order: 3, size_adjustment: true, radii: Some(vec![1.0]) };
        assert!(aim.build(&[1, 1]).is_err());

        let aim = AimParameters::Becke { order: 3, size_adjustment: false, radii: None };
        let (_, radii) = aim.build(&[1, 100]).unwrap();
        assert!(radii.is_empty());
    }
}
