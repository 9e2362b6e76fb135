//! Atomic radii and the pre-defined pruning schedules of atomic grids.

use crate::Error;

/// Bohr radius in Angstrom
pub const BOHR: f64 = 0.52917721092;

/// Bragg-Slater radii in Angstrom, indexed by atomic number minus one
const BRAGG_RADII: [f64; 54] = [
    0.35, 1.40,
    1.45, 1.05, 0.85, 0.70, 0.65, 0.60, 0.50, 1.50,
    1.80, 1.50, 1.25, 1.10, 1.00, 1.00, 1.00, 1.80,
    2.20, 1.80, 1.60, 1.40, 1.35, 1.40, 1.40, 1.40, 1.35, 1.35,
    1.35, 1.35, 1.30, 1.25, 1.15, 1.15, 1.15, 1.90,
    2.35, 2.00, 1.80, 1.55, 1.45, 1.45, 1.35, 1.30, 1.35, 1.40,
    1.60, 1.55, 1.55, 1.45, 1.45, 1.40, 1.40, 1.98,
];

/// Get the Bragg-Slater radius (in bohr) of the element with the given
/// atomic number
pub fn bragg_radius(atomic_number: usize) -> Result<f64, Error> {
    if atomic_number == 0 || atomic_number > BRAGG_RADII.len() {
        return Err(Error::InvalidParameter(format!(
            "no Bragg radius available for atomic number {}, only 1 to {} are supported",
            atomic_number, BRAGG_RADII.len()
        )));
    }

    return Ok(BRAGG_RADII[atomic_number - 1] / BOHR);
}

/// Pre-defined accuracy levels for atomic grids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Coarse,
    Medium,
    Fine,
}

/// Fractions of the Bragg radius separating the regions of the SG-1 pruning
/// scheme, for the first row, second row, and heavier elements
const SECTOR_FRACTIONS: [[f64; 4]; 3] = [
    [0.25, 0.5, 1.0, 4.5],
    [0.1667, 0.5, 0.9, 3.5],
    [0.1, 0.4, 0.8, 2.5],
];

impl Preset {
    /// Angular degrees used in each of the five pruning regions, from the
    /// nucleus outward
    pub fn degrees(&self) -> [usize; 5] {
        match self {
            Preset::Coarse => [5, 11, 17, 11, 7],
            Preset::Medium => [7, 15, 23, 15, 11],
            Preset::Fine => [15, 23, 41, 23, 17],
        }
    }

    /// Get the pruning schedule of this preset for the given element, as
    /// `(radius, sectors, degrees)`: the shell at distance `r` uses
    /// `degrees[k]`, where `k` is the number of sectors `s` with
    /// `r > s * radius`.
    pub fn schedule(&self, atomic_number: usize) -> Result<(f64, Vec<f64>, Vec<usize>), Error> {
        let radius = bragg_radius(atomic_number)?;
        let row = match atomic_number {
            1..=2 => 0,
            3..=10 => 1,
            _ => 2,
        };

        return Ok((radius, SECTOR_FRACTIONS[row].to_vec(), self.degrees().to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use super::*;

    #[test]
    fn radii() {
        assert_relative_eq!(bragg_radius(1).unwrap(), 0.35 / BOHR);
        assert_relative_eq!(bragg_radius(8).unwrap(), 1.1338356, max_relative=1e-6);
        assert_relative_eq!(bragg_radius(54).unwrap(), 1.98 / BOHR);

        let error = bragg_radius(0).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: no Bragg radius available for atomic number 0, only 1 to 54 are supported");
        assert!(bragg_radius(55).is_err());
    }

    #[test]
    fn schedules() {
        let (radius, sectors, degrees) = Preset::Medium.schedule(6).unwrap();
        assert_relative_eq!(radius, 0.70 / BOHR);
        assert_eq!(sectors, [0.1667, 0.5, 0.9, 3.5]);
        assert_eq!(degrees, [7, 15, 23, 15, 11]);

        let (_, sectors, degrees) = Preset::Fine.schedule(17).unwrap();
        assert_eq!(sectors, [0.1, 0.4, 0.8, 2.5]);
        assert_eq!(degrees, [15, 23, 41, 23, 17]);

        let (_, sectors, _) = Preset::Coarse.schedule(2).unwrap();
        assert_eq!(sectors, [0.25, 0.5, 1.0, 4.5]);
    }

    #[test]
    fn serialization() {
        let preset: Preset = serde_json::from_str("\"fine\"").unwrap();
        assert_eq!(preset, Preset::Fine);
    }
}
