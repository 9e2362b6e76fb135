use std::f64::consts::PI;

use approx::assert_relative_eq;
use ndarray::{Array1, Array2};

use molgrid::{MolecularGrid, MomentKind, MomentOrder, Vector3D};

fn water() -> (Vec<usize>, Vec<Vector3D>) {
    let atomic_numbers = vec![8, 1, 1];
    let coordinates = vec![
        Vector3D::new(0.0, 0.0, 0.0),
        Vector3D::new(0.0, 1.43, 1.11),
        Vector3D::new(0.0, -1.43, 1.11),
    ];
    return (atomic_numbers, coordinates);
}

const PARAMETERS: &str = r#"{
    "radial": {
        "quadrature": {"type": "GaussChebyshevType2", "points": 70},
        "transform": {"type": "Becke", "rmin": 1e-4, "scale": 1.5}
    },
    "angular": {"type": "Preset", "preset": "medium"},
    "aim": {"type": "Becke"},
    "store": true
}"#;

/// normalized gaussians on all atoms, giving a total charge of one per atom
fn density(grid: &MolecularGrid) -> Array1<f64> {
    grid.points().rows().into_iter().map(|point| {
        let point = Vector3D::from_row(point);
        grid.centers().iter()
            .map(|center| f64::exp(-(point - center).norm2()) / PI.powf(1.5))
            .sum()
    }).collect()
}

#[test]
fn water_integration() {
    let (atomic_numbers, coordinates) = water();
    let grid = MolecularGrid::from_json(&atomic_numbers, &coordinates, PARAMETERS).unwrap();
    assert_eq!(grid.n_atoms(), 3);
    assert!(grid.stores_atomic_grids());

    let density = density(&grid);
    assert_relative_eq!(grid.integrate(density.view()).unwrap(), 3.0, max_relative=1e-3);

    for atom in 0..3 {
        let range = grid.atom_indices(atom);
        let atomic = grid.atom_grid(atom).unwrap();
        assert_eq!(atomic.size(), range.len());
        assert!(grid.aim_weights().slice(ndarray::s![range]).iter().all(|&w| (0.0..=1.0).contains(&w)));
    }
}

#[test]
fn moments_and_integration() {
    let (atomic_numbers, coordinates) = water();
    let grid = MolecularGrid::from_json(&atomic_numbers, &coordinates, PARAMETERS).unwrap();

    let density = density(&grid);
    let mut values = Array2::zeros((2, grid.size()));
    values.row_mut(0).assign(&density);
    values.row_mut(1).fill(1.0);

    let centers = [Vector3D::zero(), Vector3D::new(0.0, 0.0, 1.11)];
    let moments = grid.moments(values.view(), &centers, 2, MomentKind::Cartesian).unwrap();
    assert_eq!(moments.values.shape(), [10, 2, 2]);

    let charge = moments.get(MomentOrder::Cartesian { nx: 0, ny: 0, nz: 0 }, 0).unwrap();
    assert_relative_eq!(charge[0], grid.integrate(density.view()).unwrap(), max_relative=1e-10);
    assert_relative_eq!(charge[1], grid.integrate(Array1::ones(grid.size()).view()).unwrap(), max_relative=1e-10);

    // dipole of gaussians centered on the atoms
    let dipole_z = moments.get(MomentOrder::Cartesian { nx: 0, ny: 0, nz: 1 }, 0).unwrap();
    assert_relative_eq!(dipole_z[0], 2.0 * 1.11, max_relative=5e-3);
    let dipole_y = moments.get(MomentOrder::Cartesian { nx: 0, ny: 1, nz: 0 }, 0).unwrap();
    assert_relative_eq!(dipole_y[0], 0.0, epsilon=1e-3);

    // moving the center changes the dipole by the charge times the shift
    let shifted = moments.get(MomentOrder::Cartesian { nx: 0, ny: 0, nz: 1 }, 1).unwrap();
    assert_relative_eq!(shifted[0], dipole_z[0] - 1.11 * charge[0], epsilon=1e-10);

    // spherical and radial moments agree with the cartesian ones
    let spherical = grid.moments(values.view(), &centers[..1], 1, MomentKind::Spherical).unwrap();
    let z = spherical.get(MomentOrder::Spherical { l: 1, m: 0 }, 0).unwrap();
    assert_relative_eq!(z[0], dipole_z[0], max_relative=1e-10);

    let radial = grid.moments(values.view(), &centers[..1], 2, MomentKind::Radial).unwrap();
    let r2 = radial.get(MomentOrder::Radial { n: 2 }, 0).unwrap();
    let xx = moments.get(MomentOrder::Cartesian { nx: 2, ny: 0, nz: 0 }, 0).unwrap();
    let yy = moments.get(MomentOrder::Cartesian { nx: 0, ny: 2, nz: 0 }, 0).unwrap();
    let zz = moments.get(MomentOrder::Cartesian { nx: 0, ny: 0, nz: 2 }, 0).unwrap();
    assert_relative_eq!(r2[0], xx[0] + yy[0] + zz[0], max_relative=1e-10);
}

#[test]
fn atom_moments() {
    let (atomic_numbers, coordinates) = water();
    let grid = MolecularGrid::from_json(&atomic_numbers, &coordinates, PARAMETERS).unwrap();

    let density = density(&grid).insert_axis(ndarray::Axis(0));
    let per_atom = grid.atom_moments(density.view(), 1, MomentKind::Cartesian).unwrap();
    assert_eq!(per_atom.len(), 3);

    let order = MomentOrder::Cartesian { nx: 0, ny: 0, nz: 0 };
    let total = per_atom.iter().map(|moments| moments.get(order, 0).unwrap()[0]).sum::<f64>();
    assert_relative_eq!(total, grid.integrate(density.row(0)).unwrap(), max_relative=1e-10);

    // the two hydrogen atoms are equivalent
    assert_relative_eq!(
        per_atom[1].get(order, 0).unwrap()[0],
        per_atom[2].get(order, 0).unwrap()[0],
        max_relative=1e-10
    );
}

#[test]
fn without_atomic_grids() {
    let (atomic_numbers, coordinates) = water();
    let parameters = PARAMETERS.replace(r#""store": true"#, r#""store": false"#);
    let grid = MolecularGrid::from_json(&atomic_numbers, &coordinates, &parameters).unwrap();
    assert!(!grid.stores_atomic_grids());

    let density = density(&grid).insert_axis(ndarray::Axis(0));
    let error = grid.atom_moments(density.view(), 1, MomentKind::Cartesian).unwrap_err();
    assert_eq!(
        error.to_string(),
        "unsupported operation: can not compute per-atom moments on a molecular grid \
        created without storing atomic grids, use `store = true` when creating the grid"
    );
}

#[test]
fn invalid_geometry() {
    let coordinates = [Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(0.0, 0.0, 0.0)];
    let error = MolecularGrid::from_json(&[1, 1], &coordinates, PARAMETERS).unwrap_err();
    assert_eq!(error.to_string(), "degenerate geometry: atoms 0 and 1 are separated by 0e0");

    let error = MolecularGrid::from_json(&[1, 1], &coordinates[..1], PARAMETERS).unwrap_err();
    assert_eq!(error.to_string(), "size mismatch: expected an array with 2 values, got 1");
}
