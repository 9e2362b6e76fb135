use molgrid::{MolecularGrid, MomentKind, PoissonOptions, PoissonSolver, Vector3D};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    time_graph::spanned!("Full calculation", {
        water_calculation()?;
    });

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Build a grid for a water molecule, and run all the available operations
/// on a model density
fn water_calculation() -> Result<(), Box<dyn std::error::Error>> {
    let atomic_numbers = [8, 1, 1];
    let coordinates = [
        Vector3D::new(0.0, 0.0, 0.0),
        Vector3D::new(0.0, 1.43, 1.11),
        Vector3D::new(0.0, -1.43, 1.11),
    ];

    let grid = MolecularGrid::from_json(&atomic_numbers, &coordinates, r#"{
        "radial": {
            "quadrature": {"type": "GaussChebyshevType2", "points": 70},
            "transform": {"type": "Becke", "rmin": 1e-4, "scale": 1.5}
        },
        "angular": {"type": "Preset", "preset": "fine"},
        "store": true
    }"#)?;

    let density = grid.points().rows().into_iter().map(|point| {
        coordinates.iter()
            .map(|center| f64::exp(-(Vector3D::from_row(point) - center).norm2()))
            .sum::<f64>()
    }).collect::<ndarray::Array1<f64>>();

    println!("integral = {}", grid.integrate(density.view())?);

    let values = density.view().insert_axis(ndarray::Axis(0));
    grid.moments(values, &[Vector3D::zero()], 4, MomentKind::Cartesian)?;
    grid.atom_moments(values, 4, MomentKind::Spherical)?;

    let model = grid.interpolate(density.view(), 8)?;
    model.gradient(grid.points())?;

    let oxygen = grid.atom_grid(0)?;
    let oxygen_density = density.slice(ndarray::s![grid.atom_indices(0)]);
    let potential = PoissonSolver::new(oxygen, PoissonOptions { max_angular: 2, ..Default::default() })?
        .decompose(oxygen_density)?
        .solve()?;
    potential.potential(oxygen.points())?;

    Ok(())
}
