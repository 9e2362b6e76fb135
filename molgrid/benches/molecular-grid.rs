#![allow(clippy::needless_return)]

use molgrid::{MolecularGrid, Vector3D};

use criterion::{Criterion, SamplingMode, black_box, criterion_group, criterion_main};

fn water() -> (Vec<usize>, Vec<Vector3D>) {
    let coordinates = vec![
        Vector3D::new(0.0, 0.0, 0.0),
        Vector3D::new(0.0, 1.43, 1.11),
        Vector3D::new(0.0, -1.43, 1.11),
    ];
    return (vec![8, 1, 1], coordinates);
}

fn parameters(preset: &str, n_radial: usize) -> String {
    format!(r#"{{
        "radial": {{
            "quadrature": {{"type": "GaussChebyshevType2", "points": {}}},
            "transform": {{"type": "Becke", "rmin": 1e-4, "scale": 1.5}}
        }},
        "angular": {{"type": "Preset", "preset": "{}"}},
        "store": true
    }}"#, n_radial, preset)
}

fn molecular_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("Molecular grid/water");
    group.noise_threshold(0.05);
    group.sampling_mode(SamplingMode::Flat);

    let (atomic_numbers, coordinates) = water();
    for &preset in black_box(&["coarse", "medium", "fine"]) {
        let parameters = parameters(preset, 70);
        group.bench_function(format!("create ({})", preset), |b| b.iter(|| {
            MolecularGrid::from_json(&atomic_numbers, &coordinates, &parameters).unwrap()
        }));
    }
}

fn interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Molecular grid/water interpolation (per point)");
    group.noise_threshold(0.05);

    let (atomic_numbers, coordinates) = water();
    let grid = MolecularGrid::from_json(&atomic_numbers, &coordinates, &parameters("medium", 70)).unwrap();
    let values = grid.points().rows().into_iter().map(|point| {
        coordinates.iter()
            .map(|center| f64::exp(-(Vector3D::from_row(point) - center).norm2()))
            .sum::<f64>()
    }).collect::<ndarray::Array1<f64>>();

    for &max_angular in black_box(&[2, 4, 8]) {
        let model = grid.interpolate(values.view(), max_angular).unwrap();
        let points = grid.points().slice(ndarray::s![..1000, ..]).to_owned();

        group.bench_function(format!("l_max = {}", max_angular), |b| b.iter_custom(|repeat| {
            let start = std::time::Instant::now();
            for _ in 0..repeat {
                model.gradient(points.view()).unwrap();
            }
            start.elapsed() / points.nrows() as u32
        }));
    }
}

criterion_group!(benches, molecular_grid, interpolation);
criterion_main!(benches);
