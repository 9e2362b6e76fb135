use std::path::PathBuf;

use schemars::schema_for;

use molgrid::{GridParameters, PoissonOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = [
        ("MolecularGrid", schema_for!(GridParameters)),
        ("PoissonOptions", schema_for!(PoissonOptions)),
    ];

    let mut directory = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    directory.pop();
    directory.push("build");
    directory.push("json-schemas");
    std::fs::create_dir_all(&directory)?;

    for (name, schema) in &schemas {
        let path = directory.join(format!("{}.json", name));
        std::fs::write(&path, serde_json::to_string_pretty(schema)?)?;
        println!("wrote {}", path.display());
    }

    Ok(())
}
