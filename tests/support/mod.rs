#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn helper_binary(name: &str) -> PathBuf {
    let path = match name {
        "brewscout" => env!("CARGO_BIN_EXE_brewscout"),
        "catalog-check" => env!("CARGO_BIN_EXE_catalog-check"),
        other => panic!("unknown helper {other}"),
    };
    PathBuf::from(path)
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Minimal catalog entry; `amenities` is `[wifi, seating, powerOutlets, quietSpace]`.
pub fn shop_json(id: &str, name: &str, city: &str, amenities: [bool; 4], ratings: &[u8]) -> Value {
    let reviews: Vec<Value> = ratings
        .iter()
        .enumerate()
        .map(|(idx, rating)| {
            json!({
                "id": format!("{id}-seed-{idx}"),
                "user": format!("Guest {idx}"),
                "rating": rating,
                "comment": "Seeded fixture review",
                "date": "2023-09-28T09:23:00.000Z"
            })
        })
        .collect();
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} serves coffee"),
        "longDescription": "",
        "image": "/placeholder.svg",
        "rating": 3.5,
        "location": {
            "address": "1 Fixture Way",
            "city": city,
            "state": "OR",
            "zip": "97201",
            "coordinates": {"lat": 45.5, "lng": -122.6}
        },
        "hours": {"open": "7:00 AM", "close": "6:00 PM"},
        "amenities": {
            "wifi": amenities[0],
            "seating": amenities[1],
            "powerOutlets": amenities[2],
            "quietSpace": amenities[3]
        },
        "specialties": ["Drip coffee"],
        "reviews": reviews
    })
}

pub fn catalog_json(shops: Vec<Value>) -> Value {
    json!({"schema_version": "coffee_catalog_v1", "shops": shops})
}

/// Write `catalog` under `<root>/data/` and return the file path.
pub fn write_catalog(root: &Path, catalog: &Value) -> Result<PathBuf> {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir)?;
    let path = data_dir.join("catalog.json");
    fs::write(&path, serde_json::to_vec_pretty(catalog)?)?;
    Ok(path)
}
