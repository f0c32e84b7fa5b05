//! Validate a catalog file and print its summary as JSON.
//!
//! Runs the same schema and structural checks the session performs at
//! startup, so a catalog can be vetted before it is deployed. Without
//! `--file` the bundled catalog is checked.

use anyhow::{Result, bail};
use brewscout::{CatalogIndex, CatalogSummary, init_logging};
use std::env;
use std::path::PathBuf;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let file = parse_args()?;
    let index = match &file {
        Some(path) => {
            if !path.is_file() {
                bail!("catalog file not found: {}", path.display());
            }
            CatalogIndex::load(path)?
        }
        None => CatalogIndex::bundled()?,
    };
    let summary = CatalogSummary::from_index(&index);
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = env::args_os().skip(1);
    let mut file = None;
    while let Some(arg_os) = args.next() {
        let arg = arg_os
            .into_string()
            .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
        match arg.as_str() {
            "--file" => {
                let Some(path) = args.next() else {
                    bail!("missing value for --file");
                };
                if file.is_some() {
                    bail!("--file may only be provided once");
                }
                file = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                print!("{}", usage());
                std::process::exit(0);
            }
            other => bail!("unknown flag: {other}"),
        }
    }
    Ok(file)
}

fn usage() -> &'static str {
    "Usage: catalog-check [--file PATH]\n\
Validates a coffee shop catalog against schema/catalog.schema.json and the structural rules, then prints a JSON summary.\n"
}
