//! Shared JSON Schema loader with schema_version enforcement.
//!
//! Catalog files declare a `schema_version`; the schema pins the same value as
//! a `const`. The loader reads the schema, checks that const against the
//! allowed set, and compiles a validator.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const SCHEMA_VERSION_POINTER: &str = "/properties/schema_version/const";

pub(crate) fn load_json_schema(path: &Path, allowed: &BTreeSet<String>) -> Result<JSONSchema> {
    let file = File::open(path).with_context(|| format!("opening schema {}", path.display()))?;
    let schema: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing schema {}", path.display()))?;

    let schema_version = extract_schema_version(&schema)
        .ok_or_else(|| anyhow!("schema {} missing schema_version const", path.display()))?;
    if !allowed.contains(&schema_version) {
        bail!(
            "schema_version '{}' not in allowed set {:?}",
            schema_version,
            allowed
        );
    }

    JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling schema {}: {err}", path.display()))
}

/// Validate `instance` and fold every violation into one error message.
pub(crate) fn validate_instance(schema: &JSONSchema, instance: &Value, label: &str) -> Result<()> {
    if let Err(errors) = schema.validate(instance) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("{label} failed schema validation:\n{details}");
    }
    Ok(())
}

fn extract_schema_version(schema: &Value) -> Option<String> {
    let version = schema.pointer(SCHEMA_VERSION_POINTER).and_then(Value::as_str)?;
    if version.trim().is_empty() {
        return None;
    }
    Some(version.to_string())
}
