//! Environment-driven configuration for the directory binaries.
//!
//! Every knob is optional. Without overrides the bundled catalog is used,
//! no overlay snapshot is persisted, and the simulated delays match the
//! listing UI (500 ms for searches, 1000 ms for review submissions).

use crate::catalog::CatalogIndex;
use crate::find_data_root;
use anyhow::{Context, Result, bail};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ROOT: &str = "BREWSCOUT_ROOT";
pub const ENV_CATALOG: &str = "BREWSCOUT_CATALOG";
pub const ENV_SNAPSHOT: &str = "BREWSCOUT_SNAPSHOT";
pub const ENV_SEARCH_DELAY_MS: &str = "BREWSCOUT_SEARCH_DELAY_MS";
pub const ENV_SUBMIT_DELAY_MS: &str = "BREWSCOUT_SUBMIT_DELAY_MS";

/// Catalog location relative to the data root.
pub const DEFAULT_CATALOG_PATH: &str = "data/coffee_shops.json";

const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Explicit catalog file; when `None` the data root copy or the bundled
    /// catalog is used.
    pub catalog_path: Option<PathBuf>,
    /// Overlay handoff file read at startup and written on exit.
    pub snapshot_path: Option<PathBuf>,
    pub search_delay: Duration,
    pub submit_delay: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            snapshot_path: None,
            search_delay: DEFAULT_SEARCH_DELAY,
            submit_delay: DEFAULT_SUBMIT_DELAY,
        }
    }
}

/// Where the catalog for a session comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Bundled,
}

impl DirectoryConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let catalog_path = non_empty(ENV_CATALOG).map(PathBuf::from).or_else(|| {
            non_empty(ENV_ROOT)
                .map(|root| Path::new(&root).join(DEFAULT_CATALOG_PATH))
                .filter(|path| path.is_file())
        });

        Ok(Self {
            catalog_path,
            snapshot_path: non_empty(ENV_SNAPSHOT).map(PathBuf::from),
            search_delay: parse_delay(ENV_SEARCH_DELAY_MS, non_empty(ENV_SEARCH_DELAY_MS))?
                .unwrap_or(DEFAULT_SEARCH_DELAY),
            submit_delay: parse_delay(ENV_SUBMIT_DELAY_MS, non_empty(ENV_SUBMIT_DELAY_MS))?
                .unwrap_or(DEFAULT_SUBMIT_DELAY),
        })
    }

    /// Resolve the catalog source: explicit path, then the data root copy,
    /// then the bundled catalog.
    pub fn catalog_source(&self) -> CatalogSource {
        if let Some(path) = &self.catalog_path {
            return CatalogSource::File(path.clone());
        }
        if let Ok(root) = find_data_root() {
            let candidate = root.join(DEFAULT_CATALOG_PATH);
            if candidate.is_file() {
                return CatalogSource::File(candidate);
            }
        }
        CatalogSource::Bundled
    }

    pub fn load_catalog(&self) -> Result<CatalogIndex> {
        match self.catalog_source() {
            CatalogSource::File(path) => CatalogIndex::load(&path),
            CatalogSource::Bundled => CatalogIndex::bundled(),
        }
    }
}

fn parse_delay(key: &str, raw: Option<String>) -> Result<Option<Duration>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'"))?;
    if millis > 60_000 {
        bail!("{key} must not exceed 60000 ms, got {millis}");
    }
    Ok(Some(Duration::from_millis(millis)))
}
