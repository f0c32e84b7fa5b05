//! Shared library for the brewscout coffee shop directory.
//!
//! The crate exposes the catalog model, the session review overlay, the
//! rating aggregator, the query engine, and the session facade that ties them
//! together for a presentation shell. Public functions here form the contract
//! the binaries depend on: data-root discovery, configuration, and the small
//! parsing helpers shared by the CLIs.

use anyhow::{Result, bail};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub mod catalog;
pub mod config;
pub mod deferred;
pub mod logging;
pub mod overlay;
pub mod query;
pub mod rating;
mod schema_loader;
pub mod session;
pub mod validation;

pub use catalog::{
    Amenities, CatalogFile, CatalogIndex, CatalogSummary, CoffeeShop, Coordinates, Facet, Hours,
    Location, OWN_AUTHOR, Review, ReviewId, ShopId, load_catalog_from_path,
};
pub use config::{CatalogSource, DirectoryConfig};
pub use deferred::{DeferredQueue, Ticket};
pub use logging::init_logging;
pub use overlay::{OverlaySnapshot, ReviewOverlayStore, load_snapshot, save_snapshot, undo_path};
pub use query::{FacetFilter, QueryOutcome, filter_catalog, matches_facets, matches_text};
pub use rating::{ReviewSummary, aggregate_rating, display_rating, merge_reviews};
pub use session::{DirectorySession, SessionEvent, ShopView, SubmitError, SubscriptionId};
pub use validation::{ReviewDraft, ValidationError};

const ROOT_SENTINEL: &str = catalog::CATALOG_SCHEMA_PATH;

/// Returns true when `candidate` looks like a brewscout data root.
fn is_data_root(candidate: &Path) -> bool {
    candidate.join(ROOT_SENTINEL).is_file()
}

/// Verifies that an explicit root hint points at a valid data root.
fn data_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !hint_path.exists() || !is_data_root(&hint_path) {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_data_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the directory holding `schema/` and `data/`.
///
/// Search order: honor `BREWSCOUT_ROOT` if it points at a real data root,
/// climb up from the current executable, then use the build-time hint.
/// Callers that can run on the bundled catalog treat failure as non-fatal.
pub fn find_data_root() -> Result<PathBuf> {
    if let Ok(env_root) = env::var(config::ENV_ROOT) {
        if let Some(root) = data_root_from_hint(&env_root) {
            return Ok(root);
        }
    }

    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            if let Some(root) = search_upwards(exe_dir) {
                return Ok(root);
            }
        }
    }

    if let Some(hint) = option_env!("BREWSCOUT_ROOT_HINT") {
        if let Some(root) = data_root_from_hint(hint) {
            return Ok(root);
        }
    }

    bail!(
        "Unable to locate the brewscout data root. Set {} to a directory containing {}.",
        config::ENV_ROOT,
        ROOT_SENTINEL
    );
}

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a facet list such as `"wifi, quietSpace"` into a filter.
pub fn parse_facet_list(value: &str) -> Result<FacetFilter> {
    let mut filter = FacetFilter::new();
    for token in split_list(value) {
        let facet: Facet = token.parse()?;
        filter.set(facet, true);
    }
    Ok(filter)
}
