//! Session-scoped review overlay.
//!
//! The overlay holds reviews contributed during the current session, keyed
//! by shop id and kept apart from the catalog's seed reviews. It is a
//! best-effort cache rather than a system of record: unknown shop or review
//! ids degrade to empty results and no-ops instead of errors.
//!
//! Snapshots are the handoff format between one store instance and its
//! successor (e.g., across a process restart). The store itself never
//! touches the filesystem; `save_snapshot`/`load_snapshot` are the optional
//! durable channel.

use crate::catalog::{Review, ReviewId, ShopId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Full copy of an overlay store, keyed by shop id.
///
/// Each list is ordered most-recently-added first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlaySnapshot(pub BTreeMap<ShopId, Vec<Review>>);

impl OverlaySnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serializing overlay snapshot")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing overlay snapshot")
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Default, Clone)]
/// Mutable mapping from shop id to the reviews added this session.
pub struct ReviewOverlayStore {
    reviews: BTreeMap<ShopId, Vec<Review>>,
}

impl ReviewOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rehydrated from a previously exported snapshot.
    pub fn from_snapshot(snapshot: OverlaySnapshot) -> Self {
        let mut store = Self::new();
        store.import_snapshot(snapshot);
        store
    }

    /// Overlay reviews for a shop, newest first. Unknown ids yield an empty slice.
    pub fn get_reviews(&self, shop_id: &ShopId) -> &[Review] {
        self.reviews.get(shop_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insert `review` at the front of the shop's list.
    ///
    /// A review whose id is already stored for this shop is ignored, so at
    /// most one instance per (shop, review id) ever exists.
    pub fn add_review(&mut self, shop_id: &ShopId, review: Review) {
        let list = self.reviews.entry(shop_id.clone()).or_default();
        if list.iter().any(|existing| existing.id == review.id) {
            debug!(shop = %shop_id, review = %review.id, "review already in overlay");
            return;
        }
        debug!(shop = %shop_id, review = %review.id, "adding overlay review");
        list.insert(0, review);
    }

    /// Remove every review with `review_id` from the shop's list, returning
    /// the first one removed.
    pub fn delete_review(&mut self, shop_id: &ShopId, review_id: &ReviewId) -> Option<Review> {
        let list = self.reviews.get_mut(shop_id)?;
        let pos = list.iter().position(|review| &review.id == review_id)?;
        debug!(shop = %shop_id, review = %review_id, "removing overlay review");
        let removed = list.remove(pos);
        list.retain(|review| &review.id != review_id);
        Some(removed)
    }

    pub fn contains(&self, shop_id: &ShopId, review_id: &ReviewId) -> bool {
        self.get_reviews(shop_id)
            .iter()
            .any(|review| &review.id == review_id)
    }

    /// Total number of stored reviews across all shops.
    pub fn len(&self) -> usize {
        self.reviews.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the entire contents with `snapshot`.
    ///
    /// Repeated review ids within a shop keep only their first occurrence.
    pub fn import_snapshot(&mut self, snapshot: OverlaySnapshot) {
        let mut reviews = snapshot.0;
        for (shop_id, list) in &mut reviews {
            let mut seen = BTreeSet::new();
            let before = list.len();
            list.retain(|review| seen.insert(review.id.clone()));
            if list.len() != before {
                debug!(shop = %shop_id, dropped = before - list.len(), "dropped repeated review ids");
            }
        }
        self.reviews = reviews;
        info!(reviews = self.len(), "imported overlay snapshot");
    }

    /// Copy of the current contents.
    pub fn export_snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot(self.reviews.clone())
    }
}

/// Read a snapshot written by `save_snapshot`. A missing file is an empty overlay.
pub fn load_snapshot(path: &Path) -> Result<OverlaySnapshot> {
    if !path.exists() {
        return Ok(OverlaySnapshot::default());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    OverlaySnapshot::from_json(&raw).with_context(|| format!("loading {}", path.display()))
}

/// Companion file for the undo stacks that belong to the snapshot at `path`:
/// `overlay.json` pairs with `overlay.undo.json`.
pub fn undo_path(path: &Path) -> PathBuf {
    path.with_extension("undo.json")
}

/// Write `snapshot` to `path`, replacing any previous copy atomically.
pub fn save_snapshot(path: &Path, snapshot: &OverlaySnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("allocating temp file in {}", dir.display()))?;
    tmp.write_all(snapshot.to_json()?.as_bytes())
        .context("writing snapshot")?;
    tmp.persist(path)
        .with_context(|| format!("persisting snapshot {}", path.display()))?;
    info!(path = %path.display(), "saved overlay snapshot");
    Ok(())
}
