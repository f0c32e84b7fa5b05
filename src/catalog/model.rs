//! Deserializable representation of `data/coffee_shops.json`.
//!
//! The types mirror `schema/catalog.schema.json` (camelCase field names
//! included) so the bundled catalog, catalog files supplied at startup, and
//! overlay snapshots all share one model. Use `CatalogIndex` for validation
//! and id lookup; use these structs directly when only parsing is needed.

use crate::catalog::identity::{Facet, ReviewId, ShopId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Author label that marks a review as written in the current session.
pub const OWN_AUTHOR: &str = "You";

#[derive(Clone, Debug, Deserialize, Serialize)]
/// Catalog file as stored on disk.
pub struct CatalogFile {
    pub schema_version: String,
    pub shops: Vec<CoffeeShop>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// One directory listing.
pub struct CoffeeShop {
    pub id: ShopId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub image: String,
    /// Seed average shown when no reviews are attached.
    pub rating: f64,
    pub location: Location,
    pub hours: Hours,
    pub amenities: Amenities,
    #[serde(default)]
    pub specialties: Vec<String>,
    /// Seed reviews in display order.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub coordinates: Coordinates,
}

/// Opaque coordinate pair; the engine stores it but never computes with it.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Hours {
    pub open: String,
    pub close: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenities {
    pub wifi: bool,
    pub seating: bool,
    pub power_outlets: bool,
    pub quiet_space: bool,
}

impl Amenities {
    pub fn has(&self, facet: Facet) -> bool {
        match facet {
            Facet::Wifi => self.wifi,
            Facet::Seating => self.seating,
            Facet::PowerOutlets => self.power_outlets,
            Facet::QuietSpace => self.quiet_space,
        }
    }

    /// Facets this shop offers, in canonical order.
    pub fn offered(&self) -> impl Iterator<Item = Facet> + '_ {
        Facet::ALL.into_iter().filter(|facet| self.has(*facet))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
/// A single review, either seeded with the catalog or added during a session.
pub struct Review {
    pub id: ReviewId,
    pub user: String,
    pub rating: u8,
    pub comment: String,
    /// ISO-8601 timestamp; kept verbatim so snapshots round-trip exactly.
    pub date: String,
}

impl Review {
    /// True when the review was authored by the current session.
    pub fn is_own(&self) -> bool {
        self.user == OWN_AUTHOR
    }
}

/// Read and parse a catalog file from disk without additional validation.
pub fn load_catalog_from_path(path: &Path) -> Result<CatalogFile> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let catalog: CatalogFile =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(catalog)
}
