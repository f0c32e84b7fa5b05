//! Coffee shop catalog wiring.
//!
//! This module wraps the JSON catalog under `data/coffee_shops.json` so the
//! engine can load a validated, immutable snapshot and expose consistent
//! identifiers. Types here mirror `schema/catalog.schema.json`; callers use
//! `CatalogIndex` for ordered access and id lookups.

pub mod identity;
pub mod index;
pub mod model;
pub mod summary;

pub use identity::{Facet, ReviewId, ShopId, UnknownFacet};
pub use index::{CATALOG_SCHEMA_PATH, CATALOG_SCHEMA_VERSION, CatalogIndex};
pub use model::{
    Amenities, CatalogFile, CoffeeShop, Coordinates, Hours, Location, OWN_AUTHOR, Review,
};
pub use summary::CatalogSummary;

pub use model::load_catalog_from_path;
