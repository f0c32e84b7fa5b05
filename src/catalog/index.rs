//! Indexed, validated view of a coffee shop catalog.
//!
//! The index is the immutable Catalog the rest of the engine reads from. It
//! rejects duplicate shop ids, out-of-range ratings, and unknown schema
//! versions up front so query and rating code can treat the data as trusted.

use crate::catalog::load_catalog_from_path;
use crate::catalog::{CatalogFile, CoffeeShop, ShopId};
use crate::schema_loader::{load_json_schema, validate_instance};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Schema version understood by this build.
pub const CATALOG_SCHEMA_VERSION: &str = "coffee_catalog_v1";

/// Relative location of the catalog schema under the data root.
pub const CATALOG_SCHEMA_PATH: &str = "schema/catalog.schema.json";

const BUNDLED_CATALOG: &str = include_str!("../../data/coffee_shops.json");

#[derive(Debug, Clone)]
/// Catalog shops in file order plus a derived index keyed by shop id.
pub struct CatalogIndex {
    schema_version: String,
    shops: Vec<CoffeeShop>,
    by_id: BTreeMap<ShopId, usize>,
}

impl CatalogIndex {
    /// Load a catalog from disk, validating it against the JSON schema and
    /// the structural rules (unique ids, rating ranges).
    pub fn load(path: &Path) -> Result<Self> {
        validate_against_schema(path)?;
        let file =
            load_catalog_from_path(path).with_context(|| format!("loading {}", path.display()))?;
        let index =
            Self::from_file(file).with_context(|| format!("validating {}", path.display()))?;
        info!(path = %path.display(), shops = index.len(), "loaded catalog");
        Ok(index)
    }

    /// The seed catalog compiled into the crate.
    pub fn bundled() -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(BUNDLED_CATALOG).context("parsing bundled catalog")?;
        Self::from_file(file).context("validating bundled catalog")
    }

    /// Build an index from in-memory shops (structural validation only).
    pub fn from_shops(shops: Vec<CoffeeShop>) -> Result<Self> {
        Self::from_file(CatalogFile {
            schema_version: CATALOG_SCHEMA_VERSION.to_string(),
            shops,
        })
    }

    pub fn from_file(file: CatalogFile) -> Result<Self> {
        validate_schema_version(&file.schema_version)?;
        let by_id = build_index(&file.shops)?;
        Ok(Self {
            schema_version: file.schema_version,
            shops: file.shops,
            by_id,
        })
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Shops in catalog order.
    pub fn shops(&self) -> &[CoffeeShop] {
        &self.shops
    }

    /// Resolve a shop by id.
    ///
    /// Returns `None` instead of erroring; unknown ids are an ordinary
    /// outcome for callers.
    pub fn shop(&self, id: &ShopId) -> Option<&CoffeeShop> {
        self.by_id.get(id).map(|&pos| &self.shops[pos])
    }

    pub fn contains(&self, id: &ShopId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Iterates shop ids in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &ShopId> {
        self.shops.iter().map(|shop| &shop.id)
    }

    pub fn len(&self) -> usize {
        self.shops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }
}

fn validate_schema_version(schema_version: &str) -> Result<()> {
    if schema_version.is_empty() {
        bail!("schema_version must not be empty");
    }

    let allowed = allowed_schema_versions();
    if !allowed.contains(schema_version) {
        bail!(
            "schema_version '{}' not in allowed set {:?}",
            schema_version,
            allowed
        );
    }

    Ok(())
}

fn allowed_schema_versions() -> BTreeSet<String> {
    BTreeSet::from_iter([CATALOG_SCHEMA_VERSION.to_string()])
}

fn build_index(shops: &[CoffeeShop]) -> Result<BTreeMap<ShopId, usize>> {
    if shops.is_empty() {
        bail!("catalog contains no shops");
    }

    let mut map = BTreeMap::new();
    for (pos, shop) in shops.iter().enumerate() {
        if shop.id.0.trim().is_empty() {
            bail!("encountered shop with no id");
        }
        if map.contains_key(&shop.id) {
            bail!("duplicate shop id {}", shop.id);
        }
        if !(0.0..=5.0).contains(&shop.rating) {
            bail!(
                "shop {} has base rating {} outside 0-5",
                shop.id,
                shop.rating
            );
        }

        let mut review_ids = BTreeSet::new();
        for review in &shop.reviews {
            if !review_ids.insert(&review.id) {
                bail!("shop {} repeats seed review id {}", shop.id, review.id);
            }
            if !(1..=5).contains(&review.rating) {
                bail!(
                    "seed review {} on shop {} has rating {} outside 1-5",
                    review.id,
                    shop.id,
                    review.rating
                );
            }
        }
        map.insert(shop.id.clone(), pos);
    }
    Ok(map)
}

fn validate_against_schema(catalog_path: &Path) -> Result<()> {
    let catalog_file = File::open(catalog_path)
        .with_context(|| format!("opening catalog {}", catalog_path.display()))?;
    let catalog_value: Value = serde_json::from_reader(BufReader::new(catalog_file))
        .with_context(|| format!("parsing catalog {}", catalog_path.display()))?;

    let schema_path = resolve_catalog_schema_path(catalog_path);
    let allowed = allowed_schema_versions();
    let schema = load_json_schema(&schema_path, &allowed)
        .with_context(|| format!("loading catalog schema {}", schema_path.display()))?;

    validate_instance(
        &schema,
        &catalog_value,
        &format!("catalog {}", catalog_path.display()),
    )
}

/// Prefer a schema shipped next to the catalog's data root, falling back to
/// the copy in this crate.
fn resolve_catalog_schema_path(catalog_path: &Path) -> PathBuf {
    if let Some(base) = catalog_path.parent().and_then(|p| p.parent()) {
        let candidate = base.join(CATALOG_SCHEMA_PATH);
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(CATALOG_SCHEMA_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Amenities, Coordinates, Hours, Location, Review, ReviewId};

    fn shop(id: &str, rating: f64) -> CoffeeShop {
        CoffeeShop {
            id: ShopId::from(id),
            name: format!("Shop {id}"),
            description: String::new(),
            long_description: String::new(),
            image: String::new(),
            rating,
            location: Location {
                address: "1 Main".into(),
                city: "Portland".into(),
                state: "OR".into(),
                zip: "97201".into(),
                coordinates: Coordinates { lat: 0.0, lng: 0.0 },
            },
            hours: Hours {
                open: "7:00 AM".into(),
                close: "8:00 PM".into(),
            },
            amenities: Amenities::default(),
            specialties: Vec::new(),
            reviews: Vec::new(),
        }
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let index = CatalogIndex::bundled().unwrap();
        assert_eq!(index.len(), 6);
        assert_eq!(index.schema_version(), CATALOG_SCHEMA_VERSION);
        let urban = index.shop(&ShopId::from("2")).unwrap();
        assert_eq!(urban.name, "Urban Grind");
        let ids: Vec<&str> = index.ids().map(ShopId::as_str).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = CatalogIndex::from_shops(vec![shop("1", 4.0), shop("1", 3.0)]).unwrap_err();
        assert!(err.to_string().contains("duplicate shop id 1"));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(CatalogIndex::from_shops(Vec::new()).is_err());
    }

    #[test]
    fn rejects_out_of_range_ratings() {
        assert!(CatalogIndex::from_shops(vec![shop("1", 5.5)]).is_err());

        let mut bad_review = shop("2", 4.0);
        bad_review.reviews.push(Review {
            id: ReviewId::from("r1"),
            user: "Someone".into(),
            rating: 0,
            comment: "nope nope".into(),
            date: "2023-01-01T00:00:00.000Z".into(),
        });
        assert!(CatalogIndex::from_shops(vec![bad_review]).is_err());
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let err = CatalogIndex::from_file(CatalogFile {
            schema_version: "coffee_catalog_v0".into(),
            shops: vec![shop("1", 4.0)],
        })
        .unwrap_err();
        assert!(err.to_string().contains("not in allowed set"));
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        let index = CatalogIndex::from_shops(vec![shop("1", 4.0)]).unwrap();
        assert!(index.shop(&ShopId::from("missing")).is_none());
        assert!(!index.contains(&ShopId::from("missing")));
    }
}
