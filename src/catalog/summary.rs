//! Aggregate counts over a catalog, used by the CLI `stats` view and
//! `catalog-check` output.

use crate::catalog::{CatalogIndex, Facet};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub schema_version: String,
    pub shops: usize,
    pub seed_reviews: usize,
    /// Number of shops offering each facet.
    pub facets: BTreeMap<Facet, usize>,
    /// Distinct cities in first-seen catalog order.
    pub cities: Vec<String>,
}

impl CatalogSummary {
    pub fn from_index(index: &CatalogIndex) -> Self {
        let mut facets: BTreeMap<Facet, usize> =
            Facet::ALL.into_iter().map(|facet| (facet, 0)).collect();
        let mut cities: Vec<String> = Vec::new();
        let mut seed_reviews = 0;

        for shop in index.shops() {
            for facet in shop.amenities.offered() {
                *facets.entry(facet).or_default() += 1;
            }
            if !cities.iter().any(|city| city == &shop.location.city) {
                cities.push(shop.location.city.clone());
            }
            seed_reviews += shop.reviews.len();
        }

        Self {
            schema_version: index.schema_version().to_string(),
            shops: index.len(),
            seed_reviews,
            facets,
            cities,
        }
    }
}
