//! Text search and amenity filtering over the catalog.
//!
//! Filtering never reorders: survivors come back in catalog order. An empty
//! result is an ordinary outcome the caller renders as "no results".

use crate::catalog::{CoffeeShop, Facet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of facets that must all be offered by a matching shop.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetFilter {
    active: BTreeSet<Facet>,
}

impl FacetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_facets(facets: impl IntoIterator<Item = Facet>) -> Self {
        Self {
            active: facets.into_iter().collect(),
        }
    }

    pub fn is_active(&self, facet: Facet) -> bool {
        self.active.contains(&facet)
    }

    pub fn set(&mut self, facet: Facet, active: bool) {
        if active {
            self.active.insert(facet);
        } else {
            self.active.remove(&facet);
        }
    }

    /// Flip one facet, returning its new state.
    pub fn toggle(&mut self, facet: Facet) -> bool {
        let now_active = !self.is_active(facet);
        self.set(facet, now_active);
        now_active
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Active facets in canonical order.
    pub fn active(&self) -> impl Iterator<Item = Facet> + '_ {
        self.active.iter().copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Case-insensitive substring match on name, short description, city, or any
/// specialty. Blank terms match everything.
pub fn matches_text(shop: &CoffeeShop, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    let hit = |field: &str| field.to_lowercase().contains(&term);
    hit(&shop.name)
        || hit(&shop.description)
        || hit(&shop.location.city)
        || shop.specialties.iter().any(|specialty| hit(specialty))
}

/// True when the shop offers every active facet.
pub fn matches_facets(shop: &CoffeeShop, filter: &FacetFilter) -> bool {
    filter.active().all(|facet| shop.amenities.has(facet))
}

/// Shops satisfying both predicates, in catalog order.
pub fn filter_catalog<'a>(
    shops: &'a [CoffeeShop],
    term: &str,
    filter: &FacetFilter,
) -> QueryOutcome<'a> {
    let shops = shops
        .iter()
        .filter(|shop| matches_text(shop, term) && matches_facets(shop, filter))
        .collect();
    QueryOutcome { shops }
}

#[derive(Debug, Clone, PartialEq)]
/// Filtered view of the catalog.
pub struct QueryOutcome<'a> {
    pub shops: Vec<&'a CoffeeShop>,
}

impl<'a> QueryOutcome<'a> {
    pub fn len(&self) -> usize {
        self.shops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a CoffeeShop> + '_ {
        self.shops.iter().copied()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.shops.iter().map(|shop| shop.id.as_str()).collect()
    }
}
