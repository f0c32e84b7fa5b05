//! Merge seed and overlay reviews and derive the aggregate rating.
//!
//! Nothing here is cached: every call recomputes from the inputs it is given,
//! so an overlay mutation is reflected the next time a summary is built.

use crate::catalog::{CoffeeShop, Review, ReviewId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Display sequence for one shop: own overlay reviews first (overlay order),
/// then seed reviews not authored by the session.
///
/// A seed review whose id already appears among the own reviews is dropped
/// too, so the merged sequence never carries the same id twice.
pub fn merge_reviews(seed: &[Review], overlay: &[Review]) -> Vec<Review> {
    let mut seen: BTreeSet<&ReviewId> = BTreeSet::new();
    let mut merged = Vec::with_capacity(seed.len() + overlay.len());

    for review in overlay.iter().filter(|review| review.is_own()) {
        if seen.insert(&review.id) {
            merged.push(review.clone());
        }
    }
    for review in seed.iter().filter(|review| !review.is_own()) {
        if seen.insert(&review.id) {
            merged.push(review.clone());
        }
    }
    merged
}

/// Arithmetic mean of `reviews`, or `base_rating` when there are none.
pub fn aggregate_rating(reviews: &[Review], base_rating: f64) -> f64 {
    if reviews.is_empty() {
        return base_rating;
    }
    let total: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
    f64::from(total) / reviews.len() as f64
}

/// Rating formatted the way listings show it (one decimal place).
pub fn display_rating(rating: f64) -> String {
    format!("{rating:.1}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Merged reviews plus the aggregate derived from them.
pub struct ReviewSummary {
    pub reviews: Vec<Review>,
    pub rating: f64,
}

impl ReviewSummary {
    pub fn compute(shop: &CoffeeShop, overlay: &[Review]) -> Self {
        let reviews = merge_reviews(&shop.reviews, overlay);
        let rating = aggregate_rating(&reviews, shop.rating);
        Self { reviews, rating }
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    pub fn display_rating(&self) -> String {
        display_rating(self.rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogIndex;

    fn review(id: &str, user: &str, rating: u8) -> Review {
        Review {
            id: ReviewId::from(id),
            user: user.to_string(),
            rating,
            comment: "fixture comment".to_string(),
            date: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn mean_over_seed_and_overlay() {
        let seed = vec![review("r1", "A", 5), review("r2", "B", 4)];
        let overlay = vec![review("o1", "You", 3)];
        let merged = merge_reviews(&seed, &overlay);
        assert_eq!(merged.len(), 3);
        assert_eq!(aggregate_rating(&merged, 1.0), 4.0);
    }

    #[test]
    fn empty_reviews_fall_back_to_base() {
        assert_eq!(aggregate_rating(&[], 4.7), 4.7);
        assert_eq!(merge_reviews(&[], &[]), Vec::<Review>::new());
    }

    #[test]
    fn own_reviews_lead_in_overlay_order() {
        let seed = vec![review("r1", "A", 5)];
        let overlay = vec![review("o2", "You", 2), review("o1", "You", 3)];
        let ids: Vec<String> = merge_reviews(&seed, &overlay)
            .into_iter()
            .map(|r| r.id.0)
            .collect();
        assert_eq!(ids, vec!["o2", "o1", "r1"]);
    }

    #[test]
    fn seed_reviews_authored_you_are_excluded() {
        let seed = vec![review("r1", "You", 1), review("r2", "B", 4)];
        let overlay = vec![review("o1", "You", 5)];
        let merged = merge_reviews(&seed, &overlay);
        assert!(merged.iter().all(|r| r.id.as_str() != "r1"));
        assert_eq!(merged.iter().filter(|r| r.is_own()).count(), 1);
    }

    #[test]
    fn overlay_reviews_by_others_are_not_shown() {
        let overlay = vec![review("o1", "Imported", 1)];
        assert!(merge_reviews(&[], &overlay).is_empty());
    }

    #[test]
    fn merged_ids_are_unique() {
        let seed = vec![review("dup", "A", 1)];
        let overlay = vec![review("dup", "You", 5)];
        let merged = merge_reviews(&seed, &overlay);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_own());
    }

    #[test]
    fn display_rounds_to_one_decimal() {
        assert_eq!(display_rating(14.0 / 3.0), "4.7");
        assert_eq!(display_rating(4.0), "4.0");
    }

    #[test]
    fn summary_for_bundled_shop() {
        let index = CatalogIndex::bundled().unwrap();
        let brew_haven = &index.shops()[0];
        let summary = ReviewSummary::compute(brew_haven, &[]);
        assert_eq!(summary.review_count(), 2);
        assert_eq!(summary.display_rating(), "4.5");
    }
}
