//! Session facade: the one state holder the presentation layer talks to.
//!
//! `DirectorySession` owns the current search term, the active facet filter,
//! and the review overlay. Every query is evaluated fresh against that state,
//! so observers only need to learn *that* something changed; subscribers
//! receive a `SessionEvent` after each mutation and re-query as they see fit.
//!
//! Simulated latency goes through a `DeferredQueue`: `request_*` calls
//! schedule an update, `advance` applies whatever has come due in order. A
//! search or filter update older than one already applied is dropped, so the
//! latest request wins even when the delays changed in between.

use crate::catalog::{CatalogIndex, CoffeeShop, Facet, OWN_AUTHOR, Review, ReviewId, ShopId};
use crate::config::DirectoryConfig;
use crate::deferred::{DeferredQueue, Ticket};
use crate::overlay::{
    OverlaySnapshot, ReviewOverlayStore, load_snapshot, save_snapshot, undo_path,
};
use crate::query::{FacetFilter, QueryOutcome, filter_catalog};
use crate::rating::ReviewSummary;
use crate::validation::{ReviewDraft, ValidationError};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Notification delivered to subscribers after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SearchChanged(String),
    FiltersChanged(FacetFilter),
    ReviewsChanged(ShopId),
    OverlayReplaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("unknown shop {0}")]
    UnknownShop(ShopId),
}

/// One shop together with its merged reviews and derived rating.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopView<'a> {
    pub shop: &'a CoffeeShop,
    pub summary: ReviewSummary,
}

#[derive(Debug)]
enum PendingUpdate {
    Search(String),
    Filters(FacetFilter),
    Review { shop_id: ShopId, review: Review },
}

type Observer = Box<dyn FnMut(&SessionEvent)>;

pub struct DirectorySession {
    catalog: Arc<CatalogIndex>,
    overlay: ReviewOverlayStore,
    search_term: String,
    filters: FacetFilter,
    /// Own reviews removed this session, most recent last, per shop.
    deleted: BTreeMap<ShopId, Vec<Review>>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    revision: u64,
    last_review_millis: i64,
    deferred: DeferredQueue<PendingUpdate>,
    applied_search: Option<Ticket>,
    applied_filters: Option<Ticket>,
    search_delay: Duration,
    submit_delay: Duration,
}

impl DirectorySession {
    /// Fresh session over `catalog` with an empty overlay and no delays.
    pub fn new(catalog: Arc<CatalogIndex>) -> Self {
        Self {
            catalog,
            overlay: ReviewOverlayStore::new(),
            search_term: String::new(),
            filters: FacetFilter::new(),
            deleted: BTreeMap::new(),
            observers: Vec::new(),
            next_subscription: 0,
            revision: 0,
            last_review_millis: i64::MIN,
            deferred: DeferredQueue::new(),
            applied_search: None,
            applied_filters: None,
            search_delay: Duration::ZERO,
            submit_delay: Duration::ZERO,
        }
    }

    pub fn with_delays(mut self, search_delay: Duration, submit_delay: Duration) -> Self {
        self.search_delay = search_delay;
        self.submit_delay = submit_delay;
        self
    }

    /// Build a session from configuration: load the catalog and rehydrate the
    /// overlay and its undo stacks from the configured snapshot file, if any.
    pub fn open(config: &DirectoryConfig) -> Result<Self> {
        let catalog = Arc::new(config.load_catalog()?);
        let mut session =
            Self::new(catalog).with_delays(config.search_delay, config.submit_delay);
        if let Some(path) = &config.snapshot_path {
            session.import_snapshot(load_snapshot(path)?);
            session.import_undo(load_snapshot(&undo_path(path))?);
        }
        Ok(session)
    }

    /// Hand the overlay and its undo stacks off to the configured snapshot
    /// file, if any.
    pub fn persist(&self, config: &DirectoryConfig) -> Result<()> {
        let Some(path) = &config.snapshot_path else {
            return Ok(());
        };
        save_snapshot(path, &self.export_snapshot())?;
        save_snapshot(&undo_path(path), &self.export_undo())
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn overlay(&self) -> &ReviewOverlayStore {
        &self.overlay
    }

    /// Monotonic counter bumped by every state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ---- search and filter state ----

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term == self.search_term {
            return;
        }
        debug!(term = %term, "search term changed");
        self.search_term = term;
        self.notify(SessionEvent::SearchChanged(self.search_term.clone()));
    }

    pub fn clear_search(&mut self) {
        self.set_search_term(String::new());
    }

    pub fn filters(&self) -> &FacetFilter {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: FacetFilter) {
        if filters == self.filters {
            return;
        }
        debug!(active = filters.active_count(), "filters changed");
        self.filters = filters;
        self.notify(SessionEvent::FiltersChanged(self.filters.clone()));
    }

    /// Flip one facet, returning its new state.
    pub fn toggle_filter(&mut self, facet: Facet) -> bool {
        let mut filters = self.filters.clone();
        let active = filters.toggle(facet);
        self.set_filters(filters);
        active
    }

    pub fn clear_filters(&mut self) {
        self.set_filters(FacetFilter::new());
    }

    /// Reset both the search term and the facet filter.
    pub fn clear_all(&mut self) {
        self.clear_search();
        self.clear_filters();
    }

    pub fn active_filter_count(&self) -> usize {
        self.filters.active_count()
    }

    // ---- queries ----

    /// Catalog filtered by the current term and facets.
    pub fn results(&self) -> QueryOutcome<'_> {
        filter_catalog(self.catalog.shops(), &self.search_term, &self.filters)
    }

    /// Current results, each with merged reviews and aggregate rating.
    pub fn list_views(&self) -> Vec<ShopView<'_>> {
        self.results()
            .iter()
            .map(|shop| self.view_of(shop))
            .collect()
    }

    pub fn shop_view(&self, shop_id: &ShopId) -> Option<ShopView<'_>> {
        self.catalog.shop(shop_id).map(|shop| self.view_of(shop))
    }

    fn view_of<'a>(&'a self, shop: &'a CoffeeShop) -> ShopView<'a> {
        ShopView {
            shop,
            summary: ReviewSummary::compute(shop, self.overlay.get_reviews(&shop.id)),
        }
    }

    // ---- reviews ----

    /// Validate `draft`, stamp it as an own review at `at`, and add it to
    /// the overlay immediately.
    pub fn submit_review(
        &mut self,
        shop_id: &ShopId,
        draft: &ReviewDraft,
        at: DateTime<Utc>,
    ) -> Result<Review, SubmitError> {
        let review = self.prepare_review(shop_id, draft, at)?;
        self.overlay.add_review(shop_id, review.clone());
        self.notify(SessionEvent::ReviewsChanged(shop_id.clone()));
        Ok(review)
    }

    /// Delete an own overlay review. Seed reviews and reviews by other
    /// authors are left alone and yield `None`.
    pub fn delete_own_review(&mut self, shop_id: &ShopId, review_id: &ReviewId) -> Option<Review> {
        let own = self
            .overlay
            .get_reviews(shop_id)
            .iter()
            .any(|review| &review.id == review_id && review.is_own());
        if !own {
            debug!(shop = %shop_id, review = %review_id, "not an own overlay review");
            return None;
        }
        let removed = self.overlay.delete_review(shop_id, review_id)?;
        self.deleted
            .entry(shop_id.clone())
            .or_default()
            .push(removed.clone());
        self.notify(SessionEvent::ReviewsChanged(shop_id.clone()));
        Some(removed)
    }

    /// Undo the most recent deletion for `shop_id`.
    ///
    /// Restoration is an ordinary idempotent add: if the same id was added
    /// again in the meantime, the overlay is left unchanged.
    pub fn restore_last_deleted(&mut self, shop_id: &ShopId) -> Option<Review> {
        let review = self.deleted.get_mut(shop_id)?.pop()?;
        if self.deleted.get(shop_id).is_some_and(Vec::is_empty) {
            self.deleted.remove(shop_id);
        }
        self.overlay.add_review(shop_id, review.clone());
        self.notify(SessionEvent::ReviewsChanged(shop_id.clone()));
        Some(review)
    }

    /// Number of deletions that can still be undone for `shop_id`.
    pub fn restorable(&self, shop_id: &ShopId) -> usize {
        self.deleted.get(shop_id).map_or(0, Vec::len)
    }

    // ---- snapshots ----

    pub fn export_snapshot(&self) -> OverlaySnapshot {
        self.overlay.export_snapshot()
    }

    /// Replace the overlay wholesale. Pending undo entries are discarded
    /// since they refer to the previous overlay.
    pub fn import_snapshot(&mut self, snapshot: OverlaySnapshot) {
        self.overlay.import_snapshot(snapshot);
        self.deleted.clear();
        self.notify(SessionEvent::OverlayReplaced);
    }

    /// Copy of the undo stacks, each ordered oldest deletion first.
    pub fn export_undo(&self) -> OverlaySnapshot {
        OverlaySnapshot(self.deleted.clone())
    }

    /// Install undo stacks exported alongside the current overlay. Call after
    /// `import_snapshot`, which discards them.
    pub fn import_undo(&mut self, stacks: OverlaySnapshot) {
        self.deleted = stacks
            .0
            .into_iter()
            .filter(|(_, stack)| !stack.is_empty())
            .collect();
    }

    // ---- deferred updates ----

    /// Schedule a search-term change after the configured search delay.
    pub fn request_search(&mut self, term: impl Into<String>) {
        self.deferred
            .schedule(self.search_delay, PendingUpdate::Search(term.into()));
    }

    /// Schedule a filter change after the configured search delay.
    pub fn request_filters(&mut self, filters: FacetFilter) {
        self.deferred
            .schedule(self.search_delay, PendingUpdate::Filters(filters));
    }

    /// Validate now, add after the configured submit delay.
    ///
    /// Validation failures are reported synchronously; the returned review
    /// becomes visible once `advance` passes its due time.
    pub fn request_review(
        &mut self,
        shop_id: &ShopId,
        draft: &ReviewDraft,
        at: DateTime<Utc>,
    ) -> Result<Review, SubmitError> {
        let review = self.prepare_review(shop_id, draft, at)?;
        self.deferred.schedule(
            self.submit_delay,
            PendingUpdate::Review {
                shop_id: shop_id.clone(),
                review: review.clone(),
            },
        );
        Ok(review)
    }

    pub fn pending_updates(&self) -> usize {
        self.deferred.pending()
    }

    /// Advance the logical clock and apply every update that came due, in
    /// order. Returns how many updates were applied; superseded search and
    /// filter updates are dropped and not counted.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        let due = self.deferred.advance(elapsed);
        self.apply_updates(due)
    }

    /// Apply everything still pending.
    pub fn settle(&mut self) -> usize {
        let due = self.deferred.drain();
        self.apply_updates(due)
    }

    fn apply_updates(&mut self, updates: Vec<(Ticket, PendingUpdate)>) -> usize {
        let mut applied = 0;
        for (ticket, update) in updates {
            match update {
                PendingUpdate::Search(term) => {
                    if supersedes(&mut self.applied_search, ticket) {
                        self.set_search_term(term);
                    } else {
                        debug!(?ticket, "dropping superseded search update");
                        continue;
                    }
                }
                PendingUpdate::Filters(filters) => {
                    if supersedes(&mut self.applied_filters, ticket) {
                        self.set_filters(filters);
                    } else {
                        debug!(?ticket, "dropping superseded filter update");
                        continue;
                    }
                }
                PendingUpdate::Review { shop_id, review } => {
                    self.overlay.add_review(&shop_id, review);
                    self.notify(SessionEvent::ReviewsChanged(shop_id));
                }
            }
            applied += 1;
        }
        applied
    }

    // ---- observers ----

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: SessionEvent) {
        self.revision += 1;
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }

    fn prepare_review(
        &mut self,
        shop_id: &ShopId,
        draft: &ReviewDraft,
        at: DateTime<Utc>,
    ) -> Result<Review, SubmitError> {
        let Some(shop) = self.catalog.shop(shop_id) else {
            warn!(shop = %shop_id, "review submitted for unknown shop");
            return Err(SubmitError::UnknownShop(shop_id.clone()));
        };
        if let Err(err) = draft.validate() {
            warn!(shop = %shop_id, error = %err, "rejected review");
            return Err(err.into());
        }

        // ids derive from the submission time; bump past anything already
        // issued or present so two quick submissions never collide
        let mut millis = at.timestamp_millis().max(self.last_review_millis.saturating_add(1));
        let taken = |id: &ReviewId| {
            self.overlay.contains(shop_id, id) || shop.reviews.iter().any(|r| &r.id == id)
        };
        while taken(&review_id_for(millis)) {
            millis += 1;
        }
        self.last_review_millis = millis;

        let stamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or(at)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        Ok(Review {
            id: review_id_for(millis),
            user: OWN_AUTHOR.to_string(),
            rating: draft.rating,
            comment: draft.comment.clone(),
            date: stamp,
        })
    }
}

fn review_id_for(millis: i64) -> ReviewId {
    ReviewId(format!("review-{millis}"))
}

/// Records `ticket` as the latest applied one unless a newer ticket of the
/// same kind was applied already.
fn supersedes(latest: &mut Option<Ticket>, ticket: Ticket) -> bool {
    if latest.is_some_and(|applied| applied > ticket) {
        return false;
    }
    *latest = Some(ticket);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session() -> DirectorySession {
        DirectorySession::new(Arc::new(CatalogIndex::bundled().unwrap()))
    }

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap()
    }

    #[test]
    fn state_is_introspectable_and_resettable() {
        let mut session = session();
        session.set_search_term("brew");
        session.toggle_filter(Facet::Wifi);
        assert_eq!(session.search_term(), "brew");
        assert!(session.filters().is_active(Facet::Wifi));
        assert_eq!(session.active_filter_count(), 1);
        assert_eq!(session.results().ids(), vec!["1", "2", "6"]);

        session.clear_all();
        assert_eq!(session.search_term(), "");
        assert_eq!(session.active_filter_count(), 0);
        assert_eq!(session.results().len(), 6);
    }

    #[test]
    fn submit_stamps_own_review_and_updates_rating() {
        let mut session = session();
        let shop = ShopId::from("1");
        let review = session
            .submit_review(&shop, &ReviewDraft::new(3, "Decent pour-over"), at(1_700_000_000_000))
            .unwrap();
        assert_eq!(review.id.as_str(), "review-1700000000000");
        assert_eq!(review.user, OWN_AUTHOR);
        assert_eq!(review.date, "2023-11-14T22:13:20.000Z");

        let view = session.shop_view(&shop).unwrap();
        assert_eq!(view.summary.reviews[0], review);
        assert_eq!(view.summary.rating, 4.0);
    }

    #[test]
    fn submit_rejects_invalid_drafts_and_unknown_shops() {
        let mut session = session();
        let err = session
            .submit_review(&ShopId::from("1"), &ReviewDraft::new(0, "fine coffee"), at(0))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ValidationError::RatingOutOfRange { .. })));
        assert_eq!(err.to_string(), "Please select a rating");

        let err = session
            .submit_review(&ShopId::from("99"), &ReviewDraft::new(4, "fine coffee"), at(0))
            .unwrap_err();
        assert!(matches!(err, SubmitError::UnknownShop(_)));
        assert!(session.overlay().is_empty());
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn rapid_submissions_get_distinct_ids() {
        let mut session = session();
        let shop = ShopId::from("2");
        let draft = ReviewDraft::new(5, "Fast WiFi indeed");
        let first = session.submit_review(&shop, &draft, at(5_000)).unwrap();
        let second = session.submit_review(&shop, &draft, at(5_000)).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(session.overlay().get_reviews(&shop).len(), 2);
    }

    #[test]
    fn seed_reviews_cannot_be_deleted() {
        let mut session = session();
        let shop = ShopId::from("1");
        assert!(session.delete_own_review(&shop, &ReviewId::from("r1")).is_none());
        assert_eq!(session.shop_view(&shop).unwrap().summary.review_count(), 2);
    }

    #[test]
    fn delete_and_restore_round_trip() {
        let mut session = session();
        let shop = ShopId::from("1");
        let review = session
            .submit_review(&shop, &ReviewDraft::new(1, "Too bitter today"), at(10))
            .unwrap();
        assert_eq!(session.shop_view(&shop).unwrap().summary.display_rating(), "3.3");

        let removed = session.delete_own_review(&shop, &review.id).unwrap();
        assert_eq!(removed, review);
        assert_eq!(session.restorable(&shop), 1);
        assert_eq!(session.shop_view(&shop).unwrap().summary.rating, 4.5);

        assert_eq!(session.restore_last_deleted(&shop), Some(review.clone()));
        assert_eq!(session.restorable(&shop), 0);
        assert_eq!(session.overlay().get_reviews(&shop), &[review]);
        assert!(session.restore_last_deleted(&shop).is_none());
    }

    #[test]
    fn restore_after_readd_is_idempotent() {
        let mut session = session();
        let shop = ShopId::from("3");
        let review = session
            .submit_review(&shop, &ReviewDraft::new(4, "Calm and green"), at(10))
            .unwrap();
        session.delete_own_review(&shop, &review.id).unwrap();
        session.overlay.add_review(&shop, review.clone());

        session.restore_last_deleted(&shop).unwrap();
        assert_eq!(session.overlay().get_reviews(&shop).len(), 1);
    }

    #[test]
    fn snapshot_handoff_between_sessions() {
        let mut first = session();
        let shop = ShopId::from("5");
        first
            .submit_review(&shop, &ReviewDraft::new(5, "Quiet as a library"), at(42))
            .unwrap();

        let mut second = session();
        second.import_snapshot(first.export_snapshot());
        assert_eq!(second.export_snapshot(), first.export_snapshot());
        assert_eq!(second.shop_view(&shop).unwrap().summary.review_count(), 4);
    }

    #[test]
    fn observers_see_each_change_until_unsubscribed() {
        let mut session = session();
        let seen: Rc<RefCell<Vec<SessionEvent>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let id = session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        session.set_search_term("latte");
        session.set_search_term("latte");
        session.toggle_filter(Facet::Seating);
        session
            .submit_review(&ShopId::from("4"), &ReviewDraft::new(4, "Quick shots"), at(1))
            .unwrap();
        session.import_snapshot(OverlaySnapshot::default());

        assert_eq!(
            *seen.borrow(),
            vec![
                SessionEvent::SearchChanged("latte".into()),
                SessionEvent::FiltersChanged(FacetFilter::from_facets([Facet::Seating])),
                SessionEvent::ReviewsChanged(ShopId::from("4")),
                SessionEvent::OverlayReplaced,
            ]
        );
        assert_eq!(session.revision(), 4);

        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        session.clear_all();
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn undo_stacks_survive_persist_and_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DirectoryConfig {
            snapshot_path: Some(dir.path().join("overlay.json")),
            ..Default::default()
        };
        let shop = ShopId::from("3");

        let mut first = DirectorySession::open(&config).unwrap();
        let review = first
            .submit_review(&shop, &ReviewDraft::new(4, "Quiet corner seats"), at(5))
            .unwrap();
        first.delete_own_review(&shop, &review.id).unwrap();
        first.persist(&config).unwrap();
        assert!(dir.path().join("overlay.undo.json").is_file());

        let mut second = DirectorySession::open(&config).unwrap();
        assert_eq!(second.restorable(&shop), 1);
        assert_eq!(second.restore_last_deleted(&shop), Some(review.clone()));
        second.persist(&config).unwrap();

        let third = DirectorySession::open(&config).unwrap();
        assert_eq!(third.restorable(&shop), 0);
        assert_eq!(third.overlay().get_reviews(&shop), &[review]);
    }

    #[test]
    fn deferred_search_applies_latest_request() {
        let mut session = session()
            .with_delays(Duration::from_millis(500), Duration::from_millis(1000));
        session.request_search("portland");
        session.advance(Duration::from_millis(200));
        session.request_search("seattle");
        assert_eq!(session.search_term(), "");

        assert_eq!(session.advance(Duration::from_millis(300)), 1);
        assert_eq!(session.search_term(), "portland");
        assert_eq!(session.advance(Duration::from_millis(200)), 1);
        assert_eq!(session.search_term(), "seattle");
        assert_eq!(session.results().ids(), vec!["2"]);
    }

    #[test]
    fn deferred_search_keeps_latest_request_when_delay_shrinks() {
        let mut session = session()
            .with_delays(Duration::from_millis(500), Duration::from_millis(1000));
        session.request_search("portland");
        session.request_filters(FacetFilter::from_facets([Facet::QuietSpace]));
        session.advance(Duration::from_millis(100));

        let mut session = session
            .with_delays(Duration::from_millis(100), Duration::from_millis(1000));
        session.request_search("seattle");
        session.request_filters(FacetFilter::new());

        assert_eq!(session.settle(), 2);
        assert_eq!(session.pending_updates(), 0);
        assert_eq!(session.search_term(), "seattle");
        assert_eq!(session.active_filter_count(), 0);
        assert_eq!(session.results().ids(), vec!["2"]);
    }

    #[test]
    fn deferred_review_becomes_visible_after_delay() {
        let mut session = session()
            .with_delays(Duration::from_millis(500), Duration::from_millis(1000));
        let shop = ShopId::from("6");
        let review = session
            .request_review(&shop, &ReviewDraft::new(5, "Great view"), at(7))
            .unwrap();
        assert!(session.overlay().get_reviews(&shop).is_empty());
        assert_eq!(session.pending_updates(), 1);

        session.request_filters(FacetFilter::from_facets([Facet::Wifi]));
        assert_eq!(session.settle(), 2);
        assert_eq!(session.overlay().get_reviews(&shop), &[review]);
        assert!(session.filters().is_active(Facet::Wifi));
    }

    #[test]
    fn deferred_review_validation_is_synchronous() {
        let mut session = session();
        let err = session
            .request_review(&ShopId::from("6"), &ReviewDraft::new(5, "meh"), at(7))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ValidationError::CommentTooShort { chars: 3 })));
        assert_eq!(session.pending_updates(), 0);
    }
}
