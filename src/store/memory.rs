use super::{RatingStore, RestaurantCatalog};
use crate::error::RecommendError;
use crate::models::{Rating, Restaurant, RestaurantId, RestaurantLink, UserId};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Outcome of a bulk rating load.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkLoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Default)]
struct StoreInner {
    restaurants: BTreeMap<RestaurantId, Restaurant>,
    // Keyed by (restaurant, user) so a restaurant's rating set is a
    // contiguous range; one entry per pair.
    ratings: BTreeMap<(RestaurantId, UserId), Rating>,
    links: BTreeMap<RestaurantId, Vec<RestaurantLink>>,
    data_version: u64,
}

impl StoreInner {
    fn restaurant_ratings(&self, id: RestaurantId) -> impl Iterator<Item = &Rating> {
        self.ratings
            .range((id, UserId::MIN)..=(id, UserId::MAX))
            .map(|(_, rating)| rating)
    }

    /// Recompute the derived aggregate fields of one restaurant from its
    /// current rating set. Runs inside the same write lock as the rating
    /// mutation that triggered it, so readers see pre-write or post-write
    /// state, never a half-applied one.
    fn recompute_aggregates(&mut self, id: RestaurantId) {
        let mut overall = 0.0;
        let mut flavor = 0.0;
        let mut env = 0.0;
        let mut service = 0.0;
        let mut count = 0u64;
        for rating in self.restaurant_ratings(id) {
            overall += rating.overall as f64;
            flavor += rating.flavor as f64;
            env += rating.environment as f64;
            service += rating.service as f64;
            count += 1;
        }

        let Some(restaurant) = self.restaurants.get_mut(&id) else {
            return;
        };
        if count > 0 {
            let n = count as f64;
            restaurant.avg_rating = overall / n;
            restaurant.avg_flavor_rating = flavor / n;
            restaurant.avg_env_rating = env / n;
            restaurant.avg_service_rating = service / n;
            restaurant.review_count = count;
        } else {
            restaurant.avg_rating = 0.0;
            restaurant.avg_flavor_rating = 0.0;
            restaurant.avg_env_rating = 0.0;
            restaurant.avg_service_rating = 0.0;
            restaurant.review_count = 0;
        }
    }
}

/// In-memory rating store and restaurant catalog.
///
/// All state sits behind one `RwLock`, which is what gives readers a
/// consistent snapshot: a rating write and the aggregate recomputation it
/// triggers commit together.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

fn validate_scores(rating: &Rating) -> Result<(), RecommendError> {
    for (field, value) in [
        ("overall", rating.overall),
        ("environment", rating.environment),
        ("flavor", rating.flavor),
        ("service", rating.service),
    ] {
        if !(1..=5).contains(&value) {
            return Err(RecommendError::ScoreOutOfRange {
                field,
                value,
                user_id: rating.user_id,
                restaurant_id: rating.restaurant_id,
            });
        }
    }
    Ok(())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_restaurant(&self, restaurant: Restaurant) {
        self.inner.write().restaurants.insert(restaurant.id, restaurant);
    }

    /// Insert or replace the (user, restaurant) rating and recompute the
    /// owning restaurant's aggregates before releasing the write lock.
    pub fn upsert_rating(&self, rating: Rating) -> Result<(), RecommendError> {
        validate_scores(&rating)?;
        let mut inner = self.inner.write();
        if !inner.restaurants.contains_key(&rating.restaurant_id) {
            return Err(RecommendError::UnknownRestaurant(rating.restaurant_id));
        }
        let restaurant_id = rating.restaurant_id;
        inner
            .ratings
            .insert((rating.restaurant_id, rating.user_id), rating);
        inner.recompute_aggregates(restaurant_id);
        inner.data_version += 1;
        Ok(())
    }

    pub fn remove_rating(
        &self,
        user_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<(), RecommendError> {
        let mut inner = self.inner.write();
        if inner.ratings.remove(&(restaurant_id, user_id)).is_none() {
            return Err(RecommendError::RatingNotFound {
                user_id,
                restaurant_id,
            });
        }
        inner.recompute_aggregates(restaurant_id);
        inner.data_version += 1;
        Ok(())
    }

    /// Bulk load used by the CSV importer: rows with out-of-range scores or
    /// an unknown restaurant are skipped and counted, and aggregates are
    /// recomputed once at the end instead of once per row. The whole load
    /// commits under a single write lock.
    pub fn bulk_load_ratings(&self, ratings: Vec<Rating>) -> BulkLoadReport {
        let mut report = BulkLoadReport::default();
        let mut inner = self.inner.write();
        for rating in ratings {
            if validate_scores(&rating).is_err()
                || !inner.restaurants.contains_key(&rating.restaurant_id)
            {
                report.skipped += 1;
                continue;
            }
            inner
                .ratings
                .insert((rating.restaurant_id, rating.user_id), rating);
            report.loaded += 1;
        }
        let ids: Vec<RestaurantId> = inner.restaurants.keys().copied().collect();
        for id in ids {
            inner.recompute_aggregates(id);
        }
        inner.data_version += 1;
        report
    }

    pub fn set_external_id(
        &self,
        restaurant_id: RestaurantId,
        external_id: String,
    ) -> Result<(), RecommendError> {
        let mut inner = self.inner.write();
        let restaurant = inner
            .restaurants
            .get_mut(&restaurant_id)
            .ok_or(RecommendError::UnknownRestaurant(restaurant_id))?;
        restaurant.external_id = Some(external_id);
        Ok(())
    }

    /// Replace the whole precomputed link table. Edges are grouped by
    /// source and kept strongest-first.
    pub fn replace_all_links(&self, links: Vec<RestaurantLink>) {
        let mut grouped: BTreeMap<RestaurantId, Vec<RestaurantLink>> = BTreeMap::new();
        for link in links {
            grouped.entry(link.source).or_default().push(link);
        }
        for edges in grouped.values_mut() {
            edges.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
        }
        self.inner.write().links = grouped;
    }

    pub fn restaurant_count(&self) -> usize {
        self.inner.read().restaurants.len()
    }

    pub fn rating_count(&self) -> usize {
        self.inner.read().ratings.len()
    }

    pub fn rated_restaurant_count(&self) -> usize {
        self.inner
            .read()
            .restaurants
            .values()
            .filter(|r| r.review_count > 0)
            .count()
    }
}

#[async_trait]
impl RatingStore for InMemoryStore {
    async fn ratings_for_user(&self, user_id: UserId) -> Result<Vec<Rating>> {
        Ok(self
            .inner
            .read()
            .ratings
            .values()
            .filter(|rating| rating.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ratings_for_restaurant(&self, restaurant_id: RestaurantId) -> Result<Vec<Rating>> {
        Ok(self
            .inner
            .read()
            .restaurant_ratings(restaurant_id)
            .cloned()
            .collect())
    }

    async fn all_ratings(&self) -> Result<Vec<Rating>> {
        Ok(self.inner.read().ratings.values().cloned().collect())
    }

    async fn data_version(&self) -> u64 {
        self.inner.read().data_version
    }
}

#[async_trait]
impl RestaurantCatalog for InMemoryStore {
    async fn restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        Ok(self.inner.read().restaurants.get(&id).cloned())
    }

    async fn all_restaurants(&self) -> Result<Vec<Restaurant>> {
        Ok(self.inner.read().restaurants.values().cloned().collect())
    }

    async fn links_from(&self, restaurant_id: RestaurantId) -> Result<Vec<RestaurantLink>> {
        Ok(self
            .inner
            .read()
            .links
            .get(&restaurant_id)
            .cloned()
            .unwrap_or_default())
    }
}
