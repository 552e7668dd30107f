pub mod memory;

use crate::models::{Rating, Restaurant, RestaurantId, RestaurantLink, UserId};
use anyhow::Result;
use async_trait::async_trait;

/// Read interface over the rating history.
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn ratings_for_user(&self, user_id: UserId) -> Result<Vec<Rating>>;
    async fn ratings_for_restaurant(&self, restaurant_id: RestaurantId) -> Result<Vec<Rating>>;
    /// Every rating in the system. Only the collaborative recommender
    /// needs this; cost is proportional to total rating volume.
    async fn all_ratings(&self) -> Result<Vec<Rating>>;
    /// Monotonic counter bumped on every rating mutation. Caches built
    /// from rating data are valid for exactly one version.
    async fn data_version(&self) -> u64;
}

/// Read interface over the restaurant catalog. Aggregate fields on the
/// returned entries are kept current by the rating-write transaction.
#[async_trait]
pub trait RestaurantCatalog: Send + Sync {
    async fn restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>>;
    /// All catalog entries, in stable id order.
    async fn all_restaurants(&self) -> Result<Vec<Restaurant>>;
    /// Precomputed similarity edges out of a restaurant, strongest first.
    /// Empty when no edges were precomputed.
    async fn links_from(&self, restaurant_id: RestaurantId) -> Result<Vec<RestaurantLink>>;
}
