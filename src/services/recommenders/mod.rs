mod collaborative;
mod content_based;
mod hybrid;
mod popularity;

pub use collaborative::CollaborativeRecommender;
pub use content_based::ContentBasedRecommender;
pub use hybrid::{
    HybridRecommender, COLLABORATIVE_WEIGHT, CONTENT_WEIGHT, POPULARITY_WEIGHT,
};
pub use popularity::PopularityRecommender;

use crate::models::{RecSource, Restaurant, RestaurantId, UserId};
use anyhow::Result;
use async_trait::async_trait;

/// One recommendation request. Each strategy reads the fields it needs
/// and ignores the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendRequest {
    pub user_id: Option<UserId>,
    pub restaurant_id: Option<RestaurantId>,
    pub limit: usize,
}

impl RecommendRequest {
    pub fn for_user(user_id: UserId, limit: usize) -> Self {
        Self {
            user_id: Some(user_id),
            restaurant_id: None,
            limit,
        }
    }

    pub fn for_restaurant(restaurant_id: RestaurantId, limit: usize) -> Self {
        Self {
            user_id: None,
            restaurant_id: Some(restaurant_id),
            limit,
        }
    }
}

/// A recommendation strategy. Missing entities and empty histories are
/// not errors; they produce an empty list.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, request: RecommendRequest) -> Result<Vec<Restaurant>>;
    fn source(&self) -> RecSource;
}

/// Catalog rows that survived the messy upstream import: a usable name
/// and at least one review. The scraped dataset carries literal "nan"
/// and "null" names.
pub fn is_valid_restaurant(restaurant: &Restaurant) -> bool {
    if restaurant.review_count == 0 {
        return false;
    }
    let name = &restaurant.name;
    !name.is_empty() && !name.eq_ignore_ascii_case("nan") && !name.eq_ignore_ascii_case("null")
}
