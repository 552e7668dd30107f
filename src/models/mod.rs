use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type RestaurantId = i64;

/// A single user's review of a restaurant.
///
/// At most one rating exists per (user, restaurant) pair; submitting a
/// second one replaces the first. All four sub-scores are 1..=5 stars,
/// validated at the store write boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub overall: u8,
    pub environment: u8,
    pub flavor: u8,
    pub service: u8,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    /// Id of the same restaurant on the upstream review site, when known.
    pub external_id: Option<String>,
    // Derived fields, owned by the store's aggregate recomputation.
    // They always equal the mean (resp. count) of the current rating set.
    pub avg_rating: f64,
    pub avg_flavor_rating: f64,
    pub avg_env_rating: f64,
    pub avg_service_rating: f64,
    pub review_count: u64,
}

impl Restaurant {
    pub fn new(id: RestaurantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            external_id: None,
            avg_rating: 0.0,
            avg_flavor_rating: 0.0,
            avg_env_rating: 0.0,
            avg_service_rating: 0.0,
            review_count: 0,
        }
    }
}

/// Precomputed content-similarity edge between two restaurants.
/// Unique per (source, target); an optional fast path for the
/// content-based recommender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantLink {
    pub source: RestaurantId,
    pub target: RestaurantId,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecSource {
    Popularity,
    ContentBased,
    Collaborative,
    Hybrid,
}

impl RecSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecSource::Popularity => "popularity",
            RecSource::ContentBased => "content_based",
            RecSource::Collaborative => "collaborative",
            RecSource::Hybrid => "hybrid",
        }
    }
}

/// Per-source candidate counts for a hybrid fusion run.
#[derive(Debug, Clone, Default)]
pub struct RecommendStats {
    pub popularity_count: usize,
    pub content_count: usize,
    pub collaborative_count: usize,
    pub fused_count: usize,
}
