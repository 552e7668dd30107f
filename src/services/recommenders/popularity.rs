use super::{is_valid_restaurant, RecommendRequest, Recommender};
use crate::models::{RecSource, Restaurant};
use crate::store::RestaurantCatalog;
use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;

/// Popularity strategy: `avg_rating * ln(1 + review_count)`.
///
/// The log term dampens review volume so a heavily reviewed mid-tier
/// place does not bury a strong small one, while a raw average would do
/// the opposite and favor places with three perfect reviews.
pub struct PopularityRecommender {
    catalog: Arc<dyn RestaurantCatalog>,
}

impl PopularityRecommender {
    pub fn new(catalog: Arc<dyn RestaurantCatalog>) -> Self {
        Self { catalog }
    }

    pub fn popularity_score(restaurant: &Restaurant) -> f64 {
        restaurant.avg_rating * (1.0 + restaurant.review_count as f64).ln()
    }
}

#[async_trait]
impl Recommender for PopularityRecommender {
    async fn recommend(&self, request: RecommendRequest) -> Result<Vec<Restaurant>> {
        let mut scored: Vec<(Restaurant, f64)> = self
            .catalog
            .all_restaurants()
            .await?
            .into_iter()
            .filter(is_valid_restaurant)
            .map(|restaurant| {
                let score = Self::popularity_score(&restaurant);
                (restaurant, score)
            })
            .collect();

        // Stable sort: ties keep catalog iteration order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(request.limit);

        Ok(scored.into_iter().map(|(restaurant, _)| restaurant).collect())
    }

    fn source(&self) -> RecSource {
        RecSource::Popularity
    }
}
