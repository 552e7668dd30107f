use crate::config::RecommendConfig;
use crate::models::{RecommendStats, Restaurant, RestaurantId, RestaurantLink, UserId};
use crate::services::recommenders::{
    is_valid_restaurant, CollaborativeRecommender, ContentBasedRecommender, HybridRecommender,
    PopularityRecommender, RecommendRequest, Recommender,
};
use crate::store::{RatingStore, RestaurantCatalog};
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Best restaurants per scored dimension.
#[derive(Debug, Clone, Default)]
pub struct TopRatedByCategory {
    pub overall: Vec<Restaurant>,
    pub flavor: Vec<Restaurant>,
    pub environment: Vec<Restaurant>,
    pub service: Vec<Restaurant>,
}

/// Facade over the four recommenders plus the cheap aggregate-only
/// queries the browsing screens use.
pub struct RecommenderService {
    ratings: Arc<dyn RatingStore>,
    catalog: Arc<dyn RestaurantCatalog>,
    popularity: PopularityRecommender,
    content: ContentBasedRecommender,
    collaborative: CollaborativeRecommender,
    hybrid: HybridRecommender,
    min_reviews: u64,
}

fn sort_by_score_then_rating(scored: &mut Vec<(Restaurant, f64)>) {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.0.avg_rating
                    .partial_cmp(&a.0.avg_rating)
                    .unwrap_or(Ordering::Equal)
            })
    });
}

/// L1 profile distance folded into a 0..=5 match score. A coarse stand-in
/// for the cosine ranking that only touches precomputed aggregates.
fn aggregate_match_score(candidate: &Restaurant, profile: &[f64; 4]) -> f64 {
    let diff = (candidate.avg_rating - profile[0]).abs()
        + (candidate.avg_flavor_rating - profile[1]).abs()
        + (candidate.avg_env_rating - profile[2]).abs()
        + (candidate.avg_service_rating - profile[3]).abs();
    5.0 - diff / 4.0
}

impl RecommenderService {
    pub fn new(
        ratings: Arc<dyn RatingStore>,
        catalog: Arc<dyn RestaurantCatalog>,
        config: &RecommendConfig,
    ) -> Self {
        Self {
            popularity: PopularityRecommender::new(catalog.clone()),
            content: ContentBasedRecommender::new(ratings.clone(), catalog.clone()),
            collaborative: CollaborativeRecommender::new(ratings.clone(), catalog.clone()),
            hybrid: HybridRecommender::new(ratings.clone(), catalog.clone()),
            ratings,
            catalog,
            min_reviews: config.popular_min_reviews,
        }
    }

    /// Landing-page popular list: established restaurants only
    /// (review-count floor), scored by `avg_rating * review_count`.
    pub async fn popular_restaurants(&self, limit: usize) -> Result<Vec<Restaurant>> {
        let mut scored: Vec<(Restaurant, f64)> = self
            .catalog
            .all_restaurants()
            .await?
            .into_iter()
            .filter(|r| is_valid_restaurant(r) && r.review_count >= self.min_reviews)
            .map(|r| {
                let score = r.avg_rating * r.review_count as f64;
                (r, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(r, _)| r).collect())
    }

    /// Log-dampened popularity ranking (the core popularity strategy).
    pub async fn trending_restaurants(&self, limit: usize) -> Result<Vec<Restaurant>> {
        self.popularity
            .recommend(RecommendRequest {
                limit,
                ..Default::default()
            })
            .await
    }

    pub async fn similar_restaurants(
        &self,
        restaurant_id: RestaurantId,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        self.content
            .recommend(RecommendRequest::for_restaurant(restaurant_id, limit))
            .await
    }

    /// Collaborative recommendations; a cold-start user degrades to the
    /// popular list instead of an empty page.
    pub async fn personalized_recommendations(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let recommendations = self
            .collaborative
            .recommend(RecommendRequest::for_user(user_id, limit))
            .await?;
        if recommendations.is_empty() {
            info!("user {} is cold-start, falling back to popular", user_id);
            return self.popular_restaurants(limit).await;
        }
        Ok(recommendations)
    }

    pub async fn hybrid_recommendations(
        &self,
        user_id: Option<UserId>,
        restaurant_id: Option<RestaurantId>,
        limit: usize,
    ) -> Result<(Vec<Restaurant>, RecommendStats)> {
        self.hybrid
            .recommend_with_stats(RecommendRequest {
                user_id,
                restaurant_id,
                limit,
            })
            .await
    }

    /// Best established restaurants along each scored dimension.
    pub async fn top_rated_by_category(&self, limit_per_category: usize) -> Result<TopRatedByCategory> {
        let established: Vec<Restaurant> = self
            .catalog
            .all_restaurants()
            .await?
            .into_iter()
            .filter(|r| is_valid_restaurant(r) && r.review_count >= self.min_reviews)
            .collect();

        let top_by = |key: fn(&Restaurant) -> f64| {
            let mut entries = established.clone();
            entries.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
            entries.truncate(limit_per_category);
            entries
        };

        Ok(TopRatedByCategory {
            overall: top_by(|r| r.avg_rating),
            flavor: top_by(|r| r.avg_flavor_rating),
            environment: top_by(|r| r.avg_env_rating),
            service: top_by(|r| r.avg_service_rating),
        })
    }

    /// Aggregate-only similarity: L1 distance over the four precomputed
    /// averages. Cheaper than the profile ranking and good enough for a
    /// sidebar.
    pub async fn similar_restaurants_fast(
        &self,
        restaurant_id: RestaurantId,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let Some(target) = self.catalog.restaurant(restaurant_id).await? else {
            return Ok(Vec::new());
        };
        let profile = [
            target.avg_rating,
            target.avg_flavor_rating,
            target.avg_env_rating,
            target.avg_service_rating,
        ];

        let mut scored: Vec<(Restaurant, f64)> = self
            .catalog
            .all_restaurants()
            .await?
            .into_iter()
            .filter(|r| {
                r.id != restaurant_id
                    && is_valid_restaurant(r)
                    && r.review_count >= self.min_reviews
            })
            .map(|r| {
                let score = aggregate_match_score(&r, &profile);
                (r, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        sort_by_score_then_rating(&mut scored);
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(r, _)| r).collect())
    }

    /// Aggregate-only personalization: match candidate aggregates against
    /// the user's mean rating profile, excluding what they already rated.
    /// Cold-start users get the popular list.
    pub async fn personalized_recommendations_fast(
        &self,
        user_id: UserId,
        current_restaurant_id: Option<RestaurantId>,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let user_ratings = self.ratings.ratings_for_user(user_id).await?;
        if user_ratings.is_empty() {
            return self.popular_restaurants(limit).await;
        }

        let n = user_ratings.len() as f64;
        let mut profile = [0.0f64; 4];
        for rating in &user_ratings {
            profile[0] += rating.overall as f64;
            profile[1] += rating.flavor as f64;
            profile[2] += rating.environment as f64;
            profile[3] += rating.service as f64;
        }
        for component in &mut profile {
            *component /= n;
        }

        let already_rated: HashSet<RestaurantId> =
            user_ratings.iter().map(|r| r.restaurant_id).collect();

        let mut scored: Vec<(Restaurant, f64)> = self
            .catalog
            .all_restaurants()
            .await?
            .into_iter()
            .filter(|r| {
                is_valid_restaurant(r)
                    && r.review_count >= self.min_reviews
                    && !already_rated.contains(&r.id)
                    && Some(r.id) != current_restaurant_id
            })
            .map(|r| {
                let score = aggregate_match_score(&r, &profile);
                (r, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        sort_by_score_then_rating(&mut scored);
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(r, _)| r).collect())
    }

    /// Recompute the precomputed similarity edge set. The caller persists
    /// the result (e.g. `InMemoryStore::replace_all_links`).
    pub async fn compute_links(&self, per_restaurant: usize) -> Result<Vec<RestaurantLink>> {
        self.content.compute_links(per_restaurant).await
    }
}
