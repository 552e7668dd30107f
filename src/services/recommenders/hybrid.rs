use super::{
    CollaborativeRecommender, ContentBasedRecommender, PopularityRecommender, RecommendRequest,
    Recommender,
};
use crate::models::{RecSource, RecommendStats, Restaurant, RestaurantId};
use crate::store::{RatingStore, RestaurantCatalog};
use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

// Fusion weights, fixed by design. They sum to 1.0.
pub const POPULARITY_WEIGHT: f64 = 0.3;
pub const CONTENT_WEIGHT: f64 = 0.3;
pub const COLLABORATIVE_WEIGHT: f64 = 0.4;

/// Hybrid strategy: positional rank fusion over the three base
/// recommenders.
///
/// The sub-scores live on incomparable scales (log-popularity units,
/// cosine similarity, predicted stars), so each list is converted to
/// positional weights before summing: rank i in a list of length L
/// contributes `weight * (1 - i/L)`.
pub struct HybridRecommender {
    popularity: PopularityRecommender,
    content: ContentBasedRecommender,
    collaborative: CollaborativeRecommender,
    catalog: Arc<dyn RestaurantCatalog>,
}

/// Fold one ranked list into the fused scores. The union keeps
/// first-seen order across lists, which is the tie-break for the final
/// sort. An empty list contributes nothing (and guards the division).
fn add_positional_scores(
    list: &[Restaurant],
    weight: f64,
    order: &mut Vec<RestaurantId>,
    scores: &mut HashMap<RestaurantId, f64>,
) {
    if list.is_empty() {
        return;
    }
    let len = list.len() as f64;
    for (i, restaurant) in list.iter().enumerate() {
        // Linear decay from full weight at rank 0; the last rank keeps a
        // residual weight/L rather than zero. Downstream tie-break
        // density depends on that residual.
        let contribution = weight * (1.0 - i as f64 / len);
        if !scores.contains_key(&restaurant.id) {
            order.push(restaurant.id);
        }
        *scores.entry(restaurant.id).or_insert(0.0) += contribution;
    }
}

impl HybridRecommender {
    pub fn new(ratings: Arc<dyn RatingStore>, catalog: Arc<dyn RestaurantCatalog>) -> Self {
        Self {
            popularity: PopularityRecommender::new(catalog.clone()),
            content: ContentBasedRecommender::new(ratings.clone(), catalog.clone()),
            collaborative: CollaborativeRecommender::new(ratings, catalog.clone()),
            catalog,
        }
    }

    pub async fn recommend_with_stats(
        &self,
        request: RecommendRequest,
    ) -> Result<(Vec<Restaurant>, RecommendStats)> {
        let limit = request.limit;

        // Popularity always runs; the other two only when their anchor id
        // was supplied.
        let popularity = self
            .popularity
            .recommend(RecommendRequest {
                limit,
                ..Default::default()
            })
            .await?;
        let content = match request.restaurant_id {
            Some(restaurant_id) => {
                self.content
                    .recommend(RecommendRequest::for_restaurant(restaurant_id, limit))
                    .await?
            }
            None => Vec::new(),
        };
        let collaborative = match request.user_id {
            Some(user_id) => {
                self.collaborative
                    .recommend(RecommendRequest::for_user(user_id, limit))
                    .await?
            }
            None => Vec::new(),
        };

        let mut stats = RecommendStats {
            popularity_count: popularity.len(),
            content_count: content.len(),
            collaborative_count: collaborative.len(),
            fused_count: 0,
        };

        let mut order: Vec<RestaurantId> = Vec::new();
        let mut scores: HashMap<RestaurantId, f64> = HashMap::new();
        add_positional_scores(&popularity, POPULARITY_WEIGHT, &mut order, &mut scores);
        add_positional_scores(&content, CONTENT_WEIGHT, &mut order, &mut scores);
        add_positional_scores(&collaborative, COLLABORATIVE_WEIGHT, &mut order, &mut scores);

        let mut fused: Vec<(RestaurantId, f64)> =
            order.into_iter().map(|id| (id, scores[&id])).collect();
        fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        fused.truncate(limit);

        let mut results = Vec::new();
        for (restaurant_id, _) in fused {
            if let Some(restaurant) = self.catalog.restaurant(restaurant_id).await? {
                results.push(restaurant);
            }
        }
        stats.fused_count = results.len();

        info!(
            "hybrid fusion: popularity={} content={} collaborative={} fused={}",
            stats.popularity_count,
            stats.content_count,
            stats.collaborative_count,
            stats.fused_count
        );

        Ok((results, stats))
    }
}

#[async_trait]
impl Recommender for HybridRecommender {
    async fn recommend(&self, request: RecommendRequest) -> Result<Vec<Restaurant>> {
        let (results, _stats) = self.recommend_with_stats(request).await?;
        Ok(results)
    }

    fn source(&self) -> RecSource {
        RecSource::Hybrid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rating, UserId};
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn restaurant(id: RestaurantId) -> Restaurant {
        Restaurant::new(id, format!("R{id}"))
    }

    #[test]
    fn test_positional_weights_with_residual() {
        let list = vec![restaurant(1), restaurant(2), restaurant(3)];
        let mut order = Vec::new();
        let mut scores = HashMap::new();
        add_positional_scores(&list, 0.3, &mut order, &mut scores);

        assert_eq!(order, vec![1, 2, 3]);
        assert!((scores[&1] - 0.3).abs() < 1e-9);
        assert!((scores[&2] - 0.2).abs() < 1e-9);
        // Last rank keeps weight/L = 0.1, not zero.
        assert!((scores[&3] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_list_contributes_nothing() {
        let mut order = Vec::new();
        let mut scores = HashMap::new();
        add_positional_scores(&[], 0.4, &mut order, &mut scores);
        assert!(order.is_empty());
        assert!(scores.is_empty());
    }

    #[test]
    fn test_scores_sum_across_lists() {
        let mut order = Vec::new();
        let mut scores = HashMap::new();
        add_positional_scores(&[restaurant(1), restaurant(2)], 0.3, &mut order, &mut scores);
        add_positional_scores(&[restaurant(2), restaurant(1)], 0.4, &mut order, &mut scores);

        // First-seen order is from the first list only.
        assert_eq!(order, vec![1, 2]);
        assert!((scores[&1] - (0.3 + 0.2)).abs() < 1e-9);
        assert!((scores[&2] - (0.15 + 0.4)).abs() < 1e-9);
    }

    fn rating(user_id: UserId, restaurant_id: RestaurantId, overall: u8) -> Rating {
        Rating {
            user_id,
            restaurant_id,
            overall,
            environment: overall,
            flavor: overall,
            service: overall,
            timestamp: Utc::now(),
            comment: None,
        }
    }

    fn fixture() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for id in 1..=4 {
            store.insert_restaurant(restaurant(id));
        }
        for (user_id, restaurant_id, overall) in [
            (100, 1, 5),
            (100, 2, 3),
            (200, 1, 5),
            (200, 2, 3),
            (200, 3, 4),
            (300, 4, 4),
            (301, 4, 5),
        ] {
            store
                .upsert_rating(rating(user_id, restaurant_id, overall))
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_user_only_request_fuses_popularity_and_collaborative() {
        let store = fixture();
        let hybrid = HybridRecommender::new(store.clone(), store.clone());

        let (results, stats) = hybrid
            .recommend_with_stats(RecommendRequest::for_user(100, 4))
            .await
            .unwrap();

        // No restaurant id, so content contributes a zero-length list and
        // the fusion is exactly popularity + collaborative.
        assert_eq!(stats.content_count, 0);
        assert!(stats.popularity_count > 0);
        assert_eq!(stats.collaborative_count, 1);
        assert!(!results.is_empty());

        let popularity = PopularityRecommender::new(store.clone() as Arc<dyn RestaurantCatalog>);
        let collaborative =
            CollaborativeRecommender::new(store.clone(), store.clone());
        let pop_list = popularity
            .recommend(RecommendRequest {
                limit: 4,
                ..Default::default()
            })
            .await
            .unwrap();
        let collab_list = collaborative
            .recommend(RecommendRequest::for_user(100, 4))
            .await
            .unwrap();

        let mut order = Vec::new();
        let mut scores = HashMap::new();
        add_positional_scores(&pop_list, POPULARITY_WEIGHT, &mut order, &mut scores);
        add_positional_scores(&collab_list, COLLABORATIVE_WEIGHT, &mut order, &mut scores);
        let mut expected: Vec<(RestaurantId, f64)> =
            order.into_iter().map(|id| (id, scores[&id])).collect();
        expected.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        expected.truncate(4);

        let result_ids: Vec<RestaurantId> = results.iter().map(|r| r.id).collect();
        let expected_ids: Vec<RestaurantId> = expected.iter().map(|(id, _)| *id).collect();
        assert_eq!(result_ids, expected_ids);
    }

    #[tokio::test]
    async fn test_cold_start_request_degrades_to_popularity() {
        let store = fixture();
        let hybrid = HybridRecommender::new(store.clone(), store.clone());

        // User 999 has no history: collaborative is empty and the fused
        // ranking is the popularity ranking.
        let (results, stats) = hybrid
            .recommend_with_stats(RecommendRequest::for_user(999, 3))
            .await
            .unwrap();
        assert_eq!(stats.collaborative_count, 0);

        let popularity = PopularityRecommender::new(store as Arc<dyn RestaurantCatalog>);
        let pop_list = popularity
            .recommend(RecommendRequest {
                limit: 3,
                ..Default::default()
            })
            .await
            .unwrap();

        let result_ids: Vec<RestaurantId> = results.iter().map(|r| r.id).collect();
        let pop_ids: Vec<RestaurantId> = pop_list.iter().map(|r| r.id).collect();
        assert_eq!(result_ids, pop_ids);
    }

    #[tokio::test]
    async fn test_full_request_uses_all_three_sources() {
        let store = fixture();
        let hybrid = HybridRecommender::new(store.clone(), store.clone());

        let (results, stats) = hybrid
            .recommend_with_stats(RecommendRequest {
                user_id: Some(100),
                restaurant_id: Some(1),
                limit: 4,
            })
            .await
            .unwrap();

        assert!(stats.popularity_count > 0);
        assert!(stats.content_count > 0);
        assert!(stats.collaborative_count > 0);
        assert!(!results.is_empty());
        assert!(results.len() <= 4);
    }
}
