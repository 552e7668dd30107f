use super::{is_valid_restaurant, RecommendRequest, Recommender};
use crate::models::{Rating, RecSource, Restaurant, RestaurantId, UserId};
use crate::services::similarity::cosine_similarity;
use crate::store::{RatingStore, RestaurantCatalog};
use anyhow::Result;
use async_trait::async_trait;
use ndarray::aview1;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Neighborhood size: how many most-similar users contribute predictions.
const MAX_SIMILAR_USERS: usize = 10;

type RatingMatrix = BTreeMap<UserId, BTreeMap<RestaurantId, f64>>;

/// User-user collaborative filtering.
///
/// Builds the sparse user -> restaurant -> rating matrix from scratch on
/// every call; the whole pipeline is stateless between requests, and
/// cost is proportional to total rating volume.
pub struct CollaborativeRecommender {
    ratings: Arc<dyn RatingStore>,
    catalog: Arc<dyn RestaurantCatalog>,
}

impl CollaborativeRecommender {
    pub fn new(ratings: Arc<dyn RatingStore>, catalog: Arc<dyn RestaurantCatalog>) -> Self {
        Self { ratings, catalog }
    }

    fn build_matrix(ratings: &[Rating]) -> RatingMatrix {
        let mut matrix: RatingMatrix = BTreeMap::new();
        for rating in ratings {
            matrix
                .entry(rating.user_id)
                .or_default()
                .insert(rating.restaurant_id, rating.overall as f64);
        }
        matrix
    }

    /// Top-K users by cosine similarity over the co-rated restaurant set.
    /// Both vectors are built over the same sorted id order. Users with
    /// no co-rated restaurant carry no signal and are excluded outright
    /// rather than scored 0.
    fn similar_users(
        matrix: &RatingMatrix,
        user_id: UserId,
        target_ratings: &BTreeMap<RestaurantId, f64>,
    ) -> Vec<(UserId, f64)> {
        let mut similar: Vec<(UserId, f64)> = Vec::new();
        for (&other_id, other_ratings) in matrix {
            if other_id == user_id {
                continue;
            }
            let common: Vec<RestaurantId> = target_ratings
                .keys()
                .filter(|id| other_ratings.contains_key(*id))
                .copied()
                .collect();
            if common.is_empty() {
                continue;
            }
            let target_vector: Vec<f64> = common.iter().map(|id| target_ratings[id]).collect();
            let other_vector: Vec<f64> = common.iter().map(|id| other_ratings[id]).collect();
            let similarity = cosine_similarity(aview1(&target_vector), aview1(&other_vector));
            similar.push((other_id, similarity));
        }

        similar.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        similar.truncate(MAX_SIMILAR_USERS);
        similar
    }

    /// Similarity-weighted predictions for restaurants the target user has
    /// not rated: mean of (neighbor rating x neighbor similarity) over the
    /// contributing neighbors, descending, ties in first-seen order.
    fn predict(
        matrix: &RatingMatrix,
        neighbors: &[(UserId, f64)],
        target_ratings: &BTreeMap<RestaurantId, f64>,
    ) -> Vec<(RestaurantId, f64)> {
        let mut order: Vec<RestaurantId> = Vec::new();
        let mut products: HashMap<RestaurantId, Vec<f64>> = HashMap::new();

        for &(neighbor_id, similarity) in neighbors {
            let Some(neighbor_ratings) = matrix.get(&neighbor_id) else {
                continue;
            };
            for (&restaurant_id, &score) in neighbor_ratings {
                if target_ratings.contains_key(&restaurant_id) {
                    continue;
                }
                products
                    .entry(restaurant_id)
                    .or_insert_with(|| {
                        order.push(restaurant_id);
                        Vec::new()
                    })
                    .push(score * similarity);
            }
        }

        let mut predicted: Vec<(RestaurantId, f64)> = order
            .into_iter()
            .map(|id| {
                let contributions = &products[&id];
                let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
                (id, mean)
            })
            .collect();
        predicted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        predicted
    }
}

#[async_trait]
impl Recommender for CollaborativeRecommender {
    async fn recommend(&self, request: RecommendRequest) -> Result<Vec<Restaurant>> {
        let Some(user_id) = request.user_id else {
            return Ok(Vec::new());
        };
        if self.ratings.ratings_for_user(user_id).await?.is_empty() {
            return Ok(Vec::new());
        }

        let all_ratings = self.ratings.all_ratings().await?;
        let matrix = Self::build_matrix(&all_ratings);
        let Some(target_ratings) = matrix.get(&user_id) else {
            return Ok(Vec::new());
        };

        let neighbors = Self::similar_users(&matrix, user_id, target_ratings);
        if neighbors.is_empty() {
            tracing::info!("user {} has no co-rating neighbors", user_id);
            return Ok(Vec::new());
        }

        let mut predicted = Self::predict(&matrix, &neighbors, target_ratings);
        predicted.truncate(request.limit);

        // Resolve and filter after the cut; dropping an invalid entry must
        // not reshuffle the survivors, and the result is never padded.
        let mut results = Vec::new();
        for (restaurant_id, _) in predicted {
            if let Some(restaurant) = self.catalog.restaurant(restaurant_id).await? {
                if is_valid_restaurant(&restaurant) {
                    results.push(restaurant);
                }
            }
        }
        Ok(results)
    }

    fn source(&self) -> RecSource {
        RecSource::Collaborative
    }
}
