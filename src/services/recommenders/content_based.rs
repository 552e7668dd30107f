use super::{is_valid_restaurant, RecommendRequest, Recommender};
use crate::models::{Rating, RecSource, Restaurant, RestaurantId, RestaurantLink};
use crate::services::profile_cache::ProfileCache;
use crate::services::similarity::cosine_similarity;
use crate::store::{RatingStore, RestaurantCatalog};
use anyhow::Result;
use async_trait::async_trait;
use ndarray::aview1;
use std::cmp::Ordering;
use std::sync::Arc;

/// Content-based strategy: rank restaurants by cosine similarity of
/// their 4-dimensional rating profiles (mean overall, environment,
/// flavor, service) against a target restaurant.
pub struct ContentBasedRecommender {
    ratings: Arc<dyn RatingStore>,
    catalog: Arc<dyn RestaurantCatalog>,
    profiles: ProfileCache,
}

/// Mean rating vector across a restaurant's rating set.
fn build_profile(ratings: &[Rating]) -> [f64; 4] {
    let n = ratings.len() as f64;
    let mut profile = [0.0; 4];
    for rating in ratings {
        profile[0] += rating.overall as f64;
        profile[1] += rating.environment as f64;
        profile[2] += rating.flavor as f64;
        profile[3] += rating.service as f64;
    }
    if n > 0.0 {
        for component in &mut profile {
            *component /= n;
        }
    }
    profile
}

impl ContentBasedRecommender {
    pub fn new(ratings: Arc<dyn RatingStore>, catalog: Arc<dyn RestaurantCatalog>) -> Self {
        Self {
            ratings,
            catalog,
            profiles: ProfileCache::new(),
        }
    }

    /// Profile for one restaurant, None when it has no ratings. Cached
    /// per store data version.
    async fn profile(&self, id: RestaurantId) -> Result<Option<[f64; 4]>> {
        let version = self.ratings.data_version().await;
        if let Some(profile) = self.profiles.get(version, id) {
            return Ok(Some(profile));
        }
        let ratings = self.ratings.ratings_for_restaurant(id).await?;
        if ratings.is_empty() {
            return Ok(None);
        }
        let profile = build_profile(&ratings);
        self.profiles.insert(version, id, profile);
        Ok(Some(profile))
    }

    /// Direct profile ranking against every other valid, rated restaurant.
    async fn rank_by_profile(
        &self,
        target_id: RestaurantId,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let Some(target_profile) = self.profile(target_id).await? else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(Restaurant, f64)> = Vec::new();
        for restaurant in self.catalog.all_restaurants().await? {
            if restaurant.id == target_id || !is_valid_restaurant(&restaurant) {
                continue;
            }
            let Some(profile) = self.profile(restaurant.id).await? else {
                continue;
            };
            let similarity = cosine_similarity(aview1(&target_profile), aview1(&profile));
            scored.push((restaurant, similarity));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(restaurant, _)| restaurant).collect())
    }

    /// Resolve precomputed similarity edges, preserving their order and
    /// dropping entries that no longer pass the validity filter.
    async fn rank_by_links(
        &self,
        links: Vec<RestaurantLink>,
        limit: usize,
    ) -> Result<Vec<Restaurant>> {
        let mut results = Vec::new();
        for link in links {
            if results.len() >= limit {
                break;
            }
            if let Some(restaurant) = self.catalog.restaurant(link.target).await? {
                if is_valid_restaurant(&restaurant) {
                    results.push(restaurant);
                }
            }
        }
        Ok(results)
    }

    /// Top-k similarity edges for every rated, valid restaurant, computed
    /// with the same profile ranking `recommend` uses. Callers persist
    /// them as the precomputed fast path.
    pub async fn compute_links(&self, per_restaurant: usize) -> Result<Vec<RestaurantLink>> {
        let mut links = Vec::new();
        for restaurant in self.catalog.all_restaurants().await? {
            if !is_valid_restaurant(&restaurant) {
                continue;
            }
            let Some(source_profile) = self.profile(restaurant.id).await? else {
                continue;
            };
            for target in self.rank_by_profile(restaurant.id, per_restaurant).await? {
                let Some(target_profile) = self.profile(target.id).await? else {
                    continue;
                };
                links.push(RestaurantLink {
                    source: restaurant.id,
                    target: target.id,
                    weight: cosine_similarity(aview1(&source_profile), aview1(&target_profile)),
                });
            }
        }
        Ok(links)
    }
}

#[async_trait]
impl Recommender for ContentBasedRecommender {
    async fn recommend(&self, request: RecommendRequest) -> Result<Vec<Restaurant>> {
        let Some(target_id) = request.restaurant_id else {
            return Ok(Vec::new());
        };
        if self.catalog.restaurant(target_id).await?.is_none() {
            return Ok(Vec::new());
        }

        // Precomputed edges are built by the same profile ranking, so
        // resolving them yields the same ordering as computing directly.
        let links = self.catalog.links_from(target_id).await?;
        if links.len() >= request.limit {
            return self.rank_by_links(links, request.limit).await;
        }

        self.rank_by_profile(target_id, request.limit).await
    }

    fn source(&self) -> RecSource {
        RecSource::ContentBased
    }
}
