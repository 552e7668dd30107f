use crate::models::{RestaurantId, UserId};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub data: DataConfig,
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory holding restaurants.csv, ratings.csv and links.csv.
    pub data_dir: String,
    /// When set, the binary logs a sample recommendation run for this user.
    pub demo_user_id: Option<UserId>,
    pub demo_restaurant_id: Option<RestaurantId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendConfig {
    pub default_limit: usize,
    /// Review-count floor for the landing-page style "popular" and
    /// "top rated" queries. The core recommenders do not use it.
    pub popular_min_reviews: u64,
    /// Precompute RestaurantLink edges after import.
    pub precompute_links: bool,
    /// Edges kept per restaurant when precomputing links.
    pub link_fanout: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "recommender-service".to_string()),
            },
            data: DataConfig {
                data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
                demo_user_id: env::var("DEMO_USER_ID")
                    .ok()
                    .map(|v| v.parse().expect("DEMO_USER_ID must be a valid i64")),
                demo_restaurant_id: env::var("DEMO_RESTAURANT_ID")
                    .ok()
                    .map(|v| v.parse().expect("DEMO_RESTAURANT_ID must be a valid i64")),
            },
            recommend: RecommendConfig {
                default_limit: env::var("DEFAULT_LIMIT")
                    .unwrap_or_else(|_| "6".to_string())
                    .parse()
                    .expect("DEFAULT_LIMIT must be a valid usize"),
                popular_min_reviews: env::var("POPULAR_MIN_REVIEWS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("POPULAR_MIN_REVIEWS must be a valid u64"),
                precompute_links: env::var("PRECOMPUTE_LINKS")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .expect("PRECOMPUTE_LINKS must be true or false"),
                link_fanout: env::var("LINK_FANOUT")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("LINK_FANOUT must be a valid usize"),
            },
        }
    }
}
