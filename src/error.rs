use crate::models::{RestaurantId, UserId};
use thiserror::Error;

/// Errors surfaced at the store write boundary.
///
/// "No result" conditions (unknown user, empty rating history, no
/// co-rated neighbors) are not errors anywhere in this crate; the
/// recommenders return an empty list for those.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("unknown restaurant {0}")]
    UnknownRestaurant(RestaurantId),

    #[error("no rating by user {user_id} for restaurant {restaurant_id}")]
    RatingNotFound {
        user_id: UserId,
        restaurant_id: RestaurantId,
    },

    #[error("{field} score {value} is outside 1..=5 (user {user_id}, restaurant {restaurant_id})")]
    ScoreOutOfRange {
        field: &'static str,
        value: u8,
        user_id: UserId,
        restaurant_id: RestaurantId,
    },
}
