use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 7;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RateVideoRequest {
    /// Rating from 1 to 7.
    #[schema(example = 5, minimum = 1, maximum = 7)]
    pub value: i16,
}

pub fn validate_rating(value: i16) -> Result<(), AppError> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(AppError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

/// Aggregate reactions for a video plus the caller's own state.
#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct EngagementSummary {
    pub likes: u64,
    pub dislikes: u64,
    /// Mean of all ratings, absent when nobody has rated.
    #[schema(example = 4.0)]
    pub rating_average: Option<f64>,
    pub rating_count: u64,
    /// Caller state; always false/absent for anonymous callers.
    pub liked: bool,
    pub disliked: bool,
    pub my_rating: Option<i16>,
}

/// Mean of `count` ratings summing to `sum`.
pub fn rating_average(sum: i64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum as f64 / count as f64)
}
