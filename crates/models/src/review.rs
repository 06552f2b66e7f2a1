use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::ids::{self, RecordId};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Immutable review of a service by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    #[serde(deserialize_with = "ids::loose")]
    pub id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub service_id: RecordId,
    #[serde(deserialize_with = "ids::loose")]
    pub client_id: RecordId,
    #[serde(default)]
    pub client_name: String,
    #[serde(deserialize_with = "ids::loose_uint")]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    #[serde(deserialize_with = "ids::loose")]
    pub service_id: RecordId,
    #[serde(deserialize_with = "ids::loose_uint")]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ModelError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        Ok(())
    }
}

/// Arithmetic mean of the ratings, or 0 when there are none. Unrounded.
pub fn mean_rating<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> (f64, u32) {
    let (sum, count) = reviews
        .into_iter()
        .fold((0u64, 0u32), |(sum, count), r| (sum + u64::from(r.rating), count + 1));
    if count == 0 {
        (0.0, 0)
    } else {
        (sum as f64 / f64::from(count), count)
    }
}

/// Round to one decimal place, as ratings are displayed.
pub fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
