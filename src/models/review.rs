// src/models/review.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest and highest accepted star rating.
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub customer_id: String,   // Customer the redeemed token was issued to
    pub customer_name: String, // Empty when the customer has no stored name
    pub rating: u8,
    pub comment: String,
    pub service_type: String, // e.g. "Exterior Paint"
    pub created_at: DateTime<Utc>,
}

/// A review submission that has passed validation and is ready to be
/// written against a token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub token: String,
    pub rating: u8,
    pub comment: String,
    pub service_type: String,
}
