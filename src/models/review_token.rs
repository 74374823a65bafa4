// src/models/review_token.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewToken {
    pub id: i64,
    pub token: String,
    pub customer_id: String,
    pub expiry_time: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ReviewToken {
    /// A token can be redeemed while unused and not past its expiry.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && now <= self.expiry_time
    }
}

/// Result of an issuance: the token value and the link sent to the customer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub review_link: String,
}
