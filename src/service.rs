use crate::db::{Database, Redemption};
use crate::error::ReviewError;
use crate::models::customer::{Customer, NewCustomer};
use crate::models::review::{NewReview, Review};
use crate::models::review_token::IssuedToken;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use rand::Rng;
use uuid::Uuid;

/// Bytes of randomness per token; hex encoding doubles the length.
pub const TOKEN_BYTES: usize = 16;

pub const DEFAULT_REVIEW_LIMIT: u32 = 50;
pub const MAX_REVIEW_LIMIT: u32 = 200;

/// Issues single-use review tokens and redeems them into reviews.
///
/// All state lives in the [`Database`]; the service itself is cheap to clone
/// and can be shared between workers.
#[derive(Clone)]
pub struct ReviewTokenService {
    db: Database,
    admin_secret: String,
    token_ttl: Duration,
}

impl ReviewTokenService {
    pub fn new(db: Database, admin_secret: impl Into<String>, token_ttl: Duration) -> Self {
        ReviewTokenService {
            db,
            admin_secret: admin_secret.into(),
            token_ttl,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checks an `Authorization` header value against the admin secret.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<(), ReviewError> {
        let credential = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|credential| !credential.is_empty())
            .ok_or_else(|| ReviewError::Unauthorized("missing bearer token".into()))?;

        if self.admin_secret.is_empty()
            || !constant_time_eq(credential.as_bytes(), self.admin_secret.as_bytes())
        {
            warn!("[TOKENS] Rejected admin request with a bad credential");
            return Err(ReviewError::Unauthorized("invalid admin credential".into()));
        }
        Ok(())
    }

    pub async fn issue(
        &self,
        authorization: Option<&str>,
        customer_id: Option<&str>,
        base_url: &str,
    ) -> Result<IssuedToken, ReviewError> {
        self.issue_at(authorization, customer_id, base_url, Utc::now())
            .await
    }

    /// Issues a token valid until `now + ttl`. Nothing is written unless the
    /// caller is authorized and the customer exists.
    pub async fn issue_at(
        &self,
        authorization: Option<&str>,
        customer_id: Option<&str>,
        base_url: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, ReviewError> {
        self.authorize(authorization)?;

        let customer_id = customer_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ReviewError::InvalidInput("Missing customerId".into()))?;

        if self.db.get_customer(customer_id).await?.is_none() {
            return Err(ReviewError::InvalidInput("Unknown customerId".into()));
        }

        let expiry_time = now
            .checked_add_signed(self.token_ttl)
            .ok_or(ReviewError::ExpiryOutOfRange)?;

        let token = generate_token();
        let stored = self
            .db
            .insert_review_token(&token, customer_id, expiry_time, now)
            .await?;
        info!(
            "[TOKENS] Issued review token {} for customer {} (expires {})",
            stored.id, customer_id, stored.expiry_time
        );

        Ok(IssuedToken {
            review_link: review_link(base_url, &token),
            token,
        })
    }

    pub async fn redeem(&self, review: NewReview) -> Result<Review, ReviewError> {
        self.redeem_at(review, Utc::now()).await
    }

    pub async fn redeem_at(
        &self,
        review: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewError> {
        match self.db.redeem_review_token(&review, now).await? {
            Redemption::Redeemed(created) => {
                info!(
                    "[TOKENS] Review {} created for customer {}",
                    created.id, created.customer_id
                );
                Ok(created)
            }
            Redemption::NotFound => Err(ReviewError::NotFound),
            Redemption::AlreadyUsed => {
                info!("[TOKENS] Refused redemption of an already used token");
                Err(ReviewError::AlreadyUsed)
            }
            Redemption::Expired => {
                info!("[TOKENS] Refused redemption of an expired token");
                Err(ReviewError::Expired)
            }
        }
    }

    pub async fn create_customer(
        &self,
        authorization: Option<&str>,
        customer: NewCustomer,
    ) -> Result<Customer, ReviewError> {
        self.authorize(authorization)?;

        let customer = Customer {
            id: non_blank(customer.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: non_blank(customer.name),
            email: non_blank(customer.email),
            created_at: Utc::now(),
        };
        if !self.db.insert_customer(&customer).await? {
            return Err(ReviewError::Conflict);
        }
        info!("[TOKENS] Registered customer {}", customer.id);
        Ok(customer)
    }

    pub async fn list_reviews(&self, limit: Option<u32>) -> Result<Vec<Review>, ReviewError> {
        let limit = limit
            .unwrap_or(DEFAULT_REVIEW_LIMIT)
            .clamp(1, MAX_REVIEW_LIMIT);
        Ok(self.db.list_reviews(limit).await?)
    }
}

/// 128 bits from the thread-local CSPRNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub fn review_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/review?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
