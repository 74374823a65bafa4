use crate::error::ReviewError;
use crate::models::customer::NewCustomer;
use crate::models::review::{NewReview, MAX_RATING, MIN_RATING};
use crate::service::ReviewTokenService;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
}

// Every field is optional here so missing ones surface as a 400 with our
// own message instead of a deserializer error.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
}

impl RedeemRequest {
    pub fn validate(self) -> Result<NewReview, ReviewError> {
        let missing = || ReviewError::InvalidInput("Missing required fields".into());
        let token = required(self.token).ok_or_else(missing)?;
        let comment = required(self.comment).ok_or_else(missing)?;
        let service_type = required(self.service_type).ok_or_else(missing)?;
        let rating = self.rating.ok_or_else(missing)?;

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ReviewError::InvalidInput(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        Ok(NewReview {
            token,
            rating: rating as u8,
            comment,
            service_type,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct ListReviewsQuery {
    pub limit: Option<u32>,
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn authorization(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("[API] Rejected request body: {}", err);
    ReviewError::InvalidInput("Malformed request body".into()).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("[API] Rejected query string: {}", err);
    ReviewError::InvalidInput("Invalid query string".into()).into()
}

/// Registers the `/api` routes and the extractor settings they rely on.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(
            web::scope("/api")
                .route("/review-tokens", web::post().to(issue_review_token)) // POST /api/review-tokens
                .route("/reviews", web::post().to(submit_review)) // POST /api/reviews
                .route("/reviews", web::get().to(list_reviews)) // GET /api/reviews
                .route("/customers", web::post().to(create_customer)), // POST /api/customers
        );
}

// Admin bodies are extracted as optional so a bad credential wins over a bad
// body. With a body present the service performs the credential check itself.
fn admin_body<T>(
    service: &ReviewTokenService,
    req: &HttpRequest,
    body: Option<web::Json<T>>,
) -> Result<T, ReviewError> {
    match body {
        Some(body) => Ok(body.into_inner()),
        None => {
            service.authorize(authorization(req))?;
            Err(ReviewError::InvalidInput("Malformed request body".into()))
        }
    }
}

pub async fn issue_review_token(
    service: web::Data<ReviewTokenService>,
    req: HttpRequest,
    body: Option<web::Json<IssueTokenRequest>>,
) -> Result<HttpResponse, ReviewError> {
    let body = admin_body(&service, &req, body)?;

    let base_url = {
        let info = req.connection_info();
        format!("{}://{}", info.scheme(), info.host())
    };

    let issued = service
        .issue(authorization(&req), body.customer_id.as_deref(), &base_url)
        .await?;
    info!(
        "[API] Review link issued for customer {}",
        body.customer_id.as_deref().unwrap_or_default().trim()
    );
    Ok(HttpResponse::Created().json(issued))
}

pub async fn submit_review(
    service: web::Data<ReviewTokenService>,
    body: web::Json<RedeemRequest>,
) -> Result<HttpResponse, ReviewError> {
    let review = body.into_inner().validate()?;
    let created = service.redeem(review).await?;
    Ok(HttpResponse::Created().json(created))
}

pub async fn list_reviews(
    service: web::Data<ReviewTokenService>,
    query: web::Query<ListReviewsQuery>,
) -> Result<HttpResponse, ReviewError> {
    let reviews = service.list_reviews(query.limit).await?;
    info!("[API] Returning {} reviews", reviews.len());
    Ok(HttpResponse::Ok().json(reviews))
}

pub async fn create_customer(
    service: web::Data<ReviewTokenService>,
    req: HttpRequest,
    body: Option<web::Json<NewCustomer>>,
) -> Result<HttpResponse, ReviewError> {
    let body = admin_body(&service, &req, body)?;

    let customer = service.create_customer(authorization(&req), body).await?;
    Ok(HttpResponse::Created().json(customer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: Option<i64>) -> RedeemRequest {
        RedeemRequest {
            token: Some("abc".into()),
            rating,
            comment: Some("  Great job ".into()),
            service_type: Some("Exterior Paint".into()),
        }
    }

    #[test]
    fn test_validate_trims_and_accepts_bounds() {
        let review = request(Some(1)).validate().unwrap();
        assert_eq!(review.comment, "Great job");
        assert_eq!(review.rating, 1);
        assert_eq!(request(Some(5)).validate().unwrap().rating, 5);
    }

    #[test]
    fn test_validate_rejects_out_of_range_rating() {
        for rating in [0, 6, -1, 300] {
            let err = request(Some(rating)).validate().unwrap_err();
            assert_eq!(err.to_string(), "Rating must be between 1 and 5");
        }
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let err = request(None).validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields");

        let mut blank_comment = request(Some(4));
        blank_comment.comment = Some("   ".into());
        assert!(matches!(
            blank_comment.validate(),
            Err(ReviewError::InvalidInput(_))
        ));

        assert!(RedeemRequest::default().validate().is_err());
    }

    #[test]
    fn test_redeem_request_uses_camel_case() {
        let body: RedeemRequest = serde_json::from_str(
            r#"{"token":"t","rating":4,"comment":"c","serviceType":"Interior Paint"}"#,
        )
        .unwrap();
        assert_eq!(body.service_type.as_deref(), Some("Interior Paint"));
    }
}
