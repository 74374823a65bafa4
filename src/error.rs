use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the review token flow and the API around it.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    NotFound,

    #[error("Token already used")]
    AlreadyUsed,

    #[error("Token expired")]
    Expired,

    #[error("Customer already exists")]
    Conflict,

    #[error("Token expiry is out of range")]
    ExpiryOutOfRange,

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl ResponseError for ReviewError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::InvalidInput(_) | ReviewError::AlreadyUsed | ReviewError::Expired => {
                StatusCode::BAD_REQUEST
            }
            ReviewError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ReviewError::NotFound => StatusCode::NOT_FOUND,
            ReviewError::Conflict => StatusCode::CONFLICT,
            ReviewError::ExpiryOutOfRange | ReviewError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ReviewError::Persistence(e) => {
                error!("[API] Store failure: {:?}", e);
                "Internal Server Error".to_string()
            }
            ReviewError::ExpiryOutOfRange => {
                error!("[API] Configured token lifetime overflows the expiry timestamp");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
