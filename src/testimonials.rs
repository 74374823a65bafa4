//! Google reviews importer.
//!
//! Pulls the reviews Google shows for the business listing and appends the
//! ones not already present to the site's testimonials JSON file. An entry
//! counts as present when an existing testimonial has the same author and
//! the same text.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PLACE_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to access testimonials file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Testimonials file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode testimonials: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Google Places request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google Places returned {status}: {message}")]
    Api { status: String, message: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub author: String,
    pub rating: u8,
    pub text: String,
    #[serde(default)]
    pub relative_time: Option<String>,
    #[serde(default)]
    pub time: Option<i64>, // Unix seconds as reported by Google
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "google".to_string()
}

impl Testimonial {
    fn same_as(&self, other: &Testimonial) -> bool {
        self.author.trim() == other.author.trim() && self.text.trim() == other.text.trim()
    }
}

#[derive(Deserialize, Debug)]
pub struct PlaceDetailsResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result: Option<PlaceResult>,
}

#[derive(Deserialize, Debug)]
pub struct PlaceResult {
    #[serde(default)]
    pub reviews: Vec<GoogleReview>,
}

#[derive(Deserialize, Debug)]
pub struct GoogleReview {
    pub author_name: String,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub relative_time_description: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
}

impl From<GoogleReview> for Testimonial {
    fn from(review: GoogleReview) -> Self {
        Testimonial {
            author: review.author_name,
            rating: review.rating,
            text: review.text,
            relative_time: review.relative_time_description,
            time: review.time,
            source: default_source(),
        }
    }
}

impl PlaceDetailsResponse {
    pub fn into_testimonials(self) -> Result<Vec<Testimonial>, ImportError> {
        if self.status != "OK" {
            return Err(ImportError::Api {
                message: self.error_message.unwrap_or_default(),
                status: self.status,
            });
        }
        Ok(self
            .result
            .map(|result| result.reviews)
            .unwrap_or_default()
            .into_iter()
            .map(Testimonial::from)
            .collect())
    }
}

pub struct GooglePlacesClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    place_id: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>, place_id: impl Into<String>) -> Self {
        Self::with_endpoint(PLACE_DETAILS_URL, api_key, place_id)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        place_id: impl Into<String>,
    ) -> Self {
        GooglePlacesClient {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            place_id: place_id.into(),
        }
    }

    pub async fn fetch_reviews(&self) -> Result<Vec<Testimonial>, ImportError> {
        debug!("[IMPORT] Fetching reviews for place {}", self.place_id);
        let response: PlaceDetailsResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("place_id", self.place_id.as_str()),
                ("fields", "reviews"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_testimonials()
    }
}

/// Appends the incoming testimonials that are not already in `existing`.
/// Entries with blank text are skipped. Returns how many were added.
pub fn merge_testimonials(existing: &mut Vec<Testimonial>, incoming: Vec<Testimonial>) -> usize {
    let mut added = 0;
    for testimonial in incoming {
        if testimonial.text.trim().is_empty() {
            continue;
        }
        if existing.iter().any(|known| known.same_as(&testimonial)) {
            continue;
        }
        existing.push(testimonial);
        added += 1;
    }
    added
}

/// Reads the testimonials file; a missing file is an empty list.
pub fn load_testimonials(path: &Path) -> Result<Vec<Testimonial>, ImportError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ImportError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&raw).map_err(|source| ImportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_testimonials(path: &Path, testimonials: &[Testimonial]) -> Result<(), ImportError> {
    let io_error = |source: std::io::Error| ImportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let json = serde_json::to_string_pretty(testimonials)?;
    fs::write(path, json).map_err(io_error)
}

/// Fetches, merges and rewrites the testimonials file.
pub async fn import(client: &GooglePlacesClient, path: &Path) -> Result<usize, ImportError> {
    let fetched = client.fetch_reviews().await?;
    let mut testimonials = load_testimonials(path)?;
    let fetched_count = fetched.len();
    let added = merge_testimonials(&mut testimonials, fetched);
    if added > 0 {
        save_testimonials(path, &testimonials)?;
    }
    info!(
        "[IMPORT] Fetched {} reviews, added {} new testimonials to {}",
        fetched_count,
        added,
        path.display()
    );
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testimonial(author: &str, text: &str) -> Testimonial {
        Testimonial {
            author: author.into(),
            rating: 5,
            text: text.into(),
            relative_time: None,
            time: None,
            source: "google".into(),
        }
    }

    #[test]
    fn test_merge_skips_duplicates_and_blank_text() {
        let mut existing = vec![testimonial("Sam", "Beautiful trim work")];
        let added = merge_testimonials(
            &mut existing,
            vec![
                testimonial("Sam", "  Beautiful trim work "),
                testimonial("Sam", "Came back for the fence"),
                testimonial("Riley", "Beautiful trim work"),
                testimonial("Jordan", "   "),
            ],
        );
        assert_eq!(added, 2);
        assert_eq!(existing.len(), 3);
        assert_eq!(existing[1].text, "Came back for the fence");
        assert_eq!(existing[2].author, "Riley");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![testimonial("Sam", "Great"), testimonial("Riley", "On time")];
        let mut existing = Vec::new();
        assert_eq!(merge_testimonials(&mut existing, batch.clone()), 2);
        assert_eq!(merge_testimonials(&mut existing, batch), 0);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn test_place_details_response_mapping() {
        let body = r#"{
            "status": "OK",
            "result": {
                "reviews": [
                    {
                        "author_name": "Pat Morgan",
                        "rating": 5,
                        "text": "Crew was careful with our furniture.",
                        "relative_time_description": "a month ago",
                        "time": 1717000000
                    },
                    { "author_name": "Lee", "rating": 4 }
                ]
            }
        }"#;
        let response: PlaceDetailsResponse = serde_json::from_str(body).unwrap();
        let testimonials = response.into_testimonials().unwrap();
        assert_eq!(testimonials.len(), 2);
        assert_eq!(testimonials[0].author, "Pat Morgan");
        assert_eq!(testimonials[0].relative_time.as_deref(), Some("a month ago"));
        assert_eq!(testimonials[0].source, "google");
        assert_eq!(testimonials[1].text, "");
    }

    #[test]
    fn test_place_details_error_status() {
        let body = r#"{"status":"REQUEST_DENIED","error_message":"The provided API key is invalid."}"#;
        let response: PlaceDetailsResponse = serde_json::from_str(body).unwrap();
        match response.into_testimonials() {
            Err(ImportError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_testimonials(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("testimonials.json");
        let list = vec![testimonial("B", "second"), testimonial("A", "first")];

        save_testimonials(&path, &list).unwrap();
        assert_eq!(load_testimonials(&path).unwrap(), list);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testimonials.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_testimonials(&path),
            Err(ImportError::Parse { .. })
        ));
    }

    #[test]
    fn test_file_without_source_defaults_to_google() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testimonials.json");
        fs::write(&path, r#"[{"author":"Kim","rating":5,"text":"Lovely"}]"#).unwrap();
        let loaded = load_testimonials(&path).unwrap();
        assert_eq!(loaded[0].source, "google");
    }
}
