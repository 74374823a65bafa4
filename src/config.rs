use chrono::Duration;
use log::info;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Longest accepted review link lifetime (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 8760;

/// Server settings, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub site_addr: String,
    pub database_path: String,
    pub site_root: String,
    pub admin_secret: String,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_hours: i64 = try_load(&lookup, "REVIEW_TOKEN_TTL_HOURS", "24")?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl_hours) {
            return Err(ConfigError::Invalid {
                key: "REVIEW_TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
                reason: format!("must be between 1 and {} hours", MAX_TOKEN_TTL_HOURS),
            });
        }

        Ok(Config {
            site_addr: try_load(&lookup, "SITE_ADDR", "127.0.0.1:3004")?,
            database_path: try_load(&lookup, "DATABASE_PATH", "reviews.db")?,
            site_root: try_load(&lookup, "SITE_ROOT", "target/site")?,
            admin_secret: require(&lookup, "ADMIN_SECRET")?,
            token_ttl: Duration::hours(ttl_hours),
        })
    }
}

/// Settings for the Google reviews importer.
#[derive(Clone)]
pub struct ImportConfig {
    pub api_key: String,
    pub place_id: String,
    pub testimonials_path: String,
}

impl ImportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(ImportConfig {
            api_key: require(&lookup, "GOOGLE_PLACES_API_KEY")?,
            place_id: require(&lookup, "GOOGLE_PLACE_ID")?,
            testimonials_path: try_load(&lookup, "TESTIMONIALS_PATH", "data/testimonials.json")?,
        })
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
