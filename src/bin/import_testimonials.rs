// Fetch Google reviews for the business and append new ones to the
// testimonials file served by the site.
use brushwork::config::ImportConfig;
use brushwork::testimonials::{import, GooglePlacesClient};
use log::error;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ImportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = GooglePlacesClient::new(config.api_key, config.place_id);
    match import(&client, Path::new(&config.testimonials_path)).await {
        Ok(added) => {
            println!("Added {} new testimonials", added);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[IMPORT] {}", e);
            ExitCode::FAILURE
        }
    }
}
