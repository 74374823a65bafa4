use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use brushwork::api;
use brushwork::config::Config;
use brushwork::db::Database;
use brushwork::service::ReviewTokenService;
use log::{error, info};
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    // Initialize the database
    let db = Database::new(&config.database_path).map_err(store_error)?;
    db.create_schema().await.map_err(store_error)?;
    let issued = db.count_review_tokens().await.map_err(store_error)?;
    info!("Schema ready, {} review tokens on record", issued);

    let service = web::Data::new(ReviewTokenService::new(
        db,
        config.admin_secret.clone(),
        config.token_ttl,
    ));
    let site_root = config.site_root.clone();
    info!("listening on http://{}", &config.site_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            // API routes before the static site so /api is never shadowed
            .configure(api::configure)
            .service(Files::new("/", site_root.clone()).index_file("index.html"))
    })
    .bind(&config.site_addr)?
    .run()
    .await
}

fn store_error(e: rusqlite::Error) -> io::Error {
    error!("Database setup failed: {}", e);
    io::Error::new(io::ErrorKind::Other, e)
}
