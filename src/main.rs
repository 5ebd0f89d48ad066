use std::sync::Arc;
use std::time::Instant;

use actix_web::middleware::{NormalizePath, from_fn};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod health;
mod model;
mod models;
mod request_log;
mod routes;
mod store;
mod telemetry;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::health::StartedAt;
use crate::routes::RateLimiters;
use crate::store::{AttendanceStore, mysql::MySqlAttendanceStore};
use crate::utils::{email_cache, email_filter};
use tracing::{error, info};
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let started = StartedAt(Instant::now());
    let config = Config::from_env()?;

    // Keep the guards alive until shutdown so buffered lines are flushed.
    let _log_guards = telemetry::init(&config)?;

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config)
        .await
        .context("Failed to connect to database")?;

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(&pool_for_filter_warmup, 100).await {
            error!(error = ?e, "Failed to warmup email filter");
        }
    });

    actix_web::rt::spawn(async move {
        // Users seen in the last 30 days, in batches of 250
        if let Err(e) = email_cache::warmup_email_cache(&pool_for_cache_warmup, 30, 250).await {
            error!(error = ?e, "Failed to warmup email cache");
        }
    });

    let store: Arc<dyn AttendanceStore> = Arc::new(MySqlAttendanceStore::new(pool.clone()));
    let limiters = RateLimiters::new(&config);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(from_fn(request_log::request_log))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(crate::error::json_config())
            .app_data(crate::error::query_config())
            .app_data(crate::error::path_config())
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(store.clone()))
            .app_data(Data::new(started))
            .service(health::health)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
