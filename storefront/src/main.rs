// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tarzify::config::AppConfig;
use tarzify::models::demo_catalog;
use tarzify::services::order_code::RandomOrderCodes;
use tarzify::services::smtp_mailer::mailer_from_config;
use tarzify::state::AppState;
use tarzify::store::{Catalog, PgStore, Stores};
use tarzify::telemetry::init_tracing;
use tarzify::web::configure_app_routes;

#[actix_web::main]
async fn main() -> io::Result<()> {
  let loaded = AppConfig::from_env();
  init_tracing(loaded.as_ref().map(|c| c.log_format).unwrap_or_default());
  tracing::info!("Starting TARZIFY storefront server...");

  let app_config = match loaded {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let pool = PgPoolOptions::new()
    .max_connections(app_config.db_max_connections)
    .acquire_timeout(app_config.external_call_timeout)
    .connect(&app_config.database_url)
    .await
    .map_err(|e| {
      tracing::error!(error = %e, "Failed to connect to the database.");
      io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string())
    })?;
  tracing::info!("Connected to the database.");

  let store = Arc::new(PgStore::new(pool));
  if app_config.run_migrations {
    store.migrate().await.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    tracing::info!("Database migrations applied.");
  }
  if app_config.seed_db {
    match store.seed_products(&demo_catalog()).await {
      Ok(written) => tracing::info!(written, "Demo catalog seeded."),
      Err(e) => tracing::warn!(error = %e, "Seeding the demo catalog failed, continuing."),
    }
  }

  let mailer = mailer_from_config(&app_config).map_err(|e| {
    tracing::error!(error = %e, "Failed to set up the mail sender.");
    io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
  })?;

  let app_state = AppState::assemble(
    app_config.clone(),
    Stores::from_shared(store),
    mailer,
    Arc::new(RandomOrderCodes),
  );

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
