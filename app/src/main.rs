// app/src/main.rs

use actix_web::middleware::from_fn;
use actix_web::{web as actix_data, App, HttpServer};
use medimart::seed::seed_demo_data;
use medimart::store::Stores;
use medimart::web::{configure_app_routes, issue_session_cookie};
use medimart::{AppConfig, AppState};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting medimart server...");

  let app_config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
  })?;

  let stores = match app_config.database_url.as_deref() {
    Some(url) => Stores::postgres(url).await.map_err(|e| {
      tracing::error!(error = %e, "Failed to initialise the database.");
      std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?,
    None => {
      tracing::warn!("DATABASE_URL not set; using in-memory stores. Data is lost on restart.");
      Stores::in_memory()
    }
  };

  if app_config.seed_db {
    match seed_demo_data(&stores).await {
      Ok(report) => tracing::info!(?report, "Seed data applied."),
      Err(e) => tracing::error!(error = %e, "Failed to seed data."),
    }
  }

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::new(stores, app_config);

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(from_fn(issue_session_cookie))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
