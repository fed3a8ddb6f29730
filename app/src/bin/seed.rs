// app/src/bin/seed.rs

//! Seeds the configured PostgreSQL database with demo data.

use anyhow::{anyhow, Context};
use medimart::seed::seed_demo_data;
use medimart::store::Stores;
use medimart::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let config = AppConfig::from_env().context("loading configuration")?;
  let database_url = config
    .database_url
    .as_deref()
    .ok_or_else(|| anyhow!("DATABASE_URL must be set to seed a database"))?;

  let stores = Stores::postgres(database_url)
    .await
    .context("connecting to and migrating the database")?;
  let report = seed_demo_data(&stores).await.context("seeding demo data")?;

  tracing::info!(
    admin_email = %report.admin_email,
    admin_created = report.admin_created,
    products = report.products_created,
    "Seeding finished."
  );
  Ok(())
}
