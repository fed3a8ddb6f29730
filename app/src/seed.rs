// app/src/seed.rs

//! Demo data: an administrator and a few products.

use crate::auth::password::hash_password;
use crate::errors::AppError;
use crate::models::{IdentityRecord, Product, Role};
use crate::store::Stores;
use rust_decimal::Decimal;
use std::env;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct SeedReport {
  pub admin_email: String,
  pub admin_created: bool,
  pub products_created: usize,
}

/// Creates the admin identity and the demo products. A second run finds the
/// admin already present and changes nothing. `SEED_ADMIN_EMAIL` and `SEED_ADMIN_PASSWORD`
/// override the defaults.
#[instrument(name = "seed::seed_demo_data", skip(stores))]
pub async fn seed_demo_data(stores: &Stores) -> Result<SeedReport, AppError> {
  let admin_email = env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@medimart.local".to_string());
  let admin_password = env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "ChangeMe123!".to_string());

  let admin_created = match stores.identities.find_by_email(&admin_email).await? {
    Some(_) => {
      info!(%admin_email, "Admin identity already present.");
      false
    }
    None => {
      let mut admin = IdentityRecord::new(
        admin_email.as_str(),
        "Admin",
        "User",
        Role::Admin,
        hash_password(&admin_password)?,
      );
      admin.email_verified = true;
      stores.identities.insert(&admin).await?;
      info!(%admin_email, identity_id = %admin.id, "Admin identity created.");
      true
    }
  };

  if !admin_created {
    return Ok(SeedReport {
      admin_email,
      admin_created,
      products_created: 0,
    });
  }

  let products = [
    Product::new("Digital Thermometer", Decimal::new(1299, 2), 50),
    Product::new("Blood Pressure Monitor", Decimal::new(4999, 2), 20),
    Product::new("First Aid Kit", Decimal::new(2450, 2), 35),
  ];
  for product in &products {
    stores.stock.insert_product(product).await?;
  }
  info!(count = products.len(), "Demo products inserted.");

  Ok(SeedReport {
    admin_email,
    admin_created,
    products_created: products.len(),
  })
}
