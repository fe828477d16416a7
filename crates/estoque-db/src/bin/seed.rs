//! # Seed Data Generator
//!
//! Populates a database with the example products used for development
//! and demos.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file (./estoque.db)
//! cargo run -p estoque-db --bin seed
//!
//! # Specify a database path
//! cargo run -p estoque-db --bin seed -- --db ./data/estoque.db
//! ```
//!
//! Seeding is idempotent: products whose SKU already exists are skipped.

use std::env;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use estoque_core::NewProduct;
use estoque_db::{Database, DbConfig, DbError};

/// The example catalog: (sku, name, unit_price_cents, quantity, category,
/// supplier).
const EXAMPLE_PRODUCTS: &[(&str, &str, i64, i64, &str, &str)] = &[
    (
        "SKU-0001",
        "Sabonete Lava Jato",
        1290,
        50,
        "Higiene",
        "Império das Espumas",
    ),
    (
        "SKU-0002",
        "Copo Térmico Mustafar",
        3990,
        20,
        "Utilidades",
        "Galactic Cups",
    ),
    (
        "SKU-0003",
        "Cabo USB Jedi",
        1990,
        80,
        "Eletrônicos",
        "Conselho Tech",
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = parse_db_path(env::args().collect());
    info!(path = %db_path, "seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let products = db.products();

    let mut created = Vec::new();
    for &(sku, name, unit_price_cents, quantity, category, supplier) in EXAMPLE_PRODUCTS {
        let input = NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            category: Some(category.to_string()),
            supplier: Some(supplier.to_string()),
            unit_price_cents,
            quantity,
        };

        match products.insert(input).await {
            Ok(product) => {
                info!(sku = %product.sku, name = %product.name, "created product");
                created.push(product);
            }
            Err(DbError::UniqueViolation { .. }) => {
                warn!(sku = %sku, "already present, skipping");
            }
            Err(err) => return Err(err.into()),
        }
    }

    println!("{}", serde_json::to_string_pretty(&created)?);

    let total = products.count().await?;
    info!(created = created.len(), total = total, "seed complete");

    db.close().await;
    Ok(())
}

/// Parses `--db <path>` from the arguments, defaulting to `./estoque.db`.
fn parse_db_path(args: Vec<String>) -> String {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--db" {
            if let Some(path) = iter.next() {
                return path.clone();
            }
        }
    }
    "./estoque.db".to_string()
}
