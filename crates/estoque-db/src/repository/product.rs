//! # Product Repository
//!
//! Database operations for products.
//!
//! ## The Compare-and-Set Primitive
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              How cas_quantity Prevents Lost Updates                 │
//! │                                                                     │
//! │  Terminal A reads quantity = 10        Terminal B reads 10          │
//! │       │                                     │                       │
//! │       ▼                                     ▼                       │
//! │  UPDATE … SET quantity = 3             UPDATE … SET quantity = 3    │
//! │  WHERE sku = ? AND quantity = 10       WHERE sku = ? AND            │
//! │       │                                      quantity = 10         │
//! │       ▼                                     │                       │
//! │  rows_affected = 1 → committed              ▼                       │
//! │                                        rows_affected = 0 → Conflict │
//! │                                        (B re-reads and retries)     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The conditional `WHERE … AND quantity = ?` plus the `rows_affected`
//! check is the entire concurrency story: no global lock, per-SKU
//! serializability.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use estoque_core::{NewProduct, Product, ProductPatch, ProductStore, StoreError};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_sku("SKU-0001").await?;
/// let committed = repo.cas_quantity("SKU-0001", 50, 45, 58050).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its SKU.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category, supplier,
                   unit_price_cents, quantity, total_value_cents,
                   created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Validates and inserts a new product, computing its derived total
    /// value.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the stored form
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, input: NewProduct) -> DbResult<Product> {
        let product = input.into_product(Utc::now())?;

        debug!(sku = %product.sku, "inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                sku, name, category, supplier,
                unit_price_cents, quantity, total_value_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.supplier)
        .bind(product.unit_price_cents)
        .bind(product.quantity)
        .bind(product.total_value_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            // The generic parser can't recover the value; we know it here.
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        Ok(product)
    }

    /// Conditionally writes a new quantity and its derived total value.
    ///
    /// The write succeeds only if the stored quantity still equals
    /// `expected_quantity`; both columns land in the same atomic write.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the product as committed
    /// * `Err(DbError::Conflict)` - a concurrent writer changed the
    ///   quantity between the caller's read and this write
    /// * `Err(DbError::NotFound)` - the product vanished
    pub async fn cas_quantity(
        &self,
        sku: &str,
        expected_quantity: i64,
        new_quantity: i64,
        new_total_value_cents: i64,
    ) -> DbResult<Product> {
        debug!(
            sku = %sku,
            expected = %expected_quantity,
            new = %new_quantity,
            "compare-and-set quantity"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = ?1,
                total_value_cents = ?2,
                updated_at = ?3
            WHERE sku = ?4 AND quantity = ?5
            "#,
        )
        .bind(new_quantity)
        .bind(new_total_value_cents)
        .bind(now)
        .bind(sku)
        .bind(expected_quantity)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a vanished product.
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE sku = ?1")
                .bind(sku)
                .fetch_optional(&mut *tx)
                .await?;

            return Err(if exists.is_some() {
                DbError::Conflict {
                    sku: sku.to_string(),
                }
            } else {
                DbError::not_found("Product", sku)
            });
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category, supplier,
                   unit_price_cents, quantity, total_value_cents,
                   created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Last-write-wins update of non-quantity fields, recomputing the
    /// derived total value.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the updated product
    /// * `Err(DbError::NotFound)` - product doesn't exist
    pub async fn update_fields(&self, sku: &str, patch: ProductPatch) -> DbResult<Product> {
        debug!(sku = %sku, "updating product fields");

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category, supplier,
                   unit_price_cents, quantity, total_value_cents,
                   created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Product", sku))?;

        let updated = patch.apply(current, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?1,
                category = ?2,
                supplier = ?3,
                unit_price_cents = ?4,
                total_value_cents = ?5,
                updated_at = ?6
            WHERE sku = ?7
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.category)
        .bind(&updated.supplier)
        .bind(updated.unit_price_cents)
        .bind(updated.total_value_cents)
        .bind(updated.updated_at)
        .bind(sku)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Deletes a product. Movements referencing it keep their (now
    /// dangling) weak reference.
    pub async fn delete_by_sku(&self, sku: &str) -> DbResult<()> {
        debug!(sku = %sku, "deleting product");

        let result = sqlx::query("DELETE FROM products WHERE sku = ?1")
            .bind(sku)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", sku));
        }

        Ok(())
    }

    /// Lists all products, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category, supplier,
                   unit_price_cents, quantity, total_value_cents,
                   created_at, updated_at
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Trait Implementation
// =============================================================================

/// The `ProductStore` view the ledger works against. Delegates to the
/// inherent methods and translates errors into the trait vocabulary.
impl ProductStore for ProductRepository {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        self.get_by_sku(sku).await.map_err(StoreError::from)
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.insert(product).await.map_err(StoreError::from)
    }

    async fn compare_and_set_quantity(
        &self,
        sku: &str,
        expected_quantity: i64,
        new_quantity: i64,
        new_total_value_cents: i64,
    ) -> Result<Product, StoreError> {
        self.cas_quantity(sku, expected_quantity, new_quantity, new_total_value_cents)
            .await
            .map_err(StoreError::from)
    }

    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        self.update_fields(sku, patch).await.map_err(StoreError::from)
    }

    async fn delete(&self, sku: &str) -> Result<(), StoreError> {
        self.delete_by_sku(sku).await.map_err(StoreError::from)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        self.list_all().await.map_err(StoreError::from)
    }
}
