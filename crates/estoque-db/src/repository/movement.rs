//! # Movement Repository
//!
//! The append-only movement log over SQLite.
//!
//! Rows are inserted once and never updated or deleted by the
//! application; there is no contention on this table since it is purely
//! additive. Reads re-run their query against storage each time, so a
//! repeated `query` call observes newly appended rows.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use estoque_core::{MovementFilter, MovementLog, NewMovement, StockMovement, StoreError};

/// Repository for the stock movement log.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement, assigning its id and - when the caller left it
    /// unset - its timestamp.
    pub async fn insert(&self, movement: NewMovement) -> DbResult<StockMovement> {
        let id = Uuid::new_v4().to_string();
        let now_ms = Utc::now().timestamp_millis();
        let movement = movement.into_movement(id, now_ms);

        debug!(
            id = %movement.id,
            sku = %movement.product_sku,
            kind = %movement.kind,
            qty = %movement.qty,
            "appending stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_sku, qty, kind,
                actor_id, actor_name, timestamp_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_sku)
        .bind(movement.qty)
        .bind(movement.kind)
        .bind(&movement.actor_id)
        .bind(&movement.actor_name)
        .bind(movement.timestamp_ms)
        .execute(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Movements matching `filter`, ordered by timestamp ascending
    /// (insertion order breaks ties).
    pub async fn query_filtered(&self, filter: &MovementFilter) -> DbResult<Vec<StockMovement>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, product_sku, qty, kind, actor_id, actor_name, timestamp_ms \
             FROM stock_movements WHERE 1 = 1",
        );

        if let Some(sku) = &filter.sku {
            qb.push(" AND product_sku = ");
            qb.push_bind(sku);
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind);
        }
        if let Some(since) = filter.since_ms {
            // inclusive lower bound
            qb.push(" AND timestamp_ms >= ");
            qb.push_bind(since);
        }
        if let Some(until) = filter.until_ms {
            // exclusive upper bound
            qb.push(" AND timestamp_ms < ");
            qb.push_bind(until);
        }

        qb.push(" ORDER BY timestamp_ms ASC, rowid ASC");

        let movements = qb
            .build_query_as::<StockMovement>()
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Counts movements (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Trait Implementation
// =============================================================================

impl MovementLog for MovementRepository {
    async fn append(&self, movement: NewMovement) -> Result<StockMovement, StoreError> {
        self.insert(movement).await.map_err(StoreError::from)
    }

    async fn query(&self, filter: MovementFilter) -> Result<Vec<StockMovement>, StoreError> {
        self.query_filtered(&filter).await.map_err(StoreError::from)
    }
}
