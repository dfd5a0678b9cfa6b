//! # Price Repository
//!
//! Selling and cost prices per (bar, product).
//!
//! ```text
//! set_price ──► upsert, active = 1
//! deactivate ─► active = 0   (row kept; lookup stops seeing it)
//! lookup ─────► active rows only
//! ```
//!
//! The workflow reads prices through [`crate::ledger::SqliteTx`] instead,
//! inside the commit's own transaction; both use the same query.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use shiftbook_core::{Money, PriceEntry};

use crate::error::{DbError, DbResult};
use crate::ledger::PRICE_COLUMNS;

/// Repository for bar price operations.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    /// Creates a new PriceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PriceRepository { pool }
    }

    /// Sets the price of a product at a bar, re-activating the entry if needed.
    ///
    /// ## Errors
    /// `ForeignKeyViolation` if the bar or product is unknown.
    pub async fn set_price(
        &self,
        bar_id: &str,
        product_id: &str,
        selling_price: Money,
        cost_price: Option<Money>,
    ) -> DbResult<PriceEntry> {
        debug!(bar_id = %bar_id, product_id = %product_id, price = %selling_price, "Setting price");

        sqlx::query(
            "INSERT INTO bar_prices (bar_id, product_id, selling_price, cost_price, active, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5) \
             ON CONFLICT(bar_id, product_id) DO UPDATE SET \
                 selling_price = excluded.selling_price, \
                 cost_price = excluded.cost_price, \
                 active = 1, \
                 updated_at = excluded.updated_at",
        )
        .bind(bar_id)
        .bind(product_id)
        .bind(selling_price)
        .bind(cost_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(PriceEntry {
            bar_id: bar_id.to_string(),
            product_id: product_id.to_string(),
            selling_price,
            cost_price,
            active: true,
        })
    }

    /// Hides a price from lookups without deleting it.
    pub async fn deactivate(&self, bar_id: &str, product_id: &str) -> DbResult<()> {
        debug!(bar_id = %bar_id, product_id = %product_id, "Deactivating price");

        let result = sqlx::query(
            "UPDATE bar_prices SET active = 0, updated_at = ?3 WHERE bar_id = ?1 AND product_id = ?2",
        )
        .bind(bar_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Price", format!("{bar_id}/{product_id}")));
        }
        Ok(())
    }

    /// Every price entry of a bar, active or not, by product id.
    pub async fn list_for_bar(&self, bar_id: &str) -> DbResult<Vec<PriceEntry>> {
        let sql = format!("SELECT {PRICE_COLUMNS} FROM bar_prices WHERE bar_id = ?1 ORDER BY product_id");
        let prices = sqlx::query_as::<_, PriceEntry>(&sql)
            .bind(bar_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(prices)
    }

    /// The active price of a product at a bar.
    pub async fn lookup(&self, bar_id: &str, product_id: &str) -> DbResult<Option<PriceEntry>> {
        let sql = format!(
            "SELECT {PRICE_COLUMNS} FROM bar_prices \
             WHERE bar_id = ?1 AND product_id = ?2 AND active = 1"
        );
        let price = sqlx::query_as::<_, PriceEntry>(&sql)
            .bind(bar_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(price)
    }
}
