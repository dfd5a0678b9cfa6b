//! # SQLite Ledger
//!
//! [`LedgerStore`] over a `sqlx` SQLite pool. Each workflow operation opens
//! one `sqlx::Transaction`; dropping it without commit rolls everything back.
//!
//! ```text
//! ShiftWorkflow ──begin()──► SqliteTx { tx: Transaction<'static, Sqlite> }
//!                               │
//!                               ├── sessions
//!                               ├── stockroom_records     (replace = DELETE + INSERT)
//!                               ├── distribution_records  (upsert by id)
//!                               ├── well_records          (replace = DELETE + INSERT)
//!                               ├── sales_records
//!                               └── bar_prices            (lookup, active only)
//! ```
//!
//! Price lookups go through the same transaction as the commit that needs
//! them, so a single-connection pool never waits on itself.
//!
//! Transactions open with `BEGIN IMMEDIATE`. Every workflow operation reads
//! before it writes; a deferred transaction would then fail with
//! `SQLITE_BUSY_SNAPSHOT` in WAL mode whenever any other session committed
//! in between. Taking the write lock up front makes writers wait on
//! `busy_timeout` instead.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use shiftbook_core::{
    CoreError, CoreResult, DistributionRecord, LedgerStore, LedgerTx, PriceCatalog, PriceEntry, Quantity,
    SalesRecord, Session, SessionStatus, StockroomRecord, WellField, WellRecord,
};

use crate::error::storage;

const SESSION_COLUMNS: &str =
    "id, bar_id, started_at, ended_at, status, shift_type, notes, validation_errors";

const STOCKROOM_COLUMNS: &str = "id, session_id, product_id, opening_stock, received_stock, \
     closing_stock, transferred_out, remarks";

const DISTRIBUTION_COLUMNS: &str = "id, session_id, product_id, quantity_from_stockroom, \
     total_allocated, unallocated, status, notes";

const WELL_COLUMNS: &str = "id, session_id, product_id, well_name, opening_stock, \
     received_from_distribution, closing_stock, consumed, remarks";

pub(crate) const SALES_COLUMNS: &str = "id, session_id, product_id, quantity_sold, \
     selling_price_per_unit, total_revenue, cost_price_per_unit, total_cost, profit";

pub(crate) const PRICE_COLUMNS: &str = "bar_id, product_id, selling_price, cost_price, active";

/// Ledger store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteLedger { pool }
    }
}

impl LedgerStore for SqliteLedger {
    type Tx = SqliteTx;

    async fn begin(&self) -> CoreResult<SqliteTx> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(storage)?;
        Ok(SqliteTx { tx })
    }
}

/// One open unit of work on the SQLite ledger.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

impl PriceCatalog for SqliteTx {
    async fn lookup(&mut self, bar_id: &str, product_id: &str) -> CoreResult<Option<PriceEntry>> {
        let sql = format!(
            "SELECT {PRICE_COLUMNS} FROM bar_prices \
             WHERE bar_id = ?1 AND product_id = ?2 AND active = 1"
        );
        sqlx::query_as::<_, PriceEntry>(&sql)
            .bind(bar_id)
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)
    }
}

impl LedgerTx for SqliteTx {
    // ---- sessions -----------------------------------------------------------

    async fn get_session(&mut self, session_id: &str) -> CoreResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        sqlx::query_as::<_, Session>(&sql)
            .bind(session_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn find_open_session(&mut self, bar_id: &str) -> CoreResult<Option<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE bar_id = ?1 AND status = ?2 \
             ORDER BY started_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Session>(&sql)
            .bind(bar_id)
            .bind(SessionStatus::InProgress)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn bar_exists(&mut self, bar_id: &str) -> CoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM bars WHERE id = ?1")
            .bind(bar_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(found.is_some())
    }

    async fn insert_session(&mut self, session: &Session) -> CoreResult<()> {
        debug!(session_id = %session.id, bar_id = %session.bar_id, "Inserting session");
        let sql = format!(
            "INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        sqlx::query(&sql)
            .bind(&session.id)
            .bind(&session.bar_id)
            .bind(session.started_at)
            .bind(session.ended_at)
            .bind(session.status)
            .bind(&session.shift_type)
            .bind(&session.notes)
            .bind(&session.validation_errors)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn update_session(&mut self, session: &Session) -> CoreResult<()> {
        debug!(session_id = %session.id, status = %session.status, "Updating session");
        let result = sqlx::query(
            "UPDATE sessions SET ended_at = ?2, status = ?3, shift_type = ?4, notes = ?5, \
             validation_errors = ?6 WHERE id = ?1",
        )
        .bind(&session.id)
        .bind(session.ended_at)
        .bind(session.status)
        .bind(&session.shift_type)
        .bind(&session.notes)
        .bind(&session.validation_errors)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Session", session.id.as_str()));
        }
        Ok(())
    }

    // ---- stockroom ----------------------------------------------------------

    async fn list_stockroom(&mut self, session_id: &str) -> CoreResult<Vec<StockroomRecord>> {
        let sql = format!(
            "SELECT {STOCKROOM_COLUMNS} FROM stockroom_records WHERE session_id = ?1 \
             ORDER BY product_id"
        );
        sqlx::query_as::<_, StockroomRecord>(&sql)
            .bind(session_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn replace_stockroom(
        &mut self,
        session_id: &str,
        records: &[StockroomRecord],
    ) -> CoreResult<()> {
        sqlx::query("DELETE FROM stockroom_records WHERE session_id = ?1")
            .bind(session_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;

        let sql = format!(
            "INSERT INTO stockroom_records ({STOCKROOM_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        for record in records {
            debug!(session_id = %session_id, product_id = %record.product_id, "Inserting stockroom record");
            sqlx::query(&sql)
                .bind(&record.id)
                .bind(&record.session_id)
                .bind(&record.product_id)
                .bind(record.opening_stock)
                .bind(record.received_stock)
                .bind(record.closing_stock)
                .bind(record.transferred_out)
                .bind(&record.remarks)
                .execute(&mut *self.tx)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    // ---- distribution -------------------------------------------------------

    async fn list_distribution(&mut self, session_id: &str) -> CoreResult<Vec<DistributionRecord>> {
        let sql = format!(
            "SELECT {DISTRIBUTION_COLUMNS} FROM distribution_records WHERE session_id = ?1 \
             ORDER BY product_id"
        );
        sqlx::query_as::<_, DistributionRecord>(&sql)
            .bind(session_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn find_distribution(
        &mut self,
        session_id: &str,
        product_id: &str,
    ) -> CoreResult<Option<DistributionRecord>> {
        let sql = format!(
            "SELECT {DISTRIBUTION_COLUMNS} FROM distribution_records \
             WHERE session_id = ?1 AND product_id = ?2"
        );
        sqlx::query_as::<_, DistributionRecord>(&sql)
            .bind(session_id)
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn save_distribution(&mut self, record: &DistributionRecord) -> CoreResult<()> {
        debug!(
            session_id = %record.session_id,
            product_id = %record.product_id,
            allocated = %record.total_allocated,
            "Saving distribution record"
        );
        let sql = format!(
            "INSERT INTO distribution_records ({DISTRIBUTION_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(id) DO UPDATE SET \
                 quantity_from_stockroom = excluded.quantity_from_stockroom, \
                 total_allocated = excluded.total_allocated, \
                 unallocated = excluded.unallocated, \
                 status = excluded.status, \
                 notes = excluded.notes"
        );
        sqlx::query(&sql)
            .bind(&record.id)
            .bind(&record.session_id)
            .bind(&record.product_id)
            .bind(record.quantity_from_stockroom)
            .bind(record.total_allocated)
            .bind(record.unallocated)
            .bind(record.status)
            .bind(&record.notes)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(())
    }

    // ---- wells --------------------------------------------------------------

    async fn list_wells(&mut self, session_id: &str) -> CoreResult<Vec<WellRecord>> {
        let sql = format!(
            "SELECT {WELL_COLUMNS} FROM well_records WHERE session_id = ?1 \
             ORDER BY product_id, well_name"
        );
        sqlx::query_as::<_, WellRecord>(&sql)
            .bind(session_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn replace_wells(&mut self, session_id: &str, records: &[WellRecord]) -> CoreResult<()> {
        sqlx::query("DELETE FROM well_records WHERE session_id = ?1")
            .bind(session_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;

        let sql = format!(
            "INSERT INTO well_records ({WELL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        );
        for record in records {
            debug!(
                session_id = %session_id,
                product_id = %record.product_id,
                well = %record.well_name,
                "Inserting well record"
            );
            sqlx::query(&sql)
                .bind(&record.id)
                .bind(&record.session_id)
                .bind(&record.product_id)
                .bind(record.well_name)
                .bind(record.opening_stock)
                .bind(record.received_from_distribution)
                .bind(record.closing_stock)
                .bind(record.consumed)
                .bind(&record.remarks)
                .execute(&mut *self.tx)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    async fn sum_across_wells(
        &mut self,
        session_id: &str,
        product_id: &str,
        field: WellField,
    ) -> CoreResult<Quantity> {
        let sql = format!(
            "SELECT COALESCE(SUM({}), 0) FROM well_records WHERE session_id = ?1 AND product_id = ?2",
            field.column()
        );
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(session_id)
            .bind(product_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(Quantity::from_hundredths(total))
    }

    // ---- sales --------------------------------------------------------------

    async fn insert_sales(&mut self, records: &[SalesRecord]) -> CoreResult<()> {
        let sql = format!(
            "INSERT INTO sales_records ({SALES_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        );
        for record in records {
            debug!(
                session_id = %record.session_id,
                product_id = %record.product_id,
                revenue = %record.total_revenue,
                "Inserting sales record"
            );
            sqlx::query(&sql)
                .bind(&record.id)
                .bind(&record.session_id)
                .bind(&record.product_id)
                .bind(record.quantity_sold)
                .bind(record.selling_price_per_unit)
                .bind(record.total_revenue)
                .bind(record.cost_price_per_unit)
                .bind(record.total_cost)
                .bind(record.profit)
                .execute(&mut *self.tx)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    async fn list_sales(&mut self, session_id: &str) -> CoreResult<Vec<SalesRecord>> {
        let sql = format!(
            "SELECT {SALES_COLUMNS} FROM sales_records WHERE session_id = ?1 ORDER BY product_id"
        );
        sqlx::query_as::<_, SalesRecord>(&sql)
            .bind(session_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)
    }

    async fn commit(self) -> CoreResult<()> {
        self.tx.commit().await.map_err(storage)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
