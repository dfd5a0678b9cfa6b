//! # Report Repository
//!
//! Read-only queries over sessions and committed sales: the audit trail and
//! the revenue numbers a manager looks at after close.
//!
//! ```text
//! sessions ──(bar_id, started_at range)──► audit trail
//!     │
//!     └── sales_records (COMPLETED sessions only) ──► SalesReport
//! ```
//!
//! Date ranges are half-open, `[from, to)`, on the session's start time.

use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use shiftbook_core::report::SalesReport;
use shiftbook_core::{Money, SalesRecord, Session, SessionStatus};

use crate::error::DbResult;

const SESSION_COLUMNS: &str =
    "id, bar_id, started_at, ended_at, status, shift_type, notes, validation_errors";

const JOINED_SALES_COLUMNS: &str = "r.id, r.session_id, r.product_id, r.quantity_sold, \
     r.selling_price_per_unit, r.total_revenue, r.cost_price_per_unit, r.total_cost, r.profit";

/// Repository for session history and sales reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Every session of a bar, newest first.
    pub async fn sessions_for_bar(&self, bar_id: &str) -> DbResult<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE bar_id = ?1 ORDER BY started_at DESC"
        );
        let sessions = sqlx::query_as::<_, Session>(&sql)
            .bind(bar_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }

    /// Sessions of a bar started in `[from, to)`, oldest first.
    pub async fn sessions_between(
        &self,
        bar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE bar_id = ?1 AND started_at >= ?2 AND started_at < ?3 \
             ORDER BY started_at"
        );
        let sessions = sqlx::query_as::<_, Session>(&sql)
            .bind(bar_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        debug!(bar_id = %bar_id, count = sessions.len(), "Loaded session audit trail");
        Ok(sessions)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Sales of completed sessions of a bar started in `[from, to)`.
    pub async fn sales_between(
        &self,
        bar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<SalesRecord>> {
        let sql = format!(
            "SELECT {JOINED_SALES_COLUMNS} FROM sales_records r \
             INNER JOIN sessions s ON s.id = r.session_id \
             WHERE s.bar_id = ?1 AND s.status = ?2 \
               AND s.started_at >= ?3 AND s.started_at < ?4 \
             ORDER BY s.started_at, r.product_id"
        );
        let sales = sqlx::query_as::<_, SalesRecord>(&sql)
            .bind(bar_id)
            .bind(SessionStatus::Completed)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Total revenue of one session. Zero for sessions without sales.
    pub async fn session_revenue(&self, session_id: &str) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_revenue), 0) FROM sales_records WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    /// Sales report for sessions started in `[from, to)`.
    pub async fn range_report(
        &self,
        bar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesReport> {
        let sales = self.sales_between(bar_id, from, to).await?;
        Ok(SalesReport::from_records(&sales))
    }

    /// Sales report for sessions started on one UTC calendar day.
    pub async fn daily_report(&self, bar_id: &str, day: NaiveDate) -> DbResult<SalesReport> {
        let from = day.and_time(chrono::NaiveTime::MIN).and_utc();
        let to = from
            .checked_add_days(Days::new(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.range_report(bar_id, from, to).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
