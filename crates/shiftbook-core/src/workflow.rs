//! # Shift Workflow
//!
//! The operations a bar runs through once per shift, each in its own ledger
//! transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  initialize(bar)                 ─► Session IN_PROGRESS                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  save_stockroom(counts)          ─► replaces stockroom records          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  create_or_refresh_distribution  ─► one PENDING record per transfer     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  save_wells(counts)              ─► replaces wells, recomputes every    │
//! │       │                             distribution's allocation           │
//! │       ▼                                                                 │
//! │  commit                                                                 │
//! │   ├── checks pass, prices found  ─► sales written, COMPLETED            │
//! │   └── otherwise                  ─► ROLLED_BACK with the reason         │
//! │                                                                         │
//! │  rollback(reason) at any point   ─► ROLLED_BACK                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//! An operation that returns an error has written nothing, with one
//! exception: a commit that fails a conservation check or a price lookup
//! still commits the ROLLED_BACK status before returning the error.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::quantity::Quantity;
use crate::reconcile::{self, WellField};
use crate::store::{LedgerStore, LedgerTx, PriceCatalog};
use crate::types::{
    DistributionRecord, PriceEntry, SalesRecord, Session, StockroomCount, StockroomRecord,
    WellCount, WellRecord,
};
use crate::validation;

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommitOutcome {
    pub session: Session,
    pub sales: Vec<SalesRecord>,
}

/// Suggested well allocation for one product, taken from its distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WellPrefill {
    pub product_id: String,
    /// Stock available to spread across the wells.
    pub available: Quantity,
    pub already_allocated: Quantity,
}

/// Runs shift operations against a ledger store.
#[derive(Debug, Clone)]
pub struct ShiftWorkflow<S> {
    store: S,
}

impl<S: LedgerStore> ShiftWorkflow<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Opens a session for a bar, or returns the one already open.
    ///
    /// ## Errors
    /// - `InvalidInput` for an empty bar id or over-long text
    /// - `NotFound` if the bar is not registered
    /// - `Conflict` only if a racing open was itself closed before it could
    ///   be re-read
    pub async fn initialize(
        &self,
        bar_id: &str,
        shift_type: Option<&str>,
        notes: Option<&str>,
    ) -> CoreResult<Session> {
        validation::validate_session_start(bar_id, shift_type, notes)?;

        match self.open_session(bar_id, shift_type, notes).await {
            Err(CoreError::Conflict(reason)) => {
                // Lost a race with another caller opening this bar's session
                debug!(bar_id = %bar_id, reason = %reason, "Session open raced, re-reading");
                let mut tx = self.store.begin().await?;
                tx.find_open_session(bar_id)
                    .await?
                    .ok_or(CoreError::Conflict(reason))
            }
            other => other,
        }
    }

    async fn open_session(
        &self,
        bar_id: &str,
        shift_type: Option<&str>,
        notes: Option<&str>,
    ) -> CoreResult<Session> {
        let mut tx = self.store.begin().await?;

        if !tx.bar_exists(bar_id).await? {
            return Err(CoreError::not_found("Bar", bar_id));
        }

        if let Some(open) = tx.find_open_session(bar_id).await? {
            debug!(session_id = %open.id, bar_id = %bar_id, "Reusing open session");
            return Ok(open);
        }

        let session = Session::start(bar_id, shift_type, notes, Utc::now());
        tx.insert_session(&session).await?;
        tx.commit().await?;

        info!(session_id = %session.id, bar_id = %bar_id, "Session started");
        Ok(session)
    }

    /// Returns the session if it exists and is IN_PROGRESS.
    pub async fn require_in_progress(&self, session_id: &str) -> CoreResult<Session> {
        let mut tx = self.store.begin().await?;
        load_in_progress(&mut tx, session_id).await
    }

    /// Abandons a session and records why.
    ///
    /// Works on any status. A terminal session keeps its status and only
    /// has its reason replaced.
    pub async fn rollback(&self, session_id: &str, reason: &str) -> CoreResult<Session> {
        let mut tx = self.store.begin().await?;
        let mut session = load_session(&mut tx, session_id).await?;

        session.roll_back(reason, Utc::now());
        tx.update_session(&session).await?;
        tx.commit().await?;

        warn!(session_id = %session_id, status = %session.status, reason = %reason, "Session rolled back");
        Ok(session)
    }

    // =========================================================================
    // Stage Writes
    // =========================================================================

    /// Replaces the session's stockroom counts.
    ///
    /// Distribution records are not touched; call
    /// [`create_or_refresh_distribution`](Self::create_or_refresh_distribution)
    /// afterwards.
    pub async fn save_stockroom(
        &self,
        session_id: &str,
        counts: Vec<StockroomCount>,
    ) -> CoreResult<Vec<StockroomRecord>> {
        validation::validate_stockroom_counts(&counts)?;

        let mut tx = self.store.begin().await?;
        load_in_progress(&mut tx, session_id).await?;

        let records: Vec<StockroomRecord> = counts
            .into_iter()
            .map(|count| StockroomRecord::from_count(session_id, count))
            .collect();

        tx.replace_stockroom(session_id, &records).await?;
        tx.commit().await?;

        info!(session_id = %session_id, count = records.len(), "Stockroom saved");
        Ok(records)
    }

    /// Creates or refreshes a distribution for every product the stockroom
    /// handed out.
    ///
    /// A refreshed record takes the new quantity and starts over at zero
    /// allocated. Distributions whose product no longer transfers anything
    /// are left as they are.
    pub async fn create_or_refresh_distribution(
        &self,
        session_id: &str,
    ) -> CoreResult<Vec<DistributionRecord>> {
        let mut tx = self.store.begin().await?;
        load_in_progress(&mut tx, session_id).await?;

        let stockroom = tx.list_stockroom(session_id).await?;
        let mut created = 0usize;
        let mut refreshed = 0usize;

        for record in stockroom.iter().filter(|r| r.transferred_out.is_positive()) {
            let distribution = match tx.find_distribution(session_id, &record.product_id).await? {
                Some(mut existing) => {
                    existing.refresh(record.transferred_out);
                    refreshed += 1;
                    existing
                }
                None => {
                    created += 1;
                    DistributionRecord::pending(
                        session_id,
                        &record.product_id,
                        record.transferred_out,
                    )
                }
            };
            tx.save_distribution(&distribution).await?;
        }

        let distribution = tx.list_distribution(session_id).await?;
        tx.commit().await?;

        info!(session_id = %session_id, created, refreshed, "Distribution refreshed");
        Ok(distribution)
    }

    /// Replaces the session's well counts and recomputes every distribution's
    /// allocation from them.
    ///
    /// ## Errors
    /// `NotFound` if a well received stock for a product with no
    /// distribution record. Nothing is written in that case.
    pub async fn save_wells(
        &self,
        session_id: &str,
        counts: Vec<WellCount>,
    ) -> CoreResult<Vec<WellRecord>> {
        validation::validate_well_counts(&counts)?;

        let mut tx = self.store.begin().await?;
        load_in_progress(&mut tx, session_id).await?;

        let wells: Vec<WellRecord> = counts
            .into_iter()
            .map(|count| WellRecord::from_count(session_id, count))
            .collect();

        let mut distribution = tx.list_distribution(session_id).await?;
        for record in &mut distribution {
            record.reset_allocation();
        }

        for well in wells
            .iter()
            .filter(|w| w.received_from_distribution.is_positive())
        {
            let record = distribution
                .iter_mut()
                .find(|d| d.product_id == well.product_id)
                .ok_or_else(|| CoreError::not_found("DistributionRecord", well.product_id.as_str()))?;
            record.allocate(well.received_from_distribution);
        }

        for record in &distribution {
            tx.save_distribution(record).await?;
        }
        tx.replace_wells(session_id, &wells).await?;
        tx.commit().await?;

        info!(session_id = %session_id, count = wells.len(), "Wells saved");
        Ok(wells)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Validates and finalizes a session.
    ///
    /// ## Order
    /// 1. stockroom → distribution
    /// 2. distribution → wells
    /// 3. nothing unallocated
    /// 4. a price for every product consumed
    /// 5. sales records written, session COMPLETED
    ///
    /// If 1-4 fail the session is committed as ROLLED_BACK with the failure
    /// text, then the error is returned.
    pub async fn commit(&self, session_id: &str) -> CoreResult<CommitOutcome> {
        let mut tx = self.store.begin().await?;
        let mut session = load_in_progress(&mut tx, session_id).await?;

        let stockroom = tx.list_stockroom(session_id).await?;
        let distribution = tx.list_distribution(session_id).await?;
        let wells = tx.list_wells(session_id).await?;

        match reconcile_session(&mut tx, &session, &stockroom, &distribution, &wells).await {
            Ok(sales) => {
                tx.insert_sales(&sales).await?;
                session.complete(Utc::now())?;
                tx.update_session(&session).await?;
                tx.commit().await?;

                info!(session_id = %session_id, sales = sales.len(), "Session committed");
                Ok(CommitOutcome { session, sales })
            }
            Err(err) if err.rolls_back_session() => {
                session.roll_back(&err.to_string(), Utc::now());
                tx.update_session(&session).await?;
                tx.commit().await?;

                warn!(session_id = %session_id, error = %err, "Commit failed, session rolled back");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn session(&self, session_id: &str) -> CoreResult<Session> {
        let mut tx = self.store.begin().await?;
        load_session(&mut tx, session_id).await
    }

    pub async fn stockroom(&self, session_id: &str) -> CoreResult<Vec<StockroomRecord>> {
        let mut tx = self.store.begin().await?;
        load_session(&mut tx, session_id).await?;
        tx.list_stockroom(session_id).await
    }

    pub async fn distribution(&self, session_id: &str) -> CoreResult<Vec<DistributionRecord>> {
        let mut tx = self.store.begin().await?;
        load_session(&mut tx, session_id).await?;
        tx.list_distribution(session_id).await
    }

    pub async fn wells(&self, session_id: &str) -> CoreResult<Vec<WellRecord>> {
        let mut tx = self.store.begin().await?;
        load_session(&mut tx, session_id).await?;
        tx.list_wells(session_id).await
    }

    pub async fn sales(&self, session_id: &str) -> CoreResult<Vec<SalesRecord>> {
        let mut tx = self.store.begin().await?;
        load_session(&mut tx, session_id).await?;
        tx.list_sales(session_id).await
    }

    /// Totals one well column for a product across all wells of a session.
    pub async fn well_total(
        &self,
        session_id: &str,
        product_id: &str,
        field: WellField,
    ) -> CoreResult<Quantity> {
        let mut tx = self.store.begin().await?;
        load_session(&mut tx, session_id).await?;
        tx.sum_across_wells(session_id, product_id, field).await
    }

    /// Distribution quantities for filling in a wells form.
    pub async fn distribution_prefill(&self, session_id: &str) -> CoreResult<Vec<WellPrefill>> {
        let mut prefill: Vec<WellPrefill> = self
            .distribution(session_id)
            .await?
            .into_iter()
            .map(|d| WellPrefill {
                product_id: d.product_id,
                available: d.quantity_from_stockroom,
                already_allocated: d.total_allocated,
            })
            .collect();
        prefill.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(prefill)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_session<T: LedgerTx>(tx: &mut T, session_id: &str) -> CoreResult<Session> {
    validation::validate_id("session_id", session_id)?;
    tx.get_session(session_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", session_id))
}

async fn load_in_progress<T: LedgerTx>(tx: &mut T, session_id: &str) -> CoreResult<Session> {
    let session = load_session(tx, session_id).await?;
    session.require_in_progress()?;
    Ok(session)
}

/// Conservation checks plus price lookups. Writes nothing.
async fn reconcile_session<T: LedgerTx + PriceCatalog>(
    tx: &mut T,
    session: &Session,
    stockroom: &[StockroomRecord],
    distribution: &[DistributionRecord],
    wells: &[WellRecord],
) -> CoreResult<Vec<SalesRecord>> {
    reconcile::check_conservation(stockroom, distribution, wells)?;

    let consumption = reconcile::consumption_by_product(wells);
    let mut prices: HashMap<String, PriceEntry> = HashMap::new();

    for product_id in reconcile::products_to_price(&consumption) {
        let price = tx
            .lookup(&session.bar_id, product_id)
            .await?
            .ok_or_else(|| CoreError::PricingMissing {
                product_id: product_id.to_string(),
                bar_id: session.bar_id.clone(),
            })?;
        prices.insert(product_id.to_string(), price);
    }

    reconcile::generate_sales(&session.id, &session.bar_id, &consumption, &prices)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConservationError, ValidationError};
    use crate::memory::{MemoryLedger, MemoryTx};
    use std::sync::atomic::{AtomicBool, Ordering};
    use crate::money::Money;
    use crate::types::{DistributionStatus, SessionStatus, WellName};

    const BAR: &str = "BAR-01";

    fn q(units: i64) -> Quantity {
        Quantity::from_units(units)
    }

    fn workflow() -> ShiftWorkflow<MemoryLedger> {
        let ledger = MemoryLedger::new();
        ledger.add_bar(BAR).unwrap();
        ShiftWorkflow::new(ledger)
    }

    fn price(workflow: &ShiftWorkflow<MemoryLedger>, product: &str, selling: i64, cost: i64) {
        workflow
            .store()
            .set_price(PriceEntry {
                bar_id: BAR.to_string(),
                product_id: product.to_string(),
                selling_price: Money::from_cents(selling),
                cost_price: Some(Money::from_cents(cost)),
                active: true,
            })
            .unwrap();
    }

    fn stock(product: &str, opening: i64, received: i64, closing: i64) -> StockroomCount {
        StockroomCount {
            product_id: product.to_string(),
            opening_stock: q(opening),
            received_stock: q(received),
            closing_stock: q(closing),
            remarks: None,
        }
    }

    fn well(product: &str, name: WellName, opening: i64, received: i64, closing: i64) -> WellCount {
        WellCount {
            product_id: product.to_string(),
            well_name: name,
            opening_stock: q(opening),
            received_from_distribution: q(received),
            closing_stock: q(closing),
            remarks: None,
        }
    }

    /// Stockroom 10 + 5 − 3 = 12 transferred, split 7 / 5 across two wells.
    async fn balanced_shift(wf: &ShiftWorkflow<MemoryLedger>) -> Session {
        let session = wf.initialize(BAR, Some("EVENING"), None).await.unwrap();
        wf.save_stockroom(&session.id, vec![stock("P1", 10, 5, 3)])
            .await
            .unwrap();
        wf.create_or_refresh_distribution(&session.id).await.unwrap();
        wf.save_wells(
            &session.id,
            vec![
                well("P1", WellName::Bar1, 0, 7, 2),
                well("P1", WellName::Bar2, 0, 5, 0),
            ],
        )
        .await
        .unwrap();
        session
    }

    #[tokio::test]
    async fn test_end_to_end_commit() {
        let wf = workflow();
        price(&wf, "P1", 900, 500);
        let session = balanced_shift(&wf).await;

        let dist = wf.distribution(&session.id).await.unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].total_allocated, q(12));
        assert_eq!(dist[0].unallocated, q(0));
        assert_eq!(dist[0].status, DistributionStatus::Allocated);

        let outcome = wf.commit(&session.id).await.unwrap();
        assert_eq!(outcome.session.status, SessionStatus::Completed);
        assert!(outcome.session.ended_at.is_some());
        assert_eq!(outcome.sales.len(), 1);

        let sale = &outcome.sales[0];
        assert_eq!(sale.quantity_sold, q(10));
        assert_eq!(sale.total_revenue, Money::from_cents(9000));
        assert_eq!(sale.total_cost, Money::from_cents(5000));
        assert_eq!(sale.profit, Money::from_cents(4000));

        assert_eq!(wf.sales(&session.id).await.unwrap(), outcome.sales);
    }

    #[tokio::test]
    async fn test_initialize_returns_open_session() {
        let wf = workflow();
        let first = wf.initialize(BAR, None, None).await.unwrap();
        let second = wf.initialize(BAR, Some("LATE"), None).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.shift_type, None);
    }

    #[tokio::test]
    async fn test_initialize_unknown_bar() {
        let wf = workflow();
        assert!(matches!(
            wf.initialize("NOPE", None, None).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_initialize_rejects_empty_bar() {
        let wf = workflow();
        assert!(matches!(
            wf.initialize("", None, None).await,
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_new_session_after_commit() {
        let wf = workflow();
        price(&wf, "P1", 900, 500);
        let session = balanced_shift(&wf).await;
        wf.commit(&session.id).await.unwrap();

        let next = wf.initialize(BAR, None, None).await.unwrap();
        assert_ne!(next.id, session.id);
        assert_eq!(next.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_over_allocation_rolls_back() {
        let wf = workflow();
        price(&wf, "P1", 900, 500);
        let session = wf.initialize(BAR, None, None).await.unwrap();
        wf.save_stockroom(&session.id, vec![stock("P1", 10, 0, 0)])
            .await
            .unwrap();
        wf.create_or_refresh_distribution(&session.id).await.unwrap();
        wf.save_wells(&session.id, vec![well("P1", WellName::Bar1, 0, 12, 0)])
            .await
            .unwrap();

        let dist = wf.distribution(&session.id).await.unwrap();
        assert_eq!(dist[0].unallocated, q(-2));
        assert_eq!(dist[0].status, DistributionStatus::PendingAllocation);

        let err = wf.commit(&session.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ValidationFailed(ConservationError::Unallocated { .. })
        ));

        let stored = wf.session(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::RolledBack);
        assert!(stored
            .validation_errors
            .as_deref()
            .is_some_and(|text| text.contains("unallocated")));
        assert!(wf.sales(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unallocated_stock_rolls_back() {
        let wf = workflow();
        price(&wf, "P1", 900, 500);
        let session = wf.initialize(BAR, None, None).await.unwrap();

        // 12 transferred, only 10 of them reach the wells
        wf.save_stockroom(&session.id, vec![stock("P1", 10, 5, 3)])
            .await
            .unwrap();
        wf.create_or_refresh_distribution(&session.id).await.unwrap();
        wf.save_wells(&session.id, vec![well("P1", WellName::Bar1, 0, 10, 4)])
            .await
            .unwrap();

        let dist = wf.distribution(&session.id).await.unwrap();
        let wells = wf.wells(&session.id).await.unwrap();
        assert_eq!(dist[0].total_allocated, q(10));
        assert_eq!(dist[0].unallocated, q(2));
        assert!(reconcile::check_distribution_to_wells(&dist, &wells).is_ok());
        assert!(reconcile::check_fully_allocated(&dist).is_err());

        let err = wf.commit(&session.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ValidationFailed(ConservationError::Unallocated { ref product_id, unallocated })
                if product_id == "P1" && unallocated == q(2)
        ));

        let stored = wf.session(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::RolledBack);
        let reason = stored.validation_errors.unwrap_or_default();
        assert!(reason.contains("P1"), "{reason}");
        assert!(reason.contains("2.00 units"), "{reason}");
        assert!(wf.sales(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stockroom_change_without_refresh_fails_check_one() {
        let wf = workflow();
        price(&wf, "P1", 900, 500);
        let session = balanced_shift(&wf).await;

        // Recount: 14 transferred now, distribution still says 12
        wf.save_stockroom(&session.id, vec![stock("P1", 10, 5, 1)])
            .await
            .unwrap();

        let err = wf.commit(&session.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ValidationFailed(ConservationError::StockroomMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_pricing_missing_rolls_back() {
        let wf = workflow();
        let session = balanced_shift(&wf).await;

        let err = wf.commit(&session.id).await.unwrap_err();
        assert!(matches!(err, CoreError::PricingMissing { ref product_id, .. } if product_id == "P1"));

        let stored = wf.session(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::RolledBack);
        assert!(wf.sales(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_consumption_needs_no_price() {
        let wf = workflow();
        let session = wf.initialize(BAR, None, None).await.unwrap();
        wf.save_stockroom(&session.id, vec![stock("P1", 4, 0, 4)])
            .await
            .unwrap();
        wf.create_or_refresh_distribution(&session.id).await.unwrap();
        wf.save_wells(&session.id, vec![well("P1", WellName::ServiceBar, 3, 0, 3)])
            .await
            .unwrap();

        let outcome = wf.commit(&session.id).await.unwrap();
        assert_eq!(outcome.session.status, SessionStatus::Completed);
        assert!(outcome.sales.is_empty());
    }

    #[tokio::test]
    async fn test_save_wells_twice_recomputes_allocation() {
        let wf = workflow();
        let session = balanced_shift(&wf).await;

        wf.save_wells(&session.id, vec![well("P1", WellName::Bar1, 0, 4, 0)])
            .await
            .unwrap();

        let dist = wf.distribution(&session.id).await.unwrap();
        assert_eq!(dist[0].total_allocated, q(4));
        assert_eq!(dist[0].unallocated, q(8));
        assert_eq!(dist[0].status, DistributionStatus::PendingAllocation);
        assert_eq!(wf.wells(&session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_wells_unknown_product_writes_nothing() {
        let wf = workflow();
        let session = balanced_shift(&wf).await;

        let err = wf
            .save_wells(
                &session.id,
                vec![
                    well("P1", WellName::Bar1, 0, 12, 0),
                    well("P9", WellName::Bar2, 0, 1, 0),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { ref id, .. } if id == "P9"));

        // Previous wells and allocation survive
        assert_eq!(wf.wells(&session.id).await.unwrap().len(), 2);
        let dist = wf.distribution(&session.id).await.unwrap();
        assert_eq!(dist[0].total_allocated, q(12));
    }

    #[tokio::test]
    async fn test_refresh_resets_allocation() {
        let wf = workflow();
        let session = balanced_shift(&wf).await;

        wf.save_stockroom(&session.id, vec![stock("P1", 10, 5, 1)])
            .await
            .unwrap();
        let dist = wf.create_or_refresh_distribution(&session.id).await.unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].quantity_from_stockroom, q(14));
        assert_eq!(dist[0].total_allocated, q(0));
        assert_eq!(dist[0].status, DistributionStatus::PendingAllocation);
    }

    #[tokio::test]
    async fn test_terminal_session_rejects_writes() {
        let wf = workflow();
        price(&wf, "P1", 900, 500);
        let session = balanced_shift(&wf).await;
        wf.commit(&session.id).await.unwrap();

        assert!(matches!(
            wf.save_stockroom(&session.id, vec![]).await,
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            wf.save_wells(&session.id, vec![]).await,
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            wf.create_or_refresh_distribution(&session.id).await,
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            wf.commit(&session.id).await,
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_rollback() {
        let wf = workflow();
        let session = wf.initialize(BAR, None, None).await.unwrap();

        let rolled = wf.rollback(&session.id, "Stock count abandoned").await.unwrap();
        assert_eq!(rolled.status, SessionStatus::RolledBack);
        assert_eq!(rolled.validation_errors.as_deref(), Some("Stock count abandoned"));

        let again = wf.rollback(&session.id, "Second reason").await.unwrap();
        assert_eq!(again.status, SessionStatus::RolledBack);
        assert_eq!(again.validation_errors.as_deref(), Some("Second reason"));
        assert_eq!(again.ended_at, rolled.ended_at);

        assert!(matches!(
            wf.require_in_progress(&session.id).await,
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let wf = workflow();
        assert!(matches!(
            wf.commit("missing").await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            wf.rollback("missing", "x").await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_well_total_and_prefill() {
        let wf = workflow();
        let session = balanced_shift(&wf).await;

        assert_eq!(
            wf.well_total(&session.id, "P1", WellField::ReceivedFromDistribution)
                .await
                .unwrap(),
            q(12)
        );
        assert_eq!(
            wf.well_total(&session.id, "P1", WellField::Consumed).await.unwrap(),
            q(10)
        );

        let prefill = wf.distribution_prefill(&session.id).await.unwrap();
        assert_eq!(prefill.len(), 1);
        assert_eq!(prefill[0].available, q(12));
    }

    #[tokio::test]
    async fn test_oversized_counts_write_nothing() {
        let wf = workflow();
        let session = wf.initialize(BAR, None, None).await.unwrap();
        let huge: Quantity = "92233720368547758.07".parse().unwrap();

        let mut row = stock("P1", 0, 0, 0);
        row.opening_stock = huge;
        row.received_stock = huge;
        assert!(matches!(
            wf.save_stockroom(&session.id, vec![row]).await,
            Err(CoreError::InvalidInput(ValidationError::OutOfRange { .. }))
        ));
        assert!(wf.stockroom(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sales_overflow_keeps_session_open() {
        let wf = workflow();
        price(&wf, "P1", i64::MAX, 0);
        let session = balanced_shift(&wf).await;

        assert!(matches!(
            wf.commit(&session.id).await,
            Err(CoreError::InvalidInput(ValidationError::Overflow { .. }))
        ));
        let stored = wf.session(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::InProgress);
        assert!(wf.sales(&session.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_at_different_bars_interleave() {
        let wf = workflow();
        wf.store().add_bar("BAR-02").unwrap();
        let first = wf.initialize(BAR, None, None).await.unwrap();
        let second = wf.initialize("BAR-02", None, None).await.unwrap();

        // A transaction on the first session stays open across the second's save
        let mut tx = wf.store().begin().await.unwrap();
        let mut edited = tx.get_session(&first.id).await.unwrap().unwrap();
        edited.notes = Some("short one bottle".to_string());
        tx.update_session(&edited).await.unwrap();

        wf.save_stockroom(&second.id, vec![stock("P1", 4, 0, 1)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = wf.session(&first.id).await.unwrap();
        assert_eq!(stored.notes.as_deref(), Some("short one bottle"));
        assert_eq!(wf.stockroom(&second.id).await.unwrap().len(), 1);
    }

    /// Commits a rival session for [`BAR`] right after the first `begin`.
    struct RacingLedger {
        inner: MemoryLedger,
        raced: AtomicBool,
    }

    impl LedgerStore for RacingLedger {
        type Tx = MemoryTx;

        async fn begin(&self) -> CoreResult<MemoryTx> {
            let tx = self.inner.begin().await?;
            if !self.raced.swap(true, Ordering::SeqCst) {
                let mut rival = self.inner.begin().await?;
                rival
                    .insert_session(&Session::start(BAR, Some("RIVAL"), None, Utc::now()))
                    .await?;
                rival.commit().await?;
            }
            Ok(tx)
        }
    }

    #[tokio::test]
    async fn test_initialize_race_returns_winner() {
        let inner = MemoryLedger::new();
        inner.add_bar(BAR).unwrap();
        let wf = ShiftWorkflow::new(RacingLedger {
            inner,
            raced: AtomicBool::new(false),
        });

        let session = wf.initialize(BAR, Some("EVENING"), None).await.unwrap();
        assert_eq!(session.shift_type.as_deref(), Some("RIVAL"));
        assert_eq!(session.status, SessionStatus::InProgress);

        // Only the rival's session was stored
        let again = wf.initialize(BAR, None, None).await.unwrap();
        assert_eq!(again.id, session.id);
    }
}
