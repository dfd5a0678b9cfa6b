//! # Store Traits
//!
//! The seams between the workflow and persistence.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ShiftWorkflow<S: LedgerStore>                                          │
//! │        │                                                                │
//! │        │ begin()                                                        │
//! │        ▼                                                                │
//! │  S::Tx ── LedgerTx      sessions + four stage tables                    │
//! │       └── PriceCatalog  price lookup inside the same transaction        │
//! │        │                                                                │
//! │        │ commit()  ─► all writes visible at once                        │
//! │        │ drop      ─► nothing written                                   │
//! │        ▼                                                                │
//! │  MemoryLedger (this crate, tests)   SqliteLedger (shiftbook-db)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every workflow operation runs inside exactly one transaction. Dropping a
//! transaction without calling [`LedgerTx::commit`] discards its writes.

use std::future::Future;

use crate::error::CoreResult;
use crate::quantity::Quantity;
use crate::reconcile::WellField;
use crate::types::{
    DistributionRecord, PriceEntry, SalesRecord, Session, StockroomRecord, WellRecord,
};

/// Source of transactions over the ledger.
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx + PriceCatalog + Send;

    /// Opens a transaction.
    fn begin(&self) -> impl Future<Output = CoreResult<Self::Tx>> + Send;
}

/// Price lookup by (bar, product). Only active entries are visible.
pub trait PriceCatalog {
    fn lookup(
        &mut self,
        bar_id: &str,
        product_id: &str,
    ) -> impl Future<Output = CoreResult<Option<PriceEntry>>> + Send;
}

/// Reads and writes against one open transaction.
pub trait LedgerTx: Send {
    // ---- sessions -----------------------------------------------------------

    fn get_session(
        &mut self,
        session_id: &str,
    ) -> impl Future<Output = CoreResult<Option<Session>>> + Send;

    /// The IN_PROGRESS session for a bar, if one exists.
    fn find_open_session(
        &mut self,
        bar_id: &str,
    ) -> impl Future<Output = CoreResult<Option<Session>>> + Send;

    fn bar_exists(&mut self, bar_id: &str) -> impl Future<Output = CoreResult<bool>> + Send;

    fn insert_session(&mut self, session: &Session) -> impl Future<Output = CoreResult<()>> + Send;

    fn update_session(&mut self, session: &Session) -> impl Future<Output = CoreResult<()>> + Send;

    // ---- stockroom ----------------------------------------------------------

    fn list_stockroom(
        &mut self,
        session_id: &str,
    ) -> impl Future<Output = CoreResult<Vec<StockroomRecord>>> + Send;

    /// Deletes the session's stockroom records, then inserts `records`.
    fn replace_stockroom(
        &mut self,
        session_id: &str,
        records: &[StockroomRecord],
    ) -> impl Future<Output = CoreResult<()>> + Send;

    // ---- distribution -------------------------------------------------------

    fn list_distribution(
        &mut self,
        session_id: &str,
    ) -> impl Future<Output = CoreResult<Vec<DistributionRecord>>> + Send;

    fn find_distribution(
        &mut self,
        session_id: &str,
        product_id: &str,
    ) -> impl Future<Output = CoreResult<Option<DistributionRecord>>> + Send;

    /// Inserts or updates by record id.
    fn save_distribution(
        &mut self,
        record: &DistributionRecord,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    // ---- wells --------------------------------------------------------------

    fn list_wells(
        &mut self,
        session_id: &str,
    ) -> impl Future<Output = CoreResult<Vec<WellRecord>>> + Send;

    /// Deletes the session's well records, then inserts `records`.
    fn replace_wells(
        &mut self,
        session_id: &str,
        records: &[WellRecord],
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Totals one well column for a product. Zero when no wells match.
    fn sum_across_wells(
        &mut self,
        session_id: &str,
        product_id: &str,
        field: WellField,
    ) -> impl Future<Output = CoreResult<Quantity>> + Send;

    // ---- sales --------------------------------------------------------------

    fn insert_sales(
        &mut self,
        records: &[SalesRecord],
    ) -> impl Future<Output = CoreResult<()>> + Send;

    fn list_sales(
        &mut self,
        session_id: &str,
    ) -> impl Future<Output = CoreResult<Vec<SalesRecord>>> + Send;

    // ---- end ----------------------------------------------------------------

    /// Makes every write of this transaction visible atomically.
    fn commit(self) -> impl Future<Output = CoreResult<()>> + Send;
}
