//! # In-Memory Ledger
//!
//! A [`LedgerStore`] kept entirely in process memory. Used by the workflow
//! tests and handy for embedding the engine without a database.
//!
//! ## Transaction Model
//! ```text
//! begin()  ──► snapshot = clone(state)   (includes every scope's version)
//!
//!   ... reads and writes hit the snapshot only, and record their scope:
//!       Session(id)  stage rows and the session itself
//!       Bar(id)      which session is open, whether the bar exists
//!       Prices(bar)  price entries read at commit
//!
//! commit() ──► lock state
//!              every touched scope still at its snapshot version ?
//!                yes → copy written sessions into state, bump their scopes
//!                no  → Conflict, nothing applied
//! drop     ──► snapshot discarded
//! ```
//! Transactions on different sessions never conflict. Two transactions that
//! touch the same session (or open a session at the same bar) cannot both
//! commit; the loser sees `CoreError::Conflict` and may retry.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CoreError, CoreResult};
use crate::quantity::Quantity;
use crate::reconcile::{self, WellField};
use crate::store::{LedgerStore, LedgerTx, PriceCatalog};
use crate::types::{
    DistributionRecord, PriceEntry, SalesRecord, Session, SessionStatus, StockroomRecord,
    WellRecord,
};

/// Unit of conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Scope {
    Session(String),
    Bar(String),
    Prices(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Session(id) => write!(f, "session {id}"),
            Scope::Bar(id) => write!(f, "bar {id}"),
            Scope::Prices(id) => write!(f, "prices of bar {id}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    versions: HashMap<Scope, u64>,
    bars: HashSet<String>,
    sessions: BTreeMap<String, Session>,
    stockroom: Vec<StockroomRecord>,
    distribution: Vec<DistributionRecord>,
    wells: Vec<WellRecord>,
    sales: Vec<SalesRecord>,
    prices: HashMap<(String, String), PriceEntry>,
}

impl LedgerState {
    fn version(&self, scope: &Scope) -> u64 {
        self.versions.get(scope).copied().unwrap_or(0)
    }

    fn bump(&mut self, scope: Scope) {
        *self.versions.entry(scope).or_default() += 1;
    }

    /// Replaces everything stored for one session with the snapshot's copy.
    fn apply_session(&mut self, snapshot: &LedgerState, session_id: &str) {
        match snapshot.sessions.get(session_id) {
            Some(session) => {
                self.sessions.insert(session_id.to_string(), session.clone());
            }
            None => {
                self.sessions.remove(session_id);
            }
        }

        self.stockroom.retain(|r| r.session_id != session_id);
        self.stockroom.extend(
            snapshot
                .stockroom
                .iter()
                .filter(|r| r.session_id == session_id)
                .cloned(),
        );
        self.distribution.retain(|r| r.session_id != session_id);
        self.distribution.extend(
            snapshot
                .distribution
                .iter()
                .filter(|r| r.session_id == session_id)
                .cloned(),
        );
        self.wells.retain(|r| r.session_id != session_id);
        self.wells.extend(
            snapshot
                .wells
                .iter()
                .filter(|r| r.session_id == session_id)
                .cloned(),
        );
        self.sales.retain(|r| r.session_id != session_id);
        self.sales.extend(
            snapshot
                .sales
                .iter()
                .filter(|r| r.session_id == session_id)
                .cloned(),
        );
    }
}

fn poisoned<T>(_: T) -> CoreError {
    CoreError::Storage("in-memory ledger lock poisoned".to_string())
}

/// Shared in-memory ledger. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(poisoned)
    }

    /// Registers a bar so sessions can be opened for it.
    pub fn add_bar(&self, bar_id: &str) -> CoreResult<()> {
        let mut state = self.lock()?;
        state.bars.insert(bar_id.to_string());
        state.bump(Scope::Bar(bar_id.to_string()));
        Ok(())
    }

    /// Inserts or replaces the price entry for (bar, product).
    pub fn set_price(&self, entry: PriceEntry) -> CoreResult<()> {
        let mut state = self.lock()?;
        let scope = Scope::Prices(entry.bar_id.clone());
        state
            .prices
            .insert((entry.bar_id.clone(), entry.product_id.clone()), entry);
        state.bump(scope);
        Ok(())
    }
}

impl LedgerStore for MemoryLedger {
    type Tx = MemoryTx;

    async fn begin(&self) -> CoreResult<MemoryTx> {
        let state = self.lock()?;
        Ok(MemoryTx {
            snapshot: state.clone(),
            read: HashSet::new(),
            written: HashSet::new(),
            ledger: Arc::clone(&self.state),
        })
    }
}

/// An open transaction on a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemoryTx {
    snapshot: LedgerState,
    read: HashSet<Scope>,
    written: HashSet<Scope>,
    ledger: Arc<Mutex<LedgerState>>,
}

impl MemoryTx {
    fn read_session(&mut self, session_id: &str) {
        self.read.insert(Scope::Session(session_id.to_string()));
    }

    fn write_session(&mut self, session_id: &str) {
        self.written.insert(Scope::Session(session_id.to_string()));
    }
}

impl PriceCatalog for MemoryTx {
    async fn lookup(&mut self, bar_id: &str, product_id: &str) -> CoreResult<Option<PriceEntry>> {
        self.read.insert(Scope::Prices(bar_id.to_string()));
        Ok(self
            .snapshot
            .prices
            .get(&(bar_id.to_string(), product_id.to_string()))
            .filter(|p| p.active)
            .cloned())
    }
}

impl LedgerTx for MemoryTx {
    async fn get_session(&mut self, session_id: &str) -> CoreResult<Option<Session>> {
        self.read_session(session_id);
        Ok(self.snapshot.sessions.get(session_id).cloned())
    }

    async fn find_open_session(&mut self, bar_id: &str) -> CoreResult<Option<Session>> {
        self.read.insert(Scope::Bar(bar_id.to_string()));
        Ok(self
            .snapshot
            .sessions
            .values()
            .find(|s| s.bar_id == bar_id && s.status == SessionStatus::InProgress)
            .cloned())
    }

    async fn bar_exists(&mut self, bar_id: &str) -> CoreResult<bool> {
        self.read.insert(Scope::Bar(bar_id.to_string()));
        Ok(self.snapshot.bars.contains(bar_id))
    }

    async fn insert_session(&mut self, session: &Session) -> CoreResult<()> {
        if self.snapshot.sessions.contains_key(&session.id) {
            return Err(CoreError::Conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        self.write_session(&session.id);
        self.written.insert(Scope::Bar(session.bar_id.clone()));
        self.snapshot
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update_session(&mut self, session: &Session) -> CoreResult<()> {
        let Some(existing) = self.snapshot.sessions.get_mut(&session.id) else {
            return Err(CoreError::not_found("Session", session.id.as_str()));
        };
        // A status change decides which session is open at the bar
        let status_changed = existing.status != session.status;
        *existing = session.clone();

        self.write_session(&session.id);
        if status_changed {
            self.written.insert(Scope::Bar(session.bar_id.clone()));
        }
        Ok(())
    }

    async fn list_stockroom(&mut self, session_id: &str) -> CoreResult<Vec<StockroomRecord>> {
        self.read_session(session_id);
        Ok(self
            .snapshot
            .stockroom
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn replace_stockroom(
        &mut self,
        session_id: &str,
        records: &[StockroomRecord],
    ) -> CoreResult<()> {
        self.write_session(session_id);
        self.snapshot.stockroom.retain(|r| r.session_id != session_id);
        self.snapshot.stockroom.extend_from_slice(records);
        Ok(())
    }

    async fn list_distribution(&mut self, session_id: &str) -> CoreResult<Vec<DistributionRecord>> {
        self.read_session(session_id);
        Ok(self
            .snapshot
            .distribution
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn find_distribution(
        &mut self,
        session_id: &str,
        product_id: &str,
    ) -> CoreResult<Option<DistributionRecord>> {
        self.read_session(session_id);
        Ok(self
            .snapshot
            .distribution
            .iter()
            .find(|r| r.session_id == session_id && r.product_id == product_id)
            .cloned())
    }

    async fn save_distribution(&mut self, record: &DistributionRecord) -> CoreResult<()> {
        self.write_session(&record.session_id);
        match self
            .snapshot
            .distribution
            .iter_mut()
            .find(|r| r.id == record.id)
        {
            Some(existing) => *existing = record.clone(),
            None => self.snapshot.distribution.push(record.clone()),
        }
        Ok(())
    }

    async fn list_wells(&mut self, session_id: &str) -> CoreResult<Vec<WellRecord>> {
        self.read_session(session_id);
        Ok(self
            .snapshot
            .wells
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn replace_wells(&mut self, session_id: &str, records: &[WellRecord]) -> CoreResult<()> {
        self.write_session(session_id);
        self.snapshot.wells.retain(|r| r.session_id != session_id);
        self.snapshot.wells.extend_from_slice(records);
        Ok(())
    }

    async fn sum_across_wells(
        &mut self,
        session_id: &str,
        product_id: &str,
        field: WellField,
    ) -> CoreResult<Quantity> {
        self.read_session(session_id);
        let wells: Vec<WellRecord> = self
            .snapshot
            .wells
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        Ok(reconcile::sum_across_wells(&wells, product_id, field))
    }

    async fn insert_sales(&mut self, records: &[SalesRecord]) -> CoreResult<()> {
        for record in records {
            self.write_session(&record.session_id);
        }
        self.snapshot.sales.extend_from_slice(records);
        Ok(())
    }

    async fn list_sales(&mut self, session_id: &str) -> CoreResult<Vec<SalesRecord>> {
        self.read_session(session_id);
        Ok(self
            .snapshot
            .sales
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn commit(self) -> CoreResult<()> {
        let mut state = self.ledger.lock().map_err(poisoned)?;

        if let Some(stale) = self
            .read
            .iter()
            .chain(&self.written)
            .find(|scope| state.version(scope) != self.snapshot.version(scope))
        {
            return Err(CoreError::Conflict(format!(
                "{stale} changed since the transaction began"
            )));
        }

        for scope in &self.written {
            if let Scope::Session(session_id) = scope {
                state.apply_session(&self.snapshot, session_id);
            }
            state.bump(scope.clone());
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_dropped_transaction_writes_nothing() {
        let ledger = MemoryLedger::new();
        let session = Session::start("B1", None, None, Utc::now());

        let mut tx = ledger.begin().await.unwrap();
        tx.insert_session(&session).await.unwrap();
        drop(tx);

        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.get_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let ledger = MemoryLedger::new();
        let session = Session::start("B1", None, None, Utc::now());

        let mut tx = ledger.begin().await.unwrap();
        tx.insert_session(&session).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        assert_eq!(tx.get_session(&session.id).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_concurrent_commit_loses() {
        let ledger = MemoryLedger::new();
        let mut first = ledger.begin().await.unwrap();
        let mut second = ledger.begin().await.unwrap();

        first
            .insert_session(&Session::start("B1", None, None, Utc::now()))
            .await
            .unwrap();
        second
            .insert_session(&Session::start("B1", None, None, Utc::now()))
            .await
            .unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_sessions_commit_independently() {
        let ledger = MemoryLedger::new();
        let a = Session::start("B1", None, None, Utc::now());
        let b = Session::start("B2", None, None, Utc::now());
        let mut setup = ledger.begin().await.unwrap();
        setup.insert_session(&a).await.unwrap();
        setup.insert_session(&b).await.unwrap();
        setup.commit().await.unwrap();

        // Interleave: A opens, B opens and commits, A commits
        let mut on_a = ledger.begin().await.unwrap();
        let mut a_notes = on_a.get_session(&a.id).await.unwrap().unwrap();
        a_notes.notes = Some("counted twice".to_string());
        on_a.update_session(&a_notes).await.unwrap();

        let mut on_b = ledger.begin().await.unwrap();
        on_b.get_session(&b.id).await.unwrap();
        on_b.replace_stockroom(&b.id, &[]).await.unwrap();
        let mut b_notes = b.clone();
        b_notes.notes = Some("late delivery".to_string());
        on_b.update_session(&b_notes).await.unwrap();
        on_b.commit().await.unwrap();

        on_a.commit().await.unwrap();

        // Both writes survived
        let mut tx = ledger.begin().await.unwrap();
        assert_eq!(
            tx.get_session(&a.id).await.unwrap().unwrap().notes.as_deref(),
            Some("counted twice")
        );
        assert_eq!(
            tx.get_session(&b.id).await.unwrap().unwrap().notes.as_deref(),
            Some("late delivery")
        );
    }

    #[tokio::test]
    async fn test_same_session_conflicts() {
        let ledger = MemoryLedger::new();
        let a = Session::start("B1", None, None, Utc::now());
        let mut setup = ledger.begin().await.unwrap();
        setup.insert_session(&a).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = ledger.begin().await.unwrap();
        let mut second = ledger.begin().await.unwrap();
        first.get_session(&a.id).await.unwrap();
        second.list_stockroom(&a.id).await.unwrap();

        first.replace_stockroom(&a.id, &[]).await.unwrap();
        first.commit().await.unwrap();

        // Second only read the session, but what it read is stale
        assert!(matches!(second.commit().await, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lookup_ignores_inactive_prices() {
        let ledger = MemoryLedger::new();
        ledger
            .set_price(PriceEntry {
                bar_id: "B1".to_string(),
                product_id: "P1".to_string(),
                selling_price: crate::Money::from_cents(900),
                cost_price: None,
                active: false,
            })
            .unwrap();

        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.lookup("B1", "P1").await.unwrap().is_none());
    }
}
