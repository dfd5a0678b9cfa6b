//! # shiftbook-core: Bar-Shift Reconciliation Logic
//!
//! This crate is the **heart** of Shiftbook. It tracks liquor stock through
//! four stages of a bar shift and refuses to close the shift unless every
//! unit is accounted for.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Shiftbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (UI, API, scripts)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ shiftbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  workflow │  │ reconcile │  │   rules   │  │ validation│  │   │
//! │  │   │ ShiftWork │  │ checks 1-3│  │ derived   │  │   input   │  │   │
//! │  │   │   flow    │  │ sales gen │  │  fields   │  │  checks   │  │   │
//! │  │   └─────┬─────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │         │ LedgerStore trait                                     │   │
//! │  │         ▼                                                       │   │
//! │  │   MemoryLedger (tests, embedding)                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shiftbook-db (Database Layer)                   │   │
//! │  │     SqliteLedger, registries, reports, migrations, config       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Session, stage records, prices, registry rows
//! - [`quantity`] / [`money`] - exact two-decimal arithmetic on i64
//! - [`rules`] - derived fields (transferred out, consumed, unallocated, totals)
//! - [`reconcile`] - conservation checks and sales generation
//! - [`session`] - lifecycle transitions
//! - [`store`] - transaction traits the workflow runs against
//! - [`workflow`] - the shift operations
//! - [`report`] - sales aggregates
//!
//! ## Design Principles
//!
//! 1. **Pure rules**: formulas and checks take records in, return values out
//! 2. **No I/O**: persistence lives behind [`store::LedgerStore`]
//! 3. **Exact quantities**: hundredths and cents, never floats
//! 4. **One transaction per operation**: a failed call writes nothing
//!
//! ## Example Usage
//!
//! ```rust
//! use shiftbook_core::quantity::Quantity;
//! use shiftbook_core::rules::compute_transferred_out;
//!
//! let out = compute_transferred_out(
//!     Quantity::from_units(10),
//!     Quantity::from_units(5),
//!     Quantity::from_units(3),
//! );
//! assert_eq!(out, Quantity::from_units(12));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod money;
pub mod quantity;
pub mod reconcile;
pub mod report;
pub mod rules;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ConservationError, CoreError, CoreResult, ValidationError};
pub use memory::MemoryLedger;
pub use money::Money;
pub use quantity::Quantity;
pub use reconcile::WellField;
pub use store::{LedgerStore, LedgerTx, PriceCatalog};
pub use types::*;
pub use workflow::{CommitOutcome, ShiftWorkflow, WellPrefill};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest accepted bar, product or session id.
pub const MAX_ID_LEN: usize = 64;

/// Longest accepted shift type label.
pub const MAX_SHIFT_TYPE_LEN: usize = 20;

/// Longest accepted session notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Longest accepted remarks on a stage record.
pub const MAX_REMARKS_LEN: usize = 200;

/// Rollback reasons are cut to this many characters before they are stored.
pub const MAX_VALIDATION_ERROR_LEN: usize = 1000;

/// Largest opening, received or closing count accepted for one row.
pub const MAX_STOCK_QUANTITY: Quantity = Quantity::from_units(1_000_000);
