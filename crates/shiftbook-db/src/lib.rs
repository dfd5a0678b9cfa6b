//! # shiftbook-db: SQLite Storage for Shiftbook
//!
//! Implements the shift ledger from `shiftbook-core` on SQLite via sqlx and
//! adds the registry, pricing, and reporting repositories around it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shiftbook Data Flow                              │
//! │                                                                         │
//! │  Caller (CLI, service, seed binary)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shiftbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  SqliteLedger │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │───►│  (ledger.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │  LedgerStore  │    │              │  │   │
//! │  │   │ SqlitePool    │    ├───────────────┤    │ 001_initial  │  │   │
//! │  │   │ workflow()    │───►│  Repositories │    │ _schema.sql  │  │   │
//! │  │   │               │    │ bar, product, │    │              │  │   │
//! │  │   │               │    │ price, report │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/shiftbook/shiftbook.db                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`ledger`] - `LedgerStore` implementation, one SQLite transaction per operation
//! - [`repository`] - Bars, products, prices, reports
//! - [`config`] - TOML + environment configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shiftbook_db::{Database, ShiftbookConfig};
//!
//! let config = ShiftbookConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let shift = db.workflow();
//! let session = shift.initialize(&bar_id, Some("EVENING"), None).await?;
//! // ... save_stockroom, create_or_refresh_distribution, save_wells ...
//! let outcome = shift.commit(&session.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, ShiftbookConfig};
pub use error::{DbError, DbResult};
pub use ledger::{SqliteLedger, SqliteTx};
pub use logging::init_tracing;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bar::BarRepository;
pub use repository::price::PriceRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::report::ReportRepository;
