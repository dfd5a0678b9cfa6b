//! # Repository Module
//!
//! Registry and report repositories for Shiftbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into the Database                           │
//! │                                                                         │
//! │  Shift operations                    Everything else                   │
//! │  ────────────────                    ───────────────                   │
//! │  db.workflow()                       db.bars() / db.products()         │
//! │       │                              db.prices() / db.reports()        │
//! │       ▼                                   │                             │
//! │  SqliteLedger (ledger.rs)                 ▼                             │
//! │  one transaction per operation       Repositories (this module)        │
//! │                                      one statement per call            │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │                SQLite Database                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`bar::BarRepository`] - Bar registry
//! - [`product::ProductRepository`] - Product registry
//! - [`price::PriceRepository`] - Per-bar selling and cost prices
//! - [`report::ReportRepository`] - Session history and sales reports

pub mod bar;
pub mod price;
pub mod product;
pub mod report;
