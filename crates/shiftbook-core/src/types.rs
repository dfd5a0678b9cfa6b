//! # Domain Types
//!
//! Core domain types used throughout Shiftbook.
//!
//! ## Stage Records
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Session, Four Stages                            │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ StockroomRecord  │   │DistributionRecord│   │   WellRecord     │    │
//! │  │ ───────────────  │──►│ ───────────────  │──►│ ───────────────  │    │
//! │  │ opening          │   │ qty_from_stock.  │   │ well_name        │    │
//! │  │ received         │   │ total_allocated  │   │ opening          │    │
//! │  │ closing          │   │ unallocated*     │   │ received_from_d. │    │
//! │  │ transferred_out* │   │ status*          │   │ closing          │    │
//! │  └──────────────────┘   └──────────────────┘   │ consumed*        │    │
//! │                                                 └────────┬─────────┘    │
//! │                                                          │ commit       │
//! │                                                 ┌────────▼─────────┐    │
//! │                                                 │   SalesRecord    │    │
//! │                                                 │ revenue* cost*   │    │
//! │                                                 │ profit*          │    │
//! │                                                 └──────────────────┘    │
//! │  * derived, see [`crate::rules`]                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Keys, Not Back-Pointers
//! Records carry a `session_id` key. A session's records are fetched from the
//! ledger by query; the session never owns them in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Session Status
// =============================================================================

/// Lifecycle status of a session.
///
/// ```text
/// IN_PROGRESS ──commit ok──► COMPLETED
///      │
///      └──commit fails / manual abort──► ROLLED_BACK
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Stage records may be written.
    InProgress,
    /// Committed; sales records exist.
    Completed,
    /// Aborted or failed validation; `validation_errors` says why.
    RolledBack,
}

impl SessionStatus {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::RolledBack => "ROLLED_BACK",
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::InProgress
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Session
// =============================================================================

/// One shift's reconciliation workflow at one bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Session {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Bar this session counts stock for.
    pub bar_id: String,

    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,

    /// Set when the session reaches a terminal status.
    #[ts(as = "Option<String>")]
    pub ended_at: Option<DateTime<Utc>>,

    pub status: SessionStatus,

    /// Free-form label such as "EVENING".
    pub shift_type: Option<String>,

    pub notes: Option<String>,

    /// Why the session was rolled back.
    pub validation_errors: Option<String>,
}

// =============================================================================
// Well Name
// =============================================================================

/// The service points stock can be poured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum WellName {
    #[serde(rename = "BAR_1")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "BAR_1"))]
    Bar1,
    #[serde(rename = "BAR_2")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "BAR_2"))]
    Bar2,
    #[serde(rename = "SERVICE_BAR")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SERVICE_BAR"))]
    ServiceBar,
}

impl WellName {
    /// Every well, in display order.
    pub const ALL: [WellName; 3] = [WellName::Bar1, WellName::Bar2, WellName::ServiceBar];

    pub fn as_str(&self) -> &'static str {
        match self {
            WellName::Bar1 => "BAR_1",
            WellName::Bar2 => "BAR_2",
            WellName::ServiceBar => "SERVICE_BAR",
        }
    }
}

impl fmt::Display for WellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WellName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BAR_1" => Ok(WellName::Bar1),
            "BAR_2" => Ok(WellName::Bar2),
            "SERVICE_BAR" => Ok(WellName::ServiceBar),
            _ => Err(ValidationError::NotAllowed {
                field: "well_name".to_string(),
                allowed: WellName::ALL.iter().map(|w| w.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Distribution Status
// =============================================================================

/// Allocation state of a distribution record.
///
/// There is no partial state: a partially allocated record keeps whatever
/// status its last write produced (see [`crate::rules::compute_unallocated`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionStatus {
    PendingAllocation,
    Allocated,
}

impl Default for DistributionStatus {
    fn default() -> Self {
        DistributionStatus::PendingAllocation
    }
}

// =============================================================================
// Caller Input
// =============================================================================

/// A stockroom count as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockroomCount {
    pub product_id: String,
    pub opening_stock: Quantity,
    pub received_stock: Quantity,
    pub closing_stock: Quantity,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// A well count as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WellCount {
    pub product_id: String,
    pub well_name: WellName,
    pub opening_stock: Quantity,
    pub received_from_distribution: Quantity,
    pub closing_stock: Quantity,
    #[serde(default)]
    pub remarks: Option<String>,
}

// =============================================================================
// Stage Records
// =============================================================================

/// Physical count at bulk storage, one per (session, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockroomRecord {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    /// Previous closing count.
    pub opening_stock: Quantity,
    /// Deliveries during the shift.
    pub received_stock: Quantity,
    /// Physical count at end of shift.
    pub closing_stock: Quantity,
    /// opening + received − closing.
    pub transferred_out: Quantity,
    pub remarks: Option<String>,
}

/// Stock handed from the stockroom toward the wells, one per (session, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DistributionRecord {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    /// Must match the stockroom's transferred_out.
    pub quantity_from_stockroom: Quantity,
    /// Sum of well allocations.
    pub total_allocated: Quantity,
    /// quantity_from_stockroom − total_allocated.
    pub unallocated: Quantity,
    pub status: DistributionStatus,
    pub notes: Option<String>,
}

/// Stock at a pourable service point, one per (session, product, well).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WellRecord {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    pub well_name: WellName,
    pub opening_stock: Quantity,
    pub received_from_distribution: Quantity,
    pub closing_stock: Quantity,
    /// max(0, opening + received − closing).
    pub consumed: Quantity,
    pub remarks: Option<String>,
}

/// Sales derived from well consumption at commit time. Never user-entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesRecord {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    /// Sum of consumed across all wells.
    pub quantity_sold: Quantity,
    pub selling_price_per_unit: Money,
    /// quantity_sold × selling_price_per_unit.
    pub total_revenue: Money,
    pub cost_price_per_unit: Money,
    /// quantity_sold × cost_price_per_unit.
    pub total_cost: Money,
    /// total_revenue − total_cost.
    pub profit: Money,
}

// =============================================================================
// Pricing
// =============================================================================

/// Selling and cost price of a product at one bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PriceEntry {
    pub bar_id: String,
    pub product_id: String,
    /// Price per unit.
    pub selling_price: Money,
    /// Optional; treated as zero for profit when absent.
    pub cost_price: Option<Money>,
    /// Inactive entries are invisible to lookups.
    pub active: bool,
}

// =============================================================================
// Registry Types
// =============================================================================

/// A bar (venue) that runs sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bar {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A stocked product (bottle, case, keg).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Unique display name.
    pub name: String,
    /// Whisky, Vodka, Rum, Beer, Wine, ...
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Bottle size in millilitres.
    pub volume_ml: Option<Quantity>,
    /// BOTTLE, CASE, ...
    pub unit: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
