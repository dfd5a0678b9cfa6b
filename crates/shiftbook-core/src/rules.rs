//! # Derived-Field Rules
//!
//! Every computed column on a stage record is produced here, and only here.
//! The workflow and the stores never do their own arithmetic.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stockroom     transferred_out = opening + received − closing          │
//! │                (may be negative)                                        │
//! │                                                                         │
//! │  Distribution  unallocated = quantity_from_stockroom − total_allocated │
//! │                status: ALLOCATED when unallocated = 0 and allocated > 0 │
//! │                        PENDING_ALLOCATION when allocated = 0            │
//! │                        otherwise unchanged                              │
//! │                                                                         │
//! │  Well          consumed = max(0, opening + received − closing)         │
//! │                                                                         │
//! │  Sales         revenue = qty × selling, cost = qty × cost              │
//! │                profit  = revenue − cost                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{
    DistributionRecord, DistributionStatus, PriceEntry, SalesRecord, StockroomCount,
    StockroomRecord, WellCount, WellRecord,
};
use crate::validation::ValidationResult;

/// Generates a new record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Formulas
// =============================================================================

/// Stock that left the stockroom during the shift.
#[inline]
pub fn compute_transferred_out(opening: Quantity, received: Quantity, closing: Quantity) -> Quantity {
    opening + received - closing
}

/// Stock poured at a well. Never negative.
#[inline]
pub fn compute_consumed(opening: Quantity, received: Quantity, closing: Quantity) -> Quantity {
    (opening + received - closing).clamp_non_negative()
}

/// Recomputes `unallocated` and applies the status rule.
///
/// Call after every change to `quantity_from_stockroom` or `total_allocated`.
pub fn compute_unallocated(record: &mut DistributionRecord) {
    record.unallocated = record.quantity_from_stockroom - record.total_allocated;

    if record.unallocated.is_zero() && record.total_allocated.is_positive() {
        record.status = DistributionStatus::Allocated;
    } else if record.total_allocated.is_zero() {
        record.status = DistributionStatus::PendingAllocation;
    }
}

/// Fills revenue, cost and profit from quantity and unit prices.
///
/// ## Errors
/// `Overflow` if an amount does not fit in cents.
pub fn compute_sales_totals(record: &mut SalesRecord) -> ValidationResult<()> {
    let overflow = |field: &str| ValidationError::Overflow {
        field: field.to_string(),
    };

    record.total_revenue = record
        .selling_price_per_unit
        .checked_extend(record.quantity_sold)
        .ok_or_else(|| overflow("total_revenue"))?;
    record.total_cost = record
        .cost_price_per_unit
        .checked_extend(record.quantity_sold)
        .ok_or_else(|| overflow("total_cost"))?;
    record.profit = record
        .total_revenue
        .checked_sub(record.total_cost)
        .ok_or_else(|| overflow("profit"))?;
    Ok(())
}

// =============================================================================
// Record Builders
// =============================================================================

impl StockroomRecord {
    /// Builds a record from a caller's count.
    pub fn from_count(session_id: &str, count: StockroomCount) -> Self {
        let transferred_out =
            compute_transferred_out(count.opening_stock, count.received_stock, count.closing_stock);
        Self {
            id: new_id(),
            session_id: session_id.to_string(),
            product_id: count.product_id,
            opening_stock: count.opening_stock,
            received_stock: count.received_stock,
            closing_stock: count.closing_stock,
            transferred_out,
            remarks: count.remarks,
        }
    }
}

impl DistributionRecord {
    /// Creates a pending distribution for stock the stockroom handed out.
    pub fn pending(session_id: &str, product_id: &str, quantity: Quantity) -> Self {
        let mut record = Self {
            id: new_id(),
            session_id: session_id.to_string(),
            product_id: product_id.to_string(),
            quantity_from_stockroom: quantity,
            total_allocated: Quantity::zero(),
            unallocated: quantity,
            status: DistributionStatus::PendingAllocation,
            notes: None,
        };
        compute_unallocated(&mut record);
        record
    }

    /// Sets a new stockroom quantity and clears any allocation.
    pub fn refresh(&mut self, quantity: Quantity) {
        self.quantity_from_stockroom = quantity;
        self.reset_allocation();
    }

    /// Zeroes the allocation ahead of a full recompute from the wells.
    pub fn reset_allocation(&mut self) {
        self.total_allocated = Quantity::zero();
        compute_unallocated(self);
    }

    /// Adds stock a well received.
    pub fn allocate(&mut self, quantity: Quantity) {
        self.total_allocated += quantity;
        compute_unallocated(self);
    }
}

impl WellRecord {
    /// Builds a record from a caller's count.
    pub fn from_count(session_id: &str, count: WellCount) -> Self {
        let consumed = compute_consumed(
            count.opening_stock,
            count.received_from_distribution,
            count.closing_stock,
        );
        Self {
            id: new_id(),
            session_id: session_id.to_string(),
            product_id: count.product_id,
            well_name: count.well_name,
            opening_stock: count.opening_stock,
            received_from_distribution: count.received_from_distribution,
            closing_stock: count.closing_stock,
            consumed,
            remarks: count.remarks,
        }
    }
}

impl SalesRecord {
    /// Prices a product's total consumption. A missing cost price counts as zero.
    pub fn priced(
        session_id: &str,
        product_id: &str,
        quantity_sold: Quantity,
        price: &PriceEntry,
    ) -> ValidationResult<Self> {
        let mut record = Self {
            id: new_id(),
            session_id: session_id.to_string(),
            product_id: product_id.to_string(),
            quantity_sold,
            selling_price_per_unit: price.selling_price,
            total_revenue: Money::zero(),
            cost_price_per_unit: price.cost_price.unwrap_or_default(),
            total_cost: Money::zero(),
            profit: Money::zero(),
        };
        compute_sales_totals(&mut record)?;
        Ok(record)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WellName;

    fn q(units: i64) -> Quantity {
        Quantity::from_units(units)
    }

    #[test]
    fn test_transferred_out_may_be_negative() {
        assert_eq!(compute_transferred_out(q(10), q(5), q(3)), q(12));
        assert_eq!(compute_transferred_out(q(1), q(0), q(4)), q(-3));
    }

    #[test]
    fn test_consumed_clamps_at_zero() {
        assert_eq!(compute_consumed(q(0), q(7), q(2)), q(5));
        assert_eq!(compute_consumed(q(1), q(0), q(4)), q(0));
    }

    #[test]
    fn test_distribution_status_transitions() {
        let mut dist = DistributionRecord::pending("s", "P1", q(12));
        assert_eq!(dist.unallocated, q(12));
        assert_eq!(dist.status, DistributionStatus::PendingAllocation);

        dist.allocate(q(7));
        assert_eq!(dist.unallocated, q(5));
        assert_eq!(dist.status, DistributionStatus::PendingAllocation);

        dist.allocate(q(5));
        assert_eq!(dist.unallocated, q(0));
        assert_eq!(dist.status, DistributionStatus::Allocated);
    }

    #[test]
    fn test_partial_allocation_keeps_previous_status() {
        let mut dist = DistributionRecord::pending("s", "P1", q(12));
        dist.allocate(q(12));
        assert_eq!(dist.status, DistributionStatus::Allocated);

        // Quantity grows underneath a full allocation: neither branch applies
        dist.quantity_from_stockroom = q(14);
        compute_unallocated(&mut dist);
        assert_eq!(dist.unallocated, q(2));
        assert_eq!(dist.status, DistributionStatus::Allocated);
    }

    #[test]
    fn test_over_allocation_goes_negative() {
        let mut dist = DistributionRecord::pending("s", "P1", q(10));
        dist.allocate(q(12));
        assert_eq!(dist.unallocated, q(-2));
        assert_eq!(dist.status, DistributionStatus::PendingAllocation);
    }

    #[test]
    fn test_refresh_resets_to_pending() {
        let mut dist = DistributionRecord::pending("s", "P1", q(10));
        dist.allocate(q(10));
        dist.refresh(q(8));
        assert_eq!(dist.total_allocated, q(0));
        assert_eq!(dist.unallocated, q(8));
        assert_eq!(dist.status, DistributionStatus::PendingAllocation);
    }

    #[test]
    fn test_well_from_count() {
        let record = WellRecord::from_count(
            "s",
            WellCount {
                product_id: "P1".to_string(),
                well_name: WellName::Bar2,
                opening_stock: q(0),
                received_from_distribution: q(5),
                closing_stock: q(2),
                remarks: None,
            },
        );
        assert_eq!(record.consumed, q(3));
        assert_eq!(record.session_id, "s");
    }

    #[test]
    fn test_sales_totals() {
        let price = PriceEntry {
            bar_id: "B".to_string(),
            product_id: "P1".to_string(),
            selling_price: Money::from_cents(900),
            cost_price: Some(Money::from_cents(500)),
            active: true,
        };
        let sale = SalesRecord::priced("s", "P1", q(10), &price).unwrap();
        assert_eq!(sale.total_revenue, Money::from_cents(9000));
        assert_eq!(sale.total_cost, Money::from_cents(5000));
        assert_eq!(sale.profit, Money::from_cents(4000));
    }

    #[test]
    fn test_sales_without_cost_price() {
        let price = PriceEntry {
            bar_id: "B".to_string(),
            product_id: "P1".to_string(),
            selling_price: Money::from_cents(250),
            cost_price: None,
            active: true,
        };
        let sale = SalesRecord::priced("s", "P1", Quantity::from_hundredths(150), &price).unwrap();
        assert_eq!(sale.total_revenue, Money::from_cents(375));
        assert_eq!(sale.total_cost, Money::zero());
        assert_eq!(sale.profit, Money::from_cents(375));
    }

    #[test]
    fn test_sales_overflow_is_an_error() {
        let price = PriceEntry {
            bar_id: "B".to_string(),
            product_id: "P1".to_string(),
            selling_price: Money::from_cents(i64::MAX),
            cost_price: None,
            active: true,
        };
        assert!(matches!(
            SalesRecord::priced("s", "P1", q(2), &price),
            Err(ValidationError::Overflow { ref field }) if field == "total_revenue"
        ));
    }
}
