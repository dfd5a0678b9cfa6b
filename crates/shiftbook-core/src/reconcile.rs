//! # Reconciliation Engine
//!
//! The pure half of commit: conservation checks and sales generation.
//! Nothing here reads a store; the workflow loads the stage records and the
//! prices, then hands them in.
//!
//! ## Commit Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stockroom ─┐                                                           │
//! │  distrib.  ─┼─► (1) stockroom → distribution                            │
//! │  wells     ─┘   (2) distribution → wells                                │
//! │                 (3) nothing unallocated                                 │
//! │                      │ first failure stops here                         │
//! │                      ▼                                                  │
//! │                 consumption_by_product(wells)                           │
//! │                      │                                                  │
//! │                      ▼  prices for every product with consumption > 0   │
//! │                 generate_sales(...) ──► Vec<SalesRecord>                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products are walked in id order so the first reported failure is
//! deterministic no matter what order the store returns rows in.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ConservationError, CoreError, CoreResult};
use crate::quantity::Quantity;
use crate::types::{DistributionRecord, PriceEntry, SalesRecord, StockroomRecord, WellRecord};

/// Which well column to total across wells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellField {
    OpeningStock,
    ReceivedFromDistribution,
    ClosingStock,
    Consumed,
}

impl WellField {
    /// Backing column name.
    pub fn column(&self) -> &'static str {
        match self {
            WellField::OpeningStock => "opening_stock",
            WellField::ReceivedFromDistribution => "received_from_distribution",
            WellField::ClosingStock => "closing_stock",
            WellField::Consumed => "consumed",
        }
    }

    /// Reads this field off a record.
    pub fn value(&self, well: &WellRecord) -> Quantity {
        match self {
            WellField::OpeningStock => well.opening_stock,
            WellField::ReceivedFromDistribution => well.received_from_distribution,
            WellField::ClosingStock => well.closing_stock,
            WellField::Consumed => well.consumed,
        }
    }
}

/// Totals one field for one product across all wells. Zero when no wells match.
pub fn sum_across_wells(wells: &[WellRecord], product_id: &str, field: WellField) -> Quantity {
    wells
        .iter()
        .filter(|w| w.product_id == product_id)
        .map(|w| field.value(w))
        .sum()
}

// =============================================================================
// Conservation Checks
// =============================================================================

/// Check 1: every transfer out of the stockroom has a matching distribution.
///
/// Records with nothing transferred are skipped.
pub fn check_stockroom_to_distribution(
    stockroom: &[StockroomRecord],
    distribution: &[DistributionRecord],
) -> Result<(), ConservationError> {
    let by_product: HashMap<&str, &DistributionRecord> = distribution
        .iter()
        .map(|d| (d.product_id.as_str(), d))
        .collect();

    let mut transfers: Vec<&StockroomRecord> = stockroom
        .iter()
        .filter(|s| s.transferred_out.is_positive())
        .collect();
    transfers.sort_by(|a, b| a.product_id.cmp(&b.product_id));

    for record in transfers {
        match by_product.get(record.product_id.as_str()) {
            None => {
                return Err(ConservationError::MissingDistribution {
                    product_id: record.product_id.clone(),
                    transferred: record.transferred_out,
                })
            }
            Some(dist) if dist.quantity_from_stockroom != record.transferred_out => {
                return Err(ConservationError::StockroomMismatch {
                    product_id: record.product_id.clone(),
                    transferred: record.transferred_out,
                    distributed: dist.quantity_from_stockroom,
                })
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Check 2: what each distribution allocated is what the wells received.
pub fn check_distribution_to_wells(
    distribution: &[DistributionRecord],
    wells: &[WellRecord],
) -> Result<(), ConservationError> {
    for dist in sorted_by_product(distribution) {
        let received =
            sum_across_wells(wells, &dist.product_id, WellField::ReceivedFromDistribution);
        if received != dist.total_allocated {
            return Err(ConservationError::WellsMismatch {
                product_id: dist.product_id.clone(),
                allocated: dist.total_allocated,
                received,
            });
        }
    }
    Ok(())
}

/// Check 3: no distribution has stock left over, or allocated more than it had.
pub fn check_fully_allocated(distribution: &[DistributionRecord]) -> Result<(), ConservationError> {
    for dist in sorted_by_product(distribution) {
        if !dist.unallocated.is_zero() {
            return Err(ConservationError::Unallocated {
                product_id: dist.product_id.clone(),
                unallocated: dist.unallocated,
            });
        }
    }
    Ok(())
}

/// Runs the three checks in order and stops at the first failure.
pub fn check_conservation(
    stockroom: &[StockroomRecord],
    distribution: &[DistributionRecord],
    wells: &[WellRecord],
) -> Result<(), ConservationError> {
    check_stockroom_to_distribution(stockroom, distribution)?;
    check_distribution_to_wells(distribution, wells)?;
    check_fully_allocated(distribution)?;
    Ok(())
}

fn sorted_by_product(distribution: &[DistributionRecord]) -> Vec<&DistributionRecord> {
    let mut sorted: Vec<&DistributionRecord> = distribution.iter().collect();
    sorted.sort_by(|a, b| a.product_id.cmp(&b.product_id));
    sorted
}

// =============================================================================
// Sales Generation
// =============================================================================

/// Total consumption per product across every well.
pub fn consumption_by_product(wells: &[WellRecord]) -> BTreeMap<String, Quantity> {
    let mut totals = BTreeMap::new();
    for well in wells {
        *totals
            .entry(well.product_id.clone())
            .or_insert_with(Quantity::zero) += well.consumed;
    }
    totals
}

/// Products that need a price before sales can be generated.
pub fn products_to_price(consumption: &BTreeMap<String, Quantity>) -> Vec<&str> {
    consumption
        .iter()
        .filter(|(_, qty)| qty.is_positive())
        .map(|(product, _)| product.as_str())
        .collect()
}

/// One sales record per product with positive consumption.
///
/// ## Errors
/// `PricingMissing` if `prices` lacks a product that was consumed.
pub fn generate_sales(
    session_id: &str,
    bar_id: &str,
    consumption: &BTreeMap<String, Quantity>,
    prices: &HashMap<String, PriceEntry>,
) -> CoreResult<Vec<SalesRecord>> {
    products_to_price(consumption)
        .into_iter()
        .map(|product_id| {
            let price = prices
                .get(product_id)
                .ok_or_else(|| CoreError::PricingMissing {
                    product_id: product_id.to_string(),
                    bar_id: bar_id.to_string(),
                })?;
            Ok(SalesRecord::priced(
                session_id,
                product_id,
                consumption[product_id],
                price,
            )?)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{StockroomCount, WellCount, WellName};

    fn q(units: i64) -> Quantity {
        Quantity::from_units(units)
    }

    fn stock(product: &str, opening: i64, received: i64, closing: i64) -> StockroomRecord {
        StockroomRecord::from_count(
            "s",
            StockroomCount {
                product_id: product.to_string(),
                opening_stock: q(opening),
                received_stock: q(received),
                closing_stock: q(closing),
                remarks: None,
            },
        )
    }

    fn well(product: &str, name: WellName, opening: i64, received: i64, closing: i64) -> WellRecord {
        WellRecord::from_count(
            "s",
            WellCount {
                product_id: product.to_string(),
                well_name: name,
                opening_stock: q(opening),
                received_from_distribution: q(received),
                closing_stock: q(closing),
                remarks: None,
            },
        )
    }

    fn allocated(product: &str, quantity: i64, allocations: &[i64]) -> DistributionRecord {
        let mut dist = DistributionRecord::pending("s", product, q(quantity));
        for a in allocations {
            dist.allocate(q(*a));
        }
        dist
    }

    fn price(product: &str, selling: i64, cost: i64) -> (String, PriceEntry) {
        (
            product.to_string(),
            PriceEntry {
                bar_id: "B".to_string(),
                product_id: product.to_string(),
                selling_price: Money::from_cents(selling),
                cost_price: Some(Money::from_cents(cost)),
                active: true,
            },
        )
    }

    #[test]
    fn test_balanced_shift_passes() {
        let stockroom = vec![stock("P1", 10, 5, 3)];
        let distribution = vec![allocated("P1", 12, &[7, 5])];
        let wells = vec![
            well("P1", WellName::Bar1, 0, 7, 2),
            well("P1", WellName::Bar2, 0, 5, 0),
        ];
        assert_eq!(check_conservation(&stockroom, &distribution, &wells), Ok(()));
    }

    #[test]
    fn test_missing_distribution() {
        let err = check_stockroom_to_distribution(&[stock("P1", 10, 0, 4)], &[]).unwrap_err();
        assert!(matches!(err, ConservationError::MissingDistribution { .. }));
    }

    #[test]
    fn test_zero_or_negative_transfer_needs_no_distribution() {
        let stockroom = vec![stock("P1", 4, 0, 4), stock("P2", 1, 0, 5)];
        assert_eq!(check_stockroom_to_distribution(&stockroom, &[]), Ok(()));
    }

    #[test]
    fn test_stockroom_mismatch_reports_both_sides() {
        let err = check_stockroom_to_distribution(
            &[stock("P1", 10, 5, 3)],
            &[allocated("P1", 10, &[])],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConservationError::StockroomMismatch {
                product_id: "P1".to_string(),
                transferred: q(12),
                distributed: q(10),
            }
        );
    }

    #[test]
    fn test_wells_mismatch() {
        let distribution = vec![allocated("P1", 12, &[12])];
        let wells = vec![well("P1", WellName::Bar1, 0, 10, 0)];
        let err = check_distribution_to_wells(&distribution, &wells).unwrap_err();
        assert!(matches!(err, ConservationError::WellsMismatch { received, .. } if received == q(10)));
    }

    #[test]
    fn test_unallocated_positive_and_negative_both_fail() {
        assert!(check_fully_allocated(&[allocated("P1", 12, &[10])]).is_err());
        let err = check_fully_allocated(&[allocated("P1", 10, &[12])]).unwrap_err();
        assert!(matches!(err, ConservationError::Unallocated { unallocated, .. } if unallocated == q(-2)));
    }

    #[test]
    fn test_first_failure_is_lowest_product_id() {
        let distribution = vec![allocated("P2", 5, &[1]), allocated("P1", 5, &[2])];
        let err = check_fully_allocated(&distribution).unwrap_err();
        assert_eq!(err.product_id(), "P1");
    }

    #[test]
    fn test_sum_across_wells_defaults_to_zero() {
        let wells = vec![well("P1", WellName::Bar1, 0, 7, 2)];
        assert_eq!(sum_across_wells(&wells, "P9", WellField::Consumed), q(0));
        assert_eq!(sum_across_wells(&wells, "P1", WellField::Consumed), q(5));
    }

    #[test]
    fn test_generate_sales_aggregates_wells() {
        let wells = vec![
            well("P1", WellName::Bar1, 0, 7, 2),
            well("P1", WellName::Bar2, 0, 5, 0),
            well("P2", WellName::ServiceBar, 3, 0, 3),
        ];
        let consumption = consumption_by_product(&wells);
        assert_eq!(consumption["P1"], q(10));
        assert_eq!(products_to_price(&consumption), vec!["P1"]);

        // P2 consumed nothing, so it needs no price
        let prices: HashMap<_, _> = [price("P1", 900, 500)].into_iter().collect();
        let sales = generate_sales("s", "B", &consumption, &prices).unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].quantity_sold, q(10));
        assert_eq!(sales[0].total_revenue, Money::from_cents(9000));
        assert_eq!(sales[0].profit, Money::from_cents(4000));
    }

    #[test]
    fn test_generate_sales_missing_price() {
        let consumption = consumption_by_product(&[well("P1", WellName::Bar1, 0, 7, 2)]);
        let err = generate_sales("s", "B", &consumption, &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::PricingMissing { ref product_id, .. } if product_id == "P1"));
    }
}
