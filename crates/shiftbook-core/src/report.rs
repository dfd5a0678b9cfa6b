//! # Sales Reports
//!
//! Aggregates over committed sales records. The database layer selects which
//! records (by session, bar, date range); this module adds them up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::SalesRecord;

/// Totals over a set of sales records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub record_count: u32,
    pub quantity_sold: Quantity,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub profit: Money,
}

impl SalesSummary {
    /// Adds one record to the totals.
    pub fn add(&mut self, record: &SalesRecord) {
        self.record_count += 1;
        self.quantity_sold += record.quantity_sold;
        self.total_revenue += record.total_revenue;
        self.total_cost += record.total_cost;
        self.profit += record.profit;
    }

    pub fn from_records(records: &[SalesRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add(record);
        }
        summary
    }
}

/// Totals for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSummary {
    pub product_id: String,
    pub summary: SalesSummary,
}

/// Per-product totals, ordered by product id.
pub fn summarize_by_product(records: &[SalesRecord]) -> Vec<ProductSummary> {
    let mut by_product: BTreeMap<&str, SalesSummary> = BTreeMap::new();
    for record in records {
        by_product
            .entry(record.product_id.as_str())
            .or_default()
            .add(record);
    }
    by_product
        .into_iter()
        .map(|(product_id, summary)| ProductSummary {
            product_id: product_id.to_string(),
            summary,
        })
        .collect()
}

/// Overall totals plus the per-product breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub totals: SalesSummary,
    pub products: Vec<ProductSummary>,
}

impl SalesReport {
    pub fn from_records(records: &[SalesRecord]) -> Self {
        Self {
            totals: SalesSummary::from_records(records),
            products: summarize_by_product(records),
        }
    }
}
