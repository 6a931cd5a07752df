//! Totals derived from the current product list.
//!
//! Sums keep full `f64` precision; rounding to cents happens only when a
//! value is formatted for display.

use crate::domain::Product;

pub fn total_count(items: &[Product]) -> usize {
    items.len()
}

pub fn purchased_count(items: &[Product]) -> usize {
    items.iter().filter(|p| p.purchased).count()
}

pub fn total_value(items: &[Product]) -> f64 {
    items.iter().map(Product::line_total).sum()
}

pub fn purchased_value(items: &[Product]) -> f64 {
    items
        .iter()
        .filter(|p| p.purchased)
        .map(Product::line_total)
        .sum()
}

pub fn remaining_value(items: &[Product]) -> f64 {
    total_value(items) - purchased_value(items)
}

/// Everything the summary panel shows, computed in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListSummary {
    pub total_count: usize,
    pub purchased_count: usize,
    pub total_value: f64,
    pub purchased_value: f64,
    pub remaining_value: f64,
}

impl ListSummary {
    pub fn from_products(items: &[Product]) -> Self {
        let mut summary = Self::default();
        for product in items {
            let line = product.line_total();
            summary.total_count += 1;
            summary.total_value += line;
            if product.purchased {
                summary.purchased_count += 1;
                summary.purchased_value += line;
            }
        }
        summary.remaining_value = summary.total_value - summary.purchased_value;
        summary
    }
}
