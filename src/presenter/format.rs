use crate::aggregator::ListSummary;
use crate::domain::Product;

/// Currency amount with two decimals, e.g. `R$ 11.00`.
pub fn format_money(value: f64) -> String {
    format!("R$ {value:.2}")
}

/// Label and value rows of the summary panel, top to bottom.
pub fn summary_lines(summary: &ListSummary) -> Vec<(&'static str, String)> {
    vec![
        ("Total products", summary.total_count.to_string()),
        ("Purchased products", summary.purchased_count.to_string()),
        ("Total value", format_money(summary.total_value)),
        ("Spent so far", format_money(summary.purchased_value)),
        ("Left to buy", format_money(summary.remaining_value)),
    ]
}

/// One list row: checkbox, name, quantity and unit price, line total.
pub fn product_line(product: &Product) -> String {
    format!(
        "[{}] {}  Qty: {} - Unit: {}  Total {}",
        if product.purchased { "x" } else { " " },
        product.name,
        product.quantity,
        format_money(product.unit_price),
        format_money(product.line_total()),
    )
}
