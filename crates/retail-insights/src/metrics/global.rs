//! Global scalar KPIs.

use crate::error::Result;
use crate::types::{GlobalKpis, columns};
use crate::utils::{f64_values, require_column};
use polars::prelude::*;

const ORDER_REVENUE: &str = "OrderRevenue";
const ORDER_ITEMS: &str = "OrderItems";

/// Compute the global KPIs of a cleaned table.
///
/// Average order value and average items per order are means over
/// per-invoice totals, not over lines.
pub fn compute_global_kpis(df: &DataFrame) -> Result<GlobalKpis> {
    let total_revenue: f64 = f64_values(df, columns::REVENUE)?.into_iter().flatten().sum();

    let per_invoice = df
        .clone()
        .lazy()
        .group_by([col(columns::INVOICE_NO)])
        .agg([
            col(columns::REVENUE).sum().alias(ORDER_REVENUE),
            col(columns::QUANTITY)
                .cast(DataType::Int64)
                .sum()
                .alias(ORDER_ITEMS),
        ])
        .collect()?;

    let order_revenue: Vec<f64> = f64_values(&per_invoice, ORDER_REVENUE)?
        .into_iter()
        .flatten()
        .collect();
    let order_items: Vec<f64> = f64_values(&per_invoice, ORDER_ITEMS)?
        .into_iter()
        .flatten()
        .collect();

    Ok(GlobalKpis {
        total_revenue,
        total_orders: require_column(df, columns::INVOICE_NO)?.n_unique()?,
        total_customers: require_column(df, columns::CUSTOMER_ID)?.n_unique()?,
        total_products: require_column(df, columns::STOCK_CODE)?.n_unique()?,
        average_order_value: mean(&order_revenue),
        average_items_per_order: mean(&order_items),
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
