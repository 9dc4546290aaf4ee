//! Product-level and price-tier aggregates.

use crate::error::Result;
use crate::types::columns;
use polars::prelude::*;

pub const TOTAL_REVENUE: &str = "TotalRevenue";
pub const TOTAL_QUANTITY: &str = "TotalQuantity";
pub const NUMBER_ORDERS: &str = "NumberOrders";
pub const AVERAGE_PRICE: &str = "AveragePrice";
pub const NUMBER_PRODUCTS: &str = "NumberProducts";

/// Revenue, quantity, distinct orders and mean price per
/// (StockCode, Description, PriceCategory), highest revenue first.
///
/// Equal revenues are ordered by the grouping key ascending.
pub fn top_products(df: &DataFrame, limit: Option<usize>) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .group_by([
            col(columns::STOCK_CODE),
            col(columns::DESCRIPTION),
            col(columns::PRICE_CATEGORY),
        ])
        .agg([
            col(columns::REVENUE).sum().alias(TOTAL_REVENUE),
            col(columns::QUANTITY)
                .cast(DataType::Int64)
                .sum()
                .alias(TOTAL_QUANTITY),
            col(columns::INVOICE_NO).n_unique().alias(NUMBER_ORDERS),
            col(columns::UNIT_PRICE).mean().alias(AVERAGE_PRICE),
        ])
        .sort(
            [
                TOTAL_REVENUE,
                columns::STOCK_CODE,
                columns::DESCRIPTION,
                columns::PRICE_CATEGORY,
            ],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false, false, false])
                .with_nulls_last(true),
        )
        .select([
            col(columns::STOCK_CODE),
            col(columns::DESCRIPTION),
            col(columns::PRICE_CATEGORY),
            col(TOTAL_REVENUE),
            col(TOTAL_QUANTITY),
            col(NUMBER_ORDERS),
            col(AVERAGE_PRICE),
        ])
        .collect()?;

    Ok(match limit {
        Some(n) => out.head(Some(n)),
        None => out,
    })
}

/// The same aggregates at price-tier granularity, highest revenue first.
pub fn price_analysis(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(columns::PRICE_CATEGORY)])
        .agg([
            col(columns::REVENUE).sum().alias(TOTAL_REVENUE),
            col(columns::UNIT_PRICE).mean().alias(AVERAGE_PRICE),
            col(columns::STOCK_CODE).n_unique().alias(NUMBER_PRODUCTS),
            col(columns::QUANTITY)
                .cast(DataType::Int64)
                .sum()
                .alias(TOTAL_QUANTITY),
            col(columns::INVOICE_NO).n_unique().alias(NUMBER_ORDERS),
        ])
        .sort(
            [TOTAL_REVENUE, columns::PRICE_CATEGORY],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{f64_values, i64_values, string_values};
    use pretty_assertions::assert_eq;

    fn cleaned() -> DataFrame {
        df![
            "InvoiceNo" => ["1", "1", "2", "3", "3"],
            "StockCode" => ["A", "B", "A", "C", "B"],
            "Description" => ["Mug", "Lamp", "Mug", "Vase", "Lamp"],
            "Quantity" => [2i32, 1, 4, 1, 1],
            "UnitPrice" => [1.0f64, 10.0, 1.0, 5.0, 10.0],
            "PriceCategory" => ["low", "premium", "low", "medium", "premium"],
            "Revenue" => [2.0f64, 10.0, 4.0, 5.0, 10.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_top_products_sorted_by_revenue() {
        let out = top_products(&cleaned(), None).unwrap();
        assert_eq!(
            out.get_column_names_str(),
            vec![
                "StockCode",
                "Description",
                "PriceCategory",
                "TotalRevenue",
                "TotalQuantity",
                "NumberOrders",
                "AveragePrice"
            ]
        );
        assert_eq!(
            string_values(&out, "StockCode").unwrap(),
            vec![Some("B".to_string()), Some("A".to_string()), Some("C".to_string())]
        );
        assert_eq!(f64_values(&out, "TotalRevenue").unwrap(), vec![Some(20.0), Some(6.0), Some(5.0)]);
        assert_eq!(i64_values(&out, "TotalQuantity").unwrap(), vec![Some(2), Some(6), Some(1)]);
        assert_eq!(i64_values(&out, "NumberOrders").unwrap(), vec![Some(2), Some(2), Some(1)]);
    }

    #[test]
    fn test_top_products_ties_broken_by_stock_code() {
        let df = df![
            "InvoiceNo" => ["1", "2"],
            "StockCode" => ["Z", "M"],
            "Description" => ["Zed", "Em"],
            "Quantity" => [1i32, 1],
            "UnitPrice" => [3.0f64, 3.0],
            "PriceCategory" => ["low", "low"],
            "Revenue" => [3.0f64, 3.0],
        ]
        .unwrap();
        let out = top_products(&df, None).unwrap();
        assert_eq!(
            string_values(&out, "StockCode").unwrap(),
            vec![Some("M".to_string()), Some("Z".to_string())]
        );
    }

    #[test]
    fn test_top_products_limit() {
        let out = top_products(&cleaned(), Some(1)).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_price_analysis() {
        let out = price_analysis(&cleaned()).unwrap();
        assert_eq!(
            out.get_column_names_str(),
            vec![
                "PriceCategory",
                "TotalRevenue",
                "AveragePrice",
                "NumberProducts",
                "TotalQuantity",
                "NumberOrders"
            ]
        );
        assert_eq!(
            string_values(&out, "PriceCategory").unwrap(),
            vec![
                Some("premium".to_string()),
                Some("low".to_string()),
                Some("medium".to_string())
            ]
        );
        assert_eq!(i64_values(&out, "NumberProducts").unwrap(), vec![Some(1), Some(1), Some(1)]);
        assert_eq!(f64_values(&out, "AveragePrice").unwrap()[0], Some(10.0));
    }
}
