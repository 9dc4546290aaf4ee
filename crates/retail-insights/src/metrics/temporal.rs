//! Daily, weekday and hourly aggregates.

use crate::error::Result;
use crate::types::{TemporalTables, columns};
use polars::prelude::*;

pub const ORDERS: &str = "Orders";
pub const ITEMS: &str = "Items";
pub const AVERAGE_REVENUE: &str = "AverageRevenue";

/// Revenue, distinct orders and items per calendar date.
pub fn daily(df: &DataFrame) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .with_column(col(columns::ORDER_DATE).cast(DataType::Date))
        .group_by([col(columns::ORDER_DATE)])
        .agg([
            col(columns::REVENUE).sum(),
            col(columns::INVOICE_NO).n_unique().alias(ORDERS),
            col(columns::QUANTITY).cast(DataType::Int64).sum().alias(ITEMS),
        ])
        .sort([columns::ORDER_DATE], SortMultipleOptions::default())
        .collect()?;
    Ok(out)
}

/// Total and mean line revenue per value of `key`, ordered by `key`.
fn revenue_by(df: &DataFrame, key: &str) -> Result<DataFrame> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(key)])
        .agg([
            col(columns::REVENUE).sum(),
            col(columns::REVENUE).mean().alias(AVERAGE_REVENUE),
        ])
        .sort([key], SortMultipleOptions::default())
        .collect()?;
    Ok(out)
}

/// Revenue per ISO weekday (Monday = 1).
pub fn weekday(df: &DataFrame) -> Result<DataFrame> {
    revenue_by(df, columns::WEEKDAY)
}

/// Revenue per hour of day.
pub fn hourly(df: &DataFrame) -> Result<DataFrame> {
    revenue_by(df, columns::HOUR)
}

pub fn temporal_tables(df: &DataFrame) -> Result<TemporalTables> {
    Ok(TemporalTables {
        daily: daily(df)?,
        weekday: weekday(df)?,
        hourly: hourly(df)?,
    })
}
