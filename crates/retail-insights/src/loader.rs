//! Loading of the raw retail transactions file.
//!
//! The file is read with a fixed schema. Invoice dates and unit prices are
//! kept as raw strings; the cleaner owns their parsing.

use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::columns;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Schema of the raw transactions file, in column order.
pub fn retail_schema() -> Schema {
    Schema::from_iter([
        Field::new(columns::INVOICE_NO.into(), DataType::String),
        Field::new(columns::STOCK_CODE.into(), DataType::String),
        Field::new(columns::DESCRIPTION.into(), DataType::String),
        Field::new(columns::QUANTITY.into(), DataType::Int32),
        Field::new(columns::INVOICE_DATE.into(), DataType::String),
        Field::new(columns::UNIT_PRICE.into(), DataType::String),
        Field::new(columns::CUSTOMER_ID.into(), DataType::Float64),
        Field::new(columns::COUNTRY.into(), DataType::String),
    ])
}

/// Read the header line and check it names the expected columns in order.
fn check_header(path: &Path) -> Result<()> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut header = String::new();
    reader.read_line(&mut header)?;

    let found: Vec<String> = header
        .trim_start_matches('\u{feff}')
        .trim_end_matches(['\r', '\n'])
        .split(',')
        .map(|name| name.trim().trim_matches('"').to_string())
        .collect();

    if found.len() != columns::RAW.len() || found.iter().zip(columns::RAW).any(|(f, e)| f != e) {
        return Err(AnalysisError::SchemaMismatch {
            expected: columns::RAW.iter().map(|c| c.to_string()).collect(),
            found,
        });
    }
    Ok(())
}

/// Load the raw transactions file into a typed table.
///
/// # Errors
///
/// - [`AnalysisError::FileNotFound`] if `path` does not exist.
/// - [`AnalysisError::SchemaMismatch`] if the header differs from [`columns::RAW`].
/// - A polars error (with context) if a value cannot be coerced to its column type.
pub fn load_retail_data(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnalysisError::FileNotFound(path.to_path_buf()));
    }

    check_header(path)?;
    debug!("Header of {} matches the retail schema", path.display());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema(Some(Arc::new(retail_schema())))
        .with_parse_options(CsvParseOptions::default().with_try_parse_dates(false))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Failed to open {}", path.display()))?
        .finish()
        .context(format!("Failed to load {}", path.display()))?;

    info!("Loaded {} rows and {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const HEADER: &str = "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n";

    #[test]
    fn test_schema_has_eight_columns() {
        let schema = retail_schema();
        assert_eq!(schema.len(), 8);
        assert_eq!(schema.get(columns::QUANTITY), Some(&DataType::Int32));
        assert_eq!(schema.get(columns::UNIT_PRICE), Some(&DataType::String));
        assert_eq!(schema.get(columns::CUSTOMER_ID), Some(&DataType::Float64));
    }

    #[test]
    fn test_load_keeps_raw_strings() {
        let file = write_csv(&format!(
            "{HEADER}536365,85123A,WHITE HANGING HEART,6,01/12/2010 08:26,\"2,55\",17850,United Kingdom\n\
             536366,22633,HAND WARMER,-2,01/12/2010 08:28:00,1.85,,France\n"
        ));

        let df = load_retail_data(file.path()).unwrap();
        assert_eq!(df.shape(), (2, 8));
        assert_eq!(df.column(columns::UNIT_PRICE).unwrap().dtype(), &DataType::String);
        assert_eq!(df.column(columns::INVOICE_DATE).unwrap().dtype(), &DataType::String);
        assert_eq!(df.column(columns::QUANTITY).unwrap().dtype(), &DataType::Int32);

        let prices = crate::utils::string_values(&df, columns::UNIT_PRICE).unwrap();
        assert_eq!(prices[0].as_deref(), Some("2,55"));
        assert_eq!(df.column(columns::CUSTOMER_ID).unwrap().null_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let result = load_retail_data("/definitely/not/here.csv");
        assert!(matches!(result, Err(AnalysisError::FileNotFound(_))));
    }

    #[test]
    fn test_schema_mismatch() {
        let file = write_csv("Invoice,StockCode\n1,2\n");
        let result = load_retail_data(file.path());
        assert!(matches!(result, Err(AnalysisError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_malformed_quantity_propagates() {
        let file = write_csv(&format!(
            "{HEADER}536365,85123A,HEART,six,01/12/2010 08:26,2.55,17850,United Kingdom\n"
        ));
        let result = load_retail_data(file.path());
        assert!(result.is_err());
    }
}
