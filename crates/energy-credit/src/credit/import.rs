//! CSV snapshots of customer records, one row per customer and one column per raw field.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::domain::CustomerId;
use super::features::{RawCustomerRecord, RawValue};

/// Header naming the customer identifier column.
pub const CUSTOMER_ID_COLUMN: &str = "customer_id";

#[derive(Debug, thiserror::Error)]
pub enum CustomerImportError {
    #[error("failed to read customer export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid customer CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("customer export has no `customer_id` column")]
    MissingIdColumn,
    #[error("row {row} has an empty customer id")]
    MissingCustomerId { row: usize },
}

pub fn read_customer_records<R: Read>(
    reader: R,
) -> Result<Vec<RawCustomerRecord>, CustomerImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let id_column = headers
        .iter()
        .position(|header| header == CUSTOMER_ID_COLUMN)
        .ok_or(CustomerImportError::MissingIdColumn)?;

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let row_data = result?;
        let customer_id = row_data.get(id_column).unwrap_or_default();
        if customer_id.is_empty() {
            return Err(CustomerImportError::MissingCustomerId { row: row + 1 });
        }

        let mut record = RawCustomerRecord::new(CustomerId(customer_id.to_string()));
        for (column, (header, cell)) in headers.iter().zip(row_data.iter()).enumerate() {
            if column == id_column || cell.is_empty() {
                continue;
            }
            record.set(header, parse_cell(cell));
        }
        records.push(record);
    }

    Ok(records)
}

pub fn read_customer_records_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<RawCustomerRecord>, CustomerImportError> {
    let file = File::open(path)?;
    read_customer_records(file)
}

fn parse_cell(cell: &str) -> RawValue {
    match cell.parse::<f64>() {
        Ok(number) if number.is_finite() => RawValue::Number(number),
        _ => RawValue::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_numbers_text_and_blanks() {
        let csv = "customer_id,on_time_ratio,location_type,missed_payments_90d\n\
                   KE-1, 0.95 ,Rural,\n\
                   KE-2,0.4,urban,3\n";

        let records = read_customer_records(Cursor::new(csv)).expect("parses");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].customer_id, CustomerId::from("KE-1"));
        assert_eq!(
            records[0].fields.get("on_time_ratio"),
            Some(&RawValue::Number(0.95))
        );
        assert_eq!(
            records[0].fields.get("location_type"),
            Some(&RawValue::Text("Rural".to_string()))
        );
        assert!(!records[0].fields.contains_key("missed_payments_90d"));
        assert!(!records[0].fields.contains_key(CUSTOMER_ID_COLUMN));
        assert_eq!(
            records[1].fields.get("missed_payments_90d"),
            Some(&RawValue::Number(3.0))
        );
    }

    #[test]
    fn requires_customer_id_column() {
        let csv = "account,on_time_ratio\nKE-1,0.9\n";
        assert!(matches!(
            read_customer_records(Cursor::new(csv)),
            Err(CustomerImportError::MissingIdColumn)
        ));
    }

    #[test]
    fn rejects_blank_customer_id() {
        let csv = "customer_id,on_time_ratio\nKE-1,0.9\n,0.8\n";
        assert!(matches!(
            read_customer_records(Cursor::new(csv)),
            Err(CustomerImportError::MissingCustomerId { row: 2 })
        ));
    }
}
