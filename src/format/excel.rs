//! Excel workbook dataset format (read-only)
//!
//! Each sheet is a table: sheet name is the table name, the first row is the
//! header. `calamine` reads workbooks but does not write them, so Excel is a
//! read-only format here.

use std::path::PathBuf;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::Result;
use crate::model::{CellValue, Column, TableMetadata};
use crate::stream::{DataSetConsumer, DataSetProducer};

/// Streaming producer over an Excel workbook
pub struct ExcelProducer {
    path: PathBuf,
}

impl ExcelProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSetProducer for ExcelProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        let mut workbook = open_workbook_auto(&self.path)?;
        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

        consumer.start_dataset()?;
        for sheet_name in sheet_names {
            debug!(sheet = %sheet_name, "reading workbook sheet");
            let range = workbook.worksheet_range(&sheet_name)?;
            let mut rows = range.rows();

            let columns: Vec<Column> = match rows.next() {
                Some(header) => header
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let name = header_name(cell);
                        Column::untyped(if name.is_empty() {
                            format!("Column{}", i + 1)
                        } else {
                            name
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };

            let metadata = TableMetadata::new(sheet_name.clone(), columns);
            consumer.start_table(&metadata)?;
            for row in rows {
                let cells: Vec<CellValue> = row.iter().map(convert_cell).collect();
                consumer.row(cells)?;
            }
            consumer.end_table()?;
        }
        consumer.end_dataset()
    }
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => format!("{}", other),
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Null
            } else {
                CellValue::Str(s.clone())
            }
        }
        Data::Float(f) => {
            // Whole floats are integer cells in disguise
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                CellValue::Int(*f as i64)
            } else {
                CellValue::Float(*f)
            }
        }
        Data::Int(i) => CellValue::Int(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let s = format!("{}", dt);
            if let Ok(datetime) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f") {
                CellValue::DateTime(datetime)
            } else if let Ok(datetime) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f") {
                CellValue::DateTime(datetime)
            } else if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                CellValue::Date(date)
            } else {
                CellValue::Str(s)
            }
        }
        Data::DateTimeIso(s) => {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                CellValue::DateTime(dt)
            } else if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                CellValue::Date(d)
            } else {
                CellValue::Str(s.clone())
            }
        }
        Data::DurationIso(s) => CellValue::Str(s.clone()),
        Data::Error(e) => CellValue::Str(format!("#{:?}", e)),
    }
}
