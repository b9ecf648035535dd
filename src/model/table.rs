//! Table metadata and in-memory tables

use std::cell::OnceCell;

use rustc_hash::FxHashMap;

use super::column::Column;
use super::value::{CellValue, DataType};
use crate::error::{Result, TabError};

fn normalize(name: &str) -> String {
    name.to_uppercase()
}

/// Table metadata: name, ordered columns, declared key columns
#[derive(Debug, Clone)]
pub struct TableMetadata {
    name: String,
    columns: Vec<Column>,
    key_columns: Vec<String>,
    // Lazily built case-normalized column-name -> position cache
    index: OnceCell<FxHashMap<String, usize>>,
}

impl TableMetadata {
    /// Create metadata for a table
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            key_columns: Vec::new(),
            index: OnceCell::new(),
        }
    }

    /// Declare key columns by name (used by update/delete/refresh SQL)
    pub fn with_key_columns(mut self, key_columns: Vec<String>) -> Self {
        self.key_columns = key_columns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Ordered column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn index(&self) -> &FxHashMap<String, usize> {
        self.index.get_or_init(|| {
            self.columns
                .iter()
                .enumerate()
                .map(|(i, c)| (normalize(&c.name), i))
                .collect()
        })
    }

    /// Position of a column, looked up case-insensitively
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index()
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| TabError::no_such_column(&self.name, name))
    }

    /// Column descriptor, looked up case-insensitively
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index().contains_key(&normalize(name))
    }

    /// Positions of the declared key columns; `NoKeyColumns` when none are declared
    pub fn key_column_indices(&self) -> Result<Vec<usize>> {
        if self.key_columns.is_empty() {
            return Err(TabError::NoKeyColumns(self.name.clone()));
        }
        self.key_columns
            .iter()
            .map(|name| self.column_index(name))
            .collect()
    }

    pub(crate) fn set_column_type(&mut self, index: usize, data_type: DataType) {
        if let Some(col) = self.columns.get_mut(index) {
            col.data_type = data_type;
        }
    }
}

/// An in-memory table: metadata plus ordered rows, read-only once built
#[derive(Debug, Clone)]
pub struct MemTable {
    metadata: TableMetadata,
    rows: Vec<Vec<CellValue>>,
}

impl MemTable {
    /// Create an empty table
    pub fn new(metadata: TableMetadata) -> Self {
        Self {
            metadata,
            rows: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; short rows are padded with NULL, long rows truncated
    pub fn add_row(&mut self, mut cells: Vec<CellValue>) {
        let width = self.metadata.column_count();
        if cells.len() < width {
            cells.resize(width, CellValue::Null);
        } else {
            cells.truncate(width);
        }
        self.rows.push(cells);
    }

    /// Cell accessor by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Result<&CellValue> {
        let col = self.metadata.column_index(column)?;
        let cells = self.rows.get(row).ok_or_else(|| TabError::RowOutOfBounds {
            table: self.metadata.name().to_string(),
            row,
            count: self.rows.len(),
        })?;
        Ok(&cells[col])
    }

    /// Rows in insertion order
    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// A single row by index
    pub fn row(&self, row: usize) -> Result<&[CellValue]> {
        self.rows
            .get(row)
            .map(|r| r.as_slice())
            .ok_or_else(|| TabError::RowOutOfBounds {
                table: self.metadata.name().to_string(),
                row,
                count: self.rows.len(),
            })
    }

    /// Infer declared types for columns still marked Unknown by widening over
    /// the observed value kinds
    pub fn infer_column_types(&mut self) {
        for col_idx in 0..self.metadata.column_count() {
            if self.metadata.columns()[col_idx].data_type != DataType::Unknown {
                continue;
            }
            let mut inferred = DataType::Unknown;
            for row in &self.rows {
                if let Some(cell) = row.get(col_idx) {
                    inferred = inferred.widen(DataType::for_value(cell));
                }
            }
            self.metadata.set_column_type(col_idx, inferred);
        }
    }
}
