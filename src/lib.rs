//! tabunit - dataset fixtures and table assertions for database testing
//!
//! Loads tabular fixture datasets from XML, flat-XML, DTD, CSV, Excel and
//! YAML sources, compares datasets cell by cell with pluggable comparators,
//! and renders set-up/tear-down operations (insert, clean-insert, refresh,
//! ...) as SQL statement batches.

pub mod assertion;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod ops;
pub mod report;
pub mod stream;

pub use config::CompareConfig;
pub use error::{Result, TabError};
pub use model::{CellValue, Column, DataSet, DataType, MemTable, TableMetadata};
