//! Table and dataset comparison engine

mod comparator;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;

use crate::config::CompareConfig;
use crate::error::{Result, TabError};
use crate::model::{CellValue, DataSet, MemTable};

pub use comparator::{ToleranceComparator, TypedComparator, ValueComparator};

/// A single comparison failure, carrying full table/column/row context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// Expected table absent from the actual dataset
    TableMissing { table: String },
    /// Actual dataset has a table the expected one does not
    TableUnexpected { table: String },
    /// Column sets differ (order-independent, after exclusions)
    ColumnsMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// Row counts differ
    RowCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
    /// A cell value differs
    CellMismatch {
        table: String,
        column: String,
        row: usize,
        expected: CellValue,
        actual: CellValue,
    },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::TableMissing { table } => {
                write!(f, "table {table} is missing from the actual dataset")
            }
            Mismatch::TableUnexpected { table } => {
                write!(f, "unexpected table {table} in the actual dataset")
            }
            Mismatch::ColumnsMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "column mismatch in table {table}: expected [{}], actual [{}]",
                expected.join(", "),
                actual.join(", ")
            ),
            Mismatch::RowCountMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "row count mismatch in table {table}: expected {expected}, actual {actual}"
            ),
            Mismatch::CellMismatch {
                table,
                column,
                row,
                expected,
                actual,
            } => write!(
                f,
                "value mismatch in table {table}, column {column}, row {row}: expected {}, actual {}",
                expected.display(),
                actual.display()
            ),
        }
    }
}

/// Receives comparison failures; the handler decides whether comparison
/// continues
pub trait FailureHandler {
    fn failure(&mut self, mismatch: Mismatch) -> Result<()>;
}

/// Default handler: the first mismatch aborts the comparison as an error
#[derive(Debug, Default)]
pub struct FailFast;

impl FailureHandler for FailFast {
    fn failure(&mut self, mismatch: Mismatch) -> Result<()> {
        Err(TabError::Assertion(mismatch))
    }
}

/// Handler that records every mismatch and lets comparison run to the end
#[derive(Debug, Default)]
pub struct CollectingHandler {
    mismatches: Vec<Mismatch>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    pub fn into_mismatches(self) -> Vec<Mismatch> {
        self.mismatches
    }
}

impl FailureHandler for CollectingHandler {
    fn failure(&mut self, mismatch: Mismatch) -> Result<()> {
        self.mismatches.push(mismatch);
        Ok(())
    }
}

/// Compares two tables column-set first, then cell by cell
pub struct TableComparator<'a> {
    comparator: &'a dyn ValueComparator,
    excluded: FxHashSet<String>,
}

impl<'a> TableComparator<'a> {
    pub fn new(comparator: &'a dyn ValueComparator) -> Self {
        Self {
            comparator,
            excluded: FxHashSet::default(),
        }
    }

    /// Exclude columns (case-insensitively) from reconciliation and
    /// cell comparison
    pub fn with_excluded_columns(mut self, columns: &[String]) -> Self {
        self.excluded = columns.iter().map(|c| c.to_uppercase()).collect();
        self
    }

    fn is_excluded(&self, column: &str) -> bool {
        self.excluded.contains(&column.to_uppercase())
    }

    fn included_columns<'t>(&self, table: &'t MemTable) -> Vec<&'t str> {
        table
            .metadata()
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !self.is_excluded(name))
            .collect()
    }

    /// Compare expected against actual, routing failures through the handler
    pub fn compare(
        &self,
        expected: &MemTable,
        actual: &MemTable,
        handler: &mut dyn FailureHandler,
    ) -> Result<()> {
        let table = expected.name().to_string();
        debug!(table = %table, "comparing table");

        // Column reconciliation: order-independent, case-insensitive
        let expected_cols = self.included_columns(expected);
        let actual_cols = self.included_columns(actual);
        let expected_set: FxHashSet<String> =
            expected_cols.iter().map(|c| c.to_uppercase()).collect();
        let actual_set: FxHashSet<String> = actual_cols.iter().map(|c| c.to_uppercase()).collect();
        if expected_set != actual_set {
            let mut expected_names: Vec<String> =
                expected_cols.iter().map(|c| c.to_string()).collect();
            let mut actual_names: Vec<String> = actual_cols.iter().map(|c| c.to_string()).collect();
            expected_names.sort();
            actual_names.sort();
            handler.failure(Mismatch::ColumnsMismatch {
                table,
                expected: expected_names,
                actual: actual_names,
            })?;
            // Cell comparison is meaningless with differing column sets
            return Ok(());
        }

        if expected.row_count() != actual.row_count() {
            handler.failure(Mismatch::RowCountMismatch {
                table: table.clone(),
                expected: expected.row_count(),
                actual: actual.row_count(),
            })?;
        }

        // Cells are compared over the shared row prefix
        let rows = expected.row_count().min(actual.row_count());
        for row in 0..rows {
            for name in &expected_cols {
                let column = expected.metadata().column(name)?;
                let expected_value = expected.value(row, name)?;
                let actual_value = actual.value(row, name)?;
                if !self.comparator.matches(column, expected_value, actual_value) {
                    handler.failure(Mismatch::CellMismatch {
                        table: table.clone(),
                        column: (*name).to_string(),
                        row,
                        expected: expected_value.clone(),
                        actual: actual_value.clone(),
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Compares whole datasets: table lists first, then each expected table
pub struct DataSetComparator<'a> {
    tables: TableComparator<'a>,
}

impl<'a> DataSetComparator<'a> {
    pub fn new(tables: TableComparator<'a>) -> Self {
        Self { tables }
    }

    pub fn compare(
        &self,
        expected: &DataSet,
        actual: &DataSet,
        handler: &mut dyn FailureHandler,
    ) -> Result<()> {
        for name in expected.table_names() {
            if !actual.contains_table(name) {
                handler.failure(Mismatch::TableMissing {
                    table: name.to_string(),
                })?;
            }
        }
        for name in actual.table_names() {
            if !expected.contains_table(name) {
                handler.failure(Mismatch::TableUnexpected {
                    table: name.to_string(),
                })?;
            }
        }
        for expected_table in expected.tables() {
            if let Ok(actual_table) = actual.table(expected_table.name()) {
                self.tables.compare(expected_table, actual_table, handler)?;
            }
        }
        Ok(())
    }
}

/// Assert two tables are equal, failing fast on the first mismatch
pub fn assert_tables_equal(expected: &MemTable, actual: &MemTable) -> Result<()> {
    let comparator = TypedComparator::new();
    TableComparator::new(&comparator).compare(expected, actual, &mut FailFast)
}

/// Assert two datasets are equal, failing fast on the first mismatch
pub fn assert_datasets_equal(expected: &DataSet, actual: &DataSet) -> Result<()> {
    let comparator = TypedComparator::new();
    let tables = TableComparator::new(&comparator);
    DataSetComparator::new(tables).compare(expected, actual, &mut FailFast)
}

/// Compare two datasets under a configuration, collecting every mismatch
pub fn compare_datasets(
    expected: &DataSet,
    actual: &DataSet,
    config: &CompareConfig,
) -> Result<Vec<Mismatch>> {
    let typed = TypedComparator::new();
    let tolerant = config.tolerance.map(ToleranceComparator::new);
    let comparator: &dyn ValueComparator = match &tolerant {
        Some(t) => t,
        None => &typed,
    };
    let tables = TableComparator::new(comparator).with_excluded_columns(&config.ignore_columns);
    let mut handler = CollectingHandler::new();
    DataSetComparator::new(tables).compare(expected, actual, &mut handler)?;
    Ok(handler.into_mismatches())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DataType, TableMetadata};

    fn pk_table(second_val: &str) -> MemTable {
        let metadata = TableMetadata::new(
            "PK_TABLE",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("val", DataType::Varchar),
            ],
        );
        let mut table = MemTable::new(metadata);
        table.add_row(vec![CellValue::Int(0), CellValue::Null]);
        table.add_row(vec![CellValue::Int(1), CellValue::Str(second_val.into())]);
        table
    }

    #[test]
    fn table_equals_itself() {
        let table = pk_table("row 1");
        assert!(assert_tables_equal(&table, &table).is_ok());
    }

    #[test]
    fn single_changed_cell_reports_one_mismatch() {
        let expected = pk_table("row 1");
        let actual = pk_table("row X");

        let comparator = TypedComparator::new();
        let mut handler = CollectingHandler::new();
        TableComparator::new(&comparator)
            .compare(&expected, &actual, &mut handler)
            .unwrap();

        let mismatches = handler.into_mismatches();
        assert_eq!(mismatches.len(), 1);
        match &mismatches[0] {
            Mismatch::CellMismatch {
                table,
                column,
                row,
                expected,
                actual,
            } => {
                assert_eq!(table, "PK_TABLE");
                assert_eq!(column, "val");
                assert_eq!(*row, 1);
                assert_eq!(expected, &CellValue::Str("row 1".into()));
                assert_eq!(actual, &CellValue::Str("row X".into()));
            }
            other => panic!("expected CellMismatch, got {:?}", other),
        }
    }

    #[test]
    fn fail_fast_stops_on_first_mismatch() {
        let expected = pk_table("row 1");
        let actual = pk_table("row X");
        match assert_tables_equal(&expected, &actual) {
            Err(TabError::Assertion(Mismatch::CellMismatch { row: 1, .. })) => {}
            other => panic!("expected assertion failure, got {:?}", other),
        }
    }

    #[test]
    fn removed_column_reports_both_lists() {
        let expected = pk_table("row 1");
        let metadata = TableMetadata::new("PK_TABLE", vec![Column::new("id", DataType::Integer)]);
        let mut actual = MemTable::new(metadata);
        actual.add_row(vec![CellValue::Int(0)]);
        actual.add_row(vec![CellValue::Int(1)]);

        let comparator = TypedComparator::new();
        let mut handler = CollectingHandler::new();
        TableComparator::new(&comparator)
            .compare(&expected, &actual, &mut handler)
            .unwrap();

        let mismatches = handler.into_mismatches();
        assert_eq!(mismatches.len(), 1);
        match &mismatches[0] {
            Mismatch::ColumnsMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, &vec!["id".to_string(), "val".to_string()]);
                assert_eq!(actual, &vec!["id".to_string()]);
            }
            other => panic!("expected ColumnsMismatch, got {:?}", other),
        }
    }

    #[test]
    fn column_order_does_not_matter() {
        let expected = pk_table("row 1");
        let metadata = TableMetadata::new(
            "PK_TABLE",
            vec![
                Column::new("val", DataType::Varchar),
                Column::new("id", DataType::Integer),
            ],
        );
        let mut actual = MemTable::new(metadata);
        actual.add_row(vec![CellValue::Null, CellValue::Int(0)]);
        actual.add_row(vec![CellValue::Str("row 1".into()), CellValue::Int(1)]);
        assert!(assert_tables_equal(&expected, &actual).is_ok());
    }

    #[test]
    fn excluded_columns_are_skipped() {
        let expected = pk_table("row 1");
        let actual = pk_table("row X");
        let comparator = TypedComparator::new();
        let mut handler = CollectingHandler::new();
        TableComparator::new(&comparator)
            .with_excluded_columns(&["VAL".to_string()])
            .compare(&expected, &actual, &mut handler)
            .unwrap();
        assert!(handler.mismatches().is_empty());
    }

    #[test]
    fn row_count_mismatch_still_compares_shared_prefix() {
        let expected = pk_table("row 1");
        let metadata = expected.metadata().clone();
        let mut actual = MemTable::new(metadata);
        actual.add_row(vec![CellValue::Int(9), CellValue::Null]);

        let comparator = TypedComparator::new();
        let mut handler = CollectingHandler::new();
        TableComparator::new(&comparator)
            .compare(&expected, &actual, &mut handler)
            .unwrap();

        let mismatches = handler.into_mismatches();
        assert!(matches!(&mismatches[0], Mismatch::RowCountMismatch { expected: 2, actual: 1, .. }));
        assert!(matches!(&mismatches[1], Mismatch::CellMismatch { column, row: 0, .. } if column == "id"));
    }

    #[test]
    fn dataset_comparison_flags_table_lists() {
        let mut expected = DataSet::new();
        expected.add_table(pk_table("row 1")).unwrap();
        let actual = DataSet::new();

        let config = CompareConfig::new();
        let mismatches = compare_datasets(&expected, &actual, &config).unwrap();
        assert_eq!(
            mismatches,
            vec![Mismatch::TableMissing {
                table: "PK_TABLE".to_string()
            }]
        );
    }
}
