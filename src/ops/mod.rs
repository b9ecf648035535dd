//! Database operations: set-up and tear-down strategies over a dataset
//!
//! Each operation turns a dataset into a sequence of SQL statements applied
//! through a [`StatementExecutor`]. Inserting walks tables in dataset order;
//! deleting walks them in reverse so child tables clear before their parents.

mod executor;
pub mod sql;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::DataSet;

pub use executor::{RecordingExecutor, ScriptExecutor, StatementExecutor};
pub use sql::SqlStatement;

/// A named database operation strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Do nothing
    None,
    /// Insert every dataset row, tables in dataset order
    Insert,
    /// Update every dataset row by its key columns
    Update,
    /// Delete each dataset row by its key columns, tables in reverse order
    Delete,
    /// Delete all rows of every dataset table, tables in reverse order
    DeleteAll,
    /// Truncate every dataset table, tables in reverse order
    Truncate,
    /// Update each row, inserting it when the update touches nothing
    Refresh,
    /// Delete all rows then insert the dataset rows
    CleanInsert,
    /// Run operations in sequence
    Composite(Vec<Operation>),
}

/// Counts of what an operation executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    pub statements: usize,
    pub rows_affected: usize,
}

impl OpStats {
    fn absorb(&mut self, other: OpStats) {
        self.statements += other.statements;
        self.rows_affected += other.rows_affected;
    }

    fn record(&mut self, affected: usize) {
        self.statements += 1;
        self.rows_affected += affected;
    }
}

impl Operation {
    /// Apply this operation's statements for the dataset through the executor
    pub fn apply(&self, dataset: &DataSet, executor: &mut dyn StatementExecutor) -> Result<OpStats> {
        let stats = self.run(dataset, executor)?;
        info!(
            operation = %self,
            statements = stats.statements,
            rows_affected = stats.rows_affected,
            "operation applied"
        );
        Ok(stats)
    }

    fn run(&self, dataset: &DataSet, executor: &mut dyn StatementExecutor) -> Result<OpStats> {
        let mut stats = OpStats::default();
        match self {
            Operation::None => {}
            Operation::Insert => {
                for table in dataset.tables() {
                    debug!(table = table.name(), rows = table.row_count(), "inserting");
                    for row in table.rows() {
                        match sql::insert_row(table.metadata(), row) {
                            Some(stmt) => stats.record(executor.execute(&stmt)?),
                            None => {
                                warn!(table = table.name(), "skipping row with no insertable columns");
                            }
                        }
                    }
                }
            }
            Operation::Update => {
                for table in dataset.tables() {
                    for row in table.rows() {
                        if let Some(stmt) = sql::update_row(table.metadata(), row)? {
                            stats.record(executor.execute(&stmt)?);
                        }
                    }
                }
            }
            Operation::Delete => {
                for table in dataset.tables_reversed() {
                    debug!(table = table.name(), rows = table.row_count(), "deleting rows");
                    for row in table.rows().collect::<Vec<_>>().into_iter().rev() {
                        let stmt = sql::delete_row(table.metadata(), row)?;
                        stats.record(executor.execute(&stmt)?);
                    }
                }
            }
            Operation::DeleteAll => {
                for table in dataset.tables_reversed() {
                    let stmt = sql::delete_all(table.metadata());
                    stats.record(executor.execute(&stmt)?);
                }
            }
            Operation::Truncate => {
                for table in dataset.tables_reversed() {
                    let stmt = sql::truncate(table.metadata());
                    stats.record(executor.execute(&stmt)?);
                }
            }
            Operation::Refresh => {
                for table in dataset.tables() {
                    for row in table.rows() {
                        let updated = match sql::update_row(table.metadata(), row)? {
                            Some(stmt) => {
                                let affected = executor.execute(&stmt)?;
                                stats.record(affected);
                                affected > 0
                            }
                            None => false,
                        };
                        if !updated {
                            if let Some(stmt) = sql::insert_row(table.metadata(), row) {
                                stats.record(executor.execute(&stmt)?);
                            }
                        }
                    }
                }
            }
            Operation::CleanInsert => {
                stats.absorb(Operation::DeleteAll.run(dataset, executor)?);
                stats.absorb(Operation::Insert.run(dataset, executor)?);
            }
            Operation::Composite(operations) => {
                for op in operations {
                    stats.absorb(op.run(dataset, executor)?);
                }
            }
        }
        Ok(stats)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::None => f.write_str("none"),
            Operation::Insert => f.write_str("insert"),
            Operation::Update => f.write_str("update"),
            Operation::Delete => f.write_str("delete"),
            Operation::DeleteAll => f.write_str("delete-all"),
            Operation::Truncate => f.write_str("truncate"),
            Operation::Refresh => f.write_str("refresh"),
            Operation::CleanInsert => f.write_str("clean-insert"),
            Operation::Composite(_) => f.write_str("composite"),
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Operation::None),
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            "delete-all" | "delete_all" => Ok(Operation::DeleteAll),
            "truncate" => Ok(Operation::Truncate),
            "refresh" => Ok(Operation::Refresh),
            "clean-insert" | "clean_insert" => Ok(Operation::CleanInsert),
            other => Err(format!("Unknown operation: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabError;
    use crate::model::{CellValue, Column, DataType, MemTable, TableMetadata};

    fn fixture() -> DataSet {
        let parent_meta = TableMetadata::new(
            "PARENT",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("name", DataType::Varchar),
            ],
        )
        .with_key_columns(vec!["id".to_string()]);
        let mut parent = MemTable::new(parent_meta);
        parent.add_row(vec![CellValue::Int(1), CellValue::Str("a".into())]);

        let child_meta = TableMetadata::new(
            "CHILD",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("parent_id", DataType::Integer),
            ],
        )
        .with_key_columns(vec!["id".to_string()]);
        let mut child = MemTable::new(child_meta);
        child.add_row(vec![CellValue::Int(10), CellValue::Int(1)]);
        child.add_row(vec![CellValue::Int(11), CellValue::Int(1)]);

        let mut ds = DataSet::new();
        ds.add_table(parent).unwrap();
        ds.add_table(child).unwrap();
        ds
    }

    #[test]
    fn insert_walks_tables_forward() {
        let ds = fixture();
        let mut executor = RecordingExecutor::new();
        let stats = Operation::Insert.apply(&ds, &mut executor).unwrap();
        assert_eq!(stats.statements, 3);
        let sql = executor.sql();
        assert!(sql[0].starts_with("INSERT INTO \"PARENT\""));
        assert!(sql[1].starts_with("INSERT INTO \"CHILD\""));
        assert!(sql[2].starts_with("INSERT INTO \"CHILD\""));
    }

    #[test]
    fn delete_all_walks_tables_in_reverse() {
        let ds = fixture();
        let mut executor = RecordingExecutor::new();
        Operation::DeleteAll.apply(&ds, &mut executor).unwrap();
        assert_eq!(
            executor.sql(),
            vec!["DELETE FROM \"CHILD\"", "DELETE FROM \"PARENT\""]
        );
    }

    #[test]
    fn delete_reverses_rows_too() {
        let ds = fixture();
        let mut executor = RecordingExecutor::new();
        Operation::Delete.apply(&ds, &mut executor).unwrap();
        let executed = executor.executed();
        assert_eq!(executed[0].params, vec![CellValue::Int(11)]);
        assert_eq!(executed[1].params, vec![CellValue::Int(10)]);
        assert_eq!(executed[2].params, vec![CellValue::Int(1)]);
    }

    #[test]
    fn clean_insert_deletes_then_inserts() {
        let ds = fixture();
        let mut executor = RecordingExecutor::new();
        let stats = Operation::CleanInsert.apply(&ds, &mut executor).unwrap();
        assert_eq!(stats.statements, 5);
        let sql = executor.sql();
        assert_eq!(sql[0], "DELETE FROM \"CHILD\"");
        assert_eq!(sql[1], "DELETE FROM \"PARENT\"");
        assert!(sql[2].starts_with("INSERT INTO \"PARENT\""));
    }

    #[test]
    fn refresh_inserts_when_update_misses() {
        let ds = fixture();
        // First update hits, the next two miss and fall through to inserts
        let mut executor = RecordingExecutor::with_responses([1, 0, 1, 0, 1]);
        Operation::Refresh.apply(&ds, &mut executor).unwrap();
        let sql = executor.sql();
        assert!(sql[0].starts_with("UPDATE \"PARENT\""));
        assert!(sql[1].starts_with("UPDATE \"CHILD\""));
        assert!(sql[2].starts_with("INSERT INTO \"CHILD\""));
        assert!(sql[3].starts_with("UPDATE \"CHILD\""));
    }

    #[test]
    fn delete_requires_key_columns() {
        let meta = TableMetadata::new("NOKEYS", vec![Column::new("a", DataType::Integer)]);
        let mut table = MemTable::new(meta);
        table.add_row(vec![CellValue::Int(1)]);
        let mut ds = DataSet::new();
        ds.add_table(table).unwrap();

        let mut executor = RecordingExecutor::new();
        assert!(matches!(
            Operation::Delete.apply(&ds, &mut executor),
            Err(TabError::NoKeyColumns(_))
        ));
    }

    #[test]
    fn none_executes_nothing() {
        let ds = fixture();
        let mut executor = RecordingExecutor::new();
        let stats = Operation::None.apply(&ds, &mut executor).unwrap();
        assert_eq!(stats, OpStats::default());
        assert!(executor.executed().is_empty());
    }

    #[test]
    fn composite_runs_in_sequence() {
        let ds = fixture();
        let mut executor = RecordingExecutor::new();
        Operation::Composite(vec![Operation::Truncate, Operation::Insert])
            .apply(&ds, &mut executor)
            .unwrap();
        let sql = executor.sql();
        assert_eq!(sql[0], "TRUNCATE TABLE \"CHILD\"");
        assert!(sql[4].starts_with("INSERT INTO \"CHILD\""));
    }
}
