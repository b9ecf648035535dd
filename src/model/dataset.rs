//! Dataset: an ordered, name-addressable collection of tables

use super::registry::NameRegistry;
use super::table::MemTable;
use crate::error::{Result, TabError};

/// A named collection of tables with insertion-ordered, case-insensitive
/// (by default) name lookup.
///
/// Assembled once, either from pre-built tables or by a streaming consumer,
/// then treated as read-only.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    tables: NameRegistry<MemTable>,
}

impl DataSet {
    /// Empty dataset with case-insensitive table names
    pub fn new() -> Self {
        Self {
            tables: NameRegistry::new(),
        }
    }

    /// Empty dataset with case-sensitive table names
    pub fn case_sensitive() -> Self {
        Self {
            tables: NameRegistry::with_case_sensitivity(true),
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.tables.is_case_sensitive()
    }

    /// Add a table; duplicate names are an `AmbiguousTableName` error
    pub fn add_table(&mut self, table: MemTable) -> Result<()> {
        self.tables.add(table.name().to_string(), table)
    }

    /// Replace an existing table
    pub(crate) fn replace_table(&mut self, table: MemTable) -> Result<()> {
        let name = table.name().to_string();
        self.tables.update(&name, table)
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Result<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| TabError::NoSuchTable(name.to_string()))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// Table names in insertion order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.names().collect()
    }

    /// Tables in insertion order
    pub fn tables(&self) -> impl DoubleEndedIterator<Item = &MemTable> {
        self.tables.values()
    }

    /// Tables in reverse insertion order (tear-down order)
    pub fn tables_reversed(&self) -> impl Iterator<Item = &MemTable> {
        self.tables.values().rev()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Infer declared column types for every table (see
    /// [`MemTable::infer_column_types`])
    pub fn infer_column_types(&mut self) {
        for table in self.tables.values_mut() {
            table.infer_column_types();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DataType, TableMetadata};

    fn table(name: &str) -> MemTable {
        MemTable::new(TableMetadata::new(
            name,
            vec![Column::new("id", DataType::Integer)],
        ))
    }

    #[test]
    fn duplicate_table_name_is_ambiguous() {
        let mut ds = DataSet::new();
        ds.add_table(table("A")).unwrap();
        assert!(matches!(
            ds.add_table(table("a")),
            Err(TabError::AmbiguousTableName(_))
        ));
    }

    #[test]
    fn case_sensitive_dataset_keeps_both() {
        let mut ds = DataSet::case_sensitive();
        ds.add_table(table("A")).unwrap();
        ds.add_table(table("a")).unwrap();
        assert_eq!(ds.table_count(), 2);
    }

    #[test]
    fn names_keep_insertion_order() {
        let mut ds = DataSet::new();
        for name in ["CHILD", "PARENT", "OTHER"] {
            ds.add_table(table(name)).unwrap();
        }
        assert_eq!(ds.table_names(), vec!["CHILD", "PARENT", "OTHER"]);
        let reversed: Vec<_> = ds.tables_reversed().map(|t| t.name().to_string()).collect();
        assert_eq!(reversed, vec!["OTHER", "PARENT", "CHILD"]);
    }

    #[test]
    fn missing_table_lookup_fails() {
        let ds = DataSet::new();
        assert!(matches!(ds.table("NOPE"), Err(TabError::NoSuchTable(_))));
    }
}
