//! Producer/consumer streaming protocol for building datasets incrementally
//!
//! A producer emits one `start_dataset`, then per table `start_table`,
//! zero or more `row` calls and `end_table`, then one `end_dataset`.
//! Out-of-order events fail fast with a protocol error.

use tracing::debug;

use crate::error::{Result, TabError};
use crate::model::{CellValue, Column, DataSet, MemTable, TableMetadata};

/// Receives dataset events from a producer
pub trait DataSetConsumer {
    fn start_dataset(&mut self) -> Result<()>;
    fn start_table(&mut self, metadata: &TableMetadata) -> Result<()>;
    fn row(&mut self, values: Vec<CellValue>) -> Result<()>;
    fn end_table(&mut self) -> Result<()>;
    fn end_dataset(&mut self) -> Result<()>;
}

/// Drives a consumer through the full event sequence
pub trait DataSetProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    New,
    InDataSet,
    InTable,
    Finished,
}

/// Consumer that materializes a [`DataSet`].
///
/// A table name appearing in more than one start/end section is merged into
/// one logical table: rows are appended, and a later section may widen the
/// column set, in which case earlier rows are padded with the no-value marker.
pub struct DataSetBuilder {
    dataset: DataSet,
    state: State,
    current: Option<(TableMetadata, Vec<Vec<CellValue>>)>,
}

impl DataSetBuilder {
    pub fn new() -> Self {
        Self::for_dataset(DataSet::new())
    }

    /// Build into a dataset with pre-configured name sensitivity
    pub fn for_dataset(dataset: DataSet) -> Self {
        Self {
            dataset,
            state: State::New,
            current: None,
        }
    }

    /// Take the materialized dataset; fails if the stream never completed
    pub fn into_dataset(self) -> Result<DataSet> {
        if self.state != State::Finished {
            return Err(TabError::protocol("dataset stream was not completed"));
        }
        Ok(self.dataset)
    }

    fn expect(&self, expected: State, event: &str) -> Result<()> {
        if self.state != expected {
            return Err(TabError::protocol(format!(
                "unexpected {event} (state {:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn finish_table(&mut self, metadata: TableMetadata, rows: Vec<Vec<CellValue>>) -> Result<()> {
        let name = metadata.name().to_string();
        if !self.dataset.contains_table(&name) {
            let mut table = MemTable::new(metadata);
            for row in rows {
                table.add_row(row);
            }
            return self.dataset.add_table(table);
        }

        // Repeated section: merge into the existing table, widening columns.
        // The merged table keeps its first-seen name.
        debug!(table = %name, "merging repeated table section");
        let existing = self.dataset.table(&name)?;
        let mut columns: Vec<Column> = existing.metadata().columns().to_vec();
        for col in metadata.columns() {
            if !existing.metadata().has_column(&col.name) {
                columns.push(col.clone());
            }
        }

        let merged_meta = TableMetadata::new(existing.metadata().name().to_string(), columns)
            .with_key_columns(existing.metadata().key_columns().to_vec());
        let mut merged = MemTable::new(merged_meta);

        // Earlier rows get the no-value marker for columns the section added
        let pad = merged.metadata().column_count() - existing.metadata().column_count();
        for row in existing.rows() {
            let mut cells = row.to_vec();
            cells.extend(std::iter::repeat(CellValue::NoValue).take(pad));
            merged.add_row(cells);
        }

        // Section rows are remapped by column name into the merged layout
        let section_slots: Vec<usize> = metadata
            .columns()
            .iter()
            .map(|c| merged.metadata().column_index(&c.name))
            .collect::<Result<_>>()?;
        let width = merged.metadata().column_count();
        for row in rows {
            let mut cells = vec![CellValue::NoValue; width];
            for (value, &slot) in row.into_iter().zip(&section_slots) {
                cells[slot] = value;
            }
            merged.add_row(cells);
        }

        self.dataset.replace_table(merged)
    }
}

impl Default for DataSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSetConsumer for DataSetBuilder {
    fn start_dataset(&mut self) -> Result<()> {
        self.expect(State::New, "start_dataset")?;
        self.state = State::InDataSet;
        Ok(())
    }

    fn start_table(&mut self, metadata: &TableMetadata) -> Result<()> {
        self.expect(State::InDataSet, "start_table")?;
        self.current = Some((metadata.clone(), Vec::new()));
        self.state = State::InTable;
        Ok(())
    }

    fn row(&mut self, values: Vec<CellValue>) -> Result<()> {
        self.expect(State::InTable, "row")?;
        let (_, rows) = self.current.as_mut().expect("in-table state has a table");
        rows.push(values);
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        self.expect(State::InTable, "end_table")?;
        let (metadata, rows) = self.current.take().expect("in-table state has a table");
        self.finish_table(metadata, rows)?;
        self.state = State::InDataSet;
        Ok(())
    }

    fn end_dataset(&mut self) -> Result<()> {
        self.expect(State::InDataSet, "end_dataset")?;
        self.state = State::Finished;
        Ok(())
    }
}

/// Producer over an already-built dataset, used to stream a dataset into a
/// writer or another consumer
pub struct DataSetSource<'a> {
    dataset: &'a DataSet,
}

impl<'a> DataSetSource<'a> {
    pub fn new(dataset: &'a DataSet) -> Self {
        Self { dataset }
    }
}

impl DataSetProducer for DataSetSource<'_> {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        consumer.start_dataset()?;
        for table in self.dataset.tables() {
            consumer.start_table(table.metadata())?;
            for row in table.rows() {
                consumer.row(row.to_vec())?;
            }
            consumer.end_table()?;
        }
        consumer.end_dataset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DataType};

    fn meta(name: &str, columns: &[&str]) -> TableMetadata {
        TableMetadata::new(
            name,
            columns.iter().map(|c| Column::untyped(*c)).collect(),
        )
    }

    #[test]
    fn builds_a_dataset() {
        let mut builder = DataSetBuilder::new();
        builder.start_dataset().unwrap();
        builder.start_table(&meta("T", &["id", "val"])).unwrap();
        builder
            .row(vec![CellValue::Int(1), CellValue::Str("a".into())])
            .unwrap();
        builder.end_table().unwrap();
        builder.end_dataset().unwrap();

        let ds = builder.into_dataset().unwrap();
        assert_eq!(ds.table_names(), vec!["T"]);
        assert_eq!(ds.table("T").unwrap().row_count(), 1);
    }

    #[test]
    fn repeated_sections_merge_rows() {
        let mut builder = DataSetBuilder::new();
        builder.start_dataset().unwrap();
        builder.start_table(&meta("T", &["id"])).unwrap();
        builder.row(vec![CellValue::Int(1)]).unwrap();
        builder.end_table().unwrap();
        builder.start_table(&meta("T", &["id"])).unwrap();
        builder.row(vec![CellValue::Int(2)]).unwrap();
        builder.end_table().unwrap();
        builder.end_dataset().unwrap();

        let ds = builder.into_dataset().unwrap();
        let table = ds.table("T").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(1, "id").unwrap(), &CellValue::Int(2));
    }

    #[test]
    fn merge_widens_columns_and_pads_earlier_rows() {
        let mut builder = DataSetBuilder::new();
        builder.start_dataset().unwrap();
        builder.start_table(&meta("T", &["id"])).unwrap();
        builder.row(vec![CellValue::Int(1)]).unwrap();
        builder.end_table().unwrap();
        builder.start_table(&meta("T", &["id", "extra"])).unwrap();
        builder
            .row(vec![CellValue::Int(2), CellValue::Str("x".into())])
            .unwrap();
        builder.end_table().unwrap();
        builder.end_dataset().unwrap();

        let ds = builder.into_dataset().unwrap();
        let table = ds.table("T").unwrap();
        assert_eq!(table.metadata().column_count(), 2);
        assert_eq!(table.value(0, "extra").unwrap(), &CellValue::NoValue);
        assert_eq!(table.value(1, "extra").unwrap(), &CellValue::Str("x".into()));
    }

    #[test]
    fn out_of_order_events_fail() {
        let mut builder = DataSetBuilder::new();
        assert!(matches!(
            builder.row(vec![CellValue::Int(1)]),
            Err(TabError::Protocol(_))
        ));
        builder.start_dataset().unwrap();
        assert!(matches!(builder.end_table(), Err(TabError::Protocol(_))));
        assert!(matches!(builder.start_dataset(), Err(TabError::Protocol(_))));
    }

    #[test]
    fn incomplete_stream_cannot_materialize() {
        let mut builder = DataSetBuilder::new();
        builder.start_dataset().unwrap();
        assert!(builder.into_dataset().is_err());
    }

    #[test]
    fn source_round_trips_through_builder() {
        let mut table = MemTable::new(meta("T", &["a"]).with_key_columns(vec!["a".into()]));
        table.add_row(vec![CellValue::Int(7)]);
        let mut ds = DataSet::new();
        ds.add_table(table).unwrap();

        let mut builder = DataSetBuilder::new();
        DataSetSource::new(&ds).produce(&mut builder).unwrap();
        let rebuilt = builder.into_dataset().unwrap();
        assert_eq!(rebuilt.table("T").unwrap().value(0, "a").unwrap(), &CellValue::Int(7));
    }
}
