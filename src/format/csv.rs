//! CSV directory dataset format
//!
//! A CSV dataset is a directory holding one `<TABLE>.csv` per table (first
//! record is the header) plus a `table-ordering.txt` listing table names one
//! per line, which fixes dataset order.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TabError};
use crate::model::{CellValue, Column, TableMetadata};
use crate::stream::{DataSetConsumer, DataSetProducer};

/// Name of the file fixing table order inside a CSV dataset directory
pub const TABLE_ORDERING_FILE: &str = "table-ordering.txt";

/// Streaming producer for CSV dataset directories
pub struct CsvDirProducer {
    dir: PathBuf,
}

impl CsvDirProducer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let ordering = self.dir.join(TABLE_ORDERING_FILE);
        if !ordering.exists() {
            return Err(TabError::format(
                &self.dir,
                format!("missing {TABLE_ORDERING_FILE}"),
            ));
        }
        let file = File::open(&ordering)?;
        let mut names = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let name = line.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

impl DataSetProducer for CsvDirProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        let names = self.table_names()?;
        consumer.start_dataset()?;
        for name in names {
            let path = self.dir.join(format!("{name}.csv"));
            debug!(table = %name, path = %path.display(), "reading CSV table");
            let file = File::open(&path)?;
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_reader(BufReader::new(file));

            let headers = reader.headers()?.clone();
            let columns: Vec<Column> = headers
                .iter()
                .map(|h| Column::untyped(h.trim().to_string()))
                .collect();
            let metadata = TableMetadata::new(name.clone(), columns);
            consumer.start_table(&metadata)?;

            for record in reader.records() {
                let record = record?;
                let cells: Vec<CellValue> =
                    record.iter().map(CellValue::parse).collect();
                consumer.row(cells)?;
            }
            consumer.end_table()?;
        }
        consumer.end_dataset()
    }
}

/// Consumer that writes a CSV dataset directory
pub struct CsvDirWriter {
    dir: PathBuf,
    table_names: Vec<String>,
    current: Option<csv::Writer<File>>,
}

impl CsvDirWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            table_names: Vec::new(),
            current: None,
        }
    }
}

impl DataSetConsumer for CsvDirWriter {
    fn start_dataset(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn start_table(&mut self, metadata: &TableMetadata) -> Result<()> {
        let path = self.dir.join(format!("{}.csv", metadata.name()));
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer.write_record(metadata.columns().iter().map(|c| c.name.as_str()))?;
        self.table_names.push(metadata.name().to_string());
        self.current = Some(writer);
        Ok(())
    }

    fn row(&mut self, values: Vec<CellValue>) -> Result<()> {
        let writer = self
            .current
            .as_mut()
            .ok_or_else(|| TabError::protocol("row event outside a table"))?;
        let fields: Vec<String> = values
            .iter()
            .map(|v| match v {
                CellValue::Null | CellValue::NoValue => String::new(),
                other => other.to_text(),
            })
            .collect();
        writer.write_record(&fields)?;
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        let mut writer = self
            .current
            .take()
            .ok_or_else(|| TabError::protocol("end_table without start_table"))?;
        writer.flush()?;
        Ok(())
    }

    fn end_dataset(&mut self) -> Result<()> {
        let mut ordering = File::create(self.dir.join(TABLE_ORDERING_FILE))?;
        for name in &self.table_names {
            writeln!(ordering, "{name}")?;
        }
        Ok(())
    }
}
