//! YAML dataset format
//!
//! ```yaml
//! PK_TABLE:
//!   - id: 0
//!     val: null
//!   - id: 1
//!     val: row 1
//! EMPTY_TABLE: []
//! ```
//!
//! The top-level mapping goes table name to row sequence; a table's column
//! set is the union of row keys in document order.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde_yaml::{Mapping, Number, Value};

use crate::error::{Result, TabError};
use crate::model::{CellValue, Column, TableMetadata};
use crate::stream::{DataSetConsumer, DataSetProducer};

/// Producer over a YAML dataset document
pub struct YamlProducer {
    path: PathBuf,
}

impl YamlProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn malformed(&self, message: impl Into<String>) -> TabError {
        TabError::format(&self.path, message)
    }
}

impl DataSetProducer for YamlProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        let file = File::open(&self.path)?;
        let document: Value = serde_yaml::from_reader(BufReader::new(file))?;

        let root = match document {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => return Err(self.malformed("top level must be a table mapping")),
        };

        consumer.start_dataset()?;
        for (key, value) in &root {
            let name = key
                .as_str()
                .ok_or_else(|| self.malformed("table names must be strings"))?;
            let rows = match value {
                Value::Sequence(rows) => rows.as_slice(),
                Value::Null => &[],
                _ => {
                    return Err(
                        self.malformed(format!("table {name} must hold a sequence of rows"))
                    )
                }
            };

            // Column set: union of row keys in document order
            let mut columns: Vec<Column> = Vec::new();
            let mut known: FxHashSet<String> = FxHashSet::default();
            for row in rows {
                let Value::Mapping(row) = row else {
                    return Err(self.malformed(format!("rows of table {name} must be mappings")));
                };
                for key in row.keys() {
                    let column = key
                        .as_str()
                        .ok_or_else(|| self.malformed("column names must be strings"))?;
                    if known.insert(column.to_uppercase()) {
                        columns.push(Column::untyped(column.to_string()));
                    }
                }
            }

            let metadata = TableMetadata::new(name.to_string(), columns);
            consumer.start_table(&metadata)?;
            for row in rows {
                let Value::Mapping(row) = row else { unreachable!() };
                let mut cells = Vec::with_capacity(metadata.column_count());
                for column in metadata.columns() {
                    let cell = lookup(row, &column.name)
                        .map(yaml_to_cell)
                        .unwrap_or(CellValue::Null);
                    cells.push(cell);
                }
                consumer.row(cells)?;
            }
            consumer.end_table()?;
        }
        consumer.end_dataset()
    }
}

fn lookup<'a>(row: &'a Mapping, column: &str) -> Option<&'a Value> {
    row.iter()
        .find(|(key, _)| key.as_str().is_some_and(|k| k.eq_ignore_ascii_case(column)))
        .map(|(_, value)| value)
}

fn yaml_to_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Int(i)
            } else {
                CellValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        // YAML has no date scalar; recognize ISO dates in strings
        Value::String(s) => CellValue::parse_literal(s),
        other => CellValue::Str(format!("{:?}", other)),
    }
}

fn cell_to_yaml(value: &CellValue) -> Value {
    match value {
        CellValue::Null | CellValue::NoValue => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::Number(Number::from(*i)),
        CellValue::Float(f) => Value::Number(Number::from(*f)),
        CellValue::Str(s) => Value::String(s.clone()),
        CellValue::Date(d) => Value::String(d.to_string()),
        CellValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

/// Consumer that writes the YAML form
pub struct YamlWriter<W: io::Write> {
    out: W,
    root: Mapping,
    current: Option<(TableMetadata, Vec<Value>)>,
}

impl YamlWriter<BufWriter<File>> {
    pub fn to_file(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: io::Write> YamlWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            root: Mapping::new(),
            current: None,
        }
    }
}

impl<W: io::Write> DataSetConsumer for YamlWriter<W> {
    fn start_dataset(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_table(&mut self, metadata: &TableMetadata) -> Result<()> {
        self.current = Some((metadata.clone(), Vec::new()));
        Ok(())
    }

    fn row(&mut self, values: Vec<CellValue>) -> Result<()> {
        let (metadata, rows) = self
            .current
            .as_mut()
            .ok_or_else(|| TabError::protocol("row event outside a table"))?;
        let mut row = Mapping::new();
        for (column, value) in metadata.columns().iter().zip(&values) {
            if value.is_no_value() {
                continue;
            }
            row.insert(Value::String(column.name.clone()), cell_to_yaml(value));
        }
        rows.push(Value::Mapping(row));
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        let (metadata, rows) = self
            .current
            .take()
            .ok_or_else(|| TabError::protocol("end_table without start_table"))?;
        self.root.insert(
            Value::String(metadata.name().to_string()),
            Value::Sequence(rows),
        );
        Ok(())
    }

    fn end_dataset(&mut self) -> Result<()> {
        serde_yaml::to_writer(&mut self.out, &Value::Mapping(std::mem::take(&mut self.root)))?;
        Ok(())
    }
}
