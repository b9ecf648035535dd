//! Verbose XML dataset format
//!
//! ```xml
//! <dataset>
//!   <table name="PK_TABLE">
//!     <column>id</column>
//!     <column>val</column>
//!     <row>
//!       <value>0</value>
//!       <null/>
//!     </row>
//!   </table>
//! </dataset>
//! ```
//!
//! `<null/>` is SQL NULL; `<none/>` marks a column with no value in that row.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, TabError};
use crate::model::{CellValue, Column, TableMetadata};
use crate::stream::{DataSetConsumer, DataSetProducer};

/// Streaming producer for the verbose XML form
pub struct XmlProducer {
    path: PathBuf,
}

impl XmlProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn malformed(&self, message: impl Into<String>) -> TabError {
        TabError::format(&self.path, message)
    }
}

struct TableState {
    name: String,
    columns: Vec<Column>,
    started: bool,
}

impl DataSetProducer for XmlProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        let file = File::open(&self.path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();

        let mut in_dataset = false;
        let mut table: Option<TableState> = None;
        let mut row: Option<Vec<CellValue>> = None;
        let mut text: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"dataset" => {
                        in_dataset = true;
                        consumer.start_dataset()?;
                    }
                    b"table" => {
                        if !in_dataset || table.is_some() {
                            return Err(self.malformed("misplaced <table> element"));
                        }
                        let name = attribute(e, b"name")?
                            .ok_or_else(|| self.malformed("<table> is missing a name attribute"))?;
                        table = Some(TableState {
                            name,
                            columns: Vec::new(),
                            started: false,
                        });
                    }
                    b"column" => {
                        text = Some(String::new());
                    }
                    b"row" => {
                        let state = table
                            .as_mut()
                            .ok_or_else(|| self.malformed("<row> outside a table"))?;
                        if !state.started {
                            let metadata =
                                TableMetadata::new(state.name.clone(), state.columns.clone());
                            consumer.start_table(&metadata)?;
                            state.started = true;
                        }
                        row = Some(Vec::new());
                    }
                    b"value" => {
                        if row.is_none() {
                            return Err(self.malformed("<value> outside a row"));
                        }
                        text = Some(String::new());
                    }
                    // Cell markers are normally self-closing but a start/end
                    // pair is accepted too
                    b"null" | b"none" => {
                        let cell = if e.local_name().as_ref() == b"null" {
                            CellValue::Null
                        } else {
                            CellValue::NoValue
                        };
                        row.as_mut()
                            .ok_or_else(|| self.malformed("cell marker outside a row"))?
                            .push(cell);
                    }
                    other => {
                        let name = String::from_utf8_lossy(other).into_owned();
                        return Err(self.malformed(format!("unexpected element <{name}>")));
                    }
                },
                Event::Empty(ref e) => {
                    let cell = match e.local_name().as_ref() {
                        b"value" => Some(CellValue::Str(String::new())),
                        b"null" => Some(CellValue::Null),
                        b"none" => Some(CellValue::NoValue),
                        _ => None,
                    };
                    if let Some(cell) = cell {
                        row.as_mut()
                            .ok_or_else(|| self.malformed("cell marker outside a row"))?
                            .push(cell);
                    }
                }
                Event::Text(ref t) => {
                    if let Some(acc) = text.as_mut() {
                        acc.push_str(&t.unescape()?);
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"column" => {
                        let name = text.take().unwrap_or_default().trim().to_string();
                        let state = table
                            .as_mut()
                            .ok_or_else(|| self.malformed("<column> outside a table"))?;
                        if state.started {
                            return Err(self.malformed("<column> after the first row"));
                        }
                        state.columns.push(Column::untyped(name));
                    }
                    b"value" => {
                        let content = text.take().unwrap_or_default();
                        row.as_mut()
                            .ok_or_else(|| self.malformed("<value> outside a row"))?
                            .push(CellValue::parse_literal(&content));
                    }
                    b"row" => {
                        let cells = row
                            .take()
                            .ok_or_else(|| self.malformed("unbalanced </row>"))?;
                        consumer.row(cells)?;
                    }
                    b"table" => {
                        let state = table
                            .take()
                            .ok_or_else(|| self.malformed("unbalanced </table>"))?;
                        if !state.started {
                            let metadata = TableMetadata::new(state.name, state.columns);
                            consumer.start_table(&metadata)?;
                        }
                        consumer.end_table()?;
                    }
                    b"dataset" => {
                        consumer.end_dataset()?;
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !in_dataset {
            return Err(self.malformed("missing <dataset> root element"));
        }
        Ok(())
    }
}

/// Consumer that writes the verbose XML form
pub struct XmlWriter<W: io::Write> {
    writer: Writer<W>,
}

impl XmlWriter<BufWriter<File>> {
    pub fn to_file(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: io::Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
        }
    }
}

impl<W: io::Write> DataSetConsumer for XmlWriter<W> {
    fn start_dataset(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.writer
            .write_event(Event::Start(BytesStart::new("dataset")))?;
        Ok(())
    }

    fn start_table(&mut self, metadata: &TableMetadata) -> Result<()> {
        let mut table = BytesStart::new("table");
        table.push_attribute(("name", metadata.name()));
        self.writer.write_event(Event::Start(table))?;
        for column in metadata.columns() {
            self.writer
                .write_event(Event::Start(BytesStart::new("column")))?;
            self.writer
                .write_event(Event::Text(BytesText::new(&column.name)))?;
            self.writer
                .write_event(Event::End(BytesEnd::new("column")))?;
        }
        Ok(())
    }

    fn row(&mut self, values: Vec<CellValue>) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new("row")))?;
        for value in &values {
            match value {
                CellValue::Null => {
                    self.writer
                        .write_event(Event::Empty(BytesStart::new("null")))?;
                }
                CellValue::NoValue => {
                    self.writer
                        .write_event(Event::Empty(BytesStart::new("none")))?;
                }
                other => {
                    self.writer
                        .write_event(Event::Start(BytesStart::new("value")))?;
                    self.writer
                        .write_event(Event::Text(BytesText::new(&other.to_text())))?;
                    self.writer
                        .write_event(Event::End(BytesEnd::new("value")))?;
                }
            }
        }
        self.writer.write_event(Event::End(BytesEnd::new("row")))?;
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new("table")))?;
        Ok(())
    }

    fn end_dataset(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new("dataset")))?;
        Ok(())
    }
}

/// Read a single attribute off an element
pub(crate) fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DataSetBuilder;

    fn read_str(xml: &str) -> crate::model::DataSet {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.xml");
        std::fs::write(&path, xml).unwrap();
        let mut producer = XmlProducer::new(&path);
        let mut builder = DataSetBuilder::new();
        producer.produce(&mut builder).unwrap();
        builder.into_dataset().unwrap()
    }

    #[test]
    fn reads_values_nulls_and_none() {
        let ds = read_str(
            r#"<?xml version="1.0"?>
<dataset>
  <table name="PK_TABLE">
    <column>id</column>
    <column>val</column>
    <row><value>0</value><null/></row>
    <row><value>1</value><value>row 1</value></row>
    <row><value>2</value><none/></row>
  </table>
</dataset>"#,
        );
        let table = ds.table("PK_TABLE").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.value(0, "id").unwrap(), &CellValue::Int(0));
        assert_eq!(table.value(0, "val").unwrap(), &CellValue::Null);
        assert_eq!(table.value(1, "val").unwrap(), &CellValue::Str("row 1".into()));
        assert_eq!(table.value(2, "val").unwrap(), &CellValue::NoValue);
    }

    #[test]
    fn empty_table_keeps_columns() {
        let ds = read_str(
            r#"<dataset>
  <table name="EMPTY">
    <column>a</column>
  </table>
</dataset>"#,
        );
        let table = ds.table("EMPTY").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.metadata().column_names(), vec!["a"]);
    }

    #[test]
    fn table_without_name_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xml");
        std::fs::write(&path, "<dataset><table><column>a</column></table></dataset>").unwrap();
        let mut producer = XmlProducer::new(&path);
        let mut builder = DataSetBuilder::new();
        assert!(matches!(
            producer.produce(&mut builder),
            Err(TabError::Format { .. })
        ));
    }
}
