//! Flat XML dataset format
//!
//! ```xml
//! <dataset>
//!   <PK_TABLE id="0"/>
//!   <PK_TABLE id="1" val="row 1"/>
//!   <EMPTY_TABLE/>
//! </dataset>
//! ```
//!
//! Each element under the root is a row; the element name is the table name
//! and attributes are columns. A missing attribute reads as NULL. Columns are
//! fixed by each table's first row unless column sensing is enabled, in which
//! case new attributes extend the column set and earlier rows are padded.
//! A `<!DOCTYPE dataset SYSTEM "...">` reference supplies authoritative
//! metadata from a DTD.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

use super::dtd;
use crate::error::{Result, TabError};
use crate::model::{CellValue, Column, TableMetadata};
use crate::stream::{DataSetConsumer, DataSetProducer};

/// Streaming producer for the flat XML form
pub struct FlatXmlProducer {
    path: PathBuf,
    column_sensing: bool,
}

impl FlatXmlProducer {
    pub fn new(path: impl Into<PathBuf>, column_sensing: bool) -> Self {
        Self {
            path: path.into(),
            column_sensing,
        }
    }

    fn malformed(&self, message: impl Into<String>) -> TabError {
        TabError::format(&self.path, message)
    }

    /// Resolve a DOCTYPE declaration into table metadata, either from an
    /// external SYSTEM file or an inline subset
    fn resolve_doctype(&self, doctype: &str) -> Result<Vec<TableMetadata>> {
        if let Some(open) = doctype.find('[') {
            let close = doctype
                .rfind(']')
                .ok_or_else(|| self.malformed("unterminated inline DTD subset"))?;
            return dtd::parse_dtd(&doctype[open + 1..close], &self.path);
        }
        if let Some(system) = doctype.find("SYSTEM") {
            let rest = &doctype[system + "SYSTEM".len()..];
            let reference = rest
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();
            let dtd_path = match self.path.parent() {
                Some(parent) => parent.join(&reference),
                None => PathBuf::from(&reference),
            };
            let text = std::fs::read_to_string(&dtd_path)?;
            return dtd::parse_dtd(&text, &dtd_path);
        }
        Ok(Vec::new())
    }
}

struct Section {
    metadata: TableMetadata,
}

impl DataSetProducer for FlatXmlProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        let file = File::open(&self.path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();

        let mut declared: Vec<TableMetadata> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        let mut in_dataset = false;
        let mut section: Option<Section> = None;
        let mut depth = 0usize;

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::DocType(ref t) => {
                    declared = self.resolve_doctype(&t.unescape()?)?;
                }
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if !in_dataset {
                        if e.local_name().as_ref() != b"dataset" {
                            return Err(self.malformed("missing <dataset> root element"));
                        }
                        in_dataset = true;
                        consumer.start_dataset()?;
                        if is_empty {
                            // <dataset/> with no rows
                            flush_unseen(&declared, &seen, consumer)?;
                            consumer.end_dataset()?;
                            return Ok(());
                        }
                    } else {
                        if !is_empty {
                            depth += 1;
                            if depth > 1 {
                                return Err(self.malformed("flat XML rows cannot nest"));
                            }
                        }
                        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                        let attrs = read_attributes(e)?;
                        self.handle_row(consumer, &mut section, &mut seen, &declared, name, attrs)?;
                    }
                }
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"dataset" {
                        if section.take().is_some() {
                            consumer.end_table()?;
                        }
                        flush_unseen(&declared, &seen, consumer)?;
                        consumer.end_dataset()?;
                    } else if depth > 0 {
                        depth -= 1;
                    }
                }
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

impl FlatXmlProducer {
    fn handle_row(
        &self,
        consumer: &mut dyn DataSetConsumer,
        section: &mut Option<Section>,
        seen: &mut Vec<String>,
        declared: &[TableMetadata],
        name: String,
        attrs: Vec<(String, String)>,
    ) -> Result<()> {
        // Exact match only: whether differently-cased sections merge is the
        // dataset's case policy, applied downstream by the builder
        let same_table = section
            .as_ref()
            .map(|s| s.metadata.name() == name)
            .unwrap_or(false);

        if !same_table {
            if section.take().is_some() {
                consumer.end_table()?;
            }
            let metadata = match find_declared(declared, &name) {
                Some(meta) => meta.clone(),
                None => {
                    let columns = attrs
                        .iter()
                        .map(|(key, _)| Column::untyped(key.clone()))
                        .collect();
                    TableMetadata::new(name.clone(), columns)
                }
            };
            consumer.start_table(&metadata)?;
            if !seen.iter().any(|s| s.eq_ignore_ascii_case(&name)) {
                seen.push(name.clone());
            }
            *section = Some(Section { metadata });
        }

        let state = section.as_mut().expect("section was just established");

        // An attribute-less element is the empty-table construct, not a row
        if attrs.is_empty() {
            return Ok(());
        }

        let unknown: Vec<&str> = attrs
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !state.metadata.has_column(key))
            .collect();
        if !unknown.is_empty() {
            if self.column_sensing {
                // Restart the section with the widened column set; the builder
                // merges the sections and pads earlier rows
                let mut columns = state.metadata.columns().to_vec();
                columns.extend(unknown.iter().map(|key| Column::untyped(*key)));
                let widened = TableMetadata::new(state.metadata.name().to_string(), columns);
                consumer.end_table()?;
                consumer.start_table(&widened)?;
                state.metadata = widened;
            } else {
                warn!(
                    table = state.metadata.name(),
                    columns = ?unknown,
                    "ignoring attributes not present in the table's first row"
                );
            }
        }

        let mut cells = vec![CellValue::Null; state.metadata.column_count()];
        for (key, value) in &attrs {
            if let Ok(idx) = state.metadata.column_index(key) {
                cells[idx] = CellValue::parse_literal(value);
            }
        }
        consumer.row(cells)
    }
}

fn find_declared<'a>(declared: &'a [TableMetadata], name: &str) -> Option<&'a TableMetadata> {
    declared.iter().find(|m| m.name().eq_ignore_ascii_case(name))
}

/// Emit empty sections for DTD-declared tables that had no rows
fn flush_unseen(
    declared: &[TableMetadata],
    seen: &[String],
    consumer: &mut dyn DataSetConsumer,
) -> Result<()> {
    for metadata in declared {
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(metadata.name())) {
            consumer.start_table(metadata)?;
            consumer.end_table()?;
        }
    }
    Ok(())
}

fn read_attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

/// Consumer that writes the flat XML form
pub struct FlatXmlWriter<W: io::Write> {
    writer: Writer<W>,
    current: Option<TableMetadata>,
    rows_in_section: usize,
}

impl FlatXmlWriter<BufWriter<File>> {
    pub fn to_file(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: io::Write> FlatXmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
            current: None,
            rows_in_section: 0,
        }
    }
}

impl<W: io::Write> DataSetConsumer for FlatXmlWriter<W> {
    fn start_dataset(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.writer
            .write_event(Event::Start(BytesStart::new("dataset")))?;
        Ok(())
    }

    fn start_table(&mut self, metadata: &TableMetadata) -> Result<()> {
        self.current = Some(metadata.clone());
        self.rows_in_section = 0;
        Ok(())
    }

    fn row(&mut self, values: Vec<CellValue>) -> Result<()> {
        let metadata = self
            .current
            .as_ref()
            .ok_or_else(|| TabError::protocol("row event outside a table"))?;
        let mut element = BytesStart::new(metadata.name());
        for (column, value) in metadata.columns().iter().zip(&values) {
            match value {
                // NULL and no-value are both encoded by attribute absence
                CellValue::Null | CellValue::NoValue => {}
                other => element.push_attribute((column.name.as_str(), other.to_text().as_str())),
            }
        }
        self.writer.write_event(Event::Empty(element))?;
        self.rows_in_section += 1;
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        let metadata = self
            .current
            .take()
            .ok_or_else(|| TabError::protocol("end_table without start_table"))?;
        if self.rows_in_section == 0 {
            self.writer
                .write_event(Event::Empty(BytesStart::new(metadata.name())))?;
        }
        Ok(())
    }

    fn end_dataset(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new("dataset")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DataSetBuilder;

    fn read_str(xml: &str, column_sensing: bool) -> crate::model::DataSet {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.xml");
        std::fs::write(&path, xml).unwrap();
        let mut producer = FlatXmlProducer::new(&path, column_sensing);
        let mut builder = DataSetBuilder::new();
        producer.produce(&mut builder).unwrap();
        builder.into_dataset().unwrap()
    }

    #[test]
    fn reads_rows_and_missing_attributes() {
        let ds = read_str(
            r#"<dataset>
  <PK_TABLE id="0"/>
  <PK_TABLE id="1" val="row 1"/>
</dataset>"#,
            false,
        );
        let table = ds.table("PK_TABLE").unwrap();
        // Columns fixed by the first row; val never declared
        assert_eq!(table.metadata().column_names(), vec!["id"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn column_sensing_extends_columns() {
        let ds = read_str(
            r#"<dataset>
  <PK_TABLE id="0"/>
  <PK_TABLE id="1" val="row 1"/>
</dataset>"#,
            true,
        );
        let table = ds.table("PK_TABLE").unwrap();
        assert_eq!(table.metadata().column_names(), vec!["id", "val"]);
        assert_eq!(table.value(0, "val").unwrap(), &CellValue::NoValue);
        assert_eq!(table.value(1, "val").unwrap(), &CellValue::Str("row 1".into()));
    }

    #[test]
    fn empty_element_is_an_empty_table() {
        let ds = read_str("<dataset><EMPTY_TABLE/></dataset>", false);
        let table = ds.table("EMPTY_TABLE").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.metadata().column_count(), 0);
    }

    #[test]
    fn interleaved_sections_merge() {
        let ds = read_str(
            r#"<dataset>
  <A x="1"/>
  <B y="2"/>
  <A x="3"/>
</dataset>"#,
            false,
        );
        assert_eq!(ds.table_names(), vec!["A", "B"]);
        assert_eq!(ds.table("A").unwrap().row_count(), 2);
    }
}
