//! DTD dataset metadata
//!
//! A dataset DTD declares table order in the `dataset` element model and one
//! `ATTLIST` per table giving its columns:
//!
//! ```text
//! <!ELEMENT dataset (PK_TABLE*, EMPTY_TABLE*)>
//! <!ELEMENT PK_TABLE EMPTY>
//! <!ATTLIST PK_TABLE
//!     id CDATA #REQUIRED
//!     val CDATA #IMPLIED
//! >
//! ```
//!
//! `#REQUIRED` attributes map to NOT NULL columns. Reading a `.dtd` yields a
//! dataset of empty tables carrying full metadata; writing exports a dataset's
//! metadata as a DTD.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TabError};
use crate::model::{Column, DataSet, TableMetadata};
use crate::stream::{DataSetConsumer, DataSetProducer};

/// Producer that emits the empty tables a DTD declares
pub struct DtdProducer {
    path: PathBuf,
}

impl DtdProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSetProducer for DtdProducer {
    fn produce(&mut self, consumer: &mut dyn DataSetConsumer) -> Result<()> {
        let text = std::fs::read_to_string(&self.path)?;
        let tables = parse_dtd(&text, &self.path)?;
        consumer.start_dataset()?;
        for metadata in &tables {
            consumer.start_table(metadata)?;
            consumer.end_table()?;
        }
        consumer.end_dataset()
    }
}

/// Parse DTD text into ordered table metadata
pub(crate) fn parse_dtd(text: &str, path: &Path) -> Result<Vec<TableMetadata>> {
    let text = strip_comments(text);
    let mut order: Vec<String> = Vec::new();
    let mut attlists: Vec<(String, Vec<Column>)> = Vec::new();

    for decl in declarations(&text) {
        let tokens = tokenize(decl);
        match tokens.first().map(String::as_str) {
            Some("ELEMENT") => {
                let name = tokens
                    .get(1)
                    .ok_or_else(|| TabError::format(path, "ELEMENT declaration without a name"))?;
                if name.eq_ignore_ascii_case("dataset") {
                    order = element_model_tables(&tokens[2..]);
                }
            }
            Some("ATTLIST") => {
                let table = tokens
                    .get(1)
                    .ok_or_else(|| TabError::format(path, "ATTLIST declaration without a table"))?
                    .clone();
                let mut columns = Vec::new();
                // Attribute declarations come in (name, type, default) triples
                for triple in tokens[2..].chunks(3) {
                    let [name, _ty, default] = triple else {
                        return Err(TabError::format(
                            path,
                            format!("incomplete ATTLIST entry for table {table}"),
                        ));
                    };
                    let nullable = !default.eq_ignore_ascii_case("#REQUIRED");
                    columns.push(Column::untyped(name.clone()).with_nullable(nullable));
                }
                attlists.push((table, columns));
            }
            _ => {}
        }
    }

    let mut tables: Vec<TableMetadata> = Vec::new();
    for name in &order {
        let columns = attlists
            .iter()
            .find(|(table, _)| table.eq_ignore_ascii_case(name))
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default();
        tables.push(TableMetadata::new(name.clone(), columns));
    }
    // ATTLISTs for tables missing from the dataset element model trail behind
    for (name, columns) in attlists {
        if !order.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            tables.push(TableMetadata::new(name, columns));
        }
    }
    Ok(tables)
}

/// Table names from a `dataset` element content model, in declaration order
fn element_model_tables(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .flat_map(|t| t.split(','))
        .map(|t| t.trim_matches(|c: char| c.is_whitespace() || "()*?+|".contains(c)))
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("EMPTY"))
        .map(str::to_string)
        .collect()
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// The contents of each `<!...>` declaration
fn declarations(text: &str) -> impl Iterator<Item = &str> {
    text.split("<!")
        .skip(1)
        .filter_map(|chunk| chunk.find('>').map(|end| &chunk[..end]))
}

/// Split a declaration into whitespace-separated tokens, keeping quoted
/// strings whole
fn tokenize(decl: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in decl.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                    tokens.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c.is_whitespace() {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(c);
                }
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Export a dataset's metadata as a DTD
pub fn write_dtd(dataset: &DataSet, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    let names: Vec<&str> = dataset.table_names();
    let model = names
        .iter()
        .map(|name| format!("{name}*"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "<!ELEMENT dataset ({model})>")?;
    writeln!(out)?;

    for table in dataset.tables() {
        let metadata = table.metadata();
        writeln!(out, "<!ELEMENT {} EMPTY>", metadata.name())?;
        if metadata.column_count() > 0 {
            writeln!(out, "<!ATTLIST {}", metadata.name())?;
            for column in metadata.columns() {
                let default = if column.nullable { "#IMPLIED" } else { "#REQUIRED" };
                writeln!(out, "    {} CDATA {}", column.name, default)?;
            }
            writeln!(out, ">")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!ELEMENT dataset (PK_TABLE*, SECOND_TABLE*, EMPTY_TABLE*)>
<!ELEMENT PK_TABLE EMPTY>
<!ATTLIST PK_TABLE
    id CDATA #REQUIRED
    val CDATA #IMPLIED
>
<!ELEMENT SECOND_TABLE EMPTY>
<!ATTLIST SECOND_TABLE
    key CDATA #REQUIRED
>
<!ELEMENT EMPTY_TABLE EMPTY>
"#;

    #[test]
    fn parses_order_and_columns() {
        let tables = parse_dtd(SAMPLE, Path::new("test.dtd")).unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["PK_TABLE", "SECOND_TABLE", "EMPTY_TABLE"]);

        let pk = &tables[0];
        assert_eq!(pk.column_names(), vec!["id", "val"]);
        assert!(!pk.column("id").unwrap().nullable);
        assert!(pk.column("val").unwrap().nullable);

        assert_eq!(tables[2].column_count(), 0);
    }

    #[test]
    fn comments_are_ignored() {
        let text = "<!-- header --><!ELEMENT dataset (T*)><!-- <!ATTLIST X y CDATA #IMPLIED> -->\n<!ATTLIST T a CDATA #IMPLIED>";
        let tables = parse_dtd(text, Path::new("test.dtd")).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column_names(), vec!["a"]);
    }
}
