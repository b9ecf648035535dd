//! Dataset file formats: detection, reading and writing
//!
//! Reading goes through the streaming protocol: each format implements
//! [`DataSetProducer`](crate::stream::DataSetProducer) and is driven into a
//! [`DataSetBuilder`](crate::stream::DataSetBuilder). Writers implement
//! [`DataSetConsumer`](crate::stream::DataSetConsumer) and are fed from a
//! [`DataSetSource`](crate::stream::DataSetSource).

mod csv;
mod dtd;
mod excel;
mod flat_xml;
mod xml;
mod yaml;

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Result, TabError};
use crate::model::DataSet;
use crate::stream::{DataSetBuilder, DataSetProducer, DataSetSource};

pub use self::csv::{CsvDirProducer, CsvDirWriter, TABLE_ORDERING_FILE};
pub use self::dtd::{DtdProducer, write_dtd};
pub use self::excel::ExcelProducer;
pub use self::flat_xml::{FlatXmlProducer, FlatXmlWriter};
pub use self::xml::{XmlProducer, XmlWriter};
pub use self::yaml::{YamlProducer, YamlWriter};

/// Supported dataset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Verbose XML: `dataset/table/column|row/value|null|none`
    Xml,
    /// Flat XML: one element per row, attributes as columns
    FlatXml,
    /// DTD metadata: empty tables with full column declarations
    Dtd,
    /// Directory of CSV files plus a table-ordering file
    Csv,
    /// Excel workbook, one sheet per table
    Excel,
    /// YAML mapping from table name to row sequences
    Yaml,
}

/// Options controlling dataset reading
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Flat XML: extend a table's column set as new attributes appear instead
    /// of fixing it from the first row
    pub column_sensing: bool,
    /// Treat table names case-sensitively
    pub case_sensitive_table_names: bool,
}

/// Detect the dataset format of a path
pub fn detect_format(path: &Path) -> Result<DataFormat> {
    if path.is_dir() {
        return Ok(DataFormat::Csv);
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "xml" => detect_xml_flavor(path),
        "dtd" => Ok(DataFormat::Dtd),
        "xlsx" | "xls" | "xlsm" | "ods" => Ok(DataFormat::Excel),
        "yml" | "yaml" => Ok(DataFormat::Yaml),
        "csv" => Err(TabError::UnsupportedFormat(
            "CSV datasets are directories containing one .csv file per table".to_string(),
        )),
        other => Err(TabError::UnsupportedFormat(other.to_string())),
    }
}

/// Distinguish the verbose and flat XML forms by the first element under the
/// document root: `<table>` means verbose, anything else is a flat row
fn detect_xml_flavor(path: &Path) -> Result<DataFormat> {
    let mut reader = Reader::from_file(path)?;
    let mut buf = Vec::new();
    let mut saw_root = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if saw_root {
                    let flavor = if e.local_name().as_ref() == b"table" {
                        DataFormat::Xml
                    } else {
                        DataFormat::FlatXml
                    };
                    return Ok(flavor);
                }
                saw_root = true;
            }
            Event::Eof => return Ok(DataFormat::FlatXml),
            _ => {}
        }
        buf.clear();
    }
}

/// Read a dataset from a path, detecting the format
pub fn read_dataset(path: &Path) -> Result<DataSet> {
    read_dataset_with(path, &ReadOptions::default())
}

/// Read a dataset with explicit options
pub fn read_dataset_with(path: &Path, options: &ReadOptions) -> Result<DataSet> {
    let format = detect_format(path)?;
    debug!(path = %path.display(), ?format, "reading dataset");

    let mut producer: Box<dyn DataSetProducer> = match format {
        DataFormat::Xml => Box::new(XmlProducer::new(path)),
        DataFormat::FlatXml => Box::new(FlatXmlProducer::new(path, options.column_sensing)),
        DataFormat::Dtd => Box::new(DtdProducer::new(path)),
        DataFormat::Csv => Box::new(CsvDirProducer::new(path)),
        DataFormat::Excel => Box::new(ExcelProducer::new(path)),
        DataFormat::Yaml => Box::new(YamlProducer::new(path)),
    };

    let seed = if options.case_sensitive_table_names {
        DataSet::case_sensitive()
    } else {
        DataSet::new()
    };
    let mut builder = DataSetBuilder::for_dataset(seed);
    producer.produce(&mut builder)?;
    let mut dataset = builder.into_dataset()?;
    dataset.infer_column_types();
    Ok(dataset)
}

/// Write a dataset to a path, picking the format from the extension
/// (`.xml` writes the flat form; a directory path writes CSV)
pub fn write_dataset(dataset: &DataSet, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let format = if ext.is_empty() {
        DataFormat::Csv
    } else {
        match ext.as_str() {
            "xml" => DataFormat::FlatXml,
            "dtd" => DataFormat::Dtd,
            "yml" | "yaml" => DataFormat::Yaml,
            "xlsx" | "xls" | "xlsm" | "ods" => DataFormat::Excel,
            other => return Err(TabError::UnsupportedFormat(other.to_string())),
        }
    };
    write_dataset_as(dataset, path, format)
}

/// Write a dataset in an explicit format
pub fn write_dataset_as(dataset: &DataSet, path: &Path, format: DataFormat) -> Result<()> {
    debug!(path = %path.display(), ?format, tables = dataset.table_count(), "writing dataset");
    let mut source = DataSetSource::new(dataset);
    match format {
        DataFormat::Xml => {
            let mut writer = XmlWriter::to_file(path)?;
            source.produce(&mut writer)
        }
        DataFormat::FlatXml => {
            let mut writer = FlatXmlWriter::to_file(path)?;
            source.produce(&mut writer)
        }
        DataFormat::Dtd => write_dtd(dataset, path),
        DataFormat::Csv => {
            let mut writer = CsvDirWriter::new(path);
            source.produce(&mut writer)
        }
        DataFormat::Yaml => {
            let mut writer = YamlWriter::to_file(path)?;
            source.produce(&mut writer)
        }
        DataFormat::Excel => Err(TabError::UnsupportedFormat(
            "Excel workbooks are read-only".to_string(),
        )),
    }
}
