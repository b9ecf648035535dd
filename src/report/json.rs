//! JSON report format

use std::io::Write;

use serde::Serialize;
use termcolor::WriteColor;

use crate::assertion::Mismatch;
use crate::error::Result;

use super::{CompareReport, ReportRenderer, ReportStats};

/// JSON report renderer
#[derive(Debug)]
pub struct JsonReport {
    pretty: bool,
}

impl JsonReport {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    expected: &'a str,
    actual: &'a str,
    tables_compared: usize,
    stats: ReportStats,
    mismatches: &'a [Mismatch],
}

impl ReportRenderer for JsonReport {
    fn render(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()> {
        let output = JsonOutput {
            expected: &report.expected,
            actual: &report.actual,
            tables_compared: report.tables_compared,
            stats: report.stats(),
            mismatches: &report.mismatches,
        };
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;
    use termcolor::NoColor;

    #[test]
    fn mismatches_are_tagged_by_kind() {
        let report = CompareReport::new(
            "a.xml",
            "b.xml",
            vec![
                Mismatch::TableMissing {
                    table: "GONE".into(),
                },
                Mismatch::CellMismatch {
                    table: "T".into(),
                    column: "c".into(),
                    row: 0,
                    expected: CellValue::Int(1),
                    actual: CellValue::Null,
                },
            ],
            2,
        );
        let mut out = NoColor::new(Vec::new());
        JsonReport::compact().render(&report, &mut out).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["mismatches"][0]["kind"], "table_missing");
        assert_eq!(value["mismatches"][1]["kind"], "cell_mismatch");
        assert_eq!(value["mismatches"][1]["expected"], 1);
        assert_eq!(value["mismatches"][1]["actual"], serde_json::Value::Null);
        assert_eq!(value["stats"]["cell_mismatches"], 1);
    }
}
