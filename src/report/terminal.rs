//! Colored terminal report

use std::io::Write;

use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::assertion::Mismatch;
use crate::error::Result;

use super::{CompareReport, ReportRenderer};

/// Terminal report with colors
#[derive(Debug, Default)]
pub struct TerminalReport;

impl TerminalReport {
    pub fn new() -> Self {
        Self
    }

    fn write_header(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()> {
        writeln!(
            writer,
            "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
        )?;
        writeln!(writer, " tabunit: {} vs {}", report.expected, report.actual)?;
        writeln!(
            writer,
            "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
        )?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_summary(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()> {
        let stats = report.stats();
        writer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        writeln!(
            writer,
            "{} mismatch(es) across {} table(s)",
            stats.total(),
            report.tables_compared
        )?;
        writer.reset()?;
        writeln!(
            writer,
            "  tables missing: {}, unexpected: {}, column sets: {}, row counts: {}, cells: {}",
            stats.tables_missing,
            stats.tables_unexpected,
            stats.column_mismatches,
            stats.row_count_mismatches,
            stats.cell_mismatches
        )?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_structural(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()> {
        let structural: Vec<&Mismatch> = report
            .mismatches
            .iter()
            .filter(|m| !matches!(m, Mismatch::CellMismatch { .. }))
            .collect();
        if structural.is_empty() {
            return Ok(());
        }
        writeln!(writer, "Structural Mismatches:")?;
        for mismatch in structural {
            writeln!(writer, "  {}", mismatch)?;
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_cells(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()> {
        let cells: Vec<&Mismatch> = report
            .mismatches
            .iter()
            .filter(|m| matches!(m, Mismatch::CellMismatch { .. }))
            .collect();
        if cells.is_empty() {
            return Ok(());
        }

        writeln!(writer, "Cell Mismatches:")?;
        let mut builder = Builder::default();
        builder.push_record(["table", "column", "row", "expected", "actual"]);
        for mismatch in cells {
            if let Mismatch::CellMismatch {
                table,
                column,
                row,
                expected,
                actual,
            } = mismatch
            {
                builder.push_record([
                    table.clone(),
                    column.clone(),
                    row.to_string(),
                    expected.display().into_owned(),
                    actual.display().into_owned(),
                ]);
            }
        }
        let mut table = builder.build();
        table.with(Style::sharp());
        writeln!(writer, "{}", table)?;
        Ok(())
    }
}

impl ReportRenderer for TerminalReport {
    fn render(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()> {
        self.write_header(report, writer)?;

        if !report.has_mismatches() {
            writer.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            writeln!(writer, "No differences found.")?;
            writer.reset()?;
            return Ok(());
        }

        self.write_summary(report, writer)?;
        self.write_structural(report, writer)?;
        self.write_cells(report, writer)?;
        Ok(())
    }
}
