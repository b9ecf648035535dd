//! Rendering of comparison results

mod json;
mod terminal;

use termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};

use crate::assertion::Mismatch;
use crate::config::ReportFormat;
use crate::error::Result;

pub use json::JsonReport;
pub use terminal::TerminalReport;

/// Mismatch counts by kind
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ReportStats {
    pub tables_missing: usize,
    pub tables_unexpected: usize,
    pub column_mismatches: usize,
    pub row_count_mismatches: usize,
    pub cell_mismatches: usize,
}

impl ReportStats {
    pub fn total(&self) -> usize {
        self.tables_missing
            + self.tables_unexpected
            + self.column_mismatches
            + self.row_count_mismatches
            + self.cell_mismatches
    }
}

/// Result of comparing two datasets, ready for rendering
#[derive(Debug)]
pub struct CompareReport {
    /// Path or label of the expected dataset
    pub expected: String,
    /// Path or label of the actual dataset
    pub actual: String,
    pub mismatches: Vec<Mismatch>,
    pub tables_compared: usize,
}

impl CompareReport {
    pub fn new(
        expected: impl Into<String>,
        actual: impl Into<String>,
        mismatches: Vec<Mismatch>,
        tables_compared: usize,
    ) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            mismatches,
            tables_compared,
        }
    }

    pub fn has_mismatches(&self) -> bool {
        !self.mismatches.is_empty()
    }

    pub fn stats(&self) -> ReportStats {
        let mut stats = ReportStats::default();
        for mismatch in &self.mismatches {
            match mismatch {
                Mismatch::TableMissing { .. } => stats.tables_missing += 1,
                Mismatch::TableUnexpected { .. } => stats.tables_unexpected += 1,
                Mismatch::ColumnsMismatch { .. } => stats.column_mismatches += 1,
                Mismatch::RowCountMismatch { .. } => stats.row_count_mismatches += 1,
                Mismatch::CellMismatch { .. } => stats.cell_mismatches += 1,
            }
        }
        stats
    }
}

/// Trait for report renderers
pub trait ReportRenderer {
    fn render(&self, report: &CompareReport, writer: &mut dyn WriteColor) -> Result<()>;
}

/// Create a renderer for the requested format
pub fn create_renderer(format: ReportFormat) -> Box<dyn ReportRenderer> {
    match format {
        ReportFormat::Terminal => Box::new(TerminalReport::new()),
        ReportFormat::Json => Box::new(JsonReport::new()),
    }
}

/// Render a report to stdout
pub fn render_to_stdout(report: &CompareReport, format: ReportFormat) -> Result<()> {
    let renderer = create_renderer(format);
    match format {
        ReportFormat::Terminal => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            renderer.render(report, &mut stdout)
        }
        ReportFormat::Json => {
            let mut stdout = NoColor::new(std::io::stdout());
            renderer.render(report, &mut stdout)
        }
    }
}
