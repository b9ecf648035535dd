//! Configuration for dataset comparison

/// Output format for comparison reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(ReportFormat::Terminal),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Configuration for comparing datasets
#[derive(Debug, Clone, Default)]
pub struct CompareConfig {
    /// Treat table names case-sensitively when loading datasets
    pub case_sensitive_tables: bool,
    /// Columns excluded from reconciliation and cell comparison
    pub ignore_columns: Vec<String>,
    /// Tolerance for numeric comparisons
    pub tolerance: Option<f64>,
    /// Report output format
    pub report_format: ReportFormat,
    /// Only show mismatch counts, not detailed failures
    pub stats_only: bool,
}

impl CompareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat table names case-sensitively
    pub fn with_case_sensitive_tables(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_tables = case_sensitive;
        self
    }

    /// Set columns to exclude from comparison
    pub fn with_ignore_columns(mut self, columns: Vec<String>) -> Self {
        self.ignore_columns = columns;
        self
    }

    /// Set numeric tolerance for float comparisons
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set report output format
    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    /// Enable stats-only reporting
    pub fn with_stats_only(mut self, stats_only: bool) -> Self {
        self.stats_only = stats_only;
        self
    }
}
