//! tabunit - dataset fixtures and table assertions for database testing

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use tabunit::assertion::compare_datasets;
use tabunit::config::{CompareConfig, ReportFormat};
use tabunit::format::{read_dataset_with, write_dataset, ReadOptions};
use tabunit::ops::{Operation, ScriptExecutor};
use tabunit::report::{render_to_stdout, CompareReport};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliReportFormat {
    Terminal,
    Json,
}

impl From<CliReportFormat> for ReportFormat {
    fn from(f: CliReportFormat) -> Self {
        match f {
            CliReportFormat::Terminal => ReportFormat::Terminal,
            CliReportFormat::Json => ReportFormat::Json,
        }
    }
}

/// Dataset fixtures and table assertions for database testing
#[derive(Parser, Debug)]
#[command(name = "tabunit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two datasets and report mismatches
    Compare {
        /// Expected dataset (file or CSV directory)
        expected: PathBuf,

        /// Actual dataset (file or CSV directory)
        actual: PathBuf,

        /// Report output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliReportFormat,

        /// Treat table names case-sensitively
        #[arg(long)]
        case_sensitive: bool,

        /// Column(s) to ignore in comparison (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ignore_column: Vec<String>,

        /// Tolerance for numeric comparisons (e.g., 0.001)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Flat XML: extend column sets as new attributes appear
        #[arg(long)]
        column_sensing: bool,

        /// Only show mismatch counts, not detailed failures
        #[arg(long)]
        stats_only: bool,
    },

    /// Convert a dataset between formats
    Convert {
        /// Input dataset (file or CSV directory)
        input: PathBuf,

        /// Output path; the extension picks the format (a directory writes CSV)
        output: PathBuf,

        /// Flat XML: extend column sets as new attributes appear
        #[arg(long)]
        column_sensing: bool,
    },

    /// Render a database operation for a dataset as a SQL script
    Sql {
        /// Dataset to apply (file or CSV directory)
        dataset: PathBuf,

        /// Operation to render
        #[arg(short, long, default_value = "clean-insert")]
        operation: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(mismatches_found) => {
            if mismatches_found {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compare {
            expected,
            actual,
            format,
            case_sensitive,
            ignore_column,
            tolerance,
            column_sensing,
            stats_only,
        } => {
            let options = ReadOptions {
                column_sensing,
                case_sensitive_table_names: case_sensitive,
            };
            let expected_ds = read_dataset_with(&expected, &options)
                .with_context(|| format!("Failed to read expected dataset: {}", expected.display()))?;
            let actual_ds = read_dataset_with(&actual, &options)
                .with_context(|| format!("Failed to read actual dataset: {}", actual.display()))?;

            let mut config = CompareConfig::new()
                .with_case_sensitive_tables(case_sensitive)
                .with_ignore_columns(ignore_column)
                .with_report_format(format.into())
                .with_stats_only(stats_only);
            if let Some(tolerance) = tolerance {
                config = config.with_tolerance(tolerance);
            }

            let mismatches = compare_datasets(&expected_ds, &actual_ds, &config)?;
            let report = CompareReport::new(
                expected.display().to_string(),
                actual.display().to_string(),
                mismatches,
                expected_ds.table_count(),
            );

            if config.stats_only {
                let stats = report.stats();
                println!("Expected: {} ({} tables)", expected.display(), expected_ds.table_count());
                println!("Actual:   {} ({} tables)", actual.display(), actual_ds.table_count());
                println!();
                println!("Tables missing:    {}", stats.tables_missing);
                println!("Tables unexpected: {}", stats.tables_unexpected);
                println!("Column mismatches: {}", stats.column_mismatches);
                println!("Row count issues:  {}", stats.row_count_mismatches);
                println!("Cell mismatches:   {}", stats.cell_mismatches);
                return Ok(report.has_mismatches());
            }

            render_to_stdout(&report, config.report_format)?;
            Ok(report.has_mismatches())
        }

        Command::Convert {
            input,
            output,
            column_sensing,
        } => {
            let options = ReadOptions {
                column_sensing,
                ..Default::default()
            };
            let dataset = read_dataset_with(&input, &options)
                .with_context(|| format!("Failed to read dataset: {}", input.display()))?;
            write_dataset(&dataset, &output)
                .with_context(|| format!("Failed to write dataset: {}", output.display()))?;
            Ok(false)
        }

        Command::Sql { dataset, operation } => {
            let op: Operation = operation
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            if op == Operation::Refresh {
                bail!("refresh depends on per-row update results and cannot be scripted");
            }
            let ds = read_dataset_with(&dataset, &ReadOptions::default())
                .with_context(|| format!("Failed to read dataset: {}", dataset.display()))?;
            let stdout = std::io::stdout();
            let mut executor = ScriptExecutor::new(stdout.lock());
            op.apply(&ds, &mut executor)?;
            Ok(false)
        }
    }
}
