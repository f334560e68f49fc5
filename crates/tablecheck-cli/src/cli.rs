//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tablecheck::Severity;

/// Tablecheck: rule-based data quality validation for database tables
#[derive(Parser)]
#[command(name = "tablecheck")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the database can be opened and queried
    TestConnection {
        /// SQLite database file (default: TABLECHECK_DATABASE)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List the tables of a database
    ListTables {
        /// SQLite database file (default: TABLECHECK_DATABASE)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Show exact row counts
        #[arg(long)]
        real_count: bool,
    },

    /// Describe the columns of a table
    Describe {
        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,

        /// SQLite database file (default: TABLECHECK_DATABASE)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Run data quality checks on a table or file
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args)]
pub struct AnalyzeArgs {
    /// Table name (defaults to the file stem with --file)
    #[arg(value_name = "TABLE")]
    pub table: Option<String>,

    /// SQLite database file (default: TABLECHECK_DATABASE)
    #[arg(short, long, conflicts_with = "file")]
    pub database: Option<PathBuf>,

    /// Delimited data file (CSV/TSV) to analyze instead of a table
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Validators to run (repeatable; default: all)
    #[arg(short = 'V', long = "validator", value_parser = ["completeness", "duplicates", "integrity", "patterns"])]
    pub validators: Vec<String>,

    /// Maximum rows to analyze (default: TABLECHECK_SAMPLE_SIZE or 10000)
    #[arg(short, long)]
    pub sample_size: Option<usize>,

    /// Sample rows at random instead of taking the first rows
    #[arg(long)]
    pub random_sample: bool,

    /// Seed for --random-sample
    #[arg(long, requires = "random_sample")]
    pub seed: Option<u64>,

    /// JSON rules file
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Report formats to write (repeatable)
    #[arg(short, long = "report", value_parser = ["json", "txt"])]
    pub reports: Vec<String>,

    /// Report output directory (default: TABLECHECK_REPORTS_DIR or reports)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print results as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when a failed check reaches this severity
    #[arg(long, value_name = "SEVERITY")]
    pub fail_on: Option<Severity>,
}
