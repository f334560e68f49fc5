//! Analyze command - run data quality checks on a table or file.

use std::sync::Arc;

use colored::Colorize;
use tablecheck::report::{writer_for, ReportInput};
use tablecheck::{
    AppConfig, AuditConfig, AuditResult, DuplicatesConfig, RuleSet, Severity, TableAudit,
};

use crate::cli::AnalyzeArgs;

/// Exit status when `--fail-on` is triggered.
const FAIL_ON_EXIT_CODE: i32 = 2;

pub fn run(
    args: AnalyzeArgs,
    config: &AppConfig,
    verbose: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let audit_config = AuditConfig {
        sample_size: args.sample_size.unwrap_or(config.sample_size),
        random_sample: args.random_sample,
        seed: args.seed,
        validators: args.validators.clone(),
        duplicates: DuplicatesConfig::from_env(),
        ..AuditConfig::default()
    };
    if audit_config.sample_size == 0 {
        return Err("--sample-size must be greater than 0".into());
    }

    let mut audit = TableAudit::with_config(audit_config);
    if let Some(rules) = &args.rules {
        audit = audit.with_rules(RuleSet::from_file(rules)?);
    }

    let result = match (&args.file, &args.table) {
        (Some(file), table) => {
            if !file.exists() {
                return Err(format!("File not found: {}", file.display()).into());
            }
            if !args.json {
                println!("{} {}", "Analyzing".cyan().bold(), file.display().to_string().white());
            }
            match table {
                Some(name) => audit.audit_file_as(file, name)?,
                None => audit.audit_file(file)?,
            }
        }
        (None, Some(table)) => {
            let connector = Arc::new(super::open_database(args.database.clone(), config)?);
            if !args.json {
                println!("{} {}", "Analyzing table".cyan().bold(), table.white());
            }
            audit.with_connector(connector).audit_table(table)?
        }
        (None, None) => return Err("give a TABLE to analyze or a data file with --file".into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.results)?);
    } else {
        print_summary(&result, verbose);
    }

    if !args.reports.is_empty() {
        let dir = args.output.clone().unwrap_or_else(|| config.reports_dir.clone());
        let metadata = result.report_metadata();
        let input = ReportInput::new(&result.table_name, &result.results, &metadata);
        for format in &args.reports {
            let path = writer_for(format)?.write(&dir, &input)?;
            if !args.json {
                println!("{} {}", "Saved report to".green().bold(), path.display().to_string().white());
            } else {
                eprintln!("Saved report to {}", path.display());
            }
        }
    }

    if let Some(threshold) = args.fail_on {
        let failures = result.summary.failures_at_or_above(threshold);
        if failures > 0 {
            eprintln!(
                "{} {} failed checks at {} or above",
                "Failing:".red().bold(),
                failures,
                threshold
            );
            return Ok(FAIL_ON_EXIT_CODE);
        }
    }

    Ok(0)
}

fn print_summary(result: &AuditResult, verbose: bool) {
    let volume = &result.volumetry;
    let sampling = &result.sampling;

    println!();
    println!("{}", "Data volume:".yellow().bold());
    println!("  Rows analyzed:  {}", volume.row_count);
    println!("  Columns:        {}", volume.column_count);
    println!("  Data points:    {}", volume.data_points);
    println!("  Memory (est.):  {:.4} GB", volume.memory_usage_gb);
    if sampling.is_sampled {
        println!(
            "  {} {} of {} rows ({:.1}%)",
            "Sampled".yellow(),
            sampling.analyzed_rows,
            sampling.total_table_rows,
            sampling.sampling_ratio * 100.0
        );
    }

    if verbose {
        println!();
        println!("{}", "Columns:".yellow().bold());
        for column in &result.columns {
            println!("  {}", column);
        }
    }

    let summary = &result.summary;
    println!();
    println!(
        "Ran {} checks: {} passed, {} failed ({:.1}% success)",
        summary.total_checks.to_string().white().bold(),
        summary.passed_checks.to_string().green(),
        summary.failed_checks.to_string().red(),
        summary.success_rate
    );
    for severity in Severity::ALL.iter().rev() {
        let count = summary.issues_by_severity.get(severity.as_str()).copied().unwrap_or(0);
        if count > 0 {
            println!("  {:9} {}", paint(*severity, severity.as_str()), count);
        }
    }

    let failures = result.failures();
    if failures.is_empty() {
        println!();
        println!("{}", "All checks passed".green());
        return;
    }

    println!();
    println!("{}", "Failed checks:".yellow().bold());
    for failure in failures {
        let target = match &failure.column_name {
            Some(column) => format!("{}.{}", failure.table_name, column),
            None => failure.table_name.clone(),
        };
        println!(
            "  [{}] {} {}: {}",
            paint(failure.severity, failure.severity.as_str()),
            failure.rule_name.white().bold(),
            target,
            failure.message
        );
    }
}

fn paint(severity: Severity, text: &str) -> colored::ColoredString {
    match severity {
        Severity::Critical => text.red().bold(),
        Severity::Error => text.red(),
        Severity::Warning => text.yellow(),
        Severity::Info => text.blue(),
    }
}
