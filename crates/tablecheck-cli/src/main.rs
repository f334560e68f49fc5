//! Tablecheck CLI - data quality validation for database tables.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use tablecheck::AppConfig;

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        cli.log_level.clone().unwrap_or_else(|| config.log_level.clone())
    };
    logging::init(&log_level);

    let result = match cli.command {
        Commands::TestConnection { database } => {
            commands::test_connection::run(database, &config, cli.verbose).map(|()| 0)
        }
        Commands::ListTables {
            database,
            real_count,
        } => commands::list_tables::run(database, real_count, &config).map(|()| 0),
        Commands::Describe { table, database } => {
            commands::describe::run(table, database, &config).map(|()| 0)
        }
        Commands::Analyze(args) => commands::analyze::run(args, &config, cli.verbose),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
