// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above
    Debug,
    /// Everything including trace
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// GraphLite DBC console
#[derive(Parser)]
#[command(name = "graphlite-dbc")]
#[command(about = "Run queries against GraphLite through connections, statements and cursors")]
#[command(version)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version information
    Version,

    /// Execute one query in its own autocommit connection
    Query {
        /// Database URL, e.g. graphlite:file:./db or graphlite:mem
        url: String,

        /// The query to execute
        query: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Interactive console (REPL)
    Console {
        /// Database URL, e.g. graphlite:file:./db?autocommit=false
        url: String,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_arguments() {
        let cli = Cli::parse_from([
            "graphlite-dbc",
            "-v",
            "query",
            "graphlite:mem",
            "RETURN 1",
            "--format",
            "json",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Query { url, query, format } => {
                assert_eq!(url, "graphlite:mem");
                assert_eq!(query, "RETURN 1");
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected the query command"),
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
