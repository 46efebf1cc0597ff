// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite DBC console entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --verbose wins over --log-level; RUST_LOG still overrides both
    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "GraphLite DBC".bold().green(), graphlite_dbc::VERSION);
            println!("Relational-style connections over an embedded graph database");
            Ok(())
        }

        Commands::Query { url, query, format } => cli::handle_query(&url, &query, format),

        Commands::Console { url } => cli::handle_console(&url),
    }
}
