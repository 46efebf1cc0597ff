// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! One-off queries and the interactive console

use super::commands::OutputFormat;
use super::output::{Outcome, ResultFormatter};
use colored::*;
use graphlite_dbc::{
    BackendKind, Connection, ConnectionConfig, ConnectionUrl, Driver, GraphEngine,
};
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::collections::HashMap;
use std::path::Path;

const HISTORY_PATH: &str = ".graphlite/.dbc_history.txt";

/// Console commands that are not queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Exit,
    Clear,
    AutoCommit(bool),
    Commit,
    Rollback,
    Valid(i64),
}

impl MetaCommand {
    /// `None` when the line is not a meta command
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let mut words = line.trim().trim_end_matches(';').split_whitespace();
        let head = words.next()?.to_lowercase();
        let arg = words.next();

        let command = match head.as_str() {
            "help" => Ok(MetaCommand::Help),
            "exit" | "quit" => Ok(MetaCommand::Exit),
            "clear" => Ok(MetaCommand::Clear),
            ":commit" => Ok(MetaCommand::Commit),
            ":rollback" => Ok(MetaCommand::Rollback),
            ":autocommit" => match arg.map(str::to_lowercase).as_deref() {
                Some("on") => Ok(MetaCommand::AutoCommit(true)),
                Some("off") => Ok(MetaCommand::AutoCommit(false)),
                _ => Err("usage: :autocommit on|off".to_string()),
            },
            ":valid" => match arg {
                None => Ok(MetaCommand::Valid(0)),
                Some(secs) => secs
                    .parse()
                    .map(MetaCommand::Valid)
                    .map_err(|_| format!("invalid timeout '{}'", secs)),
            },
            other if other.starts_with(':') => Err(format!("unknown command '{}'", other)),
            _ => return None,
        };
        Some(command)
    }
}

/// Handle the query command (one-off query execution)
pub fn handle_query(
    url: &str,
    query: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = Driver::new();
    let result = match backend_of(url)? {
        BackendKind::Embedded => {
            let conn = driver
                .connect(url, &HashMap::new())?
                .ok_or_else(|| format!("Not a GraphLite URL: {}", url))?;
            run_once(&conn, query, format)
        }
        BackendKind::Session => {
            let conn = driver.connect_session(url, &HashMap::new())?;
            run_once(&conn, query, format)
        }
    };
    driver.registry().shutdown_all()?;
    result
}

fn run_once<E: GraphEngine>(
    conn: &Connection<E>,
    query: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stmt = conn.create_statement()?;
    let outcome = Outcome::run(&mut stmt, query);
    match outcome {
        Ok(outcome) => {
            println!("{}", ResultFormatter::format(&outcome, format));
            if !conn.get_auto_commit()? {
                conn.commit()?;
            }
            conn.close()?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            Err(e.into())
        }
    }
}

/// Handle the console command (interactive REPL)
pub fn handle_console(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let driver = Driver::new();
    let result = match backend_of(url)? {
        BackendKind::Embedded => {
            let conn = driver
                .connect(url, &HashMap::new())?
                .ok_or_else(|| format!("Not a GraphLite URL: {}", url))?;
            run_console(conn, url)
        }
        BackendKind::Session => run_console(driver.connect_session(url, &HashMap::new())?, url),
    };
    driver.registry().shutdown_all()?;
    result
}

fn backend_of(url: &str) -> Result<BackendKind, Box<dyn std::error::Error>> {
    let parsed = ConnectionUrl::parse(url)?;
    Ok(ConnectionConfig::from_properties(&parsed.properties, &HashMap::new())?.backend)
}

fn run_console<E: GraphEngine>(
    conn: Connection<E>,
    url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "GraphLite DBC".bold().green());
    println!("Connected to {}", url.cyan());
    println!("Type 'help' for commands, 'exit' or 'quit' to exit");
    println!("Multi-line queries supported - use ';' to terminate\n");

    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();
    let mut rl = Editor::<(), _>::with_config(config)?;

    if let Some(parent) = Path::new(HISTORY_PATH).parent() {
        std::fs::create_dir_all(parent)?;
    }
    if rl.load_history(HISTORY_PATH).is_err() {
        log::debug!("no console history at {}", HISTORY_PATH);
    }

    let mut stmt = conn.create_statement()?;
    let mut query_buffer = String::new();

    loop {
        let mode = if conn.get_auto_commit()? { "auto" } else { "tx" };
        let prompt = if query_buffer.is_empty() {
            format!("{}> ", mode.cyan())
        } else {
            format!("{}...> ", mode.cyan())
        };

        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if !query_buffer.is_empty() {
                    query_buffer.clear();
                    println!("{}", "\nQuery buffer cleared".yellow());
                }
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();
        if query_buffer.is_empty() {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(command) = MetaCommand::parse(trimmed) {
                match command {
                    Ok(MetaCommand::Exit) => break,
                    Ok(command) => run_meta(&conn, command),
                    Err(message) => eprintln!("{}", message.red()),
                }
                continue;
            }
        }

        query_buffer.push_str(&line);
        query_buffer.push('\n');

        if trimmed.ends_with(';') {
            let query = query_buffer.trim().trim_end_matches(';').trim().to_string();
            rl.add_history_entry(query_buffer.trim())?;
            query_buffer.clear();

            match Outcome::run(&mut stmt, &query) {
                Ok(outcome) => println!("{}", ResultFormatter::format(&outcome, OutputFormat::Table)),
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            }
        }
    }

    if let Err(e) = rl.save_history(HISTORY_PATH) {
        log::warn!("could not save console history: {}", e);
    }

    stmt.close()?;
    if conn.has_uncommitted_work() {
        println!("{}", "Rolling back uncommitted work".yellow());
        conn.rollback()?;
    }
    conn.close()?;
    println!("{}", "Goodbye!".green());
    Ok(())
}

fn run_meta<E: GraphEngine>(conn: &Connection<E>, command: MetaCommand) {
    let outcome = match command {
        MetaCommand::Help => {
            print_help();
            Ok(())
        }
        MetaCommand::Clear => {
            print!("\x1B[2J\x1B[1;1H");
            Ok(())
        }
        MetaCommand::AutoCommit(enable) => conn.set_auto_commit(enable).map(|()| {
            println!("autocommit {}", if enable { "on" } else { "off" });
        }),
        MetaCommand::Commit => conn.commit().map(|()| println!("{}", "Committed".green())),
        MetaCommand::Rollback => conn
            .rollback()
            .map(|()| println!("{}", "Rolled back".yellow())),
        MetaCommand::Valid(timeout) => conn.is_valid(timeout).map(|valid| {
            if valid {
                println!("{}", "Connection is valid".green());
            } else {
                println!("{}", "Connection is not valid".red());
            }
        }),
        MetaCommand::Exit => Ok(()),
    };
    if let Err(e) = outcome {
        eprintln!("{}", format!("Error: {}", e).red());
    }
}

fn print_help() {
    println!("{}", "Commands".bold());
    println!("  help                 show this help");
    println!("  exit | quit          leave the console");
    println!("  clear                clear the screen");
    println!("  :autocommit on|off   switch autocommit");
    println!("  :commit              commit the open transaction");
    println!("  :rollback            roll back the open transaction");
    println!("  :valid [seconds]     probe the connection");
    println!();
    println!("Queries end with ';' and may span several lines.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_commands() {
        assert_eq!(MetaCommand::parse("help"), Some(Ok(MetaCommand::Help)));
        assert_eq!(MetaCommand::parse("QUIT"), Some(Ok(MetaCommand::Exit)));
        assert_eq!(
            MetaCommand::parse(":autocommit off"),
            Some(Ok(MetaCommand::AutoCommit(false)))
        );
        assert_eq!(MetaCommand::parse(":commit;"), Some(Ok(MetaCommand::Commit)));
        assert_eq!(MetaCommand::parse(":valid 3"), Some(Ok(MetaCommand::Valid(3))));
        assert_eq!(MetaCommand::parse(":valid"), Some(Ok(MetaCommand::Valid(0))));
        assert!(matches!(MetaCommand::parse(":autocommit"), Some(Err(_))));
        assert!(matches!(MetaCommand::parse(":nope"), Some(Err(_))));
    }

    #[test]
    fn test_queries_are_not_meta_commands() {
        assert_eq!(MetaCommand::parse("MATCH (n) RETURN n;"), None);
        assert_eq!(MetaCommand::parse("CREATE (:Help)"), None);
    }

    #[test]
    fn test_outcome_through_connection() {
        let driver = Driver::with_registry(std::sync::Arc::new(
            graphlite_dbc::DatabaseRegistry::new(),
        ));
        let conn = driver
            .connect("graphlite:mem", &HashMap::new())
            .unwrap()
            .unwrap();
        let mut stmt = conn.create_statement().unwrap();
        assert_eq!(
            Outcome::run(&mut stmt, "CREATE (:N {v: 1})").unwrap(),
            Outcome::Updated(1)
        );
        match Outcome::run(&mut stmt, "MATCH (n:N) RETURN n.v").unwrap() {
            Outcome::Rows(rows) => {
                assert_eq!(rows.columns, vec!["n.v".to_string()]);
                assert_eq!(rows.rows, vec![vec![graphlite_dbc::Value::Integer(1)]]);
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }
}
