// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query language front end: lexer, AST and parser

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::Query;
pub use parser::parse_query;

use thiserror::Error;

/// Errors produced while turning query text into an AST
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid input '{found}': unexpected character at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("Invalid input '{found}': expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    #[error("Invalid input: unexpected end of query, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("Invalid input: {0}")]
    InvalidQuery(String),
}
