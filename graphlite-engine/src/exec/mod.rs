// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution

mod eval;
mod executor;
pub mod result;

pub(crate) use executor::execute_query;
pub use result::{QueryResult, QueryStatistics, Row};
