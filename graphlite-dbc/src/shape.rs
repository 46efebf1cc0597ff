// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cursor shape and transaction attribute codes
//!
//! The integer codes match the ones relational drivers use, so callers can
//! pass them through unchanged.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row traversal direction of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultSetType {
    ForwardOnly = 1003,
    ScrollInsensitive = 1004,
    ScrollSensitive = 1005,
}

/// Whether a cursor may be updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Concurrency {
    ReadOnly = 1007,
    Updatable = 1008,
}

/// What happens to open cursors when a transaction commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Holdability {
    HoldOverCommit = 1,
    #[default]
    CloseAtCommit = 2,
}

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    None = 0,
    ReadUncommitted = 1,
    ReadCommitted = 2,
    RepeatableRead = 4,
    Serializable = 8,
}

macro_rules! impl_codes {
    ($ty:ident, $what:literal, [$($variant:ident),+]) => {
        impl $ty {
            pub fn code(self) -> i32 {
                self as i32
            }
        }

        impl TryFrom<i32> for $ty {
            type Error = Error;

            fn try_from(code: i32) -> Result<Self> {
                $(
                    if code == $ty::$variant as i32 {
                        return Ok($ty::$variant);
                    }
                )+
                Err(Error::UnsupportedFeature(format!(
                    "{} {} is not supported",
                    $what, code
                )))
            }
        }
    };
}

impl_codes!(
    ResultSetType,
    "Result set type",
    [ForwardOnly, ScrollInsensitive, ScrollSensitive]
);
impl_codes!(Concurrency, "Result set concurrency", [ReadOnly, Updatable]);
impl_codes!(Holdability, "Result set holdability", [HoldOverCommit, CloseAtCommit]);
impl_codes!(
    IsolationLevel,
    "Transaction isolation level",
    [None, ReadUncommitted, ReadCommitted, RepeatableRead, Serializable]
);

impl FromStr for Holdability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hold" => Ok(Holdability::HoldOverCommit),
            "close" => Ok(Holdability::CloseAtCommit),
            _ => Err(Error::InvalidUrl(format!(
                "Invalid holdability '{}'. Valid options: hold, close",
                s
            ))),
        }
    }
}

/// The three cursor parameters a statement is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorShape {
    pub result_set_type: ResultSetType,
    pub concurrency: Concurrency,
    pub holdability: Holdability,
}

impl CursorShape {
    pub fn new(holdability: Holdability) -> Self {
        Self {
            result_set_type: ResultSetType::ForwardOnly,
            concurrency: Concurrency::ReadOnly,
            holdability,
        }
    }

    /// Validate raw integer codes
    pub fn from_codes(result_set_type: i32, concurrency: i32, holdability: i32) -> Result<Self> {
        Ok(Self {
            result_set_type: ResultSetType::try_from(result_set_type)?,
            concurrency: Concurrency::try_from(concurrency)?,
            holdability: Holdability::try_from(holdability)?,
        })
    }
}

impl Default for CursorShape {
    fn default() -> Self {
        Self::new(Holdability::default())
    }
}
