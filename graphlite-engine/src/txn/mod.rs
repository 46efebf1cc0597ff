// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management
//!
//! Transactions run at READ_COMMITTED: a statement sees data committed before
//! it started plus the uncommitted changes of its own transaction.

pub mod state;
pub mod transaction;

pub use state::{TransactionId, TransactionStatus};
pub use transaction::Transaction;
