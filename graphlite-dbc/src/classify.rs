// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement outcome classification
//!
//! `Statement::execute` has to announce whether a query yields a cursor
//! before it runs. This is a textual heuristic: a query containing the word
//! `RETURN` (any case, whole word) is treated as producing rows. A `RETURN`
//! inside a string literal is also counted; callers who know the intent use
//! `execute_query` or `execute_update` instead.

use once_cell::sync::Lazy;
use regex::Regex;

static RETURN_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bRETURN\b").expect("RETURN clause pattern is valid"));

/// Whether the query text looks like it produces a tabular result
pub fn returns_rows(query: &str) -> bool {
    RETURN_CLAUSE.is_match(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_marks_tabular_output() {
        assert!(returns_rows("MATCH (n:User) RETURN n.name"));
        assert!(returns_rows("match (n) return n"));
        assert!(returns_rows("RETURN 1"));
    }

    #[test]
    fn test_updates_are_counts() {
        assert!(!returns_rows("CREATE (n:Temp)"));
        assert!(!returns_rows("MATCH (n:Returned) DELETE n"));
        assert!(!returns_rows("CREATE (n {returns: 1})"));
    }

    #[test]
    fn test_pattern_is_whole_word_and_case_insensitive() {
        let pattern = Lazy::force(&RETURN_CLAUSE);
        assert!(pattern.is_match("MATCH (n) ReTuRn n"));
        assert!(!pattern.is_match("MATCH (n) RETURNS n"));
        assert!(!pattern.is_match("MATCH (n:NORETURN) DELETE n"));
    }
}
