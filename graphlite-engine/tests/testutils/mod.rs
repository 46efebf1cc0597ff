//! Test utilities for engine integration tests

pub mod test_fixture;
