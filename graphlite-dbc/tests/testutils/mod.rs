pub mod fake_engine;
pub mod test_fixture;
