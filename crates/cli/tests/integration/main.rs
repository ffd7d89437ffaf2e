//! CLI integration tests: commands run against local fixtures and a mock
//! manifest server.

mod common;
mod generate_tests;
mod versions_tests;
