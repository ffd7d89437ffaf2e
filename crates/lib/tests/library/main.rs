//! Library integration tests against the repository's fixture templates.

mod fixtures_tests;
