//! Unit tests for wirebox components
//!
//! Each test file focuses on a single component's behavior and edge cases.
//! Container-level behavior is covered by the top-level integration tests.

pub mod provider_tests;
pub mod scanner_tests;
pub mod token_tests;
