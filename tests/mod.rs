//! Integration tests for surfboard
//!
//! Tests are organized by component:
//! - addon_test: single-addon protocol client against a mock server
//! - registry_test: multi-addon fan-out, fallback and merge
//! - commands_test: CLI handlers end to end (exit codes, saved config/library)

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
