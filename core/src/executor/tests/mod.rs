//! Tests for the executor
//!
//! Organized by feature area

mod control_flow_tests;
mod helpers;
mod stdlib_tests;
mod tools_tests;
