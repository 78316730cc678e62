//! Configuration and shared types
//!
//! Judge configuration loading, validation, and the closed type sets
//! (statuses, verdicts, errors) used across the crate.

pub mod settings;
pub mod types;
pub mod validator;
