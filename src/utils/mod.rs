//! Utilities
//!
//! - [`output`]: bounded stdout/stderr collection
//! - [`env_hygiene`]: environment handed to judged programs

pub mod env_hygiene;
pub mod output;
