//! Execution control
//!
//! Runs judged programs in their own process group with wall-clock and
//! output ceilings, and reaps them with resource usage.

pub mod reap;
pub mod runner;
