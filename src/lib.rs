//! judgebox: a submission judging engine
//!
//! Compiles and runs untrusted solutions against a problem's test cases and
//! turns what happened into a verdict. An optional AI-assisted strategy asks
//! a reasoning service for the verdict instead, falling back to execution
//! whenever the service is unavailable.
//!
//! # Architecture
//!
//! ## Judging ([`core`], [`strategy`])
//! - [`core::orchestrator`]: strategy selection, fallback, submission state transitions
//! - [`core::types`]: submissions, problems, test cases, judge reports
//! - [`strategy::traditional`]: compile then run every test case
//! - [`strategy::ai`]: reasoning-service verdicts, error explanations, hints
//!
//! ## Languages ([`judge`])
//! - [`judge::registry`]: language identifier to profile resolution
//! - [`judge::languages`]: built-in Python, JavaScript, C++, C and Java profiles
//!
//! ## Execution ([`exec`])
//! - [`exec::runner`]: process-group runner with time and output ceilings
//! - [`exec::reap`]: `wait4` reaping and group kill
//!
//! ## Verdicts ([`verdict`])
//! - [`verdict::verdict`]: per-case and compile classification, output comparison
//!
//! ## Persistence ([`store`])
//! - [`store::memory`]: in-memory submission store and per-problem/per-user stats
//!
//! ## Safety ([`safety`])
//! - [`safety::workspace`]: private per-submission directories, stale sweep
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: structured judge events
//! - [`observability::metrics`]: Prometheus metrics export
//!
//! ## Configuration ([`config`])
//! - [`config::settings`]: JSON file plus environment overlay
//! - [`config::validator`]: startup validation
//! - [`config::types`]: closed status/verdict sets and the crate error
//!
//! ## Utilities ([`utils`])
//! - [`utils::env_hygiene`]: environment handed to judged programs
//! - [`utils::output`]: bounded stdout/stderr collection

pub mod cli;
pub mod config;
pub mod core;
pub mod exec;
pub mod judge;
pub mod observability;
pub mod safety;
pub mod store;
pub mod strategy;
pub mod utils;
pub mod verdict;

pub use crate::config::settings::{FailurePolicy, JudgeConfig};
pub use crate::config::types::{JudgeError, Result, SubmissionStatus, Verdict};
pub use crate::core::orchestrator::JudgeOrchestrator;
pub use crate::core::types::{JudgeReport, Problem, StrategyKind, Submission, TestCase};
pub use crate::store::{MemoryStore, StatsSink, SubmissionStore};
