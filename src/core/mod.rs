//! Judging core.
//!
//! Core owns the submission lifecycle: the data model, strategy selection,
//! AI fallback and the only writes of submission state. Language-specific
//! compile/run logic lives in judge profiles.

pub mod orchestrator;
pub mod types;
