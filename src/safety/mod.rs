//! Safety and cleanup
//!
//! Submission-scoped workspaces with swallow-and-log cleanup.

pub mod workspace;
