//! Language profiles.
//!
//! The judging core stays language-agnostic. Profiles define how a source
//! file is compiled and run for each language.

pub mod adapter;
pub mod languages;
pub mod registry;
