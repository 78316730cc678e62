//! Built-in language profiles.

pub mod c;
pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;
