//! Compiler configuration: option types and the YAML/environment loader

pub mod loader;
pub mod types;
