//! adl2tnm: translate ADL analysis descriptions into TNM analyzers
//!
//! The translation itself lives in [`adl_core`]; this crate adds the parts
//! that touch a TNM project directory.

pub mod scaffold;

pub use adl_core::{compile, compile_file, CompileOutput, CompilerOptions, ConfigLoader};
pub use scaffold::ProjectLayout;
