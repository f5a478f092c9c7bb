//! Code emission
//!
//! The compiler stages build an [`AnalyzerUnit`] (pure data, serializable
//! for `--emit-ir`). [`render`] turns the unit into C++ text slots and
//! [`templates`] merges the slots into the three generated files.

pub mod ir;
pub mod render;
pub mod templates;

pub use ir::{
    AnalyzerUnit, BannerEntry, CutCondition, CutUnit, ExternalObject, FilterKind, FilterStep,
    FunctionShim, InfoBanner, ObjectBody, ObjectUnit, ShimParam, VariableDef,
};
pub use templates::{render_files, Fragment, GeneratedFiles};
