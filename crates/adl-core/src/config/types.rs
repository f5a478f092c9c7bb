//! Compiler options
//!
//! All fields have defaults, so a YAML file only needs the keys it changes:
//!
//! ```yaml
//! analyzer_name: susy
//! adapter: CMSNanoAODAdapter
//! search_paths:
//!   - ./headers
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Adapter whose ntuples use the `Events` tree
pub const NANOAOD_ADAPTER: &str = "CMSNanoAODAdapter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Base name of the generated analyzer (`<name>_s`, `<name>.cc`)
    pub analyzer_name: String,
    /// Event adapter mapping tuple branches to `TEParticle`s
    pub adapter: String,
    /// ROOT tree name; derived from the adapter when unset
    pub tree_name: Option<String>,
    /// Directories searched for function headers
    pub search_paths: Vec<PathBuf>,
    /// ADL file name shown in the banner of generated files
    pub source_name: String,
    /// Creation stamp for generated files; omitted when unset
    pub created: Option<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            analyzer_name: "analyzer".to_string(),
            adapter: "DelphesAdapter".to_string(),
            tree_name: None,
            search_paths: Vec::new(),
            source_name: String::new(),
            created: None,
        }
    }
}

impl CompilerOptions {
    pub fn tree_name(&self) -> &str {
        match &self.tree_name {
            Some(name) => name,
            None if self.adapter == NANOAOD_ADAPTER => "Events",
            None => "Delphes",
        }
    }
}
