//! Configuration loader
//!
//! Combines three sources, later ones winning:
//! 1. built-in defaults ([`CompilerOptions::default`])
//! 2. an optional YAML file (`ADL2TNM_CONFIG` or [`ConfigLoader::with_config_file`])
//! 3. the installation directory `LHADA2TNM_PATH`, whose `external/include`
//!    is appended to the header search path
//!
//! Command-line overrides are applied by the caller, which should then run
//! [`validate`] again.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::info;

use super::types::CompilerOptions;

/// Installation directory holding `external/{include,src}`
pub const HOME_VAR: &str = "LHADA2TNM_PATH";
/// Optional YAML configuration file
pub const CONFIG_VAR: &str = "ADL2TNM_CONFIG";

static CPP_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    home: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self {
            home,
            config_file: None,
        }
    }

    /// Create loader from `LHADA2TNM_PATH` and `ADL2TNM_CONFIG`
    pub fn from_env() -> Self {
        let home = std::env::var_os(HOME_VAR).map(PathBuf::from);
        let config_file = std::env::var_os(CONFIG_VAR).map(PathBuf::from);
        Self { home, config_file }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// `$LHADA2TNM_PATH/external`
    pub fn external_dir(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join("external"))
    }

    pub fn load(&self) -> Result<CompilerOptions> {
        let mut options = match &self.config_file {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_yaml::from_str::<CompilerOptions>(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => CompilerOptions::default(),
        };

        if let Some(external) = self.external_dir() {
            let include = external.join("include");
            if !options.search_paths.contains(&include) {
                options.search_paths.push(include);
            }
        }

        validate(&options)?;
        Ok(options)
    }
}

/// Names that end up as C++ identifiers must be valid ones
pub fn validate(options: &CompilerOptions) -> Result<()> {
    if !CPP_IDENTIFIER.is_match(&options.analyzer_name) {
        bail!(
            "analyzer name '{}' is not a valid C++ identifier",
            options.analyzer_name
        );
    }
    if !CPP_IDENTIFIER.is_match(&options.adapter) {
        bail!(
            "event adapter '{}' is not a valid C++ identifier",
            options.adapter
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_home() {
        let loader = ConfigLoader::new(Some(PathBuf::from("/opt/lhada2tnm")));
        let options = loader.load().unwrap();
        assert_eq!(options.analyzer_name, "analyzer");
        assert_eq!(
            options.search_paths,
            vec![PathBuf::from("/opt/lhada2tnm/external/include")]
        );
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adl2tnm.yaml");
        std::fs::write(
            &path,
            "analyzer_name: susy\nadapter: CMSNanoAODAdapter\nsearch_paths: [hdr]\n",
        )
        .unwrap();

        let options = ConfigLoader::new(None).with_config_file(&path).load().unwrap();
        assert_eq!(options.analyzer_name, "susy");
        assert_eq!(options.tree_name(), "Events");
        assert_eq!(options.search_paths, vec![PathBuf::from("hdr")]);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = ConfigLoader::new(None)
            .with_config_file("/nonexistent/adl2tnm.yaml")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_invalid_analyzer_name() {
        let options = CompilerOptions {
            analyzer_name: "my-analyzer".to_string(),
            ..CompilerOptions::default()
        };
        assert!(validate(&options).is_err());
    }
}
