//! Header lookup for function blocks
//!
//! The compiler never touches the file system directly; it asks a
//! [`HeaderResolver`] to locate and read the header named by `code`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A located header
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolvedHeader {
    /// Where the header can be read
    pub path: PathBuf,
    /// Spelling used in `#include "..."`
    pub include: String,
}

pub trait HeaderResolver {
    fn resolve(&self, file: &str) -> Option<ResolvedHeader>;
    fn read(&self, header: &ResolvedHeader) -> io::Result<String>;
}

// =============================================================================
// File system
// =============================================================================

/// Looks a header up as given, then under each search path and its
/// `include/` subdirectory.
#[derive(Debug, Clone, Default)]
pub struct FsHeaderResolver {
    search_paths: Vec<PathBuf>,
}

impl FsHeaderResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn include_name(&self, path: &Path) -> String {
        self.search_paths
            .iter()
            .find_map(|dir| path.strip_prefix(dir).ok())
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

impl HeaderResolver for FsHeaderResolver {
    fn resolve(&self, file: &str) -> Option<ResolvedHeader> {
        let direct = Path::new(file);
        if direct.is_file() {
            return Some(ResolvedHeader {
                path: direct.to_path_buf(),
                include: self.include_name(direct),
            });
        }

        self.search_paths.iter().find_map(|dir| {
            [dir.join(file), dir.join("include").join(file)]
                .into_iter()
                .find(|candidate| candidate.is_file())
                .map(|path| ResolvedHeader {
                    path,
                    include: file.to_string(),
                })
        })
    }

    fn read(&self, header: &ResolvedHeader) -> io::Result<String> {
        std::fs::read_to_string(&header.path)
    }
}

// =============================================================================
// In memory
// =============================================================================

/// Header contents keyed by the name used in `code` statements
#[derive(Debug, Clone, Default)]
pub struct InMemoryHeaders {
    files: HashMap<String, String>,
}

impl InMemoryHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(name.into(), contents.into());
        self
    }
}

impl HeaderResolver for InMemoryHeaders {
    fn resolve(&self, file: &str) -> Option<ResolvedHeader> {
        self.files.contains_key(file).then(|| ResolvedHeader {
            path: PathBuf::from(file),
            include: file.to_string(),
        })
    }

    fn read(&self, header: &ResolvedHeader) -> io::Result<String> {
        self.files.get(&header.include).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, header.include.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_and_include_subdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("include")).unwrap();
        std::fs::write(dir.path().join("include/kinematics.h"), "double HT();").unwrap();

        let resolver = FsHeaderResolver::new(vec![dir.path().to_path_buf()]);
        let header = resolver.resolve("kinematics.h").unwrap();
        assert_eq!(header.include, "kinematics.h");
        assert_eq!(header.path, dir.path().join("include/kinematics.h"));
        assert_eq!(resolver.read(&header).unwrap(), "double HT();");

        assert!(resolver.resolve("missing.h").is_none());
    }

    #[test]
    fn test_direct_path_is_relative_to_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("deltaR.h");
        std::fs::write(&file, "double deltaR();").unwrap();

        let resolver = FsHeaderResolver::new(vec![dir.path().to_path_buf()]);
        let header = resolver.resolve(file.to_str().unwrap()).unwrap();
        assert_eq!(header.include, "deltaR.h");
    }

    #[test]
    fn test_in_memory() {
        let headers = InMemoryHeaders::new().with("a.h", "int a();");
        let header = headers.resolve("a.h").unwrap();
        assert_eq!(headers.read(&header).unwrap(), "int a();");
        assert!(headers.resolve("b.h").is_none());
    }
}
