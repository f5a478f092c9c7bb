//! TNM project scaffolding
//!
//! A TNM analysis directory (created by `mkanalyzer`) looks like:
//!
//! ```text
//! <project>/
//!   Makefile
//!   include/linkdef.h
//!   include/          <- TEParticle.h, <adapter>.h, function headers, <name>_s.h
//!   src/              <- TEParticle.cc, <adapter>.cc, <name>_s.cc
//!   <name>.cc         <- driver
//! ```
//!
//! Support files are copied from `$LHADA2TNM_PATH/external`. The class
//! manifest and Makefile are patched only when they do not already mention
//! `<name>_s`, so running the translator twice leaves them unchanged.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use adl_core::{CompileOutput, ResolvedHeader};
use anyhow::{bail, Context, Result};
use regex::{NoExpand, Regex};
use tracing::info;

/// Make dependency line naming the TNM header
static TNM_DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)tnm\.h.*$").unwrap());

const LINKDEF: &str = "include/linkdef.h";
const MAKEFILE: &str = "Makefile";

/// Paths of a TNM analysis directory
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn linkdef(&self) -> PathBuf {
        self.root.join(LINKDEF)
    }

    pub fn makefile(&self) -> PathBuf {
        self.root.join(MAKEFILE)
    }

    /// Fail unless the directory was prepared by `mkanalyzer`.
    pub fn check(&self) -> Result<()> {
        if !self.src_dir().is_dir() {
            bail!("src directory not found in {}", self.root.display());
        }
        if !self.include_dir().is_dir() {
            bail!("include directory not found in {}", self.root.display());
        }
        if !self.linkdef().is_file() {
            bail!("{} not found in {}", LINKDEF, self.root.display());
        }
        if !self.makefile().is_file() {
            bail!("{} not found in {}", MAKEFILE, self.root.display());
        }
        Ok(())
    }

    /// Copy `TEParticle` and the event adapter from the installation.
    pub fn install_support_files(&self, external: &Path, adapter: &str) -> Result<()> {
        let copies = [
            ("include", "TEParticle.h".to_string()),
            ("include", format!("{adapter}.h")),
            ("src", "TEParticle.cc".to_string()),
            ("src", format!("{adapter}.cc")),
        ];
        for (dir, file) in copies {
            let from = external.join(dir).join(&file);
            let to = self.root.join(dir).join(&file);
            fs::copy(&from, &to)
                .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        }
        info!("installed TEParticle and {} from {}", adapter, external.display());
        Ok(())
    }

    /// Copy function headers next to the generated sources.
    pub fn install_headers(&self, headers: &[ResolvedHeader]) -> Result<()> {
        for header in headers {
            let Some(file) = header.path.file_name() else {
                continue;
            };
            let to = self.include_dir().join(file);
            if to == header.path {
                continue;
            }
            fs::copy(&header.path, &to).with_context(|| {
                format!("Failed to copy {} to {}", header.path.display(), to.display())
            })?;
        }
        Ok(())
    }

    /// Write the generated fragments; returns the written paths.
    pub fn write_fragments(&self, output: &CompileOutput) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (fragment, text) in output.files.iter() {
            let path = self.root.join(output.files.path(fragment));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create output directory")?;
            }
            fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(fragment = fragment.key(), "wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Register the analyzer classes with ROOT. Returns `false` when the
    /// manifest already mentions the analyzer.
    pub fn register_linkdef(&self, analyzer: &str) -> Result<bool> {
        let path = self.linkdef();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(updated) = patch_linkdef(&content, analyzer) else {
            return Ok(false);
        };
        fs::write(&path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("updated {}", path.display());
        Ok(true)
    }

    /// Make the driver depend on the analyzer header. Returns `false` when
    /// the Makefile already mentions the analyzer.
    pub fn register_makefile(&self, analyzer: &str) -> Result<bool> {
        let path = self.makefile();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(updated) = patch_makefile(&content, analyzer) else {
            return Ok(false);
        };
        fs::write(&path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("updated {}", path.display());
        Ok(true)
    }
}

/// Insert the pragmas before the closing `#endif`.
pub fn patch_linkdef(content: &str, analyzer: &str) -> Option<String> {
    if content.contains(&format!("{analyzer}_s")) {
        return None;
    }
    let mut lines: Vec<&str> = content.trim().lines().collect();
    // the last line closes the include guard
    lines.pop();

    let mut out = lines.join("\n");
    out.push('\n');
    out.push_str("#pragma link C++ class lhadaThing;\n");
    out.push_str(&format!("#pragma link C++ class {analyzer}_s;\n"));
    out.push_str("#pragma link C++ class TEParticle;\n");
    out.push_str("#pragma link C++ class vector<TEParticle>;\n");
    out.push_str("\n#endif\n");
    Some(out)
}

/// Append the analyzer header to every `tnm.h` dependency line.
pub fn patch_makefile(content: &str, analyzer: &str) -> Option<String> {
    if content.contains(&format!("{analyzer}_s")) {
        return None;
    }
    let replacement = format!("tnm.h $(incdir)/{analyzer}_s.h");
    let updated = TNM_DEPENDENCY.replace_all(content, NoExpand(&replacement));
    Some(updated.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINKDEF_H: &str = "#ifdef __CINT__\n#pragma link off all globals;\n#endif\n";

    #[test]
    fn test_patch_linkdef() {
        let patched = patch_linkdef(LINKDEF_H, "susy").unwrap();
        assert_eq!(
            patched,
            "#ifdef __CINT__\n#pragma link off all globals;\n\
             #pragma link C++ class lhadaThing;\n\
             #pragma link C++ class susy_s;\n\
             #pragma link C++ class TEParticle;\n\
             #pragma link C++ class vector<TEParticle>;\n\n#endif\n"
        );
        assert_eq!(patch_linkdef(&patched, "susy"), None);
    }

    #[test]
    fn test_patch_makefile() {
        let makefile = "$(objdir)/susy.o: susy.cc $(incdir)/tnm.h\n\t$(CXX) -c $<\n";
        let patched = patch_makefile(makefile, "susy").unwrap();
        assert_eq!(
            patched,
            "$(objdir)/susy.o: susy.cc $(incdir)/tnm.h $(incdir)/susy_s.h\n\t$(CXX) -c $<\n"
        );
        assert_eq!(patch_makefile(&patched, "susy"), None);
    }
}
