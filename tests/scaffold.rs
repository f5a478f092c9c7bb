//! Writing a compiled analyzer into a TNM project directory.

use std::fs;
use std::path::Path;

use adl2tnm::{compile, CompilerOptions, ProjectLayout};
use adl_core::FsHeaderResolver;
use pretty_assertions::assert_eq;

const ANALYSIS: &str = r#"
info analysis
  experiment CMS

function HT
  arg jets
  code kinematics.h

object jets
  take Jet
  select PT > 30

variable HTjets
  apply HT(jets)

cut signal
  select HTjets > 500
"#;

const LINKDEF_H: &str = "#ifdef __CINT__\n#pragma link off all globals;\n#endif\n";
const MAKEFILE: &str = "$(objdir)/susy.o: susy.cc $(incdir)/tnm.h\n";

fn project(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("include")).unwrap();
    fs::write(root.join("include/linkdef.h"), LINKDEF_H).unwrap();
    fs::write(root.join("Makefile"), MAKEFILE).unwrap();
}

fn installation(root: &Path) {
    let external = root.join("external");
    fs::create_dir_all(external.join("include")).unwrap();
    fs::create_dir_all(external.join("src")).unwrap();
    for file in ["include/TEParticle.h", "include/DelphesAdapter.h"] {
        fs::write(external.join(file), "// header\n").unwrap();
    }
    for file in ["src/TEParticle.cc", "src/DelphesAdapter.cc"] {
        fs::write(external.join(file), "// source\n").unwrap();
    }
    fs::write(
        external.join("include/kinematics.h"),
        "double HT(std::vector<TLorentzVector>& jets);\n",
    )
    .unwrap();
}

#[test]
fn incomplete_project_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    let err = ProjectLayout::new(dir.path()).check().unwrap_err();
    assert!(err.to_string().contains("include directory not found"));
}

#[test]
fn project_is_populated_and_patched_once() {
    let work = tempfile::tempdir().unwrap();
    let root = work.path().join("susy");
    let home = work.path().join("lhada2tnm");
    project(&root);
    installation(&home);

    let external = home.join("external");
    let options = CompilerOptions {
        analyzer_name: "susy".to_string(),
        search_paths: vec![external.join("include")],
        ..CompilerOptions::default()
    };
    let resolver = FsHeaderResolver::new(options.search_paths.clone());
    let output = compile(ANALYSIS, &options, &resolver).unwrap();

    let layout = ProjectLayout::new(&root);
    layout.check().unwrap();
    layout.install_support_files(&external, &options.adapter).unwrap();
    layout.install_headers(&output.headers).unwrap();
    let written = layout.write_fragments(&output).unwrap();
    assert_eq!(
        written,
        vec![
            root.join("src/susy_s.cc"),
            root.join("include/susy_s.h"),
            root.join("susy.cc"),
        ]
    );

    for file in [
        "include/TEParticle.h",
        "include/DelphesAdapter.h",
        "include/kinematics.h",
        "src/TEParticle.cc",
        "src/DelphesAdapter.cc",
    ] {
        assert!(root.join(file).is_file(), "{file} missing");
    }

    assert!(layout.register_linkdef("susy").unwrap());
    assert!(layout.register_makefile("susy").unwrap());
    let linkdef = fs::read_to_string(root.join("include/linkdef.h")).unwrap();
    let makefile = fs::read_to_string(root.join("Makefile")).unwrap();
    assert!(linkdef.contains("#pragma link C++ class susy_s;"));
    assert_eq!(makefile, "$(objdir)/susy.o: susy.cc $(incdir)/tnm.h $(incdir)/susy_s.h\n");

    // second run leaves both files alone
    assert!(!layout.register_linkdef("susy").unwrap());
    assert!(!layout.register_makefile("susy").unwrap());
    assert_eq!(fs::read_to_string(root.join("include/linkdef.h")).unwrap(), linkdef);
    assert_eq!(fs::read_to_string(root.join("Makefile")).unwrap(), makefile);
}
