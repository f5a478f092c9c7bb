//! Output templates
//!
//! Three files are generated for an analyzer called `<name>`:
//!
//! | fragment          | path                  | contents                         |
//! |-------------------|-----------------------|----------------------------------|
//! | `analyzer_source` | `src/<name>_s.cc`     | functions, objects, cuts, run()  |
//! | `analyzer_header` | `include/<name>_s.h`  | `lhadaThing`, `<name>_s`         |
//! | `driver_source`   | `<name>.cc`           | TNM event loop                   |
//!
//! Slots come from [`super::render::slots`]. HTML escaping is disabled and
//! strict mode is on, so a missing slot is an error rather than blank text.

use std::path::PathBuf;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::ir::AnalyzerUnit;
use super::render::slots;
use crate::config::types::CompilerOptions;
use crate::error::Result;

const ANALYZER_SOURCE: &str = r#"//------------------------------------------------------------------
// File:        {{name}}_s.cc
// Description: Analyzer for ADL-based analysis:
{{info}}
{{created_line}}
//------------------------------------------------------------------
#include <algorithm>
#include "{{name}}_s.h"
{{includes}}
using namespace std;
//------------------------------------------------------------------
// The following functions, objects, and variables are globally visible
// within this programming unit.
//------------------------------------------------------------------
{{fundef}}
//------------------------------------------------------------------
{{vardef}}
//------------------------------------------------------------------
{{objdef}}
//------------------------------------------------------------------
{{cutdef}}
//------------------------------------------------------------------
{{name}}_s::{{name}}_s()
{
{{vobjects}}
{{vcuts}}
}

{{name}}_s::~{{name}}_s() {}

{{runargsimpl}}
{
  // copy to internal buffers
{{copyargsimpl}}
  // create filtered objects
  for(size_t c=0; c < objects.size(); c++) objects[c]->create();

{{varimpl}}
  // apply event level selections
  for(size_t c=0; c < cuts.size(); c++)
    {
      cuts[c]->reset();
      cuts[c]->apply();
    }
}

void {{name}}_s::summary(TFile* fout, ostream& os)
{
  os << std::endl << "Summary" << std::endl << std::endl;
  for(size_t c=0; c < cuts.size(); c++)
    {
      cuts[c]->summary(os);
      cuts[c]->write(fout);
    }
}
"#;

const ANALYZER_HEADER: &str = r#"#ifndef {{name}}_s_HH
#define {{name}}_s_HH
//------------------------------------------------------------------
// File:        {{name}}_s.h
// Description: Analyzer for ADL-based analysis:
{{info}}
{{created_line}}
//------------------------------------------------------------------
#include <algorithm>
#include <iostream>
#include "TFile.h"
#include "TH1F.h"
#include "TEParticle.h"
//------------------------------------------------------------------
struct lhadaThing
{
  lhadaThing() {}
  virtual ~lhadaThing() {}
  virtual void reset() {}
  virtual void create() {}
  virtual bool apply() { return true; }
  virtual void write(TFile* fout) {}
  virtual void summary(std::ostream& os) {}
};

struct {{name}}_s
{
  std::vector<lhadaThing*> objects;
  std::vector<lhadaThing*> cuts;

  {{name}}_s();
  ~{{name}}_s();
  void run({{runargs}});
  void summary(TFile* fout, std::ostream& os);
};
#endif
"#;

const DRIVER_SOURCE: &str = r#"//------------------------------------------------------------------
// File:        {{name}}.cc
// Description: Analyzer for ADL analysis:
{{info}}
{{created_line}}
//------------------------------------------------------------------
#include "tnm.h"
#include "{{adaptername}}.h"
#include "{{name}}_s.h"

using namespace std;
//------------------------------------------------------------------
int main(int argc, char** argv)
{
  // If you want canvases to be visible during program execution, just
  // uncomment the line below
  //TApplication app("{{name}}", &argc, argv);

  // Get command line arguments
  commandLine cl(argc, argv);

  // Get names of ntuple files to be processed
  vector<string> filenames = fileNames(cl.filelist);

  // Create tree reader
  itreestream stream(filenames, "{{treename}}");
  if ( !stream.good() ) error("can't read root input files");

  // Create a buffer to receive events from the stream
  // The default is to select all branches
  // Use second argument to select specific branches
  // Example:
  //   varlist = 'Jet_PT Jet_Eta Jet_Phi'
  //   ev = eventBuffer(stream, varlist)

  eventBuffer ev(stream);
  int nevents = ev.size();
  cout << "number of events: " << nevents << endl;

  // Create output file for histograms; see notes in header
  outputFile of(cl.outputfilename);
  //------------------------------------------------------------------
  // Define histograms
  //------------------------------------------------------------------
  //setStyle();

  //------------------------------------------------------------------
  // Create an event adapter to map input types to a standard internal
  // type and create the analyzer
  //------------------------------------------------------------------
  {{adaptername}} {{adapter}};

  {{name}}_s {{analyzer}};
  //------------------------------------------------------------------
  // Loop over events
  //------------------------------------------------------------------
  for(int entry=0; entry < nevents; entry++)
    {
      // read an event into event buffer
      ev.read(entry);

      if ( entry % 10000 == 0 ) cout << entry << endl;
{{extobjimpl}}
{{runimpl}}
    }

  // summarize analysis
  {{analyzer}}.summary(of.file_, cout);

  ev.close();
  of.close();
  return 0;
}
"#;

/// One generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    AnalyzerSource,
    AnalyzerHeader,
    DriverSource,
}

impl Fragment {
    pub const ALL: [Fragment; 3] = [
        Fragment::AnalyzerSource,
        Fragment::AnalyzerHeader,
        Fragment::DriverSource,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Fragment::AnalyzerSource => "analyzer_source",
            Fragment::AnalyzerHeader => "analyzer_header",
            Fragment::DriverSource => "driver_source",
        }
    }

    /// Location relative to the project directory
    pub fn relative_path(&self, analyzer_name: &str) -> PathBuf {
        match self {
            Fragment::AnalyzerSource => PathBuf::from("src").join(format!("{analyzer_name}_s.cc")),
            Fragment::AnalyzerHeader => {
                PathBuf::from("include").join(format!("{analyzer_name}_s.h"))
            }
            Fragment::DriverSource => PathBuf::from(format!("{analyzer_name}.cc")),
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Fragment::AnalyzerSource => ANALYZER_SOURCE,
            Fragment::AnalyzerHeader => ANALYZER_HEADER,
            Fragment::DriverSource => DRIVER_SOURCE,
        }
    }
}

/// The rendered files of one compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFiles {
    pub analyzer_name: String,
    pub analyzer_source: String,
    pub analyzer_header: String,
    pub driver_source: String,
}

impl GeneratedFiles {
    pub fn get(&self, fragment: Fragment) -> &str {
        match fragment {
            Fragment::AnalyzerSource => &self.analyzer_source,
            Fragment::AnalyzerHeader => &self.analyzer_header,
            Fragment::DriverSource => &self.driver_source,
        }
    }

    /// Look a fragment up by key (`analyzer_source`, ...)
    pub fn by_name(&self, key: &str) -> Option<&str> {
        Fragment::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .map(|f| self.get(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Fragment, &str)> {
        Fragment::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    pub fn path(&self, fragment: Fragment) -> PathBuf {
        fragment.relative_path(&self.analyzer_name)
    }
}

fn registry() -> Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    for fragment in Fragment::ALL {
        handlebars.register_template_string(fragment.key(), fragment.template())?;
    }
    Ok(handlebars)
}

/// Merge the rendered slots of `unit` into the three output files.
pub fn render_files(unit: &AnalyzerUnit, options: &CompilerOptions) -> Result<GeneratedFiles> {
    let handlebars = registry()?;
    let data = slots(unit, options)?;
    let render = |fragment: Fragment| -> Result<String> {
        debug!(fragment = fragment.key(), "rendering");
        Ok(handlebars.render(fragment.key(), &data)?)
    };

    Ok(GeneratedFiles {
        analyzer_name: unit.name.clone(),
        analyzer_source: render(Fragment::AnalyzerSource)?,
        analyzer_header: render(Fragment::AnalyzerHeader)?,
        driver_source: render(Fragment::DriverSource)?,
    })
}
