//! ADL to TNM translator
//!
//! # Usage
//!
//! ```bash
//! # inside a directory created by mkanalyzer
//! adl2tnm -a susy analysis.adl
//!
//! # NanoAOD input (tree defaults to Events)
//! adl2tnm -a susy -e CMSNanoAODAdapter analysis.adl
//!
//! # print the generated files or the IR without touching the project
//! adl2tnm --dry-run analysis.adl
//! adl2tnm --emit-ir analysis.adl
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use adl2tnm::ProjectLayout;
use adl_core::config::loader::{validate, HOME_VAR};
use adl_core::{compile_file, CompileOutput, CompilerOptions, ConfigLoader, FsHeaderResolver};
use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "adl2tnm=info,adl_core=info";

#[derive(Parser)]
#[command(name = "adl2tnm")]
#[command(version)]
#[command(about = "Translate an ADL analysis description into a TNM analyzer")]
#[command(long_about = None)]
struct Cli {
    /// ADL file to translate
    adl_file: PathBuf,

    /// Name of the analyzer to be created [analyzer]
    #[arg(short = 'a', long = "analyzer")]
    analyzer: Option<String>,

    /// Name of the event adapter [DelphesAdapter]
    #[arg(short = 'e', long = "eventadapter")]
    adapter: Option<String>,

    /// Name of the ROOT tree [Delphes, or Events for CMSNanoAODAdapter]
    #[arg(short = 't', long = "tree")]
    tree: Option<String>,

    /// Extra directories searched for function headers
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// YAML configuration file
    #[arg(short = 'c', long = "config", env = "ADL2TNM_CONFIG")]
    config: Option<PathBuf>,

    /// TNM project directory
    #[arg(short = 'C', long = "project-dir", default_value = ".")]
    project_dir: PathBuf,

    /// Print the generated files instead of writing them
    #[arg(long)]
    dry_run: bool,

    /// Print the intermediate representation as JSON and stop
    #[arg(long)]
    emit_ir: bool,
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::from_env();
    if let Some(config) = &cli.config {
        loader = loader.with_config_file(config);
    }
    let options = options(&cli, &loader)?;
    let writes_project = !(cli.dry_run || cli.emit_ir);

    let external = match loader.external_dir() {
        Some(dir) => Some(dir),
        None if writes_project => bail!(
            "{} is not set; please source setup.sh in lhada2tnm and try again",
            HOME_VAR
        ),
        None => None,
    };

    let layout = ProjectLayout::new(&cli.project_dir);
    if writes_project {
        layout.check()?;
    }

    println!("    analyzer:        {}", options.analyzer_name);
    println!("    event adapter:   {}", options.adapter);
    println!("    ROOT tree:       {}", options.tree_name());
    println!("    ADL filename:    {}", cli.adl_file.display());

    let resolver = FsHeaderResolver::new(options.search_paths.clone());
    let output = compile_file(&cli.adl_file, &options, &resolver)
        .with_context(|| format!("Failed to translate {}", cli.adl_file.display()))?;
    report(&output);

    if cli.emit_ir {
        let json = serde_json::to_string_pretty(&output.analyzer)
            .context("Failed to serialize the analyzer")?;
        println!("{json}");
        return Ok(());
    }

    if cli.dry_run {
        for (fragment, text) in output.files.iter() {
            println!("{}", format!("==> {}", output.files.path(fragment).display()).bold());
            println!("{text}");
        }
        return Ok(());
    }

    if let Some(external) = external {
        layout.install_support_files(&external, &options.adapter)?;
    }
    layout.install_headers(&output.headers)?;
    layout.write_fragments(&output)?;
    if layout.register_linkdef(&options.analyzer_name)? {
        println!("update linkdef");
    }
    if layout.register_makefile(&options.analyzer_name)? {
        println!("update Makefile");
    }

    info!("done");
    Ok(())
}

/// Configuration file and environment first, then command-line overrides.
fn options(cli: &Cli, loader: &ConfigLoader) -> Result<CompilerOptions> {
    let mut options = loader.load()?;

    if let Some(analyzer) = &cli.analyzer {
        options.analyzer_name = analyzer.clone();
    }
    if let Some(adapter) = &cli.adapter {
        options.adapter = adapter.clone();
    }
    if let Some(tree) = &cli.tree {
        options.tree_name = Some(tree.clone());
    }
    options.search_paths.splice(0..0, cli.include.iter().cloned());
    options.created = Some(chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string());

    validate(&options)?;
    Ok(options)
}

fn report(output: &CompileOutput) {
    for diagnostic in &output.diagnostics {
        let label = if diagnostic.is_warning() {
            "warning".yellow().bold()
        } else {
            "note".cyan().bold()
        };
        match diagnostic.line {
            Some(line) => eprintln!("{} (line {}): {}", label, line, diagnostic.message),
            None => eprintln!("{}: {}", label, diagnostic.message),
        }
    }
}
