//! The scadcheck Command-Line Interface.
//!
//! Parses arguments, assembles the configuration and runs one suite per
//! selected source file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::actions::build_default_registry;
use crate::cli::args::CheckArgs;
use crate::cli::output::Reporter;
use crate::compiler::OpenScad;
use crate::config::HarnessConfig;
use crate::discovery::discover_source_files;
use crate::errors::HarnessError;
use crate::stl::StlReader;
use crate::suite::TestSuite;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() -> miette::Result<ExitCode> {
    let args = CheckArgs::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    debug!(?config, "resolved configuration");
    let files = resolve_inputs(&args, &config)?;

    let registry = build_default_registry();
    let compiler = OpenScad::from_config(&config);
    let reader = StlReader;
    let mut reporter = Reporter::stdout(config.use_colors);

    let mut errors = 0;
    for file in &files {
        let mut suite = TestSuite::new(file, &config, &registry)?;
        errors += suite.run(&compiler, &reader, &mut reporter)?;
    }

    info!(suites = files.len(), errors, "finished");
    Ok(if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Loads the config file, if any, then applies command-line overrides.
fn resolve_config(args: &CheckArgs) -> Result<HarnessConfig, HarnessError> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(program) = &args.openscad {
        config.compiler = program.clone();
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = (secs > 0).then_some(secs);
    }
    if args.no_color {
        config.use_colors = false;
    }
    Ok(config)
}

fn resolve_inputs(args: &CheckArgs, config: &HarnessConfig) -> Result<Vec<PathBuf>, HarnessError> {
    if let Some(dir) = &args.directory {
        return discover_source_files(dir, &config.extension);
    }
    match &args.filename {
        Some(file) if file.is_file() => Ok(vec![file.clone()]),
        Some(file) => Err(HarnessError::Usage {
            message: format!("{} is not a file", file.display()),
        }),
        None => Err(HarnessError::Usage {
            message: "either a file name or a directory is required".to_string(),
        }),
    }
}
