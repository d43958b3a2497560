//! Defines the command-line arguments for the scadcheck CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, ArgGroup, Parser};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "scadcheck",
    version,
    about = "Run the test directives embedded in OpenSCAD sources."
)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["filename", "directory"])
))]
pub struct CheckArgs {
    /// A single source file to test.
    pub filename: Option<PathBuf>,

    /// Directory containing source files to test (not searched recursively).
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// YAML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// OpenSCAD executable.
    #[arg(long, env = "SCADCHECK_OPENSCAD")]
    pub openscad: Option<String>,

    /// Per-case compiler time limit in seconds (0 disables it).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn argument_model_is_consistent() {
        CheckArgs::command().debug_assert();
    }

    #[test]
    fn file_and_directory_are_exclusive() {
        assert!(CheckArgs::try_parse_from(["scadcheck", "a.scad", "-d", "tests"]).is_err());
        assert!(CheckArgs::try_parse_from(["scadcheck"]).is_err());
    }

    #[test]
    fn directory_mode_with_overrides() {
        let args = CheckArgs::try_parse_from([
            "scadcheck",
            "--directory",
            "tests",
            "--timeout",
            "0",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.directory, Some(PathBuf::from("tests")));
        assert_eq!(args.timeout, Some(0));
        assert_eq!(args.verbose, 2);
        assert!(args.filename.is_none());
    }
}
