//! Harness configuration.
//!
//! Defaults reproduce the stock OpenSCAD setup. A YAML file can override any
//! subset of the keys:
//!
//! ```yaml
//! compiler: /opt/openscad/bin/openscad
//! timeout_secs: 600      # null disables the limit
//! extension: scad
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::HarnessError;

/// Configuration for discovering, compiling and reporting test cases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Compiler executable.
    pub compiler: String,
    /// Flags passed on every invocation, before the output option.
    pub baseline_args: Vec<String>,
    /// Option introducing the output path.
    pub output_arg: String,
    /// Artifact file name, written next to the scratch source.
    pub output_file_name: String,
    /// Source extension picked up in directory mode.
    pub extension: String,
    /// Per-case compiler time limit in seconds.
    pub timeout_secs: Option<u64>,
    /// Whether to colorize the report.
    pub use_colors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: "openscad".to_string(),
            baseline_args: ["--enable", "fast-csg", "--enable", "predictible-output"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_arg: "-o".to_string(),
            output_file_name: "out.stl".to_string(),
            extension: "scad".to_string(),
            timeout_secs: Some(300),
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl HarnessConfig {
    /// Reads a YAML config file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_yaml(&content).map_err(|message| HarnessError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
