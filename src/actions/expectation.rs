//! `EXPECT` directives: compare the produced artifact with a stored reference.

use std::fs;
use std::path::{Path, PathBuf};

use super::TestAction;
use crate::artifact::ArtifactResult;
use crate::errors::{ActionError, DirectiveError};

/// Reference-file comparison. The reference must exist when the directive is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expect {
    pub reference: PathBuf,
}

impl Expect {
    pub const IDENTIFIER: &'static str = "EXPECT";

    /// Resolves `payload` against `base_dir` unless it is already absolute.
    ///
    /// A relative path missing from `base_dir` is looked up in the working
    /// directory instead.
    pub fn parse(payload: &str, base_dir: &Path) -> Result<Self, DirectiveError> {
        if payload.is_empty() {
            return Err(DirectiveError::new("Could not parse: missing reference path"));
        }
        let path = Path::new(payload);
        if path.is_absolute() {
            return Self::existing(path.to_path_buf());
        }

        let beside_source = base_dir.join(path);
        if beside_source.exists() {
            return Ok(Self {
                reference: beside_source,
            });
        }
        if path.exists() {
            let reference = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            return Ok(Self { reference });
        }
        Err(DirectiveError::new(format!(
            "File does not exist: {} (nor {} in the working directory)",
            beside_source.display(),
            path.display()
        )))
    }

    fn existing(reference: PathBuf) -> Result<Self, DirectiveError> {
        if !reference.exists() {
            return Err(DirectiveError::new(format!(
                "File does not exist: {}",
                reference.display()
            )));
        }
        Ok(Self { reference })
    }

    /// [`super::ActionParser`] entry point.
    pub fn create(payload: &str, base_dir: &Path) -> Result<Box<dyn TestAction>, DirectiveError> {
        Ok(Box::new(Self::parse(payload, base_dir)?))
    }
}

impl TestAction for Expect {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn run(&self, result: &dyn ArtifactResult) -> Result<(), ActionError> {
        result.compare_with_expected(&self.reference)
    }
}
