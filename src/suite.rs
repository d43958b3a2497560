//! All test cases of one source file, run against a scratch copy.
//!
//! The original file is never touched: it is copied into a private temporary
//! directory, `include <...>` / `use <...>` paths in the copy are made
//! absolute (the copy lives elsewhere, so relative paths would no longer
//! resolve), and every case isolates and compiles the copy. The scratch
//! directory is removed when the suite is dropped.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::actions::ActionRegistry;
use crate::artifact::ArtifactReader;
use crate::case::TestCase;
use crate::cli::output::Reporter;
use crate::compiler::Compiler;
use crate::config::HarnessConfig;
use crate::errors::HarnessError;
use crate::scanner::SourceScanner;

static INCLUDE_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*(?:include|use)\s*<)([^>]*)(>)").expect("include pattern is valid")
});

/// One source file's test cases plus the scratch copy they run against.
#[derive(Debug)]
pub struct TestSuite {
    file_path: PathBuf,
    tmp_dir: TempDir,
    tmp_file: PathBuf,
    testcases: Vec<TestCase>,
}

impl TestSuite {
    /// Copies `file_path` to a scratch directory, rewrites its includes and
    /// parses the test cases. Parse errors abort construction.
    pub fn new(
        file_path: &Path,
        config: &HarnessConfig,
        registry: &ActionRegistry,
    ) -> Result<Self, HarnessError> {
        let file_path = file_path
            .canonicalize()
            .map_err(|e| HarnessError::io(file_path, e))?;
        let file_name = file_path.file_name().ok_or_else(|| HarnessError::Usage {
            message: format!("{} is not a file", file_path.display()),
        })?;

        let tmp_dir = tempfile::Builder::new()
            .prefix("scadcheck-")
            .tempdir()
            .map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
        let tmp_file = tmp_dir.path().join(file_name);

        let base_dir = file_path.parent().unwrap_or_else(|| Path::new("/"));
        let source = fs::read_to_string(&file_path).map_err(|e| HarnessError::io(&file_path, e))?;
        fs::write(&tmp_file, rewrite_includes(&source, base_dir))
            .map_err(|e| HarnessError::io(&tmp_file, e))?;
        debug!(
            original = %file_path.display(),
            scratch = %tmp_file.display(),
            "created scratch copy"
        );

        let testcases = SourceScanner::new(registry)
            .with_output_file_name(config.output_file_name.clone())
            .scan(&tmp_file, &file_path)?;

        Ok(Self {
            file_path,
            tmp_dir,
            tmp_file,
            testcases,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn scratch_dir(&self) -> &Path {
        self.tmp_dir.path()
    }

    pub fn scratch_file(&self) -> &Path {
        &self.tmp_file
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.testcases
    }

    pub fn name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Runs every case in order and returns the total error count.
    pub fn run(
        &mut self,
        compiler: &dyn Compiler,
        reader: &dyn ArtifactReader,
        reporter: &mut Reporter,
    ) -> Result<usize, HarnessError> {
        reporter.suite_started(&self.name());
        info!(suite = %self.file_path.display(), cases = self.testcases.len(), "running suite");

        let mut errors = 0;
        for case in &mut self.testcases {
            errors += case.run(compiler, reader, reporter)?;
        }

        reporter.suite_finished(errors);
        Ok(errors)
    }
}

/// Makes relative `include <...>` and `use <...>` paths absolute against `base_dir`.
pub fn rewrite_includes(text: &str, base_dir: &Path) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let Some(caps) = INCLUDE_STATEMENT.captures(line) else {
            out.push_str(line);
            continue;
        };
        let target = Path::new(&caps[2]);
        if target.is_absolute() || caps[2].is_empty() {
            out.push_str(line);
            continue;
        }
        let resolved = base_dir.join(target);
        debug!(from = &caps[2], to = %resolved.display(), "rewrote include");

        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&caps[1]);
        out.push_str(&resolved.display().to_string());
        out.push_str(&caps[3]);
        out.push_str(&line[whole.end..]);
    }
    out
}
