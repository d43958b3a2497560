//! Extracting test cases from a source file.
//!
//! Every line classified as a directive becomes one [`TestCase`] with a single
//! action. Cases come out in file order. The first malformed directive aborts
//! the scan with a [`HarnessError::Parse`] that points at the offending line.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::actions::ActionRegistry;
use crate::case::TestCase;
use crate::directive::{classify, LineKind};
use crate::errors::{HarnessError, ParseContext};

/// Turns directive lines into test cases using an [`ActionRegistry`].
#[derive(Debug)]
pub struct SourceScanner<'r> {
    registry: &'r ActionRegistry,
    output_file_name: String,
}

impl<'r> SourceScanner<'r> {
    pub fn new(registry: &'r ActionRegistry) -> Self {
        Self {
            registry,
            output_file_name: TestCase::DEFAULT_OUTPUT.to_string(),
        }
    }

    pub fn with_output_file_name(mut self, name: impl Into<String>) -> Self {
        self.output_file_name = name.into();
        self
    }

    /// Scans `path`, which is both read and reported.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<TestCase>, HarnessError> {
        self.scan(path, path)
    }

    /// Scans the file at `source` on behalf of `origin`.
    ///
    /// Cases are bound to `source`. Diagnostics name and quote `origin`, and
    /// relative reference paths are resolved against its directory. Both files
    /// must have the same lines in the same order.
    pub fn scan(&self, source: &Path, origin: &Path) -> Result<Vec<TestCase>, HarnessError> {
        let text = fs::read_to_string(source).map_err(|e| HarnessError::io(source, e))?;
        let base_dir = origin.parent().unwrap_or_else(|| Path::new(""));

        let mut cases = Vec::new();
        for (idx, raw) in text.split_inclusive('\n').enumerate() {
            let line_nr = idx + 1;
            let line = raw.trim_end_matches(['\n', '\r']);
            if let LineKind::Directive(payload) = classify(line) {
                let action = self
                    .registry
                    .create(&payload, base_dir)
                    .map_err(|err| parse_error(source, &text, origin, line_nr, err.to_string()))?;
                cases.push(
                    TestCase::new(source.to_path_buf(), line_nr, vec![action])
                        .with_output_name(&self.output_file_name),
                );
            }
        }

        debug!(path = %origin.display(), cases = cases.len(), "scanned source");
        Ok(cases)
    }
}

/// Builds a diagnostic quoting line `line_nr` of `origin`.
///
/// Falls back to the scanned text when `origin` cannot be read.
fn parse_error(
    source: &Path,
    scanned: &str,
    origin: &Path,
    line_nr: usize,
    message: String,
) -> HarnessError {
    let origin_text = if origin == source {
        None
    } else {
        fs::read_to_string(origin).ok()
    };
    let text = origin_text.as_deref().unwrap_or(scanned);
    let (offset, line) = locate_line(text, line_nr);
    HarnessError::parse(
        ParseContext::new(origin, line_nr, line),
        message,
        text,
        (offset, line.len()),
    )
}

/// Byte offset and content (without line ending) of line `line_nr`.
fn locate_line(text: &str, line_nr: usize) -> (usize, &str) {
    let mut offset = 0;
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == line_nr {
            return (offset, raw.trim_end_matches(['\n', '\r']));
        }
        offset += raw.len();
    }
    (text.len(), "")
}
