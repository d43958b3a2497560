//! Isolating one statement of a source file for a single compiler run.
//!
//! OpenSCAD's `!` modifier renders only the marked statement. Isolation
//! prefixes the target line with `!`; restoration removes exactly that one
//! character again. [`IsolationGuard`] ties the two together: once acquired,
//! the file is restored on every exit path, including early returns and
//! unwinding.
//!
//! Every rewrite goes through a temporary file in the same directory that is
//! then renamed over the original, so a failure mid-write never leaves a
//! truncated source behind.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::HarnessError;

/// Prefix that makes OpenSCAD render only the marked statement.
pub const ISOLATION_MARKER: char = '!';

/// Returns `text` with the marker inserted at the start of line `line_nr` (1-based).
pub fn isolate_line(text: &str, line_nr: usize) -> Result<String, String> {
    let mut out = String::with_capacity(text.len() + 1);
    let mut found = false;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == line_nr {
            out.push(ISOLATION_MARKER);
            found = true;
        }
        out.push_str(line);
    }
    if !found {
        return Err(format!("file has no line {line_nr}"));
    }
    Ok(out)
}

/// Inverse of [`isolate_line`]: removes the leading marker from line `line_nr`.
pub fn restore_line(text: &str, line_nr: usize) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut found = false;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == line_nr {
            let Some(rest) = line.strip_prefix(ISOLATION_MARKER) else {
                return Err(format!(
                    "line {line_nr} does not start with the isolation marker"
                ));
            };
            out.push_str(rest);
            found = true;
        } else {
            out.push_str(line);
        }
    }
    if !found {
        return Err(format!("file has no line {line_nr}"));
    }
    Ok(out)
}

/// Scoped isolation of one line. Dropping the guard restores the file.
#[derive(Debug)]
pub struct IsolationGuard {
    path: PathBuf,
    line_nr: usize,
    active: bool,
}

impl IsolationGuard {
    /// Marks line `line_nr` of `path` for isolated rendering.
    pub fn acquire(path: &Path, line_nr: usize) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let isolated = isolate_line(&text, line_nr).map_err(|reason| HarnessError::Isolation {
            path: path.to_path_buf(),
            line_nr,
            reason,
        })?;
        replace_contents(path, &isolated)?;
        debug!(path = %path.display(), line_nr, "isolated line");
        Ok(Self {
            path: path.to_path_buf(),
            line_nr,
            active: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }

    /// Restores the file now and reports any failure.
    pub fn release(mut self) -> Result<(), HarnessError> {
        self.active = false;
        self.restore()
    }

    fn restore(&self) -> Result<(), HarnessError> {
        let text = fs::read_to_string(&self.path).map_err(|e| HarnessError::io(&self.path, e))?;
        let restored =
            restore_line(&text, self.line_nr).map_err(|reason| HarnessError::Isolation {
                path: self.path.clone(),
                line_nr: self.line_nr,
                reason,
            })?;
        replace_contents(&self.path, &restored)?;
        debug!(path = %self.path.display(), line_nr = self.line_nr, "restored line");
        Ok(())
    }
}

impl Drop for IsolationGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(err) = self.restore() {
            warn!(
                path = %self.path.display(),
                line_nr = self.line_nr,
                "failed to restore isolated line: {err}"
            );
        }
    }
}

/// Atomically replaces the contents of `path`.
fn replace_contents(path: &Path, contents: &str) -> Result<(), HarnessError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| HarnessError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| HarnessError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| HarnessError::io(path, e.error))?;
    Ok(())
}
