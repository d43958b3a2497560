//! Directory-mode discovery of source files.
//!
//! Only the top level of the directory is searched, matching the flat layout
//! of a typical OpenSCAD test folder.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::HarnessError;

/// Collects the source files directly inside `dir` with the given extension.
///
/// Subdirectories are not entered. The result is sorted so suites run in a
/// deterministic order.
pub fn discover_source_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, HarnessError> {
    if !dir.is_dir() {
        return Err(HarnessError::Usage {
            message: format!("{} is not a directory", dir.display()),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            HarnessError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !has_extension(entry.path(), extension) {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}
