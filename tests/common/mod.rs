//! Shared fixtures for the integration tests.
//!
//! `FakeCompiler` stands in for OpenSCAD: it reads the isolated statement
//! (the line carrying the `!` prefix) and emits a box mesh for `cube(N)` or
//! `cube([x, y, z])`. An isolated line containing `fail(` is reported as a
//! compiler failure; one containing `noop(` succeeds without writing output.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use scadcheck::cli::output::Reporter;
use scadcheck::stl::{box_mesh, to_ascii};
use scadcheck::{Compiler, HarnessError};
use termcolor::NoColor;

#[derive(Debug, Default)]
pub struct FakeCompiler {
    /// Isolated lines seen, one per compile.
    pub isolated: RefCell<Vec<String>>,
    /// Source snapshots taken while compiling.
    pub sources: RefCell<Vec<PathBuf>>,
}

impl Compiler for FakeCompiler {
    fn compile(&self, source: &Path, output: &Path) -> Result<(), HarnessError> {
        let text = fs::read_to_string(source).map_err(|e| HarnessError::io(source, e))?;
        let isolated: Vec<&str> = text
            .lines()
            .filter(|line| line.trim_start().starts_with('!'))
            .collect();
        self.sources.borrow_mut().push(source.to_path_buf());
        let [line] = isolated.as_slice() else {
            return Err(failure(format!("expected one isolated line, found {}", isolated.len())));
        };
        self.isolated.borrow_mut().push(line.to_string());

        if line.contains("fail(") {
            return Err(failure("ERROR: Parser error in line 1".to_string()));
        }
        if line.contains("noop(") {
            return Ok(());
        }
        let size = cube_size(line).ok_or_else(|| failure(format!("cannot model {line}")))?;
        let mesh = box_mesh([0.0; 3], size);
        fs::write(output, to_ascii(&mesh, "fake")).map_err(|e| HarnessError::io(output, e))
    }
}

fn failure(stderr: String) -> HarnessError {
    HarnessError::Compiler {
        program: "fake-openscad".to_string(),
        status: "exit status: 1".to_string(),
        stdout: String::new(),
        stderr,
    }
}

fn cube_size(line: &str) -> Option<[f32; 3]> {
    let start = line.find("cube(")? + "cube(".len();
    let end = start + line[start..].find(')')?;
    let args = line[start..end].trim();
    if let Some(inner) = args.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
        let dims: Vec<f32> = inner
            .split(',')
            .map(|d| d.trim().parse().ok())
            .collect::<Option<_>>()?;
        return dims.try_into().ok();
    }
    let n: f32 = args.parse().ok()?;
    Some([n; 3])
}

/// Writer whose contents stay readable after the reporter takes ownership.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Plain-text reporter plus a handle on what it wrote.
pub fn capture_reporter() -> (Reporter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    (Reporter::new(NoColor::new(buffer.clone())), buffer)
}

/// Writes `content` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// ASCII STL of a `size`-sided cube at the origin.
pub fn cube_stl(size: f32) -> String {
    to_ascii(&box_mesh([0.0; 3], [size; 3]), "reference")
}
