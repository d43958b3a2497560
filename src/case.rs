//! Running a single test case.
//!
//! A case moves through `Idle → Isolated → Compiled → Evaluated → Reported`.
//! The target line is restored before anything is evaluated or reported, and
//! also when compilation fails. At most one error is counted per case: the
//! first failing action ends the evaluation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::actions::TestAction;
use crate::artifact::ArtifactReader;
use crate::cli::output::Reporter;
use crate::compiler::Compiler;
use crate::errors::{ActionError, HarnessError};
use crate::isolation::IsolationGuard;

/// Progress of a case through its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Idle,
    Isolated,
    Compiled,
    Evaluated,
    Reported,
}

/// One directive-bearing line and the actions to check against its artifact.
#[derive(Debug)]
pub struct TestCase {
    pub file_path: PathBuf,
    pub out_file: PathBuf,
    pub line_nr: usize,
    pub actions: Vec<Box<dyn TestAction>>,
    errors: usize,
    state: CaseState,
}

impl TestCase {
    pub const DEFAULT_OUTPUT: &'static str = "out.stl";

    /// The artifact is written next to `file_path` as `out.stl`.
    pub fn new(file_path: PathBuf, line_nr: usize, actions: Vec<Box<dyn TestAction>>) -> Self {
        let out_file = sibling(&file_path, Self::DEFAULT_OUTPUT);
        Self {
            file_path,
            out_file,
            line_nr,
            actions,
            errors: 0,
            state: CaseState::Idle,
        }
    }

    pub fn with_output_name(mut self, name: &str) -> Self {
        self.out_file = sibling(&self.file_path, name);
        self
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    /// File name used in report lines.
    pub fn display_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.display().to_string())
    }

    /// Runs the case and returns the errors it added (0 or 1).
    ///
    /// Compiler failures and unreadable artifacts are counted; parse, lookup
    /// and I/O errors are returned.
    pub fn run(
        &mut self,
        compiler: &dyn Compiler,
        reader: &dyn ArtifactReader,
        reporter: &mut Reporter,
    ) -> Result<usize, HarnessError> {
        self.state = CaseState::Idle;
        reporter.case_started(&self.display_name(), self.line_nr);

        let failure = match self.compile_isolated(compiler)? {
            Err(err) => Some(err.to_string()),
            Ok(()) => {
                self.state = CaseState::Compiled;
                let failure = self.evaluate(reader)?;
                self.state = CaseState::Evaluated;
                failure
            }
        };

        let added = usize::from(failure.is_some());
        self.errors += added;
        reporter.case_finished(failure.as_deref());
        self.state = CaseState::Reported;
        debug!(line_nr = self.line_nr, errors = added, "case reported");
        Ok(added)
    }

    /// Compiles with the target line isolated. The outer result carries
    /// errors that abort the run; the inner one a counted compiler failure.
    fn compile_isolated(
        &mut self,
        compiler: &dyn Compiler,
    ) -> Result<Result<(), HarnessError>, HarnessError> {
        remove_stale(&self.out_file)?;

        let guard = IsolationGuard::acquire(&self.file_path, self.line_nr)?;
        self.state = CaseState::Isolated;
        let compiled = compiler.compile(&self.file_path, &self.out_file);
        guard.release()?;

        match compiled {
            Err(err) if err.is_case_fatal() => Ok(Err(err)),
            Err(err) => Err(err),
            Ok(()) => Ok(Ok(())),
        }
    }

    /// Runs the actions in order; returns the detail of the first failure.
    fn evaluate(&self, reader: &dyn ArtifactReader) -> Result<Option<String>, HarnessError> {
        let result = match reader.read(&self.out_file) {
            Ok(result) => result,
            Err(err) if err.is_case_fatal() => return Ok(Some(err.to_string())),
            Err(err) => return Err(err),
        };

        for action in &self.actions {
            match action.run(result.as_ref()) {
                Ok(()) => {}
                Err(ActionError::Failed(failure)) => return Ok(Some(failure.to_string())),
                Err(ActionError::Harness(err)) if err.is_case_fatal() => {
                    return Ok(Some(err.to_string()))
                }
                Err(ActionError::Harness(err)) => return Err(err),
            }
        }
        Ok(None)
    }
}

fn sibling(file_path: &Path, name: &str) -> PathBuf {
    file_path
        .parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Removes a previous artifact so it cannot stand in for this case's output.
fn remove_stale(out_file: &Path) -> Result<(), HarnessError> {
    match fs::remove_file(out_file) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarnessError::io(out_file, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactResult;
    use crate::errors::ActionFailure;
    use std::cell::Cell;
    use std::rc::Rc;

    const SOURCE: &str = "cube(1); ///ASSERT:volume=1\nsphere(2);\n";

    #[derive(Debug)]
    struct Failing;

    impl TestAction for Failing {
        fn identifier(&self) -> &'static str {
            "FAIL"
        }

        fn run(&self, _result: &dyn ArtifactResult) -> Result<(), ActionError> {
            Err(ActionFailure::Assertion {
                name: "volume".into(),
                expected: 2.0,
                actual: 1.0,
            }
            .into())
        }
    }

    #[derive(Debug, Default)]
    struct Recording(Rc<Cell<usize>>);

    impl TestAction for Recording {
        fn identifier(&self) -> &'static str {
            "RECORD"
        }

        fn run(&self, _result: &dyn ArtifactResult) -> Result<(), ActionError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    struct Unit;

    impl ArtifactResult for Unit {
        fn property(&self, _name: &str) -> Result<f64, HarnessError> {
            Ok(1.0)
        }

        fn compare_with_expected(&self, _reference: &Path) -> Result<(), ActionError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingReader(Cell<usize>);

    impl ArtifactReader for CountingReader {
        fn read(&self, _path: &Path) -> Result<Box<dyn ArtifactResult>, HarnessError> {
            self.0.set(self.0.get() + 1);
            Ok(Box::new(Unit))
        }
    }

    /// Records whether the target line was isolated, then succeeds or fails.
    struct ScriptedCompiler {
        fail: bool,
        saw_isolated: Cell<bool>,
    }

    impl ScriptedCompiler {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                saw_isolated: Cell::new(false),
            }
        }
    }

    impl Compiler for ScriptedCompiler {
        fn compile(&self, source: &Path, _output: &Path) -> Result<(), HarnessError> {
            let text = fs::read_to_string(source).map_err(|e| HarnessError::io(source, e))?;
            self.saw_isolated.set(text.starts_with("!cube(1);"));
            if self.fail {
                return Err(HarnessError::Compiler {
                    program: "openscad".into(),
                    status: "exit status: 1".into(),
                    stdout: String::new(),
                    stderr: "ERROR: boom".into(),
                });
            }
            Ok(())
        }
    }

    fn boxed(action: impl TestAction + 'static) -> Box<dyn TestAction> {
        Box::new(action)
    }

    fn source_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.scad");
        fs::write(&path, SOURCE).unwrap();
        (dir, path)
    }

    #[test]
    fn first_failing_action_ends_the_case() {
        let (_dir, path) = source_file();
        let calls = Rc::new(Cell::new(0));
        let mut case = TestCase::new(
            path.clone(),
            1,
            vec![boxed(Failing), boxed(Recording(calls.clone()))],
        );

        let added = case
            .run(&ScriptedCompiler::new(false), &CountingReader::default(), &mut Reporter::silent())
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(case.errors(), 1);
        assert_eq!(calls.get(), 0);
        assert_eq!(case.state(), CaseState::Reported);
        assert_eq!(fs::read_to_string(&path).unwrap(), SOURCE);
    }

    #[test]
    fn passing_actions_all_run() {
        let (_dir, path) = source_file();
        let calls = Rc::new(Cell::new(0));
        let mut case = TestCase::new(
            path,
            1,
            vec![boxed(Recording(calls.clone())), boxed(Recording(calls.clone()))],
        );

        let added = case
            .run(&ScriptedCompiler::new(false), &CountingReader::default(), &mut Reporter::silent())
            .unwrap();

        assert_eq!(added, 0);
        assert_eq!(calls.get(), 2);
        assert_eq!(case.state(), CaseState::Reported);
    }

    #[test]
    fn compiler_failure_is_counted_after_restoring_the_file() {
        let (_dir, path) = source_file();
        let calls = Rc::new(Cell::new(0));
        let compiler = ScriptedCompiler::new(true);
        let reader = CountingReader::default();
        let mut case = TestCase::new(path.clone(), 1, vec![boxed(Recording(calls.clone()))]);

        let added = case.run(&compiler, &reader, &mut Reporter::silent()).unwrap();

        assert_eq!(added, 1);
        assert_eq!(case.errors(), 1);
        assert!(compiler.saw_isolated.get());
        assert_eq!(reader.0.get(), 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(case.state(), CaseState::Reported);
        assert_eq!(fs::read_to_string(&path).unwrap(), SOURCE);
    }

    #[test]
    fn output_sits_next_to_the_source() {
        let case = TestCase::new(PathBuf::from("/work/part.scad"), 3, Vec::new())
            .with_output_name("result.stl");
        assert_eq!(case.out_file, PathBuf::from("/work/result.stl"));
        assert_eq!(case.display_name(), "part.scad");
        assert_eq!(case.state(), CaseState::Idle);
    }
}
