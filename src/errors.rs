//! Error handling for the scadcheck harness.
//!
//! Two families of failure exist and they never mix:
//!
//! - [`HarnessError`] is the crate-wide error. It is a `miette` diagnostic so the
//!   binary can render parse failures with the offending source line attached.
//!   Some variants are fatal only to the case that produced them (see
//!   [`HarnessError::is_case_fatal`]); the rest abort the whole run.
//! - [`ActionFailure`] is a failed check: an assertion mismatch or an artifact
//!   that differs from its reference. It is counted by the case runner, never
//!   propagated.
//!
//! [`DirectiveError`] is the context-free error produced while parsing a
//! directive payload; the scanner wraps it into [`HarnessError::Parse`] once it
//! knows the file and line.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

// ============================================================================
// PARSE CONTEXT
// ============================================================================

/// Where a directive was found: source path, 1-based line number and the raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    pub path: PathBuf,
    pub line_nr: usize,
    pub content: String,
}

impl ParseContext {
    pub fn new(path: impl Into<PathBuf>, line_nr: usize, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line_nr,
            content: content.into(),
        }
    }
}

impl fmt::Display for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file: {}\nline: {}\ncontent: {}",
            self.path.display(),
            self.line_nr,
            self.content
        )
    }
}

// ============================================================================
// DIRECTIVE ERRORS
// ============================================================================

/// A directive payload that could not be turned into an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DirectiveError(pub String);

impl DirectiveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ============================================================================
// HARNESS ERRORS
// ============================================================================

/// Unified error type for every failure mode of the harness.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("Parse error: {message}\n{context}")]
    #[diagnostic(code(scadcheck::parse))]
    Parse {
        message: String,
        context: ParseContext,
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid test directive")]
        span: SourceSpan,
    },

    #[error("{program} failed ({status}) with:\n{stdout}\n{stderr}")]
    #[diagnostic(code(scadcheck::compiler))]
    Compiler {
        program: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("{program} did not finish within {}s", timeout.as_secs())]
    #[diagnostic(
        code(scadcheck::compiler_timeout),
        help("raise the limit with --timeout or `timeout_secs` in the config file")
    )]
    CompilerTimeout { program: String, timeout: Duration },

    #[error("could not start {program}: {source}")]
    #[diagnostic(
        code(scadcheck::compiler_spawn),
        help("point --openscad (or SCADCHECK_OPENSCAD) at the OpenSCAD executable")
    )]
    CompilerSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("result has no property \"{name}\"")]
    #[diagnostic(code(scadcheck::lookup))]
    PropertyLookup {
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("unreadable artifact {}: {reason}", path.display())]
    #[diagnostic(code(scadcheck::artifact))]
    Artifact { path: PathBuf, reason: String },

    #[error("cannot isolate line {line_nr} of {}: {reason}", path.display())]
    #[diagnostic(code(scadcheck::isolation))]
    Isolation {
        path: PathBuf,
        line_nr: usize,
        reason: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(scadcheck::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration {}: {message}", path.display())]
    #[diagnostic(code(scadcheck::config))]
    Config { path: PathBuf, message: String },

    #[error("{message}")]
    #[diagnostic(code(scadcheck::usage))]
    Usage { message: String },
}

impl HarnessError {
    /// Builds a parse error pointing at `span` inside the full source text.
    pub fn parse(
        context: ParseContext,
        message: impl Into<String>,
        source_text: &str,
        span: impl Into<SourceSpan>,
    ) -> Self {
        let src = NamedSource::new(context.path.display().to_string(), source_text.to_string());
        Self::Parse {
            message: message.into(),
            context,
            src,
            span: span.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn artifact(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// True when the error ends the current case but not the suite.
    ///
    /// Compiler failures (including timeouts) and unreadable artifacts are
    /// product defects; everything else signals a broken corpus or environment.
    pub fn is_case_fatal(&self) -> bool {
        matches!(
            self,
            Self::Compiler { .. } | Self::CompilerTimeout { .. } | Self::Artifact { .. }
        )
    }
}

// ============================================================================
// ACTION FAILURES
// ============================================================================

/// A check that ran and did not hold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionFailure {
    #[error("Expected: \"{name}\" == \"{expected}\"\nActual: \"{name}\" == \"{actual}\"")]
    Assertion {
        name: String,
        expected: f64,
        actual: f64,
    },

    #[error("Artifact differs from {}:\n{detail}", reference.display())]
    Mismatch { reference: PathBuf, detail: String },
}

/// Outcome of running one action that did not pass.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Failed(#[from] ActionFailure),
    #[error(transparent)]
    Harness(#[from] HarnessError),
}
