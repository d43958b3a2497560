//! Annotation-driven test harness for OpenSCAD sources.
//!
//! Test directives live in `///` comments next to the statement they check:
//!
//! ```text
//! cube(10); ///ASSERT:volume=1000,size_x=10
//! sphere(5); ///EXPECT:reference/sphere.stl
//! ```
//!
//! Each directive line is compiled on its own (the statement is isolated with
//! OpenSCAD's `!` modifier in a scratch copy of the file) and the resulting
//! STL is checked by the directive's action.

pub use crate::actions::{build_default_registry, ActionRegistry, TestAction};
pub use crate::artifact::{ArtifactReader, ArtifactResult};
pub use crate::case::{CaseState, TestCase};
pub use crate::compiler::{Compiler, OpenScad};
pub use crate::config::HarnessConfig;
pub use crate::errors::{ActionError, ActionFailure, DirectiveError, HarnessError, ParseContext};
pub use crate::scanner::SourceScanner;
pub use crate::stl::{StlMesh, StlReader, StlResult};
pub use crate::suite::TestSuite;

pub mod actions;
pub mod artifact;
pub mod case;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod directive;
pub mod discovery;
pub mod errors;
pub mod isolation;
pub mod scanner;
pub mod stl;
pub mod suite;
