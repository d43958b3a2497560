//! The queryable outcome of compiling one isolated statement.
//!
//! Actions only ever see a `&dyn ArtifactResult`; the STL implementation lives
//! in [`crate::stl`].

use std::path::Path;

use crate::errors::{ActionError, HarnessError};

/// Named scalar properties plus comparison against a reference artifact.
pub trait ArtifactResult {
    /// Looks up a named property. Unknown names are a [`HarnessError::PropertyLookup`].
    fn property(&self, name: &str) -> Result<f64, HarnessError>;

    /// Checks the produced artifact against the reference file at `reference`.
    ///
    /// The implementation decides what "equal" means; a difference is reported
    /// as [`crate::errors::ActionFailure::Mismatch`].
    fn compare_with_expected(&self, reference: &Path) -> Result<(), ActionError>;
}

/// Turns the file written by the compiler into an [`ArtifactResult`].
pub trait ArtifactReader {
    fn read(&self, path: &Path) -> Result<Box<dyn ArtifactResult>, HarnessError>;
}
