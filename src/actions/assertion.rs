//! `ASSERT` directives: exact equality checks on named result properties.
//!
//! ```text
//! cube([2, 3, 4]); ///ASSERT:volume=24,size_z=4
//! ```
//!
//! Values are compared with `==`; there is no tolerance. Sub-assertions run in
//! order and the first mismatch ends the assertion.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::TestAction;
use crate::artifact::ArtifactResult;
use crate::errors::{ActionError, ActionFailure, DirectiveError};

static SUB_ASSERTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^=]+)=(-?\d+(?:\.\d+)?)$").expect("sub-assertion pattern is valid")
});

/// One `name=value` check.
#[derive(Debug, Clone, PartialEq)]
pub struct SubAssertion {
    pub name: String,
    pub expectation: f64,
}

impl SubAssertion {
    pub const DELIMITER: char = '=';

    pub fn parse(item: &str) -> Result<Self, DirectiveError> {
        let Some(caps) = SUB_ASSERTION.captures(item) else {
            return Err(DirectiveError::new(format!(
                "Could not parse: \"{item}\" (expected name=number)"
            )));
        };
        let expectation = caps[2]
            .parse::<f64>()
            .map_err(|e| DirectiveError::new(format!("Could not parse: \"{item}\": {e}")))?;
        Ok(Self {
            name: caps[1].to_string(),
            expectation,
        })
    }

    pub fn run(&self, result: &dyn ArtifactResult) -> Result<(), ActionError> {
        let actual = result.property(&self.name)?;
        if actual != self.expectation {
            return Err(ActionFailure::Assertion {
                name: self.name.clone(),
                expected: self.expectation,
                actual,
            }
            .into());
        }
        Ok(())
    }
}

/// A comma-separated list of [`SubAssertion`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub subs: Vec<SubAssertion>,
}

impl Assertion {
    pub const IDENTIFIER: &'static str = "ASSERT";
    pub const DELIMITER: char = ',';

    pub fn parse(payload: &str) -> Result<Self, DirectiveError> {
        if payload.is_empty() {
            return Err(DirectiveError::new("Could not parse: empty assertion"));
        }
        let subs = payload
            .split(Self::DELIMITER)
            .map(SubAssertion::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { subs })
    }

    /// [`super::ActionParser`] entry point.
    pub fn create(payload: &str, _base_dir: &Path) -> Result<Box<dyn TestAction>, DirectiveError> {
        Ok(Box::new(Self::parse(payload)?))
    }
}

impl TestAction for Assertion {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn run(&self, result: &dyn ArtifactResult) -> Result<(), ActionError> {
        for sub in &self.subs {
            sub.run(result)?;
        }
        Ok(())
    }
}
