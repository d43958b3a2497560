//! Test actions and the registry that builds them from directive payloads.
//!
//! A directive payload has the shape `IDENTIFIER:PAYLOAD`. The identifier picks
//! an action kind (case-sensitive, exact match) and the rest is handed to that
//! kind's own parser. New kinds are added by registering another
//! identifier/parser pair; existing kinds are untouched.
//!
//! | Identifier | Payload                   | Action          |
//! |------------|---------------------------|-----------------|
//! | `ASSERT`   | `name=value[,name=value]*`| [`Assertion`]   |
//! | `EXPECT`   | reference file path       | [`Expect`]      |

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::artifact::ArtifactResult;
use crate::errors::{ActionError, DirectiveError};

pub mod assertion;
pub mod expectation;

pub use assertion::{Assertion, SubAssertion};
pub use expectation::Expect;

static ACTION_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+):(.*)$").expect("action directive pattern is valid"));

/// A parsed, executable check bound to one directive.
pub trait TestAction: fmt::Debug {
    /// The directive identifier this action was built from.
    fn identifier(&self) -> &'static str;

    /// Evaluates the action against a compiled result.
    fn run(&self, result: &dyn ArtifactResult) -> Result<(), ActionError>;
}

/// Builds an action from its payload. `base_dir` anchors relative paths.
pub type ActionParser = fn(&str, &Path) -> Result<Box<dyn TestAction>, DirectiveError>;

/// Maps directive identifiers to payload parsers.
#[derive(Default)]
pub struct ActionRegistry {
    parsers: HashMap<String, ActionParser>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the parser for `identifier`.
    pub fn register(&mut self, identifier: &str, parser: ActionParser) {
        self.parsers.insert(identifier.to_string(), parser);
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.parsers.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.parsers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Parses a whitespace-free `IDENTIFIER:PAYLOAD` string into an action.
    pub fn create(
        &self,
        directive: &str,
        base_dir: &Path,
    ) -> Result<Box<dyn TestAction>, DirectiveError> {
        let Some(caps) = ACTION_DIRECTIVE.captures(directive) else {
            return Err(DirectiveError::new(format!(
                "Could not parse test string: {directive}"
            )));
        };
        let identifier = &caps[1];
        let payload = &caps[2];

        let Some(parser) = self.parsers.get(identifier) else {
            return Err(DirectiveError::new(format!(
                "Test action \"{identifier}\" does not exist (known: {})",
                self.identifiers().join(", ")
            )));
        };
        parser(payload, base_dir)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

/// Registry with every built-in action kind.
pub fn build_default_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Assertion::IDENTIFIER, Assertion::create);
    registry.register(Expect::IDENTIFIER, Expect::create);
    registry
}
