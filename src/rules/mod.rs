//! Backup rule definitions and their evaluation into concrete file sets.

pub mod specification;
pub mod walker;

pub use specification::{Entry, Explanation, FailedMatch, Specification};
pub use walker::{Filesystem, OsFilesystem, WalkResult};

use crate::model::DatasetDefinitionId;

/// Whether a rule includes or excludes the paths it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Include,
    Exclude,
}

/// One include/exclude rule: a glob `pattern` applied below `directory`.
///
/// Rules are ordered by `id`; when several rules match the same path the one
/// with the highest id wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: usize,
    pub operation: Operation,
    pub directory: String,
    pub pattern: String,
    /// Definition this rule is scoped to; `None` applies to all definitions.
    pub definition: Option<DatasetDefinitionId>,
}

impl Rule {
    pub fn include(id: usize, directory: &str, pattern: &str) -> Self {
        Self {
            id,
            operation: Operation::Include,
            directory: directory.to_string(),
            pattern: pattern.to_string(),
            definition: None,
        }
    }

    pub fn exclude(id: usize, directory: &str, pattern: &str) -> Self {
        Self {
            id,
            operation: Operation::Exclude,
            directory: directory.to_string(),
            pattern: pattern.to_string(),
            definition: None,
        }
    }

    /// Rendered form, as shown in diagnostics.
    pub fn render(&self) -> String {
        let operation = match self.operation {
            Operation::Include => "+",
            Operation::Exclude => "-",
        };
        format!("{} {} {}", operation, self.directory, self.pattern)
    }
}
