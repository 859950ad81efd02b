//! Evaluation of ordered include/exclude rules into a concrete file set.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::rules::walker::Filesystem;
use crate::rules::{Operation, Rule};

/// One step of a path's match trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Explanation {
    pub operation: Operation,
}

/// The effective decision for one path, with the full trail of rules that
/// touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub file: PathBuf,
    pub directory: PathBuf,
    pub operation: Operation,
    pub reason: Vec<Explanation>,
}

/// A rule that could not be applied to a path.
#[derive(Debug)]
pub struct FailedMatch {
    pub rule: Rule,
    pub path: PathBuf,
    pub failure: Error,
}

/// The evaluated form of a rule set: every matched path with its decision
/// trail, plus the rules and paths that could not be matched.
///
/// Construction is eager; walking and matching happen in [`Specification::tracked`].
#[derive(Debug, Default)]
pub struct Specification {
    pub entries: BTreeMap<PathBuf, Entry>,
    pub failures: Vec<FailedMatch>,
}

struct RuleMatcher {
    operation: Operation,
    matcher: GlobMatcher,
}

impl Specification {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Evaluates `rules` against `filesystem`.
    pub fn new(rules: Vec<Rule>, filesystem: &dyn Filesystem) -> Result<Self> {
        Self::tracked(rules, filesystem, |_| ())
    }

    /// Evaluates `rules` against `filesystem`, reporting every path matched
    /// by an include rule through `on_match_included` as it is discovered.
    ///
    /// Rules are grouped by directory and each directory is walked once, with
    /// all of the group's matchers applied to every visited path. Matches are
    /// applied in rule order, so the last matching rule decides a path's
    /// effective operation. A group whose walk produces neither matches nor
    /// traversal failures marks all of its rules as failed; a directory that
    /// cannot be walked at all fails with the filesystem error. Traversal
    /// failures on paths matched by an exclusion rule are dropped.
    pub fn tracked(
        rules: Vec<Rule>,
        filesystem: &dyn Filesystem,
        mut on_match_included: impl FnMut(&Path),
    ) -> Result<Self> {
        let mut spec = Self::empty();
        let mut exclusion_matchers: Vec<GlobMatcher> = Vec::new();

        for (directory, group) in group_by_directory(rules) {
            let root = PathBuf::from(&directory);
            let matchers = group
                .iter()
                .map(|rule| {
                    Ok(RuleMatcher {
                        operation: rule.operation,
                        matcher: compile_matcher(&directory, &rule.pattern)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            exclusion_matchers.extend(
                matchers
                    .iter()
                    .filter(|m| m.operation == Operation::Exclude)
                    .map(|m| m.matcher.clone()),
            );

            let walked = match filesystem.walk(&root) {
                Ok(walked) => walked,
                Err(e) => {
                    debug!(directory = %root.display(), error = %e, "Failed to walk rule directory");
                    if let Some(rule) = group.into_iter().next() {
                        spec.failures.push(FailedMatch {
                            rule,
                            path: root,
                            failure: e,
                        });
                    }
                    continue;
                }
            };

            let mut matched_any = false;

            for (rule, rule_matcher) in group.iter().zip(&matchers) {
                for path in &walked.paths {
                    if rule_matcher.matcher.is_match(path) {
                        matched_any = true;
                        if rule.operation == Operation::Include {
                            on_match_included(path);
                        }
                        spec.record_match(rule, path, &root);
                    }
                }
            }

            if !matched_any && walked.failures.is_empty() {
                for rule in group {
                    let failure = Error::RuleMatchingFailure { rule: rule.render() };
                    spec.failures.push(FailedMatch {
                        rule,
                        path: root.clone(),
                        failure,
                    });
                }
            } else if let Some(first) = group.into_iter().next() {
                for (path, failure) in walked.failures {
                    spec.failures.push(FailedMatch {
                        rule: first.clone(),
                        path,
                        failure: Error::Io(failure),
                    });
                }
            }
        }

        spec.failures.retain(|failure| {
            !exclusion_matchers
                .iter()
                .any(|matcher| matcher.is_match(&failure.path))
        });

        Ok(spec)
    }

    fn record_match(&mut self, rule: &Rule, path: &Path, directory: &Path) {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.operation = rule.operation;
                entry.reason.push(Explanation {
                    operation: rule.operation,
                });
            }
            None => {
                self.entries.insert(
                    path.to_path_buf(),
                    Entry {
                        file: path.to_path_buf(),
                        directory: directory.to_path_buf(),
                        operation: rule.operation,
                        reason: vec![Explanation {
                            operation: rule.operation,
                        }],
                    },
                );
            }
        }
    }

    /// All paths to back up: entries decided as include, plus the directories
    /// between each entry and its rule's root (the roots themselves included).
    pub fn included(&self) -> Vec<PathBuf> {
        let entries = self
            .entries
            .values()
            .filter(|entry| entry.operation == Operation::Include);

        let mut included: Vec<PathBuf> = entries
            .clone()
            .map(|entry| entry.file.clone())
            .collect();

        for entry in entries {
            for parent in Self::collect_relative_parents(&entry.directory, &entry.file) {
                if !included.contains(&parent) {
                    included.push(parent);
                }
            }
        }

        included
    }

    /// All paths decided as exclude.
    pub fn excluded(&self) -> Vec<PathBuf> {
        self.entries
            .values()
            .filter(|entry| entry.operation == Operation::Exclude)
            .map(|entry| entry.file.clone())
            .collect()
    }

    /// Per-path decision trails.
    pub fn explanation(&self) -> BTreeMap<PathBuf, Vec<Explanation>> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.reason.clone()))
            .collect()
    }

    /// Rules that could not be applied, with the reason.
    pub fn unmatched(&self) -> Vec<(&Rule, &Error)> {
        self.failures
            .iter()
            .map(|failure| (&failure.rule, &failure.failure))
            .collect()
    }

    /// The ancestors of `to` from its immediate parent down to and including
    /// `from`; empty when `to` is `from` or lies outside it.
    pub fn collect_relative_parents(from: &Path, to: &Path) -> Vec<PathBuf> {
        if !to.starts_with(from) {
            return Vec::new();
        }

        let mut collected = Vec::new();
        let mut current = to;

        while current != from {
            match current.parent() {
                Some(parent) => {
                    collected.push(parent.to_path_buf());
                    current = parent;
                }
                None => return Vec::new(),
            }
        }

        collected
    }
}

fn group_by_directory(rules: Vec<Rule>) -> Vec<(String, Vec<Rule>)> {
    let mut groups: Vec<(String, Vec<Rule>)> = Vec::new();

    for rule in rules {
        match groups.iter_mut().find(|(directory, _)| *directory == rule.directory) {
            Some((_, group)) => group.push(rule),
            None => groups.push((rule.directory.clone(), vec![rule])),
        }
    }

    // matches are applied in declaration order within a group
    for (_, group) in &mut groups {
        group.sort_by_key(|rule| rule.id);
    }

    groups
}

fn compile_matcher(directory: &str, pattern: &str) -> Result<GlobMatcher> {
    let rooted = if directory.ends_with('/') {
        format!("{}{}", directory, pattern)
    } else {
        format!("{}/{}", directory, pattern)
    };

    let glob = GlobBuilder::new(&rooted)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::InvalidRulePattern {
            pattern: rooted.clone(),
            reason: e.to_string(),
        })?;

    Ok(glob.compile_matcher())
}
