//! Compare two schema revisions and compute the next version.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::diff::{diff, Change};
use crate::error::{CompareError, VersionError};
use crate::node::SchemaNode;
use crate::rules::RuleEngine;
use crate::severity::{reduce, Severity};
use crate::types::CompareOptions;
use crate::version::SchemaVersion;

/// A change together with its severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedChange {
    #[serde(flatten)]
    pub change: Change,
    pub severity: Severity,
}

/// Outcome of comparing two schema revisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Release {
    pub previous: SchemaVersion,
    /// Equal to `previous` when nothing changed.
    pub next: SchemaVersion,
    pub severity: Severity,
    pub changes: Vec<ClassifiedChange>,
}

impl Release {
    /// Compare with default options.
    pub fn compare(old: &Value, new: &Value, current: SchemaVersion) -> Result<Self, CompareError> {
        Self::compare_with(old, new, current, &CompareOptions::default())
    }

    /// Diff, classify every change, and bump `current` by the most severe one.
    ///
    /// Unlike [`compute_next_version`], identical schemas are not an error:
    /// the release simply has no changes and `next == previous`.
    ///
    /// # Errors
    ///
    /// Fails if either document is not a schema, a change cannot be
    /// classified, or the bump overflows.
    pub fn compare_with(
        old: &Value,
        new: &Value,
        current: SchemaVersion,
        options: &CompareOptions,
    ) -> Result<Self, CompareError> {
        let old_node = SchemaNode::from_value(old).map_err(|source| CompareError::Parse {
            side: "old",
            source,
        })?;
        let new_node = SchemaNode::from_value(new).map_err(|source| CompareError::Parse {
            side: "new",
            source,
        })?;

        let engine = RuleEngine::from_options(options);
        let changes = diff(&old_node, &new_node)
            .into_iter()
            .map(|change| -> Result<ClassifiedChange, CompareError> {
                let severity = engine.classify(&change)?;
                Ok(ClassifiedChange { change, severity })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let severity = reduce(changes.iter().map(|c| c.severity));
        let next = match current.bump(severity) {
            Ok(next) => next,
            Err(VersionError::NoChanges { current }) => current,
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            changes = changes.len(),
            %severity,
            previous = %current,
            %next,
            "compared schemas"
        );

        Ok(Release {
            previous: current,
            next,
            severity,
            changes,
        })
    }

    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes classified at exactly `severity`.
    pub fn changes_at(&self, severity: Severity) -> impl Iterator<Item = &ClassifiedChange> {
        self.changes.iter().filter(move |c| c.severity == severity)
    }

    /// Markdown changelog grouped by severity, most severe first.
    pub fn summarize(&self) -> String {
        Summary(self).to_string()
    }
}

struct Summary<'a>(&'a Release);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release = self.0;
        writeln!(f, "## Summary\n")?;
        if release.is_unchanged() {
            return writeln!(f, "No changes detected; version remains {}.", release.previous);
        }

        writeln!(f, "- Previous version: {}", release.previous)?;
        writeln!(f, "- New version: {}", release.next)?;
        writeln!(f, "- Change level: {}", release.severity)?;

        for (severity, heading) in [
            (Severity::Model, "Model level"),
            (Severity::Revision, "Revision level"),
            (Severity::Addition, "Addition level"),
        ] {
            let mut entries = release.changes_at(severity).peekable();
            if entries.peek().is_none() {
                continue;
            }
            writeln!(f, "\n### {}\n", heading)?;
            for entry in entries {
                writeln!(f, "- {}", entry.change)?;
            }
        }
        Ok(())
    }
}

/// Next version for a schema change from `old` to `new`.
///
/// # Errors
///
/// `CompareError::Version(VersionError::NoChanges { .. })` when the schemas
/// are equivalent, plus every error of [`Release::compare`].
pub fn compute_next_version(
    old: &Value,
    new: &Value,
    current: SchemaVersion,
) -> Result<SchemaVersion, CompareError> {
    compute_next_version_with(old, new, current, &CompareOptions::default())
}

/// [`compute_next_version`] with explicit options.
pub fn compute_next_version_with(
    old: &Value,
    new: &Value,
    current: SchemaVersion,
    options: &CompareOptions,
) -> Result<SchemaVersion, CompareError> {
    let release = Release::compare_with(old, new, current, options)?;
    if release.is_unchanged() {
        return Err(VersionError::NoChanges { current }.into());
    }
    Ok(release.next)
}
