//! Change severity and the reducer over a set of classified changes.

use std::fmt;

use serde::Serialize;

/// How far a change reaches, ordered `None < Addition < Revision < Model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No change.
    #[default]
    None,
    /// Every document valid before is still valid.
    Addition,
    /// Breaks existing validators or queries, but not data.
    Revision,
    /// Breaks existing data. Some documents valid before are rejected.
    Model,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Addition => "addition",
            Severity::Revision => "revision",
            Severity::Model => "model",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// The most severe of `severities`, or [`Severity::None`] when empty.
pub fn reduce<I>(severities: I) -> Severity
where
    I: IntoIterator<Item = Severity>,
{
    severities.into_iter().max().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(Severity::None < Severity::Addition);
        assert!(Severity::Addition < Severity::Revision);
        assert!(Severity::Revision < Severity::Model);
    }

    #[test]
    fn reduce_empty_is_none() {
        assert_eq!(reduce(Vec::new()), Severity::None);
    }

    #[test]
    fn reduce_takes_maximum() {
        assert_eq!(
            reduce([Severity::Addition, Severity::Revision, Severity::Addition]),
            Severity::Revision
        );
        assert_eq!(
            reduce([Severity::Model, Severity::Addition]),
            Severity::Model
        );
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Severity::Revision).unwrap(),
            serde_json::json!("revision")
        );
    }
}
