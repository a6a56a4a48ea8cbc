//! SchemaVer version numbers (`MODEL-REVISION-ADDITION`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;
use crate::severity::Severity;

/// A SchemaVer version such as `1-2-0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    model: u64,
    revision: u64,
    addition: u64,
}

impl SchemaVersion {
    pub const fn new(model: u64, revision: u64, addition: u64) -> Self {
        SchemaVersion {
            model,
            revision,
            addition,
        }
    }

    pub fn model(&self) -> u64 {
        self.model
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn addition(&self) -> u64 {
        self.addition
    }

    /// Next version for a change of the given severity.
    ///
    /// Incrementing a component resets every component to its right.
    ///
    /// # Errors
    ///
    /// `VersionError::NoChanges` for [`Severity::None`], and
    /// `VersionError::Overflow` if the component is already at `u64::MAX`.
    pub fn bump(self, severity: Severity) -> Result<Self, VersionError> {
        let overflow = |component| VersionError::Overflow {
            current: self,
            component,
        };
        match severity {
            Severity::None => Err(VersionError::NoChanges { current: self }),
            Severity::Addition => {
                let addition = self.addition.checked_add(1).ok_or_else(|| overflow("addition"))?;
                Ok(SchemaVersion::new(self.model, self.revision, addition))
            }
            Severity::Revision => {
                let revision = self.revision.checked_add(1).ok_or_else(|| overflow("revision"))?;
                Ok(SchemaVersion::new(self.model, revision, 0))
            }
            Severity::Model => {
                let model = self.model.checked_add(1).ok_or_else(|| overflow("model"))?;
                Ok(SchemaVersion::new(model, 0, 0))
            }
        }
    }
}

/// Free-function form of [`SchemaVersion::bump`].
pub fn bump(current: SchemaVersion, severity: Severity) -> Result<SchemaVersion, VersionError> {
    current.bump(severity)
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.model, self.revision, self.addition)
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionError;

    /// Accepts `1-0-0`, with optional surrounding whitespace and a leading `v`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidFormat {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let parts: Vec<&str> = trimmed.split('-').collect();
        let [model, revision, addition] = parts.as_slice() else {
            return Err(invalid());
        };
        let component = |p: &str| -> Result<u64, VersionError> {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            p.parse().map_err(|_| invalid())
        };
        Ok(SchemaVersion::new(
            component(*model)?,
            component(*revision)?,
            component(*addition)?,
        ))
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
