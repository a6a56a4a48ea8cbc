//! Error types for schema comparison and version computation.

use std::path::PathBuf;
use thiserror::Error;

use crate::version::SchemaVersion;

/// A document that cannot be mapped onto the schema model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaParseError {
    #[error("expected a schema object at {path}, got {actual}")]
    NotASchema { path: String, actual: String },

    #[error("invalid {keyword} at {path}: expected {expected}, got {actual}")]
    InvalidKeyword {
        path: String,
        keyword: String,
        expected: String,
        actual: String,
    },

    #[error("unknown instance type \"{value}\" at {path}")]
    UnknownType { path: String, value: String },
}

/// A change the rules engine has no rule for.
///
/// Raised for unrecognized keywords so that an unknown change never
/// lowers the computed bump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot classify change to '{keyword}' at {path}")]
pub struct UnclassifiedChangeError {
    pub keyword: String,
    /// JSON Pointer style location of the change.
    pub path: String,
}

/// Errors produced while parsing or bumping a version number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version \"{value}\": expected MODEL-REVISION-ADDITION, e.g. 1-0-0")]
    InvalidFormat { value: String },

    #[error("no changes detected; version remains {current}")]
    NoChanges { current: SchemaVersion },

    #[error("{component} component of {current} cannot be incremented")]
    Overflow {
        current: SchemaVersion,
        component: &'static str,
    },
}

/// Errors from the full compare pipeline.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("cannot read {side} schema: {source}")]
    Parse {
        side: &'static str,
        #[source]
        source: SchemaParseError,
    },

    #[error(transparent)]
    Unclassified(#[from] UnclassifiedChangeError),

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Errors while loading a schema document (host side).
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },
}

impl CompareError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompareError::Version(VersionError::NoChanges { .. }) => 1,
            _ => 2,
        }
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
