//! SchemaVer classification for JSON Schemas
//!
//! Compares two revisions of a JSON Schema, classifies every structural
//! difference by how far it reaches into existing data, and computes the
//! next `MODEL-REVISION-ADDITION` version.
//!
//! # Example
//!
//! ```
//! use schemaver::{compute_next_version, SchemaVersion};
//! use serde_json::json;
//!
//! let old = json!({
//!     "type": "object",
//!     "properties": { "email": { "type": "string" } },
//!     "additionalProperties": false
//! });
//! let new = json!({
//!     "type": "object",
//!     "properties": {
//!         "email": { "type": "string" },
//!         "phone": { "type": "string" }
//!     },
//!     "additionalProperties": false
//! });
//!
//! let current: SchemaVersion = "1-1-1".parse().unwrap();
//! let next = compute_next_version(&old, &new, current).unwrap();
//!
//! // An optional property on a closed object is an addition
//! assert_eq!(next.to_string(), "1-1-2");
//! ```
//!
//! # Severity Levels
//!
//! | Severity | Meaning | Bump |
//! |----------|---------|------|
//! | `Model` | Breaks existing data | `2-0-0` |
//! | `Revision` | Breaks existing validators or queries, but not data | `1-2-0` |
//! | `Addition` | Every previously valid document is still valid | `1-1-2` |
//! | `None` | No change | no bump |
//!
//! # Pipeline
//!
//! [`diff`] produces [`Change`]s, [`RuleEngine::classify`] assigns each a
//! [`Severity`], [`reduce`] keeps the most severe, and [`bump`] produces the
//! next version. [`Release`] runs the whole pipeline and keeps the
//! classified changes for reporting.

mod diff;
mod error;
mod keyword;
mod loader;
mod node;
mod pattern;
mod release;
mod rules;
mod severity;
mod types;
mod version;

pub use diff::{diff, Change, ChangeKind, PropertyContext, SchemaPath, Scope};
pub use error::{
    CompareError, LoadError, SchemaParseError, UnclassifiedChangeError, VersionError,
};
pub use keyword::{Bound, Family, Keyword};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str};
pub use node::{Exclusive, ExtraProperties, InstanceType, Items, SchemaNode, SubSchema};
pub use pattern::{BestEffortPatterns, PatternComparator, Restrictiveness};
pub use release::{compute_next_version, compute_next_version_with, ClassifiedChange, Release};
pub use rules::{
    classify, lookup, lookup_property, Direction, RuleCategory, RuleEngine, KEYWORD_RULES,
    PROPERTY_RULES,
};
pub use severity::{reduce, Severity};
pub use types::CompareOptions;
pub use version::{bump, SchemaVersion};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
