//! Shared helpers and comparison options.

use std::collections::BTreeSet;

use serde_json::Value;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Options for comparing two schema revisions.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Extra keyword names declared annotation-only (e.g. OpenAPI `example`
    /// or `x-` extensions). Changes to them classify like metadata.
    /// Undeclared unknown keywords are reported as unclassified.
    pub annotation_keywords: BTreeSet<String>,
}

impl CompareOptions {
    /// Create options with no extra annotation keywords.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one keyword annotation-only.
    pub fn annotation_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.annotation_keywords.insert(keyword.into());
        self
    }

    /// Declare several keywords annotation-only.
    pub fn annotation_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.annotation_keywords
            .extend(keywords.into_iter().map(Into::into));
        self
    }
}
