//! Typed model of a decoded schema document.
//!
//! Only the keywords the rules engine understands get typed fields. Every
//! other keyword lands in [`SchemaNode::extensions`] verbatim, so a change to
//! it can still be detected and reported as unclassified.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::SchemaParseError;
use crate::keyword::{Family, Keyword};
use crate::types::json_type_name;

/// JSON Schema instance types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl InstanceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "null" => Some(InstanceType::Null),
            "boolean" => Some(InstanceType::Boolean),
            "object" => Some(InstanceType::Object),
            "array" => Some(InstanceType::Array),
            "number" => Some(InstanceType::Number),
            "integer" => Some(InstanceType::Integer),
            "string" => Some(InstanceType::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::Null => "null",
            InstanceType::Boolean => "boolean",
            InstanceType::Object => "object",
            InstanceType::Array => "array",
            InstanceType::Number => "number",
            InstanceType::Integer => "integer",
            InstanceType::String => "string",
        }
    }

    /// Keyword family that constrains instances of this type.
    fn family(&self) -> Option<Family> {
        match self {
            InstanceType::Number | InstanceType::Integer => Some(Family::Numeric),
            InstanceType::String => Some(Family::String),
            InstanceType::Array => Some(Family::Array),
            InstanceType::Object => Some(Family::Object),
            InstanceType::Null | InstanceType::Boolean => None,
        }
    }
}

/// A sub-schema slot that also accepts a boolean: `properties` entries,
/// `additionalProperties`, `contains`, `items` and tuple positions.
#[derive(Debug, Clone, PartialEq)]
pub enum SubSchema {
    Flag(bool),
    Schema(Box<SchemaNode>),
}

impl SubSchema {
    pub fn to_value(&self) -> Value {
        match self {
            SubSchema::Flag(b) => Value::Bool(*b),
            SubSchema::Schema(node) => node.as_value().clone(),
        }
    }
}

impl Default for SubSchema {
    fn default() -> Self {
        SubSchema::Flag(true)
    }
}

/// Openness rank of a raw sub-schema value, if it is a boolean or a schema.
pub(crate) fn openness(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(false) => Some(0),
        Value::Object(_) => Some(1),
        Value::Bool(true) => Some(2),
        _ => None,
    }
}

/// `items` in either single-schema or positional (tuple) form.
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    Single(SubSchema),
    Tuple(Vec<SubSchema>),
}

impl Items {
    pub fn to_value(&self) -> Value {
        match self {
            Items::Single(sub) => sub.to_value(),
            Items::Tuple(slots) => Value::Array(slots.iter().map(SubSchema::to_value).collect()),
        }
    }
}

/// `exclusiveMaximum` / `exclusiveMinimum`: a limit (2019+) or a flag
/// modifying `maximum` / `minimum` (draft 4).
#[derive(Debug, Clone, PartialEq)]
pub enum Exclusive {
    Limit(Number),
    Flag(bool),
}

impl Exclusive {
    pub fn to_value(&self) -> Value {
        match self {
            Exclusive::Limit(n) => Value::Number(n.clone()),
            Exclusive::Flag(b) => Value::Bool(*b),
        }
    }
}

/// Whether an object accepts properties beyond those it lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraProperties {
    Allowed,
    NotAllowed,
    /// `additionalProperties` is a schema: extras are allowed if they match it.
    Validated,
}

impl ExtraProperties {
    pub fn label(&self) -> &'static str {
        match self {
            ExtraProperties::Allowed => "allowed",
            ExtraProperties::NotAllowed => "not allowed",
            ExtraProperties::Validated => "validated",
        }
    }
}

/// One schema (sub)document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub types: Option<BTreeSet<InstanceType>>,
    pub enumeration: Option<Vec<Value>>,
    pub format: Option<String>,

    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Exclusive>,
    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Exclusive>,
    pub multiple_of: Option<Number>,

    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,

    pub items: Option<Items>,
    pub prefix_items: Option<Vec<SubSchema>>,
    pub contains: Option<SubSchema>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub max_contains: Option<u64>,
    pub min_contains: Option<u64>,
    /// Absent means `false`.
    pub unique_items: bool,

    pub properties: BTreeMap<String, SubSchema>,
    /// Absent means no required properties.
    pub required: BTreeSet<String>,
    /// Absent means `true`.
    pub additional_properties: SubSchema,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub dependent_required: BTreeMap<String, BTreeSet<String>>,

    pub metadata: BTreeMap<Keyword, Value>,
    pub extensions: BTreeMap<String, Value>,

    source: Value,
}

impl SchemaNode {
    /// Decode a schema document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaParseError` if the document is not an object or a
    /// recognized keyword holds a value of the wrong JSON type.
    pub fn from_value(value: &Value) -> Result<Self, SchemaParseError> {
        parse_node(value, "")
    }

    /// The document this node was decoded from.
    pub fn as_value(&self) -> &Value {
        &self.source
    }

    /// State of `additionalProperties` at this level.
    pub fn extra_properties(&self) -> ExtraProperties {
        match &self.additional_properties {
            SubSchema::Flag(true) => ExtraProperties::Allowed,
            SubSchema::Flag(false) => ExtraProperties::NotAllowed,
            SubSchema::Schema(_) => ExtraProperties::Validated,
        }
    }

    /// `items`, with `items: true` read as absent.
    pub fn effective_items(&self) -> Option<&Items> {
        match &self.items {
            Some(Items::Single(SubSchema::Flag(true))) => None,
            items => items.as_ref(),
        }
    }

    /// Whether keywords of `family` constrain instances of this node.
    ///
    /// Without a declared `type` every family applies.
    pub fn constrains(&self, family: Family) -> bool {
        match &self.types {
            None => true,
            Some(types) => {
                matches!(family, Family::Core | Family::Metadata)
                    || types.iter().any(|t| t.family() == Some(family))
            }
        }
    }

    /// JSON value of a keyword that compares as a single value.
    ///
    /// Returns `None` when the keyword is absent. Keywords with an implicit
    /// default (`uniqueItems`) always report their effective value, and a
    /// draft 4 exclusive flag set to `false` reads as absent.
    pub fn value_of(&self, keyword: &Keyword) -> Option<Value> {
        let number = |n: &Option<Number>| n.clone().map(Value::Number);
        let count = |n: &Option<u64>| n.map(Value::from);
        let exclusive = |e: &Option<Exclusive>| match e {
            None | Some(Exclusive::Flag(false)) => None,
            Some(e) => Some(e.to_value()),
        };
        match keyword {
            Keyword::Type => self.types.as_ref().map(types_to_value),
            Keyword::Format => self.format.clone().map(Value::String),
            Keyword::Maximum => number(&self.maximum),
            Keyword::ExclusiveMaximum => exclusive(&self.exclusive_maximum),
            Keyword::Minimum => number(&self.minimum),
            Keyword::ExclusiveMinimum => exclusive(&self.exclusive_minimum),
            Keyword::MultipleOf => number(&self.multiple_of),
            Keyword::MaxLength => count(&self.max_length),
            Keyword::MinLength => count(&self.min_length),
            Keyword::Pattern => self.pattern.clone().map(Value::String),
            Keyword::MaxItems => count(&self.max_items),
            Keyword::MinItems => count(&self.min_items),
            Keyword::MaxContains => count(&self.max_contains),
            Keyword::MinContains => count(&self.min_contains),
            Keyword::UniqueItems => Some(Value::Bool(self.unique_items)),
            Keyword::MaxProperties => count(&self.max_properties),
            Keyword::MinProperties => count(&self.min_properties),
            Keyword::Other(name) => self.extensions.get(name).cloned(),
            kw if kw.is_metadata() => self.metadata.get(kw).cloned(),
            _ => None,
        }
    }
}

fn types_to_value(types: &BTreeSet<InstanceType>) -> Value {
    if types.len() == 1 {
        if let Some(t) = types.iter().next() {
            return Value::String(t.as_str().to_string());
        }
    }
    Value::Array(
        types
            .iter()
            .map(|t| Value::String(t.as_str().to_string()))
            .collect(),
    )
}

// --- Internal implementation ---

fn pointer(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn invalid(path: &str, keyword: &str, expected: &str, actual: &Value) -> SchemaParseError {
    SchemaParseError::InvalidKeyword {
        path: pointer(path),
        keyword: keyword.to_string(),
        expected: expected.to_string(),
        actual: json_type_name(actual).to_string(),
    }
}

fn parse_node(value: &Value, path: &str) -> Result<SchemaNode, SchemaParseError> {
    let Some(map) = value.as_object() else {
        return Err(SchemaParseError::NotASchema {
            path: pointer(path),
            actual: json_type_name(value).to_string(),
        });
    };

    let mut node = SchemaNode {
        source: value.clone(),
        ..SchemaNode::default()
    };

    for (key, val) in map {
        let child_path = format!("{}/{}", path, escape(key));
        let child = child_path.as_str();

        match Keyword::parse(key) {
            Keyword::Type => node.types = Some(parse_types(val, child)?),
            Keyword::Enum => node.enumeration = Some(expect_array(val, child, key)?.clone()),
            Keyword::Format => node.format = Some(expect_str(val, child, key)?.to_string()),
            Keyword::Maximum => node.maximum = Some(expect_number(val, child, key)?),
            Keyword::Minimum => node.minimum = Some(expect_number(val, child, key)?),
            Keyword::MultipleOf => node.multiple_of = Some(expect_number(val, child, key)?),
            Keyword::ExclusiveMaximum => {
                node.exclusive_maximum = Some(parse_exclusive(val, child, key)?)
            }
            Keyword::ExclusiveMinimum => {
                node.exclusive_minimum = Some(parse_exclusive(val, child, key)?)
            }
            Keyword::MaxLength => node.max_length = Some(expect_count(val, child, key)?),
            Keyword::MinLength => node.min_length = Some(expect_count(val, child, key)?),
            Keyword::Pattern => node.pattern = Some(expect_str(val, child, key)?.to_string()),
            Keyword::Items => node.items = Some(parse_items(val, child)?),
            Keyword::PrefixItems => node.prefix_items = Some(parse_tuple(val, child, key)?),
            Keyword::Contains => node.contains = Some(parse_sub_schema(val, child)?),
            Keyword::MaxItems => node.max_items = Some(expect_count(val, child, key)?),
            Keyword::MinItems => node.min_items = Some(expect_count(val, child, key)?),
            Keyword::MaxContains => node.max_contains = Some(expect_count(val, child, key)?),
            Keyword::MinContains => node.min_contains = Some(expect_count(val, child, key)?),
            Keyword::UniqueItems => node.unique_items = expect_bool(val, child, key)?,
            Keyword::Properties => node.properties = parse_properties(val, child)?,
            Keyword::Required => node.required = parse_name_set(val, child, key)?,
            Keyword::AdditionalProperties => {
                node.additional_properties = parse_sub_schema(val, child)?
            }
            Keyword::MaxProperties => node.max_properties = Some(expect_count(val, child, key)?),
            Keyword::MinProperties => node.min_properties = Some(expect_count(val, child, key)?),
            Keyword::DependentRequired => {
                node.dependent_required = parse_dependent_required(val, child)?
            }
            keyword @ (Keyword::Title
            | Keyword::Description
            | Keyword::Default
            | Keyword::Deprecated
            | Keyword::ReadOnly
            | Keyword::WriteOnly
            | Keyword::Examples
            | Keyword::Id
            | Keyword::Comment) => {
                check_metadata(&keyword, val, child)?;
                node.metadata.insert(keyword, val.clone());
            }
            Keyword::Other(name) => {
                node.extensions.insert(name, val.clone());
            }
        }
    }

    Ok(node)
}

/// Escape a key for use as a JSON Pointer segment (~ -> ~0, / -> ~1).
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn parse_types(value: &Value, path: &str) -> Result<BTreeSet<InstanceType>, SchemaParseError> {
    let names: Vec<&Value> = match value {
        Value::String(_) => vec![value],
        Value::Array(arr) => arr.iter().collect(),
        other => return Err(invalid(path, "type", "string or array", other)),
    };

    let mut types = BTreeSet::new();
    for name in names {
        let Some(s) = name.as_str() else {
            return Err(invalid(path, "type", "string", name));
        };
        let t = InstanceType::parse(s).ok_or_else(|| SchemaParseError::UnknownType {
            path: pointer(path),
            value: s.to_string(),
        })?;
        types.insert(t);
    }
    Ok(types)
}

fn parse_sub_schema(value: &Value, path: &str) -> Result<SubSchema, SchemaParseError> {
    match value {
        Value::Bool(b) => Ok(SubSchema::Flag(*b)),
        other => Ok(SubSchema::Schema(Box::new(parse_node(other, path)?))),
    }
}

fn parse_items(value: &Value, path: &str) -> Result<Items, SchemaParseError> {
    match value {
        Value::Array(_) => Ok(Items::Tuple(parse_tuple(value, path, "items")?)),
        other => Ok(Items::Single(parse_sub_schema(other, path)?)),
    }
}

fn parse_tuple(
    value: &Value,
    path: &str,
    keyword: &str,
) -> Result<Vec<SubSchema>, SchemaParseError> {
    expect_array(value, path, keyword)?
        .iter()
        .enumerate()
        .map(|(i, item)| parse_sub_schema(item, &format!("{}/{}", path, i)))
        .collect()
}

fn parse_properties(
    value: &Value,
    path: &str,
) -> Result<BTreeMap<String, SubSchema>, SchemaParseError> {
    let props = expect_object(value, path, "properties")?;
    let mut result = BTreeMap::new();
    for (name, prop) in props {
        let prop_path = format!("{}/{}", path, escape(name));
        result.insert(name.clone(), parse_sub_schema(prop, &prop_path)?);
    }
    Ok(result)
}

fn parse_name_set(
    value: &Value,
    path: &str,
    keyword: &str,
) -> Result<BTreeSet<String>, SchemaParseError> {
    expect_array(value, path, keyword)?
        .iter()
        .map(|v| {
            v.as_str()
                .map(String::from)
                .ok_or_else(|| invalid(path, keyword, "array of strings", v))
        })
        .collect()
}

fn parse_dependent_required(
    value: &Value,
    path: &str,
) -> Result<BTreeMap<String, BTreeSet<String>>, SchemaParseError> {
    let deps = expect_object(value, path, "dependentRequired")?;
    let mut result = BTreeMap::new();
    for (name, names) in deps {
        let dep_path = format!("{}/{}", path, escape(name));
        result.insert(
            name.clone(),
            parse_name_set(names, &dep_path, "dependentRequired")?,
        );
    }
    Ok(result)
}

fn parse_exclusive(
    value: &Value,
    path: &str,
    keyword: &str,
) -> Result<Exclusive, SchemaParseError> {
    match value {
        Value::Number(n) => Ok(Exclusive::Limit(n.clone())),
        Value::Bool(b) => Ok(Exclusive::Flag(*b)),
        other => Err(invalid(path, keyword, "number or boolean", other)),
    }
}

fn check_metadata(keyword: &Keyword, value: &Value, path: &str) -> Result<(), SchemaParseError> {
    let ok = match keyword {
        Keyword::Title | Keyword::Description | Keyword::Id | Keyword::Comment => value.is_string(),
        Keyword::Deprecated | Keyword::ReadOnly | Keyword::WriteOnly => value.is_boolean(),
        Keyword::Examples => value.is_array(),
        _ => true,
    };
    if ok {
        return Ok(());
    }
    let expected = match keyword {
        Keyword::Deprecated | Keyword::ReadOnly | Keyword::WriteOnly => "boolean",
        Keyword::Examples => "array",
        _ => "string",
    };
    Err(invalid(path, keyword.as_str(), expected, value))
}

fn expect_object<'a>(
    value: &'a Value,
    path: &str,
    keyword: &str,
) -> Result<&'a Map<String, Value>, SchemaParseError> {
    value
        .as_object()
        .ok_or_else(|| invalid(path, keyword, "object", value))
}

fn expect_array<'a>(
    value: &'a Value,
    path: &str,
    keyword: &str,
) -> Result<&'a Vec<Value>, SchemaParseError> {
    value
        .as_array()
        .ok_or_else(|| invalid(path, keyword, "array", value))
}

fn expect_str<'a>(
    value: &'a Value,
    path: &str,
    keyword: &str,
) -> Result<&'a str, SchemaParseError> {
    value
        .as_str()
        .ok_or_else(|| invalid(path, keyword, "string", value))
}

fn expect_bool(value: &Value, path: &str, keyword: &str) -> Result<bool, SchemaParseError> {
    value
        .as_bool()
        .ok_or_else(|| invalid(path, keyword, "boolean", value))
}

fn expect_number(value: &Value, path: &str, keyword: &str) -> Result<Number, SchemaParseError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        other => Err(invalid(path, keyword, "number", other)),
    }
}

fn expect_count(value: &Value, path: &str, keyword: &str) -> Result<u64, SchemaParseError> {
    value
        .as_u64()
        .ok_or_else(|| invalid(path, keyword, "non-negative integer", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_schema() {
        let node = SchemaNode::from_value(&json!({
            "type": "object",
            "properties": {
                "email": { "type": "string", "pattern": "@" }
            },
            "required": ["email"],
            "additionalProperties": false
        }))
        .unwrap();

        assert_eq!(
            node.types,
            Some(BTreeSet::from([InstanceType::Object]))
        );
        assert!(node.required.contains("email"));
        assert_eq!(node.extra_properties(), ExtraProperties::NotAllowed);
        assert!(matches!(
            &node.properties["email"],
            SubSchema::Schema(email) if email.pattern.as_deref() == Some("@")
        ));
    }

    #[test]
    fn defaults_for_absent_keywords() {
        let node = SchemaNode::from_value(&json!({})).unwrap();
        assert_eq!(node.extra_properties(), ExtraProperties::Allowed);
        assert!(!node.unique_items);
        assert!(node.required.is_empty());
        assert_eq!(node.value_of(&Keyword::UniqueItems), Some(json!(false)));
        assert_eq!(node.value_of(&Keyword::Maximum), None);
    }

    #[test]
    fn type_accepts_array_form() {
        let node = SchemaNode::from_value(&json!({ "type": ["string", "null"] })).unwrap();
        let types = node.types.unwrap();
        assert!(types.contains(&InstanceType::String));
        assert!(types.contains(&InstanceType::Null));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = SchemaNode::from_value(&json!({ "properties": { "a": { "type": "text" } } }))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaParseError::UnknownType {
                path: "/properties/a/type".into(),
                value: "text".into()
            }
        );
    }

    #[test]
    fn wrong_keyword_type_is_an_error() {
        let err = SchemaNode::from_value(&json!({ "maximum": "100" })).unwrap_err();
        assert!(matches!(
            err,
            SchemaParseError::InvalidKeyword { ref keyword, .. } if keyword == "maximum"
        ));
    }

    #[test]
    fn non_object_root_is_an_error() {
        let err = SchemaNode::from_value(&json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            SchemaParseError::NotASchema {
                path: "/".into(),
                actual: "array".into()
            }
        );
    }

    #[test]
    fn unknown_keywords_kept_as_extensions() {
        let node = SchemaNode::from_value(&json!({ "allOf": [{}], "x-order": 1 })).unwrap();
        assert_eq!(node.extensions.len(), 2);
        assert_eq!(
            node.value_of(&Keyword::Other("x-order".into())),
            Some(json!(1))
        );
    }

    #[test]
    fn items_forms() {
        let single = SchemaNode::from_value(&json!({ "items": { "type": "string" } })).unwrap();
        assert!(matches!(single.items, Some(Items::Single(SubSchema::Schema(_)))));

        let flag = SchemaNode::from_value(&json!({ "items": false })).unwrap();
        assert_eq!(flag.items, Some(Items::Single(SubSchema::Flag(false))));

        let tuple = SchemaNode::from_value(&json!({ "items": [{}, {}] })).unwrap();
        assert!(matches!(tuple.items, Some(Items::Tuple(ref t)) if t.len() == 2));
    }

    #[test]
    fn draft4_exclusive_flag() {
        let node = SchemaNode::from_value(&json!({ "maximum": 10, "exclusiveMaximum": true }))
            .unwrap();
        assert_eq!(node.exclusive_maximum, Some(Exclusive::Flag(true)));
        assert_eq!(node.value_of(&Keyword::ExclusiveMaximum), Some(json!(true)));
    }

    #[test]
    fn false_exclusive_flag_reads_as_absent() {
        let node = SchemaNode::from_value(&json!({ "maximum": 10, "exclusiveMaximum": false }))
            .unwrap();
        assert_eq!(node.exclusive_maximum, Some(Exclusive::Flag(false)));
        assert_eq!(node.value_of(&Keyword::ExclusiveMaximum), None);
    }

    #[test]
    fn boolean_sub_schemas() {
        let node = SchemaNode::from_value(&json!({
            "properties": { "any": true, "never": false },
            "prefixItems": [true, { "type": "string" }],
            "items": true
        }))
        .unwrap();
        assert_eq!(node.properties["any"], SubSchema::Flag(true));
        assert_eq!(node.properties["never"], SubSchema::Flag(false));
        assert!(matches!(
            node.prefix_items.as_deref(),
            Some([SubSchema::Flag(true), SubSchema::Schema(_)])
        ));
        assert_eq!(node.items, Some(Items::Single(SubSchema::Flag(true))));
        assert_eq!(node.effective_items(), None);
    }

    #[test]
    fn property_entry_must_be_a_schema() {
        let err = SchemaNode::from_value(&json!({ "properties": { "a": 3 } })).unwrap_err();
        assert_eq!(
            err,
            SchemaParseError::NotASchema {
                path: "/properties/a".into(),
                actual: "number".into()
            }
        );
    }

    #[test]
    fn family_applicability_follows_type() {
        let node = SchemaNode::from_value(&json!({ "type": "integer" })).unwrap();
        assert!(node.constrains(Family::Numeric));
        assert!(!node.constrains(Family::String));
        assert!(node.constrains(Family::Core));

        let untyped = SchemaNode::from_value(&json!({})).unwrap();
        assert!(untyped.constrains(Family::Array));
    }

    #[test]
    fn metadata_type_checked() {
        let err = SchemaNode::from_value(&json!({ "deprecated": "yes" })).unwrap_err();
        assert!(matches!(
            err,
            SchemaParseError::InvalidKeyword { ref expected, .. } if expected == "boolean"
        ));
    }

    #[test]
    fn pointer_escapes_keys() {
        let err = SchemaNode::from_value(&json!({ "properties": { "a/b": { "type": 1 } } }))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaParseError::InvalidKeyword { ref path, .. } if path == "/properties/a~1b/type"
        ));
    }
}
