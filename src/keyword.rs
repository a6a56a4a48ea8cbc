//! Recognized schema keywords and the families they belong to.

use std::fmt;

use serde::{Serialize, Serializer};

/// A schema keyword as seen by the differ and the rules engine.
///
/// Anything outside the recognized set is kept as [`Keyword::Other`] so that
/// changes to it can be surfaced instead of dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Keyword {
    Type,
    Enum,
    Format,
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
    MultipleOf,
    MaxLength,
    MinLength,
    Pattern,
    Items,
    PrefixItems,
    Contains,
    MaxItems,
    MinItems,
    MaxContains,
    MinContains,
    UniqueItems,
    Properties,
    Required,
    AdditionalProperties,
    MaxProperties,
    MinProperties,
    DependentRequired,
    Title,
    Description,
    Default,
    Deprecated,
    ReadOnly,
    WriteOnly,
    Examples,
    Id,
    Comment,
    Other(String),
}

/// Group of keywords that apply to the same instance types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Applies to every instance type (`type`, `enum`, `format`).
    Core,
    Numeric,
    String,
    Array,
    Object,
    /// Annotations that never affect validation.
    Metadata,
}

/// Which side of the allowed range a bound keyword limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bound {
    Upper,
    Lower,
}

/// Numeric keywords compared value-by-value.
pub const NUMERIC_SCALARS: &[Keyword] = &[
    Keyword::Maximum,
    Keyword::ExclusiveMaximum,
    Keyword::Minimum,
    Keyword::ExclusiveMinimum,
    Keyword::MultipleOf,
];

/// String keywords compared value-by-value.
pub const STRING_SCALARS: &[Keyword] = &[Keyword::MaxLength, Keyword::MinLength, Keyword::Pattern];

/// Array keywords compared value-by-value (sub-schemas are walked separately).
pub const ARRAY_SCALARS: &[Keyword] = &[
    Keyword::MaxItems,
    Keyword::MinItems,
    Keyword::MaxContains,
    Keyword::MinContains,
    Keyword::UniqueItems,
];

/// Object keywords compared value-by-value.
pub const OBJECT_SCALARS: &[Keyword] = &[Keyword::MaxProperties, Keyword::MinProperties];

/// Metadata keywords, in document order of the JSON Schema vocabulary.
pub const METADATA: &[Keyword] = &[
    Keyword::Title,
    Keyword::Description,
    Keyword::Default,
    Keyword::Deprecated,
    Keyword::ReadOnly,
    Keyword::WriteOnly,
    Keyword::Examples,
    Keyword::Id,
    Keyword::Comment,
];

impl Keyword {
    /// Map a keyword name onto the recognized set.
    pub fn parse(name: &str) -> Self {
        match name {
            "type" => Keyword::Type,
            "enum" => Keyword::Enum,
            "format" => Keyword::Format,
            "maximum" => Keyword::Maximum,
            "exclusiveMaximum" => Keyword::ExclusiveMaximum,
            "minimum" => Keyword::Minimum,
            "exclusiveMinimum" => Keyword::ExclusiveMinimum,
            "multipleOf" => Keyword::MultipleOf,
            "maxLength" => Keyword::MaxLength,
            "minLength" => Keyword::MinLength,
            "pattern" => Keyword::Pattern,
            "items" => Keyword::Items,
            "prefixItems" => Keyword::PrefixItems,
            "contains" => Keyword::Contains,
            "maxItems" => Keyword::MaxItems,
            "minItems" => Keyword::MinItems,
            "maxContains" => Keyword::MaxContains,
            "minContains" => Keyword::MinContains,
            "uniqueItems" => Keyword::UniqueItems,
            "properties" => Keyword::Properties,
            "required" => Keyword::Required,
            "additionalProperties" => Keyword::AdditionalProperties,
            "maxProperties" => Keyword::MaxProperties,
            "minProperties" => Keyword::MinProperties,
            "dependentRequired" => Keyword::DependentRequired,
            "title" => Keyword::Title,
            "description" => Keyword::Description,
            "default" => Keyword::Default,
            "deprecated" => Keyword::Deprecated,
            "readOnly" => Keyword::ReadOnly,
            "writeOnly" => Keyword::WriteOnly,
            "examples" => Keyword::Examples,
            "$id" => Keyword::Id,
            "$comment" => Keyword::Comment,
            other => Keyword::Other(other.to_string()),
        }
    }

    /// The keyword name as written in a schema document.
    pub fn as_str(&self) -> &str {
        match self {
            Keyword::Type => "type",
            Keyword::Enum => "enum",
            Keyword::Format => "format",
            Keyword::Maximum => "maximum",
            Keyword::ExclusiveMaximum => "exclusiveMaximum",
            Keyword::Minimum => "minimum",
            Keyword::ExclusiveMinimum => "exclusiveMinimum",
            Keyword::MultipleOf => "multipleOf",
            Keyword::MaxLength => "maxLength",
            Keyword::MinLength => "minLength",
            Keyword::Pattern => "pattern",
            Keyword::Items => "items",
            Keyword::PrefixItems => "prefixItems",
            Keyword::Contains => "contains",
            Keyword::MaxItems => "maxItems",
            Keyword::MinItems => "minItems",
            Keyword::MaxContains => "maxContains",
            Keyword::MinContains => "minContains",
            Keyword::UniqueItems => "uniqueItems",
            Keyword::Properties => "properties",
            Keyword::Required => "required",
            Keyword::AdditionalProperties => "additionalProperties",
            Keyword::MaxProperties => "maxProperties",
            Keyword::MinProperties => "minProperties",
            Keyword::DependentRequired => "dependentRequired",
            Keyword::Title => "title",
            Keyword::Description => "description",
            Keyword::Default => "default",
            Keyword::Deprecated => "deprecated",
            Keyword::ReadOnly => "readOnly",
            Keyword::WriteOnly => "writeOnly",
            Keyword::Examples => "examples",
            Keyword::Id => "$id",
            Keyword::Comment => "$comment",
            Keyword::Other(name) => name,
        }
    }

    /// Family of the keyword; `None` for unrecognized keywords.
    pub fn family(&self) -> Option<Family> {
        let family = match self {
            Keyword::Type | Keyword::Enum | Keyword::Format => Family::Core,
            Keyword::Maximum
            | Keyword::ExclusiveMaximum
            | Keyword::Minimum
            | Keyword::ExclusiveMinimum
            | Keyword::MultipleOf => Family::Numeric,
            Keyword::MaxLength | Keyword::MinLength | Keyword::Pattern => Family::String,
            Keyword::Items
            | Keyword::PrefixItems
            | Keyword::Contains
            | Keyword::MaxItems
            | Keyword::MinItems
            | Keyword::MaxContains
            | Keyword::MinContains
            | Keyword::UniqueItems => Family::Array,
            Keyword::Properties
            | Keyword::Required
            | Keyword::AdditionalProperties
            | Keyword::MaxProperties
            | Keyword::MinProperties
            | Keyword::DependentRequired => Family::Object,
            Keyword::Title
            | Keyword::Description
            | Keyword::Default
            | Keyword::Deprecated
            | Keyword::ReadOnly
            | Keyword::WriteOnly
            | Keyword::Examples
            | Keyword::Id
            | Keyword::Comment => Family::Metadata,
            Keyword::Other(_) => return None,
        };
        Some(family)
    }

    /// Which side of the range this keyword bounds, if it is a bound.
    pub fn bound(&self) -> Option<Bound> {
        match self {
            Keyword::Maximum
            | Keyword::ExclusiveMaximum
            | Keyword::MaxLength
            | Keyword::MaxItems
            | Keyword::MaxContains
            | Keyword::MaxProperties => Some(Bound::Upper),
            Keyword::Minimum
            | Keyword::ExclusiveMinimum
            | Keyword::MinLength
            | Keyword::MinItems
            | Keyword::MinContains
            | Keyword::MinProperties => Some(Bound::Lower),
            _ => None,
        }
    }

    pub fn is_metadata(&self) -> bool {
        self.family() == Some(Family::Metadata)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Keyword {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
