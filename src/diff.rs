//! Structural diff between two schema trees.
//!
//! Walks both trees in parallel and emits one [`Change`] per atomic
//! difference. Output order carries no meaning.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::keyword::{
    Family, Keyword, ARRAY_SCALARS, METADATA, NUMERIC_SCALARS, OBJECT_SCALARS, STRING_SCALARS,
};
use crate::node::{ExtraProperties, Items, SchemaNode, SubSchema};

/// Location of a change from the document root.
///
/// Property names render as plain segments (`/address/zip`), sub-schema
/// keywords in brackets (`/tags/[items]`) and tuple positions as indices
/// (`/[prefixItems]/0`). Equality is per segment, so a property literally
/// named `[items]` never equals the `items` sub-schema even though both
/// print alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SchemaPath(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Property(String),
    SubSchema(Keyword),
    Position(usize),
}

impl SchemaPath {
    pub fn root() -> Self {
        SchemaPath(Vec::new())
    }

    /// Path of the property `name` below this one.
    pub fn join(&self, name: impl Into<String>) -> Self {
        self.push(Segment::Property(name.into()))
    }

    /// Path of the sub-schema held by `keyword` below this one.
    pub fn sub_schema(&self, keyword: &Keyword) -> Self {
        self.push(Segment::SubSchema(keyword.clone()))
    }

    /// Path of tuple position `index` below this one.
    pub fn position(&self, index: usize) -> Self {
        self.push(Segment::Position(index))
    }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        SchemaPath(segments)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            match segment {
                Segment::Property(name) => {
                    write!(f, "/{}", name.replace('~', "~0").replace('/', "~1"))?
                }
                Segment::SubSchema(keyword) => write!(f, "/[{}]", keyword)?,
                Segment::Position(index) => write!(f, "/{}", index)?,
            }
        }
        Ok(())
    }
}

impl Serialize for SchemaPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What happened at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// Whether a change concerns a whole keyword or one member of a
/// set-valued keyword (an `enum` option, a `dependentRequired` pair, a
/// tuple position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Keyword,
    Member,
}

/// Context recorded with a property addition or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyContext {
    /// Required in the new schema (added) or the old schema (removed).
    pub required: bool,
    /// `additionalProperties` in the old schema (added) or the new schema
    /// (removed).
    pub additional_properties: ExtraProperties,
}

/// One atomic structural difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub path: SchemaPath,
    pub kind: ChangeKind,
    pub keyword: Keyword,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyContext>,
}

impl Change {
    fn new(path: SchemaPath, kind: ChangeKind, keyword: Keyword) -> Self {
        Change {
            path,
            kind,
            keyword,
            scope: Scope::Keyword,
            old_value: None,
            new_value: None,
            property: None,
        }
    }

    pub fn added(path: SchemaPath, keyword: Keyword, value: Value) -> Self {
        Change {
            new_value: Some(value),
            ..Change::new(path, ChangeKind::Added, keyword)
        }
    }

    pub fn removed(path: SchemaPath, keyword: Keyword, value: Value) -> Self {
        Change {
            old_value: Some(value),
            ..Change::new(path, ChangeKind::Removed, keyword)
        }
    }

    pub fn modified(path: SchemaPath, keyword: Keyword, old: Value, new: Value) -> Self {
        Change {
            old_value: Some(old),
            new_value: Some(new),
            ..Change::new(path, ChangeKind::Modified, keyword)
        }
    }

    /// Mark the change as concerning one member of the keyword.
    pub fn member(mut self) -> Self {
        self.scope = Scope::Member;
        self
    }

    pub fn property_added(path: SchemaPath, schema: Value, context: PropertyContext) -> Self {
        Change {
            property: Some(context),
            ..Change::added(path, Keyword::Properties, schema)
        }
    }

    pub fn property_removed(path: SchemaPath, schema: Value, context: PropertyContext) -> Self {
        Change {
            property: Some(context),
            ..Change::removed(path, Keyword::Properties, schema)
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ctx) = &self.property {
            let status = if ctx.required { "Required" } else { "Optional" };
            return match self.kind {
                ChangeKind::Removed => write!(
                    f,
                    "{} property removed from {}; additional properties are {} in the current schema",
                    status,
                    self.path,
                    ctx.additional_properties.label()
                ),
                _ => write!(
                    f,
                    "{} property added at {}; additional properties were {} in the previous schema",
                    status,
                    self.path,
                    ctx.additional_properties.label()
                ),
            };
        }

        if self.keyword == Keyword::Required {
            let (from, to) = match self.new_value {
                Some(Value::Bool(true)) => ("optional", "required"),
                _ => ("required", "optional"),
            };
            return write!(f, "Property at {} changed from {} to {}", self.path, from, to);
        }

        let label = if self.keyword.is_metadata() {
            "Metadata"
        } else {
            "Validation"
        };
        match (self.scope, self.kind) {
            (Scope::Member, ChangeKind::Added) => write!(
                f,
                "'{}' entry {} added at {}",
                self.keyword,
                show(&self.new_value),
                self.path
            ),
            (Scope::Member, _) => write!(
                f,
                "'{}' entry {} removed from {}",
                self.keyword,
                show(&self.old_value),
                self.path
            ),
            (Scope::Keyword, ChangeKind::Added) => {
                write!(f, "{} keyword '{}' added at {}", label, self.keyword, self.path)
            }
            (Scope::Keyword, ChangeKind::Removed) => {
                write!(f, "{} keyword '{}' removed from {}", label, self.keyword, self.path)
            }
            (Scope::Keyword, ChangeKind::Modified) => write!(
                f,
                "{} keyword '{}' modified at {} from {} to {}",
                label,
                self.keyword,
                self.path,
                show(&self.old_value),
                show(&self.new_value)
            ),
        }
    }
}

fn show(value: &Option<Value>) -> String {
    value
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "nothing".to_string())
}

/// Diff two schema trees.
///
/// Returns an empty list when the trees describe the same constraints.
pub fn diff(old: &SchemaNode, new: &SchemaNode) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_node(old, new, &SchemaPath::root(), &mut changes);
    changes
}

// --- Internal implementation ---

fn diff_node(old: &SchemaNode, new: &SchemaNode, path: &SchemaPath, out: &mut Vec<Change>) {
    for keyword in METADATA {
        diff_scalar(old, new, path, keyword, out);
    }
    diff_extensions(old, new, path, out);

    diff_scalar(old, new, path, &Keyword::Type, out);
    diff_enum(old, new, path, out);
    diff_scalar(old, new, path, &Keyword::Format, out);

    // Once the instance type changed, type-specific keywords describe
    // different things on each side.
    if let (Some(a), Some(b)) = (&old.types, &new.types) {
        if a != b {
            return;
        }
    }

    let applies = |family: Family| old.constrains(family) || new.constrains(family);

    if applies(Family::Numeric) {
        for keyword in NUMERIC_SCALARS {
            diff_scalar(old, new, path, keyword, out);
        }
    }
    if applies(Family::String) {
        for keyword in STRING_SCALARS {
            diff_scalar(old, new, path, keyword, out);
        }
    }
    if applies(Family::Array) {
        for keyword in ARRAY_SCALARS {
            diff_scalar(old, new, path, keyword, out);
        }
        diff_items(old, new, path, out);
        diff_optional_tuple(
            old.prefix_items.as_deref(),
            new.prefix_items.as_deref(),
            path,
            Keyword::PrefixItems,
            out,
        );
        diff_optional_sub_schema(
            old.contains.as_ref(),
            new.contains.as_ref(),
            path,
            Keyword::Contains,
            out,
        );
    }
    if applies(Family::Object) {
        for keyword in OBJECT_SCALARS {
            diff_scalar(old, new, path, keyword, out);
        }
        diff_properties(old, new, path, out);
        diff_sub_schema(
            &old.additional_properties,
            &new.additional_properties,
            path,
            Keyword::AdditionalProperties,
            out,
        );
        diff_dependent_required(old, new, path, out);
    }
}

fn diff_scalar(
    old: &SchemaNode,
    new: &SchemaNode,
    path: &SchemaPath,
    keyword: &Keyword,
    out: &mut Vec<Change>,
) {
    match (old.value_of(keyword), new.value_of(keyword)) {
        (None, Some(v)) => out.push(Change::added(path.clone(), keyword.clone(), v)),
        (Some(v), None) => out.push(Change::removed(path.clone(), keyword.clone(), v)),
        (Some(a), Some(b)) if !same_value(&a, &b) => {
            out.push(Change::modified(path.clone(), keyword.clone(), a, b))
        }
        _ => {}
    }
}

/// Numbers compare by value so `10` and `10.0` are the same bound.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn contains_value(options: &[Value], value: &Value) -> bool {
    options.iter().any(|o| same_value(o, value))
}

fn diff_extensions(old: &SchemaNode, new: &SchemaNode, path: &SchemaPath, out: &mut Vec<Change>) {
    let names: BTreeSet<&String> = old.extensions.keys().chain(new.extensions.keys()).collect();
    for name in names {
        diff_scalar(old, new, path, &Keyword::Other(name.clone()), out);
    }
}

fn diff_enum(old: &SchemaNode, new: &SchemaNode, path: &SchemaPath, out: &mut Vec<Change>) {
    match (&old.enumeration, &new.enumeration) {
        (None, Some(values)) => {
            out.push(Change::added(path.clone(), Keyword::Enum, Value::Array(values.clone())))
        }
        (Some(values), None) => out.push(Change::removed(
            path.clone(),
            Keyword::Enum,
            Value::Array(values.clone()),
        )),
        (Some(before), Some(after)) => {
            for option in after.iter().filter(|v| !contains_value(before, v)) {
                out.push(Change::added(path.clone(), Keyword::Enum, option.clone()).member());
            }
            for option in before.iter().filter(|v| !contains_value(after, v)) {
                out.push(Change::removed(path.clone(), Keyword::Enum, option.clone()).member());
            }
        }
        (None, None) => {}
    }
}

fn diff_properties(old: &SchemaNode, new: &SchemaNode, path: &SchemaPath, out: &mut Vec<Change>) {
    let extra_before = old.extra_properties();
    let extra_now = new.extra_properties();

    for (name, new_prop) in &new.properties {
        let prop_path = path.join(name.as_str());
        match old.properties.get(name) {
            Some(old_prop) => {
                diff_slot(old_prop, new_prop, &prop_path, &prop_path, Keyword::Properties, out)
            }
            None => out.push(Change::property_added(
                prop_path,
                new_prop.to_value(),
                PropertyContext {
                    required: new.required.contains(name),
                    additional_properties: extra_before,
                },
            )),
        }
    }

    for (name, old_prop) in &old.properties {
        if new.properties.contains_key(name) {
            continue;
        }
        out.push(Change::property_removed(
            path.join(name.as_str()),
            old_prop.to_value(),
            PropertyContext {
                required: old.required.contains(name),
                additional_properties: extra_now,
            },
        ));
    }

    // Properties added or removed above already account for their status.
    for name in old.required.symmetric_difference(&new.required) {
        if old.properties.contains_key(name) != new.properties.contains_key(name) {
            continue;
        }
        let now_required = new.required.contains(name);
        out.push(Change::modified(
            path.join(name.as_str()),
            Keyword::Required,
            Value::Bool(!now_required),
            Value::Bool(now_required),
        ));
    }
}

fn diff_sub_schema(
    old: &SubSchema,
    new: &SubSchema,
    path: &SchemaPath,
    keyword: Keyword,
    out: &mut Vec<Change>,
) {
    let nested = path.sub_schema(&keyword);
    diff_slot(old, new, path, &nested, keyword, out)
}

/// Two schemas are walked at `nested`; any other difference is one
/// openness change at `at`.
fn diff_slot(
    old: &SubSchema,
    new: &SubSchema,
    at: &SchemaPath,
    nested: &SchemaPath,
    keyword: Keyword,
    out: &mut Vec<Change>,
) {
    match (old, new) {
        (SubSchema::Schema(a), SubSchema::Schema(b)) => diff_node(a, b, nested, out),
        (SubSchema::Flag(a), SubSchema::Flag(b)) if a == b => {}
        _ => out.push(Change::modified(
            at.clone(),
            keyword,
            old.to_value(),
            new.to_value(),
        )),
    }
}

fn diff_optional_sub_schema(
    old: Option<&SubSchema>,
    new: Option<&SubSchema>,
    path: &SchemaPath,
    keyword: Keyword,
    out: &mut Vec<Change>,
) {
    match (old, new) {
        (None, Some(sub)) => out.push(Change::added(path.clone(), keyword, sub.to_value())),
        (Some(sub), None) => out.push(Change::removed(path.clone(), keyword, sub.to_value())),
        (Some(a), Some(b)) => diff_sub_schema(a, b, path, keyword, out),
        (None, None) => {}
    }
}

fn diff_items(old: &SchemaNode, new: &SchemaNode, path: &SchemaPath, out: &mut Vec<Change>) {
    match (old.effective_items(), new.effective_items()) {
        (None, Some(items)) => {
            out.push(Change::added(path.clone(), Keyword::Items, items.to_value()))
        }
        (Some(items), None) => {
            out.push(Change::removed(path.clone(), Keyword::Items, items.to_value()))
        }
        (Some(Items::Single(a)), Some(Items::Single(b))) => {
            diff_sub_schema(a, b, path, Keyword::Items, out)
        }
        (Some(Items::Tuple(a)), Some(Items::Tuple(b))) => {
            diff_tuple(a, b, &path.sub_schema(&Keyword::Items), Keyword::Items, out)
        }
        (Some(a), Some(b)) => out.push(Change::modified(
            path.clone(),
            Keyword::Items,
            a.to_value(),
            b.to_value(),
        )),
        (None, None) => {}
    }
}

fn diff_optional_tuple(
    old: Option<&[SubSchema]>,
    new: Option<&[SubSchema]>,
    path: &SchemaPath,
    keyword: Keyword,
    out: &mut Vec<Change>,
) {
    let to_value = |slots: &[SubSchema]| {
        Value::Array(slots.iter().map(SubSchema::to_value).collect())
    };
    match (old, new) {
        (None, Some(slots)) => out.push(Change::added(path.clone(), keyword, to_value(slots))),
        (Some(slots), None) => out.push(Change::removed(path.clone(), keyword, to_value(slots))),
        (Some(a), Some(b)) => {
            let base = path.sub_schema(&keyword);
            diff_tuple(a, b, &base, keyword, out)
        }
        (None, None) => {}
    }
}

/// Positions present on both sides are walked; extra positions are member
/// changes located at the tuple keyword.
fn diff_tuple(
    old: &[SubSchema],
    new: &[SubSchema],
    base: &SchemaPath,
    keyword: Keyword,
    out: &mut Vec<Change>,
) {
    for i in 0..old.len().max(new.len()) {
        match (old.get(i), new.get(i)) {
            (Some(a), Some(b)) => {
                let at = base.position(i);
                diff_slot(a, b, &at, &at, keyword.clone(), out)
            }
            (None, Some(b)) => {
                let value = json!({ "position": i, "schema": b.to_value() });
                out.push(Change::added(base.clone(), keyword.clone(), value).member())
            }
            (Some(a), None) => {
                let value = json!({ "position": i, "schema": a.to_value() });
                out.push(Change::removed(base.clone(), keyword.clone(), value).member())
            }
            (None, None) => {}
        }
    }
}

fn diff_dependent_required(
    old: &SchemaNode,
    new: &SchemaNode,
    path: &SchemaPath,
    out: &mut Vec<Change>,
) {
    let pairs = |node: &SchemaNode| -> BTreeSet<(String, String)> {
        node.dependent_required
            .iter()
            .flat_map(|(name, deps)| deps.iter().map(move |d| (name.clone(), d.clone())))
            .collect()
    };
    let before = pairs(old);
    let after = pairs(new);

    for (name, dep) in after.difference(&before) {
        out.push(
            Change::added(path.clone(), Keyword::DependentRequired, json!({ name: dep })).member(),
        );
    }
    for (name, dep) in before.difference(&after) {
        out.push(
            Change::removed(path.clone(), Keyword::DependentRequired, json!({ name: dep }))
                .member(),
        );
    }
}
