//! Classification rules: maps each [`Change`] onto a [`Severity`].
//!
//! The table lives in two constants so it can be read and audited on its
//! own. [`RuleEngine::rule_for`] only decides which row a change falls
//! under; the severity always comes from the table.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::diff::{Change, ChangeKind, Scope};
use crate::error::UnclassifiedChangeError;
use crate::keyword::{Bound, Keyword};
use crate::node::{openness, ExtraProperties};
use crate::pattern::{BestEffortPatterns, PatternComparator, Restrictiveness};
use crate::severity::Severity;
use crate::types::CompareOptions;

/// What kind of constraint a change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Metadata,
    /// Presence of a validation keyword.
    Validation,
    Type,
    Format,
    EnumOption,
    Required,
    UpperBound,
    LowerBound,
    UniqueItems,
    /// Draft 4 boolean `exclusiveMaximum` / `exclusiveMinimum`.
    ExclusiveFlag,
    MultipleOf,
    Pattern,
    /// A sub-schema slot (`additionalProperties`, `items`, `contains`, a
    /// property or a tuple position) moving between `false`, a schema and
    /// `true`.
    Openness,
    /// `items` switching between single and tuple form.
    ItemsForm,
    Dependency,
    /// Tuple position in `items` / `prefixItems`.
    Position,
}

/// Which way a change moved within its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Added,
    Removed,
    Changed,
    Increased,
    Decreased,
    Tightened,
    Loosened,
    /// New `multipleOf` is a multiple of the old one.
    Multiple,
    /// The two `multipleOf` values share a factor greater than one.
    CommonFactor,
    NoCommonFactor,
}

use self::Direction as D;
use self::RuleCategory as C;

/// Severity of every keyword-level change category.
pub const KEYWORD_RULES: &[(RuleCategory, Direction, Severity)] = &[
    (C::Metadata, D::Added, Severity::Addition),
    (C::Metadata, D::Removed, Severity::Addition),
    (C::Metadata, D::Changed, Severity::Addition),
    (C::Validation, D::Added, Severity::Revision),
    (C::Validation, D::Removed, Severity::Addition),
    (C::Type, D::Changed, Severity::Model),
    (C::Format, D::Changed, Severity::Model),
    (C::EnumOption, D::Added, Severity::Addition),
    (C::EnumOption, D::Removed, Severity::Revision),
    (C::Required, D::Tightened, Severity::Revision),
    (C::Required, D::Loosened, Severity::Addition),
    (C::UpperBound, D::Increased, Severity::Addition),
    (C::UpperBound, D::Decreased, Severity::Revision),
    (C::UpperBound, D::Changed, Severity::Revision),
    (C::LowerBound, D::Increased, Severity::Revision),
    (C::LowerBound, D::Decreased, Severity::Addition),
    (C::LowerBound, D::Changed, Severity::Revision),
    (C::UniqueItems, D::Tightened, Severity::Revision),
    (C::UniqueItems, D::Loosened, Severity::Addition),
    (C::ExclusiveFlag, D::Tightened, Severity::Revision),
    (C::ExclusiveFlag, D::Loosened, Severity::Addition),
    (C::MultipleOf, D::Multiple, Severity::Addition),
    (C::MultipleOf, D::CommonFactor, Severity::Revision),
    (C::MultipleOf, D::NoCommonFactor, Severity::Model),
    (C::Pattern, D::Tightened, Severity::Revision),
    (C::Pattern, D::Loosened, Severity::Addition),
    (C::Openness, D::Tightened, Severity::Revision),
    (C::Openness, D::Loosened, Severity::Addition),
    (C::ItemsForm, D::Changed, Severity::Model),
    (C::Dependency, D::Added, Severity::Revision),
    (C::Dependency, D::Removed, Severity::Addition),
    (C::Position, D::Added, Severity::Revision),
    (C::Position, D::Removed, Severity::Addition),
];

/// Severity of adding or removing a property, by whether it is required and
/// the `additionalProperties` state on the other side of the change.
///
/// A schema-valued `additionalProperties` counts as allowed.
pub const PROPERTY_RULES: &[(ChangeKind, bool, ExtraProperties, Severity)] = &[
    (ChangeKind::Added, false, ExtraProperties::NotAllowed, Severity::Addition),
    (ChangeKind::Added, false, ExtraProperties::Allowed, Severity::Revision),
    (ChangeKind::Added, false, ExtraProperties::Validated, Severity::Revision),
    (ChangeKind::Added, true, ExtraProperties::NotAllowed, Severity::Model),
    (ChangeKind::Added, true, ExtraProperties::Allowed, Severity::Revision),
    (ChangeKind::Added, true, ExtraProperties::Validated, Severity::Revision),
    (ChangeKind::Removed, false, ExtraProperties::NotAllowed, Severity::Revision),
    (ChangeKind::Removed, false, ExtraProperties::Allowed, Severity::Addition),
    (ChangeKind::Removed, false, ExtraProperties::Validated, Severity::Addition),
    (ChangeKind::Removed, true, ExtraProperties::NotAllowed, Severity::Model),
    (ChangeKind::Removed, true, ExtraProperties::Allowed, Severity::Addition),
    (ChangeKind::Removed, true, ExtraProperties::Validated, Severity::Addition),
];

/// Look up a keyword-level row.
pub fn lookup(category: RuleCategory, direction: Direction) -> Option<Severity> {
    KEYWORD_RULES
        .iter()
        .find(|(c, d, _)| *c == category && *d == direction)
        .map(|(_, _, s)| *s)
}

/// Look up a property row.
pub fn lookup_property(
    kind: ChangeKind,
    required: bool,
    extra: ExtraProperties,
) -> Option<Severity> {
    PROPERTY_RULES
        .iter()
        .find(|(k, r, e, _)| *k == kind && *r == required && *e == extra)
        .map(|(_, _, _, s)| *s)
}

/// Classifies changes against the rule table.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine<P = BestEffortPatterns> {
    patterns: P,
    annotations: BTreeSet<String>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine honoring the annotation keywords declared in `options`.
    pub fn from_options(options: &CompareOptions) -> Self {
        RuleEngine {
            patterns: BestEffortPatterns,
            annotations: options.annotation_keywords.clone(),
        }
    }
}

impl<P: PatternComparator> RuleEngine<P> {
    /// Swap in a different pattern comparator.
    pub fn with_patterns<Q: PatternComparator>(self, patterns: Q) -> RuleEngine<Q> {
        RuleEngine {
            patterns,
            annotations: self.annotations,
        }
    }

    /// Declare extra keywords whose changes classify like metadata.
    pub fn annotation_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.annotations.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Severity of one change.
    ///
    /// # Errors
    ///
    /// `UnclassifiedChangeError` when the change concerns a keyword with no
    /// rule, such as an unrecognized keyword not declared annotation-only.
    pub fn classify(&self, change: &Change) -> Result<Severity, UnclassifiedChangeError> {
        let severity = match &change.property {
            Some(ctx) => lookup_property(change.kind, ctx.required, ctx.additional_properties),
            None => self
                .rule_for(change)
                .and_then(|(category, direction)| lookup(category, direction)),
        };

        let severity = severity.ok_or_else(|| UnclassifiedChangeError {
            keyword: change.keyword.to_string(),
            path: change.path.to_string(),
        })?;

        tracing::debug!(
            keyword = %change.keyword,
            path = %change.path,
            kind = ?change.kind,
            %severity,
            "classified change"
        );
        Ok(severity)
    }

    /// Table row a keyword-level change falls under.
    pub fn rule_for(&self, change: &Change) -> Option<(RuleCategory, Direction)> {
        let keyword = &change.keyword;

        if let Keyword::Other(name) = keyword {
            if !self.annotations.contains(name) {
                return None;
            }
            return Some((C::Metadata, presence(change.kind)));
        }
        if keyword.is_metadata() {
            return Some((C::Metadata, presence(change.kind)));
        }

        if change.scope == Scope::Member {
            let category = match keyword {
                Keyword::Enum => C::EnumOption,
                Keyword::DependentRequired => C::Dependency,
                Keyword::Items | Keyword::PrefixItems => C::Position,
                _ => return None,
            };
            return Some((category, presence(change.kind)));
        }

        if change.kind != ChangeKind::Modified {
            return Some((C::Validation, presence(change.kind)));
        }

        let old = change.old_value.as_ref()?;
        let new = change.new_value.as_ref()?;

        let rule = match keyword {
            Keyword::Type => (C::Type, D::Changed),
            Keyword::Format => (C::Format, D::Changed),
            Keyword::Required => (C::Required, tightened_if(new == &Value::Bool(true))),
            Keyword::UniqueItems => (C::UniqueItems, tightened_if(new == &Value::Bool(true))),
            Keyword::MultipleOf => (C::MultipleOf, multiple_of(old, new)),
            Keyword::Pattern => (C::Pattern, self.pattern(old.as_str()?, new.as_str()?)),
            Keyword::Items if old.is_array() != new.is_array() => (C::ItemsForm, D::Changed),
            Keyword::Items
            | Keyword::PrefixItems
            | Keyword::Contains
            | Keyword::AdditionalProperties
            | Keyword::Properties => {
                (C::Openness, tightened_if(openness(new)? < openness(old)?))
            }
            kw => {
                let bound = kw.bound()?;
                bound_rule(bound, old, new)
            }
        };
        Some(rule)
    }

    fn pattern(&self, old: &str, new: &str) -> Direction {
        match self.patterns.compare(old, new) {
            Some(Restrictiveness::Looser) | Some(Restrictiveness::Equivalent) => D::Loosened,
            Some(Restrictiveness::Stricter) => D::Tightened,
            None => {
                tracing::debug!(old, new, "pattern comparison undetermined, assuming stricter");
                D::Tightened
            }
        }
    }
}

/// Classify with the default engine.
pub fn classify(change: &Change) -> Result<Severity, UnclassifiedChangeError> {
    RuleEngine::new().classify(change)
}

// --- Internal implementation ---

fn presence(kind: ChangeKind) -> Direction {
    match kind {
        ChangeKind::Added => D::Added,
        ChangeKind::Removed => D::Removed,
        ChangeKind::Modified => D::Changed,
    }
}

fn tightened_if(cond: bool) -> Direction {
    if cond {
        D::Tightened
    } else {
        D::Loosened
    }
}

fn bound_rule(bound: Bound, old: &Value, new: &Value) -> (RuleCategory, Direction) {
    let numeric = |v: &Value| v.as_f64();
    match (old, new) {
        (Value::Bool(_), Value::Bool(now)) => (C::ExclusiveFlag, tightened_if(*now)),
        _ => {
            let category = match bound {
                Bound::Upper => C::UpperBound,
                Bound::Lower => C::LowerBound,
            };
            let direction = match (numeric(old), numeric(new)) {
                (Some(a), Some(b)) if b > a => D::Increased,
                (Some(a), Some(b)) if b < a => D::Decreased,
                _ => D::Changed,
            };
            (category, direction)
        }
    }
}

const EPSILON: f64 = 1e-9;

fn multiple_of(old: &Value, new: &Value) -> Direction {
    let (Some(a), Some(b)) = (old.as_f64(), new.as_f64()) else {
        return D::NoCommonFactor;
    };
    if a <= 0.0 || b <= 0.0 {
        return D::NoCommonFactor;
    }

    let ratio = b / a;
    if ratio >= 1.0 - EPSILON && (ratio - ratio.round()).abs() < EPSILON {
        return D::Multiple;
    }

    match scale_to_integers(a, b) {
        Some((x, y)) if gcd(x, y) > 1 => D::CommonFactor,
        _ => D::NoCommonFactor,
    }
}

/// Multiply both values by the smallest power of ten making them integers.
fn scale_to_integers(a: f64, b: f64) -> Option<(u64, u64)> {
    let mut factor = 1.0;
    for _ in 0..=9 {
        let (x, y) = (a * factor, b * factor);
        let whole = |v: f64| (v - v.round()).abs() < 1e-6;
        if whole(x) && whole(y) && x.round() <= u64::MAX as f64 && y.round() <= u64::MAX as f64 {
            return Some((x.round() as u64, y.round() as u64));
        }
        factor *= 10.0;
    }
    None
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{PropertyContext, SchemaPath};
    use serde_json::json;

    fn root() -> SchemaPath {
        SchemaPath::root()
    }

    fn modified(keyword: Keyword, old: Value, new: Value) -> Severity {
        classify(&Change::modified(root(), keyword, old, new)).unwrap()
    }

    mod table {
        use super::*;

        #[test]
        fn every_property_combination_has_a_row() {
            for kind in [ChangeKind::Added, ChangeKind::Removed] {
                for required in [false, true] {
                    for extra in [
                        ExtraProperties::Allowed,
                        ExtraProperties::NotAllowed,
                        ExtraProperties::Validated,
                    ] {
                        assert!(lookup_property(kind, required, extra).is_some());
                    }
                }
            }
        }

        #[test]
        fn validated_extras_match_allowed() {
            for kind in [ChangeKind::Added, ChangeKind::Removed] {
                for required in [false, true] {
                    assert_eq!(
                        lookup_property(kind, required, ExtraProperties::Validated),
                        lookup_property(kind, required, ExtraProperties::Allowed)
                    );
                }
            }
        }

        #[test]
        fn no_duplicate_keyword_rows() {
            for (i, (c, d, _)) in KEYWORD_RULES.iter().enumerate() {
                assert!(
                    !KEYWORD_RULES[i + 1..]
                        .iter()
                        .any(|(c2, d2, _)| c2 == c && d2 == d),
                    "duplicate row {:?} {:?}",
                    c,
                    d
                );
            }
        }
    }

    mod properties {
        use super::*;

        fn added(required: bool, extra: ExtraProperties) -> Severity {
            let ctx = PropertyContext {
                required,
                additional_properties: extra,
            };
            classify(&Change::property_added(root().join("p"), json!({}), ctx)).unwrap()
        }

        fn removed(required: bool, extra: ExtraProperties) -> Severity {
            let ctx = PropertyContext {
                required,
                additional_properties: extra,
            };
            classify(&Change::property_removed(root().join("p"), json!({}), ctx)).unwrap()
        }

        #[test]
        fn add_optional() {
            assert_eq!(added(false, ExtraProperties::NotAllowed), Severity::Addition);
            assert_eq!(added(false, ExtraProperties::Allowed), Severity::Revision);
        }

        #[test]
        fn add_required() {
            assert_eq!(added(true, ExtraProperties::NotAllowed), Severity::Model);
            assert_eq!(added(true, ExtraProperties::Allowed), Severity::Revision);
        }

        #[test]
        fn remove_optional() {
            assert_eq!(removed(false, ExtraProperties::NotAllowed), Severity::Revision);
            assert_eq!(removed(false, ExtraProperties::Allowed), Severity::Addition);
        }

        #[test]
        fn remove_required() {
            assert_eq!(removed(true, ExtraProperties::NotAllowed), Severity::Model);
            assert_eq!(removed(true, ExtraProperties::Allowed), Severity::Addition);
        }
    }

    mod keywords {
        use super::*;

        #[test]
        fn validation_presence() {
            let add = Change::added(root(), Keyword::MaxLength, json!(5));
            let remove = Change::removed(root(), Keyword::MaxLength, json!(5));
            assert_eq!(classify(&add).unwrap(), Severity::Revision);
            assert_eq!(classify(&remove).unwrap(), Severity::Addition);
        }

        #[test]
        fn required_flip() {
            assert_eq!(modified(Keyword::Required, json!(false), json!(true)), Severity::Revision);
            assert_eq!(modified(Keyword::Required, json!(true), json!(false)), Severity::Addition);
        }

        #[test]
        fn type_and_format() {
            assert_eq!(modified(Keyword::Type, json!("string"), json!("number")), Severity::Model);
            assert_eq!(modified(Keyword::Format, json!("date"), json!("email")), Severity::Model);
        }

        #[test]
        fn enum_options() {
            let add = Change::added(root(), Keyword::Enum, json!("c")).member();
            let remove = Change::removed(root(), Keyword::Enum, json!("a")).member();
            assert_eq!(classify(&add).unwrap(), Severity::Addition);
            assert_eq!(classify(&remove).unwrap(), Severity::Revision);
        }

        #[test]
        fn upper_bounds() {
            assert_eq!(modified(Keyword::Maximum, json!(100), json!(50)), Severity::Revision);
            assert_eq!(modified(Keyword::MaxItems, json!(3), json!(10)), Severity::Addition);
            assert_eq!(
                modified(Keyword::ExclusiveMaximum, json!(10.5), json!(20)),
                Severity::Addition
            );
        }

        #[test]
        fn lower_bounds() {
            assert_eq!(modified(Keyword::MinLength, json!(1), json!(3)), Severity::Revision);
            assert_eq!(modified(Keyword::Minimum, json!(0), json!(-5)), Severity::Addition);
        }

        #[test]
        fn draft4_exclusive_flag() {
            assert_eq!(
                modified(Keyword::ExclusiveMinimum, json!(false), json!(true)),
                Severity::Revision
            );
            assert_eq!(
                modified(Keyword::ExclusiveMinimum, json!(true), json!(false)),
                Severity::Addition
            );
            assert_eq!(
                modified(Keyword::ExclusiveMaximum, json!(true), json!(10)),
                Severity::Revision
            );
        }

        #[test]
        fn unique_items() {
            assert_eq!(modified(Keyword::UniqueItems, json!(false), json!(true)), Severity::Revision);
            assert_eq!(modified(Keyword::UniqueItems, json!(true), json!(false)), Severity::Addition);
        }

        #[test]
        fn multiple_of_relations() {
            assert_eq!(modified(Keyword::MultipleOf, json!(2), json!(4)), Severity::Addition);
            assert_eq!(modified(Keyword::MultipleOf, json!(4), json!(6)), Severity::Revision);
            assert_eq!(modified(Keyword::MultipleOf, json!(3), json!(5)), Severity::Model);
            assert_eq!(modified(Keyword::MultipleOf, json!(0.5), json!(1.5)), Severity::Addition);
            assert_eq!(modified(Keyword::MultipleOf, json!(0.4), json!(0.6)), Severity::Revision);
        }

        #[test]
        fn patterns() {
            assert_eq!(
                modified(Keyword::Pattern, json!("^[a-z]+$"), json!(".*")),
                Severity::Addition
            );
            assert_eq!(
                modified(Keyword::Pattern, json!("abc"), json!("^abc$")),
                Severity::Revision
            );
            // undeterminable falls back to the stricter reading
            assert_eq!(
                modified(Keyword::Pattern, json!("^[a-z]+$"), json!("^[0-9]+$")),
                Severity::Revision
            );
        }

        #[test]
        fn openness() {
            assert_eq!(
                modified(Keyword::AdditionalProperties, json!(true), json!(false)),
                Severity::Revision
            );
            assert_eq!(
                modified(Keyword::AdditionalProperties, json!(false), json!({ "type": "string" })),
                Severity::Addition
            );
            assert_eq!(
                modified(Keyword::Items, json!(true), json!({ "type": "string" })),
                Severity::Revision
            );
        }

        #[test]
        fn boolean_property_and_position_flags() {
            let flip = |keyword: Keyword, old: Value, new: Value| {
                classify(&Change::modified(root().join("a"), keyword, old, new)).unwrap()
            };
            assert_eq!(flip(Keyword::Properties, json!(true), json!(false)), Severity::Revision);
            assert_eq!(
                flip(Keyword::Properties, json!(false), json!({ "type": "string" })),
                Severity::Addition
            );
            assert_eq!(flip(Keyword::PrefixItems, json!({}), json!(true)), Severity::Addition);
        }

        #[test]
        fn items_form_switch() {
            assert_eq!(
                modified(Keyword::Items, json!({ "type": "string" }), json!([{}])),
                Severity::Model
            );
        }

        #[test]
        fn member_changes() {
            let dep = Change::added(root(), Keyword::DependentRequired, json!({ "a": "b" })).member();
            assert_eq!(classify(&dep).unwrap(), Severity::Revision);
            let pos = Change::removed(root(), Keyword::PrefixItems, json!({ "position": 1 })).member();
            assert_eq!(classify(&pos).unwrap(), Severity::Addition);
        }

        #[test]
        fn metadata_is_addition() {
            assert_eq!(modified(Keyword::Title, json!("A"), json!("B")), Severity::Addition);
            let add = Change::added(root(), Keyword::Deprecated, json!(true));
            assert_eq!(classify(&add).unwrap(), Severity::Addition);
        }
    }

    mod unrecognized {
        use super::*;

        #[test]
        fn unknown_keyword_is_an_error() {
            let change = Change::added(root().join("a"), Keyword::Other("allOf".into()), json!([]));
            let err = classify(&change).unwrap_err();
            assert_eq!(
                err,
                UnclassifiedChangeError {
                    keyword: "allOf".into(),
                    path: "/a".into()
                }
            );
        }

        #[test]
        fn declared_annotation_is_metadata() {
            let engine = RuleEngine::from_options(&CompareOptions::new().annotation_keyword("x-order"));
            let change = Change::modified(root(), Keyword::Other("x-order".into()), json!(1), json!(2));
            assert_eq!(engine.classify(&change).unwrap(), Severity::Addition);
        }
    }

    mod comparator {
        use super::*;

        struct AlwaysLooser;

        impl PatternComparator for AlwaysLooser {
            fn compare(&self, _old: &str, _new: &str) -> Option<Restrictiveness> {
                Some(Restrictiveness::Looser)
            }
        }

        #[test]
        fn custom_comparator_is_used() {
            let engine = RuleEngine::new().with_patterns(AlwaysLooser);
            let change = Change::modified(root(), Keyword::Pattern, json!("^[a-z]+$"), json!("^[0-9]+$"));
            assert_eq!(engine.classify(&change).unwrap(), Severity::Addition);
        }
    }

    #[test]
    fn helpers() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(scale_to_integers(0.25, 1.5), Some((25, 150)));
        assert_eq!(scale_to_integers(1.0 / 3.0, 1.0), None);
    }
}
