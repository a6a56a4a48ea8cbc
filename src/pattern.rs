//! Restrictiveness comparison between two `pattern` values.
//!
//! Deciding whether one regular language contains another is not something
//! the rules engine attempts in general. [`BestEffortPatterns`] recognizes a
//! few shapes that are sound to decide syntactically and gives up on the
//! rest; callers with better knowledge can plug in their own
//! [`PatternComparator`].

use std::collections::BTreeSet;

use regex::Regex;

/// How a new pattern relates to the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restrictiveness {
    /// The new pattern accepts every string the old one did, and more.
    Looser,
    /// The new pattern accepts a subset of what the old one did.
    Stricter,
    /// Both accept the same strings.
    Equivalent,
}

/// Decides how a `pattern` change affects the set of accepted strings.
pub trait PatternComparator {
    /// Returns `None` when the relationship cannot be determined.
    fn compare(&self, old: &str, new: &str) -> Option<Restrictiveness>;
}

/// Syntactic comparison covering match-everything patterns, anchors added
/// or removed around an identical body, and alternations that gain or lose
/// branches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestEffortPatterns;

impl PatternComparator for BestEffortPatterns {
    fn compare(&self, old: &str, new: &str) -> Option<Restrictiveness> {
        if old == new {
            return Some(Restrictiveness::Equivalent);
        }
        let old_re = Regex::new(old).ok()?;
        let new_re = Regex::new(new).ok()?;

        match (matches_everything(old, &old_re), matches_everything(new, &new_re)) {
            (true, true) => return Some(Restrictiveness::Equivalent),
            (false, true) => return Some(Restrictiveness::Looser),
            (true, false) => return Some(Restrictiveness::Stricter),
            (false, false) => {}
        }

        let old_parts = Anchored::split(old);
        let new_parts = Anchored::split(new);

        if old_parts.body == new_parts.body {
            return compare_anchors(&old_parts, &new_parts);
        }

        if old_parts.start != new_parts.start || old_parts.end != new_parts.end {
            return None;
        }
        let old_alts = alternatives(&old_parts)?;
        let new_alts = alternatives(&new_parts)?;
        if old_alts == new_alts {
            Some(Restrictiveness::Equivalent)
        } else if old_alts.is_subset(&new_alts) {
            Some(Restrictiveness::Looser)
        } else if new_alts.is_subset(&old_alts) {
            Some(Restrictiveness::Stricter)
        } else {
            None
        }
    }
}

/// A pattern split into its leading/trailing anchors and the body between.
struct Anchored<'a> {
    start: bool,
    end: bool,
    body: &'a str,
}

impl<'a> Anchored<'a> {
    fn split(pattern: &'a str) -> Self {
        let (start, rest) = match pattern.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let escaped_dollar = rest.ends_with("\\$") && !rest.ends_with("\\\\$");
        let (end, body) = match rest.strip_suffix('$') {
            Some(body) if !escaped_dollar => (true, body),
            _ => (false, rest),
        };
        Anchored { start, end, body }
    }
}

/// Dropping an anchor only removes an assertion, so the result matches a
/// superset of strings.
fn compare_anchors(old: &Anchored<'_>, new: &Anchored<'_>) -> Option<Restrictiveness> {
    let dropped = (old.start && !new.start) || (old.end && !new.end);
    let added = (!old.start && new.start) || (!old.end && new.end);
    match (dropped, added) {
        (true, false) => Some(Restrictiveness::Looser),
        (false, true) => Some(Restrictiveness::Stricter),
        (false, false) => Some(Restrictiveness::Equivalent),
        (true, true) => None,
    }
}

/// An unanchored search pattern that can match the empty string matches
/// every input, unless it carries assertions.
fn matches_everything(pattern: &str, re: &Regex) -> bool {
    const ASSERTIONS: &[&str] = &["^", "$", "\\b", "\\B", "\\A", "\\z", "(?="];
    !ASSERTIONS.iter().any(|a| pattern.contains(a)) && re.is_match("")
}

/// Top-level alternation branches of a pattern body.
///
/// Anchored bodies are only split when the whole body is one group, since
/// `^a|b$` binds the anchors to individual branches.
fn alternatives<'a>(parts: &Anchored<'a>) -> Option<BTreeSet<&'a str>> {
    let body = if parts.start || parts.end {
        unwrap_group(parts.body)?
    } else {
        unwrap_group(parts.body).unwrap_or(parts.body)
    };
    Some(split_top_level(body).into_iter().collect())
}

/// Inner text of a body that is exactly one `( ... )` or `(?: ... )` group.
fn unwrap_group(body: &str) -> Option<&str> {
    let inner = body.strip_prefix('(')?.strip_suffix(')')?;
    if !balanced(inner) {
        return None;
    }
    if let Some(rest) = inner.strip_prefix("?:") {
        return Some(rest);
    }
    if inner.starts_with('?') {
        return None;
    }
    Some(inner)
}

/// Whether every group opened in `s` is also closed within it.
fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    let mut escaped = false;
    let mut in_class = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut escaped = false;
    let mut in_class = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => depth -= 1,
            '|' if !in_class && depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}
