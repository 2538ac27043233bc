//! Anchored pattern matching and captured-match records
//!
//! [`Pattern`] is a named regular expression normalized into
//! anchored-repeatable form: the source is compiled as `\A(?:source)` and
//! applied to the tail of the input starting at an explicitly supplied
//! offset, so a pattern either matches at exactly that offset or not at
//! all; it never scans forward to a later match. Because the offset is
//! an argument rather than state on the pattern, patterns are immutable
//! and can be shared freely between concurrently running, independent
//! scans.
//!
//! [`MatchRecord`] is the immutable value a qualifying match leaves in
//! the context tree: the positional capture groups (excluding the whole
//! match) and any named groups.

use crate::error::Error;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;

/// A named, offset-anchored text matcher.
///
/// Cloning is cheap; the compiled program is shared.
#[derive(Debug, Clone)]
pub struct Pattern {
    id: Arc<str>,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` into anchored form under the given id.
    ///
    /// Fails with [`Error::InvalidPattern`] when the source is not a
    /// valid regular expression.
    pub fn compile(id: &str, source: &str) -> Result<Self, Error> {
        let anchored = format!(r"\A(?:{})", source);
        let regex = Regex::new(&anchored).map_err(|e| Error::InvalidPattern {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            id: Arc::from(id),
            regex,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    /// Attempt a match at exactly `offset`.
    ///
    /// Returns the captures of the match, with group positions relative
    /// to `offset`, or `None` when the pattern does not match there. An
    /// offset that is out of range or not on a character boundary
    /// matches nothing.
    pub fn match_at<'t>(&self, text: &'t str, offset: usize) -> Option<Captures<'t>> {
        let tail = text.get(offset..)?;
        self.regex.captures(tail)
    }

    /// Whether the pattern declares any capture groups beyond the whole
    /// match (positional or named).
    pub fn has_captures(&self) -> bool {
        self.regex.captures_len() > 1
    }

    /// Whether the pattern declares named capture groups.
    pub fn has_named_captures(&self) -> bool {
        self.regex.capture_names().flatten().next().is_some()
    }

    /// The anchored source this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.regex.as_str() == other.regex.as_str()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The captured groups of one successful pattern application.
///
/// Positional groups exclude the whole-match group; a slot is `None`
/// when that group did not participate in the match. Named groups are
/// listed in group order and also appear in their positional slots.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pattern_id: Arc<str>,
    groups: Vec<Option<String>>,
    named: Vec<(String, Option<String>)>,
}

impl MatchRecord {
    pub(crate) fn from_captures(pattern: &Pattern, caps: &Captures<'_>) -> Self {
        let groups = (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
            .collect();
        let named = pattern
            .regex
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| {
                name.map(|n| (n.to_string(), caps.get(i).map(|m| m.as_str().to_string())))
            })
            .collect();
        Self {
            pattern_id: pattern.id_arc(),
            groups,
            named,
        }
    }

    /// Id of the pattern that produced this record.
    pub fn pattern_id(&self) -> &str {
        &self.pattern_id
    }

    /// All positional groups, excluding the whole match.
    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }

    /// Positional group by index; 0 is the first capture group.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Named group by name.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// All named groups in group order.
    pub fn named_groups(&self) -> &[(String, Option<String>)] {
        &self.named
    }
}
