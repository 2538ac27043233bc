//! Control descriptors: expectation sets and structural effects
//!
//! A [`Control`] tells the engine what may come next and what the match
//! does to the context stack/tree. The expectation set is ordered
//! (declaration order is the disambiguation rule, first match wins) and
//! comes in three forms: pattern ids expanded against the registry at
//! each step, a pre-resolved pattern list that passes through untouched,
//! or an inherit marker that reuses whatever control the current context
//! last ran under.
//!
//! Structural effects are a fixed set of optional fields rather than an
//! open-ended bag: pops and pushes applied before and after the match is
//! attached, plus an optional wrap name that nests the match one tree
//! level deeper without touching the stack.

use crate::matching::Pattern;

/// The ordered collection of patterns acceptable at the next step.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectations {
    /// Pattern ids, expanded against the engine's registry in order.
    Ids(Vec<String>),
    /// Already-resolved patterns, used in the given order as-is.
    Resolved(Vec<Pattern>),
    /// Reuse the control last cached on the current context.
    Inherit,
}

impl Expectations {
    pub fn is_inherit(&self) -> bool {
        matches!(self, Expectations::Inherit)
    }
}

/// Structural side effects accompanying one scan step.
///
/// Pops name the context frames to pop out to, in order, each resolved
/// independently; pushes name new child contexts, created in order. The
/// `pre_*` fields apply before the current match is attached to the
/// tree, the `post_*` fields after.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Effects {
    pub pre_pop: Vec<String>,
    pub pre_push: Vec<String>,
    pub post_pop: Vec<String>,
    pub post_push: Vec<String>,
    /// Nest the current match inside a fresh context of this name. The
    /// wrapper becomes a tree child only; it is never pushed onto the
    /// stack, so it is unreachable by later pops.
    pub wrap: Option<String>,
}

/// The next expectation set plus the structural effects of this step.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub expectations: Expectations,
    pub effects: Effects,
}

impl Control {
    pub fn new(expectations: Expectations, effects: Effects) -> Self {
        Self {
            expectations,
            effects,
        }
    }

    /// A control expecting the given pattern ids, in order, with no
    /// structural effects.
    pub fn expect<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            Expectations::Ids(ids.into_iter().map(Into::into).collect()),
            Effects::default(),
        )
    }

    /// A control over already-resolved patterns, in the given order.
    pub fn resolved(patterns: Vec<Pattern>) -> Self {
        Self::new(Expectations::Resolved(patterns), Effects::default())
    }

    /// A control that reuses whatever the current context last ran under.
    pub fn inherit() -> Self {
        Self::new(Expectations::Inherit, Effects::default())
    }

    pub fn pre_pop(mut self, name: impl Into<String>) -> Self {
        self.effects.pre_pop.push(name.into());
        self
    }

    pub fn pre_push(mut self, name: impl Into<String>) -> Self {
        self.effects.pre_push.push(name.into());
        self
    }

    pub fn post_pop(mut self, name: impl Into<String>) -> Self {
        self.effects.post_pop.push(name.into());
        self
    }

    pub fn post_push(mut self, name: impl Into<String>) -> Self {
        self.effects.post_push.push(name.into());
        self
    }

    pub fn wrap(mut self, name: impl Into<String>) -> Self {
        self.effects.wrap = Some(name.into());
        self
    }

    /// The pattern ids this control would accept, for diagnostics.
    ///
    /// An inherit control lists nothing; it is substituted before any
    /// matching happens.
    pub fn expected_ids(&self) -> Vec<String> {
        match &self.expectations {
            Expectations::Ids(ids) => ids.clone(),
            Expectations::Resolved(patterns) => {
                patterns.iter().map(|p| p.id().to_string()).collect()
            }
            Expectations::Inherit => Vec::new(),
        }
    }
}
