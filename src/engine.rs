//! The scan engine: pattern registry, configuration, and the scan loop
//!
//! [`Engine`] owns the pattern registry and the caller-supplied pieces
//! of a concrete grammar: the control resolver and the root control. It
//! knows nothing about any specific language: the resolver encodes the
//! transition table, the engine supplies the machinery.
//!
//! Scanning is a suspend/resume cursor: [`Engine::iterate`] returns a
//! [`TokenCursor`] that performs no matching until the consumer asks for
//! the next token, and may be abandoned at any point with no teardown.
//! The structural effects of a step (pops, pushes, tree attachment,
//! control caching) are applied when the cursor is next advanced, so a
//! consumer that stops after a token observes exactly the state the
//! suspension point defines. [`Engine::process`] drains the cursor and
//! returns the context tree instead.
//!
//! One step of the loop, in fixed order: substitute an inherited
//! control from the current context's cache; expand the expectation set
//! against the registry; try each pattern at the exact current offset in
//! declared order, first match wins; hand the token to the resolver;
//! yield it; then, on the next advance, apply the resolved control's
//! pre-pops and pre-pushes, attach the match (directly or under a wrap
//! node), cache the control on the current context, and apply the
//! post-pops and post-pushes.

use crate::context::{ContextName, ContextTree, NodeId};
use crate::control::{Control, Expectations};
use crate::error::{context_window, Error};
use crate::matching::{MatchRecord, Pattern};
use crate::position::Position;
use regex::Captures;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

type Resolver = Box<dyn Fn(&Token<'_>) -> Option<Control> + Send + Sync>;

/// One successful pattern application, as observed by the resolver and
/// the consumer.
///
/// Tokens are ephemeral: the resolver must not retain one beyond the
/// call, and the engine keeps nothing of it past the step.
#[derive(Debug)]
pub struct Token<'t> {
    captures: Captures<'t>,
    pattern: Pattern,
    start_offset: usize,
    end_offset: usize,
    context: NodeId,
    context_name: ContextName,
}

impl<'t> Token<'t> {
    pub fn pattern_id(&self) -> &str {
        self.pattern.id()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The whole matched fragment.
    pub fn text(&self) -> &'t str {
        self.captures.get(0).map(|m| m.as_str()).unwrap_or("")
    }

    /// Positional capture group; 0 is the first group after the whole
    /// match.
    pub fn group(&self, index: usize) -> Option<&'t str> {
        self.captures.get(index + 1).map(|m| m.as_str())
    }

    /// Named capture group.
    pub fn named(&self, name: &str) -> Option<&'t str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// Byte range of the match within the scanned text.
    pub fn span(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }

    /// Offset of the first byte after the match, where the scan
    /// continues.
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// The context the match was produced in.
    pub fn context(&self) -> NodeId {
        self.context
    }

    pub fn context_name(&self) -> &ContextName {
        &self.context_name
    }
}

/// A pattern reference accepted by [`Engine::resolve_pattern`]: an id to
/// look up, or an already-compiled pattern to pass through.
#[derive(Debug, Clone)]
pub enum PatternKey<'a> {
    Id(&'a str),
    Compiled(&'a Pattern),
}

impl<'a> From<&'a str> for PatternKey<'a> {
    fn from(id: &'a str) -> Self {
        PatternKey::Id(id)
    }
}

impl<'a> From<&'a Pattern> for PatternKey<'a> {
    fn from(pattern: &'a Pattern) -> Self {
        PatternKey::Compiled(pattern)
    }
}

/// The tokenization engine: registry, configuration, scan entry points.
pub struct Engine {
    patterns: HashMap<String, Pattern>,
    resolver: Option<Resolver>,
    root_ctl: Option<Control>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("Engine")
            .field("patterns", &ids)
            .field("root_ctl", &self.root_ctl)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            resolver: None,
            root_ctl: None,
        }
    }

    /// Register named patterns, compiling each into anchored form.
    ///
    /// The whole batch is validated before anything is stored: an id
    /// already in the registry (or repeated within the batch) fails with
    /// [`Error::DuplicatePattern`], a source that does not compile with
    /// [`Error::InvalidPattern`].
    pub fn define_patterns(&mut self, patterns: &[(&str, &str)]) -> Result<&mut Self, Error> {
        for (index, (id, _)) in patterns.iter().enumerate() {
            let repeated_in_batch = patterns[..index].iter().any(|(seen, _)| seen == id);
            if repeated_in_batch || self.patterns.contains_key(*id) {
                return Err(Error::DuplicatePattern { id: id.to_string() });
            }
        }
        let mut compiled = Vec::with_capacity(patterns.len());
        for (id, source) in patterns {
            compiled.push(Pattern::compile(id, source)?);
        }
        for pattern in compiled {
            self.patterns.insert(pattern.id().to_string(), pattern);
        }
        Ok(self)
    }

    /// Look up a registered pattern by id.
    pub fn get_pattern(&self, id: &str) -> Result<Pattern, Error> {
        self.patterns
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownPattern { id: id.to_string() })
    }

    /// Resolve a pattern reference. Ids are looked up; a compiled
    /// pattern known to the registry is returned unchanged, so
    /// resolution is idempotent.
    pub fn resolve_pattern<'a>(&self, key: impl Into<PatternKey<'a>>) -> Result<Pattern, Error> {
        match key.into() {
            PatternKey::Id(id) => self.get_pattern(id),
            PatternKey::Compiled(pattern) => match self.patterns.get(pattern.id()) {
                Some(known) if known == pattern => Ok(pattern.clone()),
                _ => Err(Error::UnknownPattern {
                    id: pattern.id().to_string(),
                }),
            },
        }
    }

    /// Expand an ordered id list into patterns, preserving order.
    pub fn get_patterns(&self, ids: &[&str]) -> Result<Vec<Pattern>, Error> {
        ids.iter().map(|id| self.get_pattern(id)).collect()
    }

    /// Install the transition function: a pure mapping from a produced
    /// token to the next control, or `None` to end the scan.
    pub fn set_ctl_resolver<F>(&mut self, resolver: F) -> &mut Self
    where
        F: Fn(&Token<'_>) -> Option<Control> + Send + Sync + 'static,
    {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Install the control used when a scan is started without an
    /// explicit one.
    pub fn set_root_ctl(&mut self, ctl: Control) -> &mut Self {
        self.root_ctl = Some(ctl);
        self
    }

    /// Scan `text` as a lazy token sequence. No tree is retained:
    /// matches are not attached anywhere.
    pub fn iterate<'s, 't>(
        &'s self,
        text: &'t str,
        starting_ctl: Option<Control>,
        start_offset: usize,
    ) -> TokenCursor<'s, 't> {
        self.cursor(text, starting_ctl, start_offset, TreeSlot::Owned(ContextTree::new()), false)
    }

    /// Scan `text` as a lazy token sequence, attaching qualifying
    /// matches into the supplied tree. Several scans over one tree
    /// merge under its root.
    pub fn iterate_into<'s, 't>(
        &'s self,
        text: &'t str,
        starting_ctl: Option<Control>,
        start_offset: usize,
        tree: &'s mut ContextTree,
    ) -> TokenCursor<'s, 't> {
        self.cursor(text, starting_ctl, start_offset, TreeSlot::Borrowed(tree), true)
    }

    /// Drain a scan for tree construction only and return the tree.
    pub fn process(
        &self,
        text: &str,
        starting_ctl: Option<Control>,
        start_offset: usize,
    ) -> Result<ContextTree, Error> {
        let mut tree = ContextTree::new();
        self.process_into(text, starting_ctl, start_offset, &mut tree)?;
        Ok(tree)
    }

    /// Drain a scan into a caller-owned tree.
    pub fn process_into(
        &self,
        text: &str,
        starting_ctl: Option<Control>,
        start_offset: usize,
        tree: &mut ContextTree,
    ) -> Result<(), Error> {
        let mut cursor = self.iterate_into(text, starting_ctl, start_offset, tree);
        for step in &mut cursor {
            step?;
        }
        Ok(())
    }

    fn cursor<'s, 't>(
        &'s self,
        text: &'t str,
        starting_ctl: Option<Control>,
        start_offset: usize,
        tree: TreeSlot<'s>,
        attach: bool,
    ) -> TokenCursor<'s, 't> {
        let ctl = starting_ctl.or_else(|| self.root_ctl.clone());
        let ctx = tree.tree().root();
        TokenCursor {
            engine: self,
            text,
            tree,
            attach,
            ctx,
            offset: start_offset,
            ctl,
            prev_id: None,
            pending: None,
            done: false,
        }
    }
}

enum TreeSlot<'s> {
    Owned(ContextTree),
    Borrowed(&'s mut ContextTree),
}

impl TreeSlot<'_> {
    fn tree(&self) -> &ContextTree {
        match self {
            TreeSlot::Owned(tree) => tree,
            TreeSlot::Borrowed(tree) => tree,
        }
    }

    fn tree_mut(&mut self) -> &mut ContextTree {
        match self {
            TreeSlot::Owned(tree) => tree,
            TreeSlot::Borrowed(tree) => tree,
        }
    }
}

/// Effects of a yielded token, held back until the cursor is advanced
/// again so that abandonment right after the yield is always safe.
struct PendingStep {
    next_ctl: Option<Control>,
    pattern_id: String,
    record: Option<MatchRecord>,
}

/// A suspend/resume cursor over one scan invocation.
///
/// Yields `Result<Token, Error>`; the first error ends the scan. The
/// cursor holds no external resources and may be dropped at any point.
pub struct TokenCursor<'s, 't> {
    engine: &'s Engine,
    text: &'t str,
    tree: TreeSlot<'s>,
    attach: bool,
    ctx: NodeId,
    offset: usize,
    ctl: Option<Control>,
    prev_id: Option<String>,
    pending: Option<PendingStep>,
    done: bool,
}

impl<'s, 't> TokenCursor<'s, 't> {
    fn position(&self) -> Position {
        Position::at(self.text, self.offset)
    }

    fn dead_end(&self, previous: Option<String>) -> Error {
        Error::DeadEnd {
            position: self.position(),
            previous,
        }
    }

    /// Pop out to the parent of the nearest frame named `name`.
    fn pop_to(&mut self, name: &str, pattern_id: &str) -> Result<(), Error> {
        match self.tree.tree().closest(self.ctx, name) {
            Some(parent) => {
                self.ctx = parent;
                Ok(())
            }
            None => Err(Error::UnresolvedContext {
                position: Self::position(self),
                pattern_id: pattern_id.to_string(),
                context: name.to_string(),
            }),
        }
    }

    /// Apply the held-back effects of the previously yielded token.
    /// Returns `false` for clean termination of the scan.
    fn apply_pending(&mut self, pending: PendingStep) -> Result<bool, Error> {
        let PendingStep {
            next_ctl,
            pattern_id,
            record,
        } = pending;
        self.prev_id = Some(pattern_id.clone());

        let ctl = match next_ctl {
            Some(ctl) => ctl,
            None => {
                if self.offset < self.text.len() {
                    return Err(self.dead_end(Some(pattern_id)));
                }
                return Ok(false);
            }
        };

        for name in &ctl.effects.pre_pop {
            self.pop_to(name, &pattern_id)?;
        }
        for name in &ctl.effects.pre_push {
            self.ctx = self.tree.tree_mut().push_context(self.ctx, name.clone());
        }

        if let Some(record) = record {
            match &ctl.effects.wrap {
                None => self.tree.tree_mut().push_match(self.ctx, record),
                Some(wrap_name) => {
                    // The wrapper is a tree child only; the stack pointer
                    // stays where it is, so no pop can address it.
                    let wrapper = self.tree.tree_mut().push_context(self.ctx, wrap_name.clone());
                    self.tree.tree_mut().push_match(wrapper, record);
                }
            }
        }

        self.tree.tree_mut().set_last_control(self.ctx, ctl.clone());

        for name in &ctl.effects.post_pop {
            self.pop_to(name, &pattern_id)?;
        }
        for name in &ctl.effects.post_push {
            self.ctx = self.tree.tree_mut().push_context(self.ctx, name.clone());
        }

        self.ctl = Some(ctl);
        Ok(true)
    }

    /// Perform one match step: expand expectations, match at the exact
    /// current offset, consult the resolver, and hand the token out.
    /// `Ok(None)` is clean end of input at the root context.
    fn step(&mut self) -> Result<Option<Token<'t>>, Error> {
        let ctl = match self.ctl.take() {
            Some(ctl) => ctl,
            None => {
                // Neither a starting control nor a configured root
                // control: same outcome as a resolver yielding nothing.
                if self.offset < self.text.len() {
                    return Err(self.dead_end(self.prev_id.clone()));
                }
                return Ok(None);
            }
        };

        // An inherit control reuses whatever the current context last
        // ran under; a context with no history is a dead end.
        let ctl = if ctl.expectations.is_inherit() {
            match self.tree.tree().last_control(self.ctx) {
                Some(cached) if !cached.expectations.is_inherit() => cached.clone(),
                _ => return Err(self.dead_end(self.prev_id.clone())),
            }
        } else {
            ctl
        };

        let patterns = match &ctl.expectations {
            Expectations::Ids(ids) => {
                let mut expanded = Vec::with_capacity(ids.len());
                for id in ids {
                    expanded.push(self.engine.get_pattern(id)?);
                }
                expanded
            }
            Expectations::Resolved(patterns) => patterns.clone(),
            Expectations::Inherit => return Err(self.dead_end(self.prev_id.clone())),
        };

        let mut matched: Option<(Pattern, Captures<'t>)> = None;
        for pattern in &patterns {
            if let Some(caps) = pattern.match_at(self.text, self.offset) {
                matched = Some((pattern.clone(), caps));
                break;
            }
        }

        let (pattern, captures) = match matched {
            Some(found) => found,
            None => {
                if self.offset < self.text.len() {
                    return Err(Error::UnexpectedToken {
                        position: Self::position(self),
                        window: context_window(self.text, self.offset),
                        previous: self.prev_id.clone(),
                        expected: ctl.expected_ids(),
                    });
                }
                if !self.tree.tree().is_root(self.ctx) {
                    return Err(Error::UnexpectedEndOfInput {
                        position: Self::position(self),
                        previous: self.prev_id.clone(),
                        expected: ctl.expected_ids(),
                    });
                }
                return Ok(None);
            }
        };

        let start = self.offset;
        let matched_len = captures.get(0).map(|m| m.end()).unwrap_or(0);
        self.offset = start + matched_len;

        let token = Token {
            captures,
            pattern: pattern.clone(),
            start_offset: start,
            end_offset: self.offset,
            context: self.ctx,
            context_name: self.tree.tree().name(self.ctx).clone(),
        };

        let next_ctl = match &self.engine.resolver {
            Some(resolver) => resolver(&token),
            None => None,
        };

        // A match reaches the tree only when there is a tree to build
        // and it carries capture groups, or the next control wraps it.
        let record = match &next_ctl {
            Some(ctl)
                if self.attach
                    && (pattern.has_captures()
                        || pattern.has_named_captures()
                        || ctl.effects.wrap.is_some()) =>
            {
                Some(MatchRecord::from_captures(&pattern, &token.captures))
            }
            _ => None,
        };

        self.pending = Some(PendingStep {
            next_ctl,
            pattern_id: pattern.id().to_string(),
            record,
        });

        Ok(Some(token))
    }
}

impl<'s, 't> Iterator for TokenCursor<'s, 't> {
    type Item = Result<Token<'t>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(pending) = self.pending.take() {
            match self.apply_pending(pending) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
        match self.step() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}
