//! The context stack/tree
//!
//! A context is simultaneously a frame on an explicit stack (via its
//! parent link) and a node in the output tree (via its ordered children).
//! Nodes live in an arena owned by [`ContextTree`] and reference each
//! other by [`NodeId`] index, so the parent back-reference is a plain
//! non-owning index and the structure cannot form ownership cycles.
//! Nodes are created only as children of an existing node and are never
//! re-parented, which keeps every parent chain finite and acyclic.
//!
//! The root carries the reserved [`ContextName::Root`] name, a distinct
//! enum variant rather than a magic string, so no user-chosen name can
//! collide with it.

use crate::control::Control;
use crate::matching::MatchRecord;
use std::fmt;

/// A context name: the reserved root sentinel or a user-chosen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextName {
    Root,
    Named(String),
}

impl ContextName {
    pub fn named(name: impl Into<String>) -> Self {
        ContextName::Named(name.into())
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ContextName::Root)
    }

    /// The user-chosen name, or `None` for the root.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            ContextName::Root => None,
            ContextName::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for ContextName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextName::Root => write!(f, "(root)"),
            ContextName::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Index of a node within its [`ContextTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One ordered child of a context: a nested context or an attached match.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeItem {
    Context(NodeId),
    Match(MatchRecord),
}

/// A node of the context tree; also a frame of the context stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextNode {
    name: ContextName,
    parent: Option<NodeId>,
    children: Vec<TreeItem>,
    last_control: Option<Control>,
}

impl ContextNode {
    pub fn name(&self) -> &ContextName {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[TreeItem] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.name.is_root()
    }

    /// The control this context last ran under, if any step has been
    /// cached on it.
    pub fn last_control(&self) -> Option<&Control> {
        self.last_control.as_ref()
    }
}

/// The arena owning all context nodes of one tree.
///
/// Created with the root node already present. A tree can be reused
/// across scan invocations to merge several scans under one root.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextTree {
    nodes: Vec<ContextNode>,
}

impl Default for ContextTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ContextNode {
                name: ContextName::Root,
                parent: None,
                children: Vec::new(),
                last_control: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Look up a node. Ids are only meaningful within the tree that
    /// issued them.
    pub fn get(&self, id: NodeId) -> Option<&ContextNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node(&self, id: NodeId) -> &ContextNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ContextNode {
        &mut self.nodes[id.0]
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.node(id).is_root()
    }

    pub fn name(&self, id: NodeId) -> &ContextName {
        self.node(id).name()
    }

    /// Create a new context as the last child of `parent` and return it.
    pub fn push_context(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ContextNode {
            name: ContextName::named(name),
            parent: Some(parent),
            children: Vec::new(),
            last_control: None,
        });
        self.node_mut(parent).children.push(TreeItem::Context(id));
        id
    }

    /// Append a match record to a context's children.
    pub fn push_match(&mut self, context: NodeId, record: MatchRecord) {
        self.node_mut(context).children.push(TreeItem::Match(record));
    }

    /// Find the nearest frame named `name`, starting at `from` and
    /// walking upward inclusive of `from` itself, and return its
    /// *parent*, the frame a pop lands on. `None` when no frame on the
    /// chain bears the name; the root sentinel never matches.
    pub fn closest(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = self.node(id);
            if node.name.as_named() == Some(name) {
                return node.parent;
            }
            current = node.parent;
        }
        None
    }

    pub(crate) fn set_last_control(&mut self, id: NodeId, control: Control) {
        self.node_mut(id).last_control = Some(control);
    }

    pub fn last_control(&self, id: NodeId) -> Option<&Control> {
        self.node(id).last_control()
    }

    /// Visit context nodes post-order: children before their parent.
    pub fn walk<F>(&self, from: NodeId, visit: &mut F)
    where
        F: FnMut(NodeId, &ContextNode),
    {
        for item in &self.node(from).children {
            if let TreeItem::Context(child) = item {
                self.walk(*child, visit);
            }
        }
        visit(from, self.node(from));
    }
}
