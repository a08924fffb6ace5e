#![forbid(unsafe_code)]

//! Tree model: nodes, columns, snapshots, and drop targets.
//!
//! A [`TreeSnapshot`] is the consistent view of the hierarchy at one point in
//! time. It is owned by the external tree store and only ever borrowed here.
//! Columns are lanes of siblings sharing a parent; dropping onto a column
//! means "become a child of this column's parent".
//!
//! # Invariants
//!
//! 1. A node with `is_persisted == false` has no stable id and must never be
//!    dragged. The model records the flag; the validator and session enforce it.
//! 2. `TreeSnapshot::revision` changes whenever the store publishes a new
//!    view. Two snapshots with equal revisions are treated as identical.
//! 3. Acyclicity is *not* enforced by the model. A snapshot may carry a cycle
//!    introduced upstream; [`TreeIndex`](crate::TreeIndex) detects it.

use std::borrow::Borrow;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Stable identifier of a persisted node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct NodeId(String);

impl NodeId {
    /// Create an id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// TreeNode
// ---------------------------------------------------------------------------

/// A unit in the project hierarchy (building, floor, room, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    /// `None` for roots.
    pub parent_id: Option<NodeId>,
    /// Free-form kind tag ("building", "floor", ...). Not interpreted here.
    pub node_kind: String,
    /// `false` for nodes created client-side and not yet saved.
    pub is_persisted: bool,
}

impl TreeNode {
    /// Create a persisted root node with an empty kind.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            node_kind: String::new(),
            is_persisted: true,
        }
    }

    /// Set the parent id.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the kind tag.
    #[must_use]
    pub fn with_kind(mut self, node_kind: impl Into<String>) -> Self {
        self.node_kind = node_kind.into();
        self
    }

    /// Mark the node as created client-side and not yet saved.
    #[must_use]
    pub fn unsaved(mut self) -> Self {
        self.is_persisted = false;
        self
    }

    /// Whether the node has no parent.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A lane of sibling nodes sharing one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Column {
    pub id: String,
    /// Parent shared by every node in the lane; `None` for the root lane.
    pub parent_id: Option<NodeId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub nodes: Vec<TreeNode>,
}

impl Column {
    /// Create an empty column whose nodes are children of `parent_id`.
    #[must_use]
    pub fn new(id: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            nodes: Vec::new(),
        }
    }

    /// Create an empty root column.
    #[must_use]
    pub fn root(id: impl Into<String>) -> Self {
        Self::new(id, None)
    }

    /// Replace the column's nodes.
    #[must_use]
    pub fn with_nodes(mut self, nodes: Vec<TreeNode>) -> Self {
        self.nodes = nodes;
        self
    }
}

// ---------------------------------------------------------------------------
// TreeSnapshot
// ---------------------------------------------------------------------------

/// Consistent view of the hierarchy at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeSnapshot {
    /// Bumped by the store on every published change.
    pub revision: u64,
    pub columns: Vec<Column>,
}

impl TreeSnapshot {
    /// Create a snapshot at the given revision.
    #[must_use]
    pub fn new(revision: u64, columns: Vec<Column>) -> Self {
        Self { revision, columns }
    }

    /// Iterate every node across all columns, in column order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.columns.iter().flat_map(|column| column.nodes.iter())
    }

    /// Find a node by id (first occurrence wins).
    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes().find(|node| node.id.as_str() == id)
    }

    /// Find a column by id.
    #[must_use]
    pub fn find_column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == id)
    }

    /// Total number of nodes across all columns.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.columns.iter().map(|column| column.nodes.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// DropTarget
// ---------------------------------------------------------------------------

/// Where a dragged node may be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum DropTarget {
    /// Become a child of this node.
    Node { node: TreeNode },
    /// Become a child of this column's parent.
    Column { column: Column },
}

impl DropTarget {
    /// Target a node.
    #[must_use]
    pub fn node(node: TreeNode) -> Self {
        Self::Node { node }
    }

    /// Target a column.
    #[must_use]
    pub fn column(column: Column) -> Self {
        Self::Column { column }
    }

    /// Which kind of element is targeted.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Node { .. } => TargetKind::Node,
            Self::Column { .. } => TargetKind::Column,
        }
    }

    /// Identity of the targeted element, independent of its payload.
    #[must_use]
    pub fn key(&self) -> TargetKey {
        match self {
            Self::Node { node } => TargetKey::Node(node.id.clone()),
            Self::Column { column } => TargetKey::Column(column.id.clone()),
        }
    }

    /// The parent a dropped node would receive.
    ///
    /// A node target proposes itself; a column target proposes its parent,
    /// which is `None` for the root column.
    #[must_use]
    pub fn proposed_parent(&self) -> Option<&NodeId> {
        match self {
            Self::Node { node } => Some(&node.id),
            Self::Column { column } => column.parent_id.as_ref(),
        }
    }
}

/// Element kind of a [`DropTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Node,
    Column,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// Identity of a drop target; two hovers with equal keys hit the same element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetKey {
    Node(NodeId),
    Column(String),
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node:{id}"),
            Self::Column(id) => write!(f, "column:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
