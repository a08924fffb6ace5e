#![forbid(unsafe_code)]

//! Ancestry queries over a borrowed [`TreeSnapshot`].
//!
//! [`TreeIndex`] is an arena-style view: node ids map to borrowed nodes, and
//! parent links are followed by id lookup rather than by object reference.
//! It is built per query and dropped afterwards, so it can never observe a
//! stale snapshot.
//!
//! # Corrupted snapshots
//!
//! The store is supposed to publish acyclic trees, but an upstream bug could
//! hand us a parent chain that loops. Every walk here is therefore bounded
//! twice: by a visited set keyed by node id, and by a hop cap
//! ([`DEFAULT_MAX_ANCESTOR_HOPS`]). A walk that hits either bound reports
//! [`Ancestry::Unresolved`]; [`TreeIndex::is_descendant_of`] folds that into
//! `false` ("not provably a descendant").

use ahash::{AHashMap, AHashSet};

use crate::model::{NodeId, TreeNode, TreeSnapshot};

/// Hop cap for descendant checks.
pub const DEFAULT_MAX_ANCESTOR_HOPS: usize = 20;

/// Three-way answer of a bounded ancestry walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ancestry {
    /// The ancestor was reached within the hop cap.
    Descendant,
    /// The walk reached a root (or an unknown parent) without meeting the ancestor.
    NotDescendant,
    /// The walk hit the hop cap or revisited a node before resolving.
    Unresolved {
        /// Parent links followed before giving up.
        hops: usize,
    },
}

/// Read-only id index over one snapshot.
#[derive(Debug, Clone)]
pub struct TreeIndex<'a> {
    nodes: AHashMap<&'a str, &'a TreeNode>,
    max_hops: usize,
}

impl<'a> TreeIndex<'a> {
    /// Index a snapshot with the default hop cap.
    #[must_use]
    pub fn new(snapshot: &'a TreeSnapshot) -> Self {
        Self::with_max_hops(snapshot, DEFAULT_MAX_ANCESTOR_HOPS)
    }

    /// Index a snapshot with a custom hop cap.
    ///
    /// When an id appears in more than one column the first occurrence wins,
    /// matching [`TreeSnapshot::find_node`].
    #[must_use]
    pub fn with_max_hops(snapshot: &'a TreeSnapshot, max_hops: usize) -> Self {
        let mut nodes = AHashMap::with_capacity(snapshot.node_count());
        for node in snapshot.nodes() {
            nodes.entry(node.id.as_str()).or_insert(node);
        }
        Self { nodes, max_hops }
    }

    /// Look up a node by id.
    #[inline]
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&'a TreeNode> {
        self.nodes.get(id).copied()
    }

    /// Whether the snapshot contains a node with this id.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of distinct node ids.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot has no nodes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Configured hop cap.
    #[inline]
    #[must_use]
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Parent id of a known node.
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&'a NodeId> {
        self.node(id).and_then(|node| node.parent_id.as_ref())
    }

    /// Ids from `node_id`'s parent up to the root, nearest first.
    ///
    /// Empty if the node is unknown or is a root. A parent id that is not in
    /// the snapshot still appears as the last element. A cyclic chain stops
    /// just before the first repeated id.
    #[must_use]
    pub fn find_ancestor_chain(&self, node_id: &str) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut visited: AHashSet<&str> = AHashSet::new();
        visited.insert(node_id);

        let mut current = self.parent_of(node_id);
        while let Some(id) = current {
            if !visited.insert(id.as_str()) {
                tracing::warn!(
                    target: "trellis.tree",
                    node_id = %node_id,
                    repeated = %id,
                    "cycle in ancestor chain"
                );
                break;
            }
            chain.push(id.clone());
            current = self.parent_of(id.as_str());
        }
        chain
    }

    /// Bounded walk from `node_id` towards the root looking for `ancestor_id`.
    ///
    /// A node is not its own descendant: the walk starts at the parent.
    #[must_use]
    pub fn ancestry(&self, node_id: &str, ancestor_id: &str) -> Ancestry {
        let mut visited: AHashSet<&str> = AHashSet::new();
        visited.insert(node_id);

        let mut hops = 0usize;
        let mut current = self.parent_of(node_id);
        while let Some(id) = current {
            if hops >= self.max_hops {
                tracing::warn!(
                    target: "trellis.tree",
                    node_id = %node_id,
                    ancestor_id = %ancestor_id,
                    hops,
                    "ancestry walk hit hop cap"
                );
                return Ancestry::Unresolved { hops };
            }
            hops += 1;

            if id.as_str() == ancestor_id {
                return Ancestry::Descendant;
            }
            if !visited.insert(id.as_str()) {
                tracing::warn!(
                    target: "trellis.tree",
                    node_id = %node_id,
                    repeated = %id,
                    hops,
                    "cycle detected during ancestry walk"
                );
                return Ancestry::Unresolved { hops };
            }
            current = self.parent_of(id.as_str());
        }
        Ancestry::NotDescendant
    }

    /// `true` iff `ancestor_id` is provably an ancestor of `node_id`.
    ///
    /// Unresolved walks fail safe to `false`.
    #[must_use]
    pub fn is_descendant_of(&self, node_id: &str, ancestor_id: &str) -> bool {
        self.ancestry(node_id, ancestor_id) == Ancestry::Descendant
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
