#![forbid(unsafe_code)]

//! Canonical test trees and a wired-up session builder.
//!
//! The scenario tree used throughout the tests:
//!
//! ```text
//! col-root:  R
//! col-r:     C1  C2        (children of R)
//! col-c1:    G             (child of C1)
//! ```

use std::sync::Arc;

use trellis_core::{Column, TreeNode, TreeSnapshot};
use trellis_dnd::{Collaborators, DragConfig, DragSession};

use crate::fakes::{RecordingNotifier, RecordingStore, ScriptedMoveApi, SharedSnapshot};

pub fn r() -> TreeNode {
    TreeNode::new("r", "Campus").with_kind("site")
}

pub fn c1() -> TreeNode {
    TreeNode::new("c1", "North Wing").with_parent("r").with_kind("building")
}

pub fn c2() -> TreeNode {
    TreeNode::new("c2", "South Wing").with_parent("r").with_kind("building")
}

pub fn g() -> TreeNode {
    TreeNode::new("g", "Ground Floor").with_parent("c1").with_kind("floor")
}

pub fn root_column() -> Column {
    Column::root("col-root").with_nodes(vec![r()])
}

pub fn r_column() -> Column {
    Column::new("col-r", Some("r".into())).with_nodes(vec![c1(), c2()])
}

pub fn c1_column() -> Column {
    Column::new("col-c1", Some("c1".into())).with_nodes(vec![g()])
}

/// R → {C1, C2}, C1 → {G} at revision 1.
pub fn scenario_tree() -> TreeSnapshot {
    TreeSnapshot::new(1, vec![root_column(), r_column(), c1_column()])
}

/// A single parent chain `n0 ← n1 ← … ← n{len-1}`, one column per level.
pub fn chain(len: usize) -> TreeSnapshot {
    let columns = (0..len)
        .map(|i| {
            let mut node = TreeNode::new(format!("n{i}"), format!("Node {i}"));
            let column = if i == 0 {
                Column::root("col-root")
            } else {
                let parent = format!("n{}", i - 1);
                node = node.with_parent(parent.as_str());
                Column::new(format!("col-{parent}"), Some(parent.into()))
            };
            column.with_nodes(vec![node])
        })
        .collect();
    TreeSnapshot::new(1, columns)
}

/// Every fake wired together around one tree.
///
/// The store writes through to the shared snapshot, so an optimistic apply
/// is visible to the next evaluation.
#[derive(Debug, Clone)]
pub struct Harness {
    pub tree: Arc<SharedSnapshot>,
    pub api: Arc<ScriptedMoveApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<RecordingStore>,
}

impl Harness {
    pub fn new(snapshot: TreeSnapshot) -> Self {
        let tree = SharedSnapshot::new(snapshot);
        Self {
            store: RecordingStore::backed_by(tree.clone()),
            tree,
            api: ScriptedMoveApi::new(),
            notifier: RecordingNotifier::new(),
        }
    }

    /// Harness around [`scenario_tree`].
    pub fn scenario() -> Self {
        Self::new(scenario_tree())
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            snapshots: self.tree.clone(),
            api: self.api.clone(),
            notifier: self.notifier.clone(),
            store: self.store.clone(),
        }
    }

    /// A session with default configuration.
    pub fn session(&self) -> DragSession {
        self.session_with(DragConfig::default())
    }

    pub fn session_with(&self, config: DragConfig) -> DragSession {
        DragSession::new(config, self.collaborators())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::TreeIndex;

    #[test]
    fn scenario_tree_shape() {
        let snap = scenario_tree();
        assert_eq!(snap.node_count(), 4);
        let index = TreeIndex::new(&snap);
        assert!(index.is_descendant_of("g", "r"));
        assert!(index.is_descendant_of("g", "c1"));
        assert!(!index.is_descendant_of("g", "c2"));
    }

    #[test]
    fn chain_links_each_level() {
        let snap = chain(5);
        assert_eq!(snap.node_count(), 5);
        let index = TreeIndex::new(&snap);
        assert_eq!(index.find_ancestor_chain("n4").len(), 4);
    }

    #[test]
    fn harness_store_writes_through() {
        use trellis_dnd::OptimisticStoreMutator;

        let harness = Harness::scenario();
        harness.store.apply_parent(&"g".into(), None);
        assert!(harness.tree.current().find_node("g").unwrap().is_root());
    }
}
