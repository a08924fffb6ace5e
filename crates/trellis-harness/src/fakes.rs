#![forbid(unsafe_code)]

//! Recording implementations of every collaborator trait.
//!
//! All fakes are `Send + Sync`, share state through `Arc`, and expose what
//! they saw so tests can assert on call order without a mocking framework.
//! Poisoned locks are recovered rather than propagated so one failing
//! assertion does not cascade through unrelated checks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use trellis_core::{Column, NodeId, TreeSnapshot};
use trellis_dnd::{
    MoveApiError, MoveNodeApi, MoveResponse, NotificationSink, OptimisticStoreMutator,
    TreeSnapshotProvider,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SharedSnapshot
// ============================================================================

/// A mutable tree store that hands out snapshots.
///
/// Every mutation bumps the revision, mirroring a store that publishes a new
/// snapshot after each change.
#[derive(Debug, Default)]
pub struct SharedSnapshot {
    inner: Mutex<TreeSnapshot>,
    fetches: AtomicUsize,
}

impl SharedSnapshot {
    pub fn new(snapshot: TreeSnapshot) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(snapshot),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Copy of the current snapshot without counting a fetch.
    pub fn current(&self) -> TreeSnapshot {
        lock(&self.inner).clone()
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        lock(&self.inner).revision
    }

    /// Number of times the engine asked for a snapshot.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Replace the columns, bumping the revision past the current one.
    pub fn replace(&self, columns: Vec<Column>) {
        let mut inner = lock(&self.inner);
        inner.revision += 1;
        inner.columns = columns;
    }

    /// Publish a new revision with unchanged contents.
    pub fn touch(&self) {
        lock(&self.inner).revision += 1;
    }

    /// Move `node_id` into the column whose parent is `new_parent`.
    ///
    /// Creates the column (`col-<parent>` or `col-root`) when none exists.
    /// Returns `false` if the node is unknown.
    pub fn reparent(&self, node_id: &NodeId, new_parent: Option<&NodeId>) -> bool {
        let mut inner = lock(&self.inner);
        let mut moved = None;
        for column in &mut inner.columns {
            if let Some(pos) = column.nodes.iter().position(|n| &n.id == node_id) {
                moved = Some(column.nodes.remove(pos));
                break;
            }
        }
        let Some(mut node) = moved else {
            return false;
        };
        node.parent_id = new_parent.cloned();

        let home = inner
            .columns
            .iter()
            .position(|column| column.parent_id.as_ref() == new_parent);
        match home {
            Some(idx) => inner.columns[idx].nodes.push(node),
            None => {
                let id = new_parent.map_or_else(|| "col-root".to_string(), |p| format!("col-{p}"));
                inner
                    .columns
                    .push(Column::new(id, new_parent.cloned()).with_nodes(vec![node]));
            }
        }
        inner.revision += 1;
        true
    }
}

impl TreeSnapshotProvider for SharedSnapshot {
    fn snapshot(&self) -> TreeSnapshot {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.current()
    }
}

// ============================================================================
// ScriptedMoveApi
// ============================================================================

/// One recorded `move_node` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCall {
    pub node_id: NodeId,
    pub new_parent_id: Option<NodeId>,
}

/// Backend fake answering from a queue of scripted replies.
///
/// When the queue is empty every call succeeds.
#[derive(Debug, Default)]
pub struct ScriptedMoveApi {
    replies: Mutex<VecDeque<Result<MoveResponse, MoveApiError>>>,
    calls: Mutex<Vec<MoveCall>>,
}

impl ScriptedMoveApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the reply for the next unanswered call.
    pub fn push_reply(&self, reply: Result<MoveResponse, MoveApiError>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn calls(&self) -> Vec<MoveCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl MoveNodeApi for ScriptedMoveApi {
    async fn move_node(
        &self,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
    ) -> Result<MoveResponse, MoveApiError> {
        lock(&self.calls).push(MoveCall {
            node_id: node_id.clone(),
            new_parent_id: new_parent_id.cloned(),
        });
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(MoveResponse::ok()))
    }
}

// ============================================================================
// RecordingNotifier
// ============================================================================

/// A notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<Notification> {
        lock(&self.shown).clone()
    }

    pub fn last(&self) -> Option<Notification> {
        lock(&self.shown).last().cloned()
    }
}

impl NotificationSink for RecordingNotifier {
    fn show_success(&self, text: &str) {
        lock(&self.shown).push(Notification::Success(text.to_string()));
    }

    fn show_error(&self, text: &str) {
        lock(&self.shown).push(Notification::Error(text.to_string()));
    }
}

// ============================================================================
// RecordingStore
// ============================================================================

/// One recorded optimistic store edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Apply {
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
    },
    Revert {
        node_id: NodeId,
        previous_parent_id: Option<NodeId>,
    },
}

/// Store fake that records edits and optionally applies them to a
/// [`SharedSnapshot`].
#[derive(Debug, Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<StoreCall>>,
    tree: Option<Arc<SharedSnapshot>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A store whose edits are written through to `tree`.
    pub fn backed_by(tree: Arc<SharedSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::default(),
            tree: Some(tree),
        })
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }
}

impl OptimisticStoreMutator for RecordingStore {
    fn apply_parent(&self, node_id: &NodeId, new_parent_id: Option<&NodeId>) {
        lock(&self.calls).push(StoreCall::Apply {
            node_id: node_id.clone(),
            new_parent_id: new_parent_id.cloned(),
        });
        if let Some(tree) = &self.tree {
            tree.reparent(node_id, new_parent_id);
        }
    }

    fn revert_parent(&self, node_id: &NodeId, previous_parent_id: Option<&NodeId>) {
        lock(&self.calls).push(StoreCall::Revert {
            node_id: node_id.clone(),
            previous_parent_id: previous_parent_id.cloned(),
        });
        if let Some(tree) = &self.tree {
            tree.reparent(node_id, previous_parent_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::scenario_tree;
    use futures::executor::block_on;

    #[test]
    fn snapshot_fetches_are_counted() {
        let tree = SharedSnapshot::new(scenario_tree());
        assert_eq!(tree.fetches(), 0);
        let _ = tree.snapshot();
        let _ = tree.current();
        assert_eq!(tree.fetches(), 1);
    }

    #[test]
    fn reparent_moves_node_and_bumps_revision() {
        let tree = SharedSnapshot::new(scenario_tree());
        let before = tree.revision();
        assert!(tree.reparent(&"g".into(), Some(&"c2".into())));
        let snap = tree.current();
        assert_eq!(snap.revision, before + 1);
        let g = snap.find_node("g").unwrap();
        assert_eq!(g.parent_id, Some("c2".into()));
        let home = snap
            .columns
            .iter()
            .find(|c| c.nodes.iter().any(|n| n.id.as_str() == "g"))
            .unwrap();
        assert_eq!(home.parent_id, Some("c2".into()));
    }

    #[test]
    fn reparent_unknown_node_is_noop() {
        let tree = SharedSnapshot::new(scenario_tree());
        let before = tree.revision();
        assert!(!tree.reparent(&"nope".into(), None));
        assert_eq!(tree.revision(), before);
    }

    #[test]
    fn scripted_replies_are_consumed_in_order() {
        let api = ScriptedMoveApi::new();
        api.push_reply(Ok(MoveResponse::failed("locked")));
        let first = block_on(api.move_node(&"a".into(), None)).unwrap();
        let second = block_on(api.move_node(&"b".into(), Some(&"r".into()))).unwrap();
        assert!(!first.success);
        assert!(second.success);
        assert_eq!(api.call_count(), 2);
        assert_eq!(api.calls()[1].new_parent_id, Some("r".into()));
    }

    #[test]
    fn backed_store_writes_through() {
        let tree = SharedSnapshot::new(scenario_tree());
        let store = RecordingStore::backed_by(tree.clone());
        store.apply_parent(&"c2".into(), Some(&"c1".into()));
        store.revert_parent(&"c2".into(), Some(&"r".into()));
        assert_eq!(store.calls().len(), 2);
        assert_eq!(
            tree.current().find_node("c2").unwrap().parent_id,
            Some("r".into())
        );
    }
}
