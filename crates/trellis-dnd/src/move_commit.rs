#![forbid(unsafe_code)]

//! Optimistic move commits.
//!
//! [`MoveCommitCoordinator::commit`] performs one reparent:
//!
//! 1. Ask the store to apply the new parent locally, so the UI reflects the
//!    move before the network call resolves.
//! 2. Call [`MoveNodeApi::move_node`].
//! 3. On success, notify with the node name and keep the optimistic state.
//! 4. On failure, notify with the server message (or a generic one) and
//!    return an outcome carrying the previous parent. Reverting is the
//!    store's job; the coordinator owns no rollback storage.
//!
//! A rejected call (`Err`) and a resolved `success: false` response are
//! handled identically. Nothing here returns an error to the caller: every
//! failure becomes a [`MoveOutcome`] with `success == false`.
//!
//! The coordinator does not guard against concurrent commits. The session
//! that owns it allows at most one drop in flight.

use std::fmt;
use std::sync::Arc;

use tracing::Instrument;
use trellis_core::{NodeId, TreeNode};

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::ports::{MoveNodeApi, NotificationSink, OptimisticStoreMutator};

/// Placeholder replaced by the node name in [`CommitMessages::success`].
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Notification texts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CommitMessages {
    /// Success text; `{name}` is replaced by the node name.
    pub success: String,
    /// Failure prefix; the server message is appended after `": "`.
    pub failure: String,
}

impl Default for CommitMessages {
    fn default() -> Self {
        Self {
            success: "Moved \"{name}\"".to_string(),
            failure: "Failed to move node".to_string(),
        }
    }
}

impl CommitMessages {
    /// Render the success text for `node`.
    #[must_use]
    pub fn success_text(&self, node: &TreeNode) -> String {
        self.success.replace(NAME_PLACEHOLDER, &node.name)
    }

    /// Render the failure text, appending the server message when present.
    #[must_use]
    pub fn failure_text(&self, server_message: Option<&str>) -> String {
        match server_message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => format!("{}: {message}", self.failure),
            None => self.failure.clone(),
        }
    }
}

/// Result of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub success: bool,
    /// The text that was sent to the notification sink.
    pub message: String,
    pub node_id: NodeId,
    /// Parent before the optimistic apply; what the store reverts to.
    pub previous_parent_id: Option<NodeId>,
    pub new_parent_id: Option<NodeId>,
}

/// Executes reparents against the backend with optimistic local updates.
#[derive(Clone)]
pub struct MoveCommitCoordinator {
    api: Arc<dyn MoveNodeApi>,
    notifier: Arc<dyn NotificationSink>,
    store: Arc<dyn OptimisticStoreMutator>,
    messages: CommitMessages,
}

impl fmt::Debug for MoveCommitCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveCommitCoordinator")
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

impl MoveCommitCoordinator {
    /// Create a coordinator with default notification texts.
    #[must_use]
    pub fn new(
        api: Arc<dyn MoveNodeApi>,
        notifier: Arc<dyn NotificationSink>,
        store: Arc<dyn OptimisticStoreMutator>,
    ) -> Self {
        Self {
            api,
            notifier,
            store,
            messages: CommitMessages::default(),
        }
    }

    /// Replace the notification texts.
    #[must_use]
    pub fn with_messages(mut self, messages: CommitMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Current notification texts.
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &CommitMessages {
        &self.messages
    }

    /// Move `candidate` under `new_parent_id` (`None` makes it a root).
    pub async fn commit(&self, candidate: &TreeNode, new_parent_id: Option<&NodeId>) -> MoveOutcome {
        let span = tracing::debug_span!(
            target: "trellis.commit",
            "move.commit",
            node_id = %candidate.id,
            new_parent = ?new_parent_id.map(NodeId::as_str),
        );
        self.commit_inner(candidate, new_parent_id)
            .instrument(span)
            .await
    }

    async fn commit_inner(&self, candidate: &TreeNode, new_parent_id: Option<&NodeId>) -> MoveOutcome {
        self.store.apply_parent(&candidate.id, new_parent_id);

        let failure_detail = match self.api.move_node(&candidate.id, new_parent_id).await {
            Ok(response) if response.success => None,
            Ok(response) => Some(response.message),
            Err(err) => {
                tracing::debug!(target: "trellis.commit", error = %err, "move request errored");
                Some(err.server_message().map(str::to_owned))
            }
        };

        let outcome = |success: bool, message: String| MoveOutcome {
            success,
            message,
            node_id: candidate.id.clone(),
            previous_parent_id: candidate.parent_id.clone(),
            new_parent_id: new_parent_id.cloned(),
        };

        match failure_detail {
            None => {
                let text = self.messages.success_text(candidate);
                tracing::info!(target: "trellis.commit", node_id = %candidate.id, "move committed");
                self.notifier.show_success(&text);
                outcome(true, text)
            }
            Some(server_message) => {
                let text = self.messages.failure_text(server_message.as_deref());
                tracing::warn!(
                    target: "trellis.commit",
                    node_id = %candidate.id,
                    server_message = server_message.as_deref().unwrap_or(""),
                    "move failed"
                );
                self.notifier.show_error(&text);
                outcome(false, text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::executor::block_on;

    use super::*;
    use crate::ports::{MoveApiError, MoveResponse};

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        replies: Mutex<VecDeque<Result<MoveResponse, MoveApiError>>>,
    }

    impl Recorder {
        fn replying(reply: Result<MoveResponse, MoveApiError>) -> Arc<Self> {
            let recorder = Self::default();
            recorder.replies.lock().unwrap().push_back(reply);
            Arc::new(recorder)
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl MoveNodeApi for Recorder {
        async fn move_node(
            &self,
            node_id: &NodeId,
            new_parent_id: Option<&NodeId>,
        ) -> Result<MoveResponse, MoveApiError> {
            self.push(format!("api {node_id} -> {new_parent_id:?}"));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(MoveResponse::ok()))
        }
    }

    impl NotificationSink for Recorder {
        fn show_success(&self, text: &str) {
            self.push(format!("success {text}"));
        }
        fn show_error(&self, text: &str) {
            self.push(format!("error {text}"));
        }
    }

    impl OptimisticStoreMutator for Recorder {
        fn apply_parent(&self, node_id: &NodeId, new_parent_id: Option<&NodeId>) {
            self.push(format!("apply {node_id} -> {new_parent_id:?}"));
        }
        fn revert_parent(&self, node_id: &NodeId, previous_parent_id: Option<&NodeId>) {
            self.push(format!("revert {node_id} -> {previous_parent_id:?}"));
        }
    }

    fn coordinator(recorder: &Arc<Recorder>) -> MoveCommitCoordinator {
        MoveCommitCoordinator::new(recorder.clone(), recorder.clone(), recorder.clone())
    }

    fn floor() -> TreeNode {
        TreeNode::new("f1", "Floor 1").with_parent("b1")
    }

    #[test]
    fn success_applies_then_calls_api_then_notifies() {
        let rec = Recorder::replying(Ok(MoveResponse::ok()));
        let target = NodeId::new("b2");
        let outcome = block_on(coordinator(&rec).commit(&floor(), Some(&target)));

        assert!(outcome.success);
        assert_eq!(outcome.message, "Moved \"Floor 1\"");
        assert_eq!(outcome.previous_parent_id, Some(NodeId::new("b1")));
        assert_eq!(outcome.new_parent_id, Some(target));
        assert_eq!(
            rec.log(),
            [
                "apply f1 -> Some(NodeId(\"b2\"))",
                "api f1 -> Some(NodeId(\"b2\"))",
                "success Moved \"Floor 1\"",
            ]
        );
    }

    #[test]
    fn resolved_failure_uses_server_message() {
        let rec = Recorder::replying(Ok(MoveResponse::failed("locked")));
        let outcome = block_on(coordinator(&rec).commit(&floor(), Some(&NodeId::new("b2"))));
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to move node: locked");
        assert_eq!(rec.log().last().map(String::as_str), Some("error Failed to move node: locked"));
    }

    #[test]
    fn rejected_call_handled_like_resolved_failure() {
        let rec = Recorder::replying(Err(MoveApiError::Rejected("locked".into())));
        let outcome = block_on(coordinator(&rec).commit(&floor(), Some(&NodeId::new("b2"))));
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to move node: locked");
    }

    #[test]
    fn transport_failure_uses_generic_message() {
        let rec = Recorder::replying(Err(MoveApiError::Transport("offline".into())));
        let outcome = block_on(coordinator(&rec).commit(&floor(), Some(&NodeId::new("b2"))));
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to move node");
    }

    #[test]
    fn blank_server_message_uses_generic_message() {
        let rec = Recorder::replying(Ok(MoveResponse {
            success: false,
            message: Some("   ".into()),
        }));
        let outcome = block_on(coordinator(&rec).commit(&floor(), Some(&NodeId::new("b2"))));
        assert_eq!(outcome.message, "Failed to move node");
    }

    #[test]
    fn optimistic_apply_happens_even_on_failure_and_revert_is_left_to_store() {
        let rec = Recorder::replying(Err(MoveApiError::Http {
            status: 500,
            message: None,
        }));
        block_on(coordinator(&rec).commit(&floor(), Some(&NodeId::new("b2"))));
        let log = rec.log();
        assert!(log[0].starts_with("apply f1"));
        assert!(log.iter().all(|entry| !entry.starts_with("revert")));
    }

    #[test]
    fn root_move_passes_none() {
        let rec = Recorder::replying(Ok(MoveResponse::ok()));
        let outcome = block_on(coordinator(&rec).commit(&floor(), None));
        assert!(outcome.success);
        assert_eq!(outcome.new_parent_id, None);
        assert_eq!(rec.log()[1], "api f1 -> None");
    }

    #[test]
    fn custom_messages() {
        let rec = Recorder::replying(Ok(MoveResponse::ok()));
        let coordinator = coordinator(&rec).with_messages(CommitMessages {
            success: "{name} verschoben".into(),
            failure: "Verschieben fehlgeschlagen".into(),
        });
        let outcome = block_on(coordinator.commit(&floor(), Some(&NodeId::new("b2"))));
        assert_eq!(outcome.message, "Floor 1 verschoben");
        assert_eq!(
            coordinator.messages().failure_text(Some("gesperrt")),
            "Verschieben fehlgeschlagen: gesperrt"
        );
    }
}
