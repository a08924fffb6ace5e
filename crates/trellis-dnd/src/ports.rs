#![forbid(unsafe_code)]

//! Collaborator interfaces consumed by the reparenting engine.
//!
//! Everything outside the engine (tree store, backend, toast layer) is
//! reached through these traits. They are object-safe and held as
//! `Arc<dyn ...>`, so a host can hand in whatever it already owns.
//!
//! | Trait | Owner | Called |
//! |-------|-------|--------|
//! | [`TreeSnapshotProvider`] | tree store | once per validator evaluation |
//! | [`MoveNodeApi`] | backend client | once per accepted drop |
//! | [`NotificationSink`] | toast layer | after each commit, fire-and-forget |
//! | [`OptimisticStoreMutator`] | tree store | before each move request |

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use trellis_core::{NodeId, TreeSnapshot};

/// Supplies the current tree snapshot.
///
/// Never cached by the engine: every hover and drop evaluation asks again.
pub trait TreeSnapshotProvider: Send + Sync {
    fn snapshot(&self) -> TreeSnapshot;
}

impl<F> TreeSnapshotProvider for F
where
    F: Fn() -> TreeSnapshot + Send + Sync,
{
    fn snapshot(&self) -> TreeSnapshot {
        self()
    }
}

/// Backend acknowledgement of a move request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveResponse {
    pub success: bool,
    /// Server-provided detail, typically set on failure.
    pub message: Option<String>,
}

impl MoveResponse {
    /// A successful response without detail.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A resolved failure carrying a server message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// A move request that did not resolve to a [`MoveResponse`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoveApiError {
    /// The request never reached the backend (network down, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Http { status: u16, message: Option<String> },

    /// The backend rejected the move with an explanation.
    #[error("move rejected: {0}")]
    Rejected(String),
}

impl MoveApiError {
    /// Message that came from the server, if any.
    ///
    /// Transport failures never carry one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Transport(_) => None,
            Self::Http { message, .. } => message.as_deref(),
            Self::Rejected(message) => Some(message),
        }
    }
}

/// Performs the authoritative reparent on the backend.
///
/// `new_parent_id` is `None` when the node becomes a root.
#[async_trait]
pub trait MoveNodeApi: Send + Sync {
    async fn move_node(
        &self,
        node_id: &NodeId,
        new_parent_id: Option<&NodeId>,
    ) -> Result<MoveResponse, MoveApiError>;
}

/// Fire-and-forget user feedback.
pub trait NotificationSink: Send + Sync {
    fn show_success(&self, text: &str);
    fn show_error(&self, text: &str);
}

/// Local parent edits owned by the tree store.
///
/// The engine calls [`apply_parent`](Self::apply_parent) before the move
/// request. It never calls [`revert_parent`](Self::revert_parent) itself: the
/// store reverts when it observes a failed [`MoveOutcome`](crate::move_commit::MoveOutcome)
/// or re-applies from a fresh fetch.
pub trait OptimisticStoreMutator: Send + Sync {
    fn apply_parent(&self, node_id: &NodeId, new_parent_id: Option<&NodeId>);
    fn revert_parent(&self, node_id: &NodeId, previous_parent_id: Option<&NodeId>);
}

/// Bundle of collaborators injected into a [`DragSession`](crate::drag_session::DragSession).
#[derive(Clone)]
pub struct Collaborators {
    pub snapshots: Arc<dyn TreeSnapshotProvider>,
    pub api: Arc<dyn MoveNodeApi>,
    pub notifier: Arc<dyn NotificationSink>,
    pub store: Arc<dyn OptimisticStoreMutator>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
