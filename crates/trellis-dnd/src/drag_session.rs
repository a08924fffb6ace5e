#![forbid(unsafe_code)]

//! Drag session: the lifecycle of one node drag, from pick-up to drop.
//!
//! [`DragSession`] owns the single active drag. It feeds pointer hovers
//! through an [`EventCoalescer`], classifies hovered targets with a
//! [`DropValidator`], exposes per-element [`DerivedHints`], and hands valid
//! drops to a [`MoveCommitCoordinator`].
//!
//! # State Machine
//!
//! ```text
//! Idle ──begin_drag──▶ Armed ──hover tick──▶ Hovering ──drop_on──▶ Dropping ──▶ Idle
//!                        ▲                       │   (valid)
//!                        └──── leave tick ───────┤
//!                                                └──drop_on (invalid)──▶ Cancelled ──▶ Idle
//! any phase ──cancel──▶ Cancelled ──▶ Idle
//! ```
//!
//! `Cancelled` is transient: every path through it lands in `Idle` before
//! the call returns.
//!
//! # Invariants
//!
//! 1. At most one candidate exists. `begin_drag` during an active drag is
//!    rejected and leaves the existing candidate untouched.
//! 2. Unsaved nodes never become the candidate.
//! 3. `hover_validity` is computed from a snapshot fetched for that
//!    evaluation. A repeated hover over the same target at the same snapshot
//!    revision produces no event; a new revision always re-evaluates.
//!    Hint queries compare the current revision with the stored one and
//!    re-evaluate on mismatch, so a stale validity is never rendered.
//! 4. After `cancel()` or a finished drop no coalescer timer is pending, so
//!    no stale tick can reach a dead session.
//! 5. The commit coordinator is only invoked for targets whose validity is
//!    strictly `Valid` at drop time.
//!
//! # Failure Modes
//!
//! - Every rule violation is returned as data ([`DropOutcome::Rejected`],
//!   [`DragEvent::HoverChanged`]); nothing here panics or returns `Err`
//!   after a drag has begun.
//! - If a `drop_on` future is dropped before it completes, the session stays
//!   in `Dropping`. Further drops are rejected with
//!   [`RejectReason::CommitInFlight`] until [`cancel`](DragSession::cancel).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use trellis_core::{
    Column, DropTarget, DropValidator, NodeId, RejectReason, TargetKey, TreeNode, Validity,
};
use web_time::Instant;

use crate::config::DragConfig;
use crate::event_coalescer::{CoalescedTick, EventCoalescer};
use crate::hints::DerivedHints;
use crate::move_commit::{MoveCommitCoordinator, MoveOutcome};
use crate::ports::{Collaborators, TreeSnapshotProvider};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragPhase {
    /// No candidate.
    Idle,
    /// A candidate is held; no target evaluated yet.
    Armed,
    /// A target has been evaluated.
    Hovering,
    /// A valid drop is being committed.
    Dropping,
    /// Transient: the drag is being torn down.
    Cancelled,
}

/// Snapshot of the session's derived state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragSessionState {
    pub candidate: Option<TreeNode>,
    pub hover_target: Option<DropTarget>,
    pub hover_validity: Option<Validity>,
}

/// Derived-state changes reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    /// A candidate was armed.
    Started { node_id: NodeId },
    /// The hover target or its validity changed.
    HoverChanged {
        target: TargetKey,
        validity: Validity,
    },
    /// The pointer left and no target is hovered.
    HoverCleared,
    /// The drag was abandoned.
    Cancelled,
}

/// Result of [`DragSession::drop_on`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The target was invalid; nothing was sent to the backend.
    Rejected { reason: RejectReason },
    /// The move was sent; the outcome says whether it stuck.
    Committed(MoveOutcome),
}

impl DropOutcome {
    /// Whether the node was moved successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Committed(outcome) if outcome.success)
    }
}

/// Why a drag could not start.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BeginDragError {
    #[error("node {id} is not saved yet and cannot be dragged")]
    UnsavedNode { id: NodeId },

    #[error("a drag of node {active} is already in progress")]
    SessionActive { active: NodeId },

    #[error("a previous move is still being committed")]
    CommitInFlight,
}

// ---------------------------------------------------------------------------
// DragSession
// ---------------------------------------------------------------------------

/// State machine for the single active node drag.
///
/// Call [`hover`](Self::hover) and [`leave`](Self::leave) on every pointer
/// callback, and [`tick`](Self::tick) whenever
/// [`next_deadline`](Self::next_deadline) passes.
pub struct DragSession {
    config: DragConfig,
    phase: DragPhase,
    state: DragSessionState,
    /// Snapshot revision the stored validity was computed against.
    hover_revision: Option<u64>,
    validator: DropValidator,
    coalescer: EventCoalescer<DropTarget>,
    snapshots: Arc<dyn TreeSnapshotProvider>,
    committer: MoveCommitCoordinator,
    evaluations: u64,
}

impl fmt::Debug for DragSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragSession")
            .field("phase", &self.phase)
            .field(
                "candidate",
                &self.state.candidate.as_ref().map(|c| c.id.as_str()),
            )
            .field("hover_target", &self.state.hover_target.as_ref().map(DropTarget::key))
            .field("hover_validity", &self.state.hover_validity)
            .finish_non_exhaustive()
    }
}

impl DragSession {
    /// Create an idle session.
    #[must_use]
    pub fn new(config: DragConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            snapshots,
            api,
            notifier,
            store,
        } = collaborators;
        let committer =
            MoveCommitCoordinator::new(api, notifier, store).with_messages(config.messages.clone());
        Self {
            validator: DropValidator::new(config.validator.clone()),
            coalescer: EventCoalescer::new(config.coalescer),
            config,
            phase: DragPhase::Idle,
            state: DragSessionState::default(),
            hover_revision: None,
            snapshots,
            committer,
            evaluations: 0,
        }
    }

    /// Pick up `node`.
    ///
    /// On `Err` no session state changes, so the host can block the native
    /// drag gesture.
    pub fn begin_drag(&mut self, node: &TreeNode) -> Result<DragEvent, BeginDragError> {
        if self.phase == DragPhase::Dropping {
            return Err(BeginDragError::CommitInFlight);
        }
        if let Some(active) = &self.state.candidate {
            tracing::warn!(
                target: "trellis.drag",
                active = %active.id,
                requested = %node.id,
                "begin_drag while a drag is active"
            );
            return Err(BeginDragError::SessionActive {
                active: active.id.clone(),
            });
        }
        if !node.is_persisted {
            tracing::debug!(target: "trellis.drag", node_id = %node.id, "refusing to drag unsaved node");
            return Err(BeginDragError::UnsavedNode {
                id: node.id.clone(),
            });
        }

        self.coalescer.cancel_all();
        self.state = DragSessionState {
            candidate: Some(node.clone()),
            ..DragSessionState::default()
        };
        self.hover_revision = None;
        self.phase = DragPhase::Armed;
        tracing::debug!(target: "trellis.drag", node_id = %node.id, "drag armed");
        Ok(DragEvent::Started {
            node_id: node.id.clone(),
        })
    }

    /// Report the pointer over `target`. Evaluation happens on a later tick.
    pub fn hover(&mut self, target: DropTarget, now: Instant) {
        if !self.is_dragging() {
            return;
        }
        self.coalescer.on_hover(target, now);
    }

    /// Report the pointer leaving the current target.
    pub fn leave(&mut self, now: Instant) {
        if !self.is_dragging() {
            return;
        }
        self.coalescer.on_leave(now);
    }

    /// Deliver every coalesced hover/leave that is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<DragEvent> {
        let mut out = Vec::new();
        for tick in self.coalescer.poll(now) {
            match tick {
                CoalescedTick::Hover(target) => self.apply_hover(target, &mut out),
                CoalescedTick::Leave => self.clear_hover(&mut out),
            }
        }
        out
    }

    /// Re-evaluate the hovered target after the store published a new snapshot.
    ///
    /// Emits `HoverChanged` only when the validity actually changed.
    pub fn refresh(&mut self) -> Vec<DragEvent> {
        let mut out = Vec::new();
        if self.phase != DragPhase::Hovering {
            return out;
        }
        let Some(target) = self.state.hover_target.clone() else {
            return out;
        };

        let snapshot = self.snapshots.snapshot();
        if self.hover_revision == Some(snapshot.revision) {
            return out;
        }
        let validity = self.evaluate(&target, &snapshot);
        let previous = self.state.hover_validity.replace(validity);
        self.hover_revision = Some(snapshot.revision);
        if previous != Some(validity) {
            tracing::debug!(
                target: "trellis.drag",
                drop_target = %target.key(),
                revision = snapshot.revision,
                valid = validity.is_valid(),
                "hover revalidated"
            );
            out.push(DragEvent::HoverChanged {
                target: target.key(),
                validity,
            });
        }
        out
    }

    /// Drop the candidate on `target`.
    ///
    /// The target is evaluated against a fresh snapshot. Invalid targets end
    /// the drag without contacting the backend; valid ones are committed and
    /// the session returns to `Idle` once the commit resolves.
    ///
    /// While a previous commit is still pending the drop is rejected with
    /// [`RejectReason::CommitInFlight`] and nothing else changes.
    pub async fn drop_on(&mut self, target: DropTarget) -> DropOutcome {
        if self.phase == DragPhase::Dropping {
            tracing::warn!(
                target: "trellis.drag",
                drop_target = %target.key(),
                "drop while a commit is in flight"
            );
            return DropOutcome::Rejected {
                reason: RejectReason::CommitInFlight,
            };
        }
        self.coalescer.cancel_all();

        let Some(candidate) = self.state.candidate.clone() else {
            tracing::debug!(target: "trellis.drag", "drop without an active drag");
            return DropOutcome::Rejected {
                reason: RejectReason::NoCandidate,
            };
        };

        let snapshot = self.snapshots.snapshot();
        let validity = self.evaluate(&target, &snapshot);
        let new_parent = DropValidator::resolve_new_parent(&target).cloned();
        self.state.hover_target = Some(target);
        self.state.hover_validity = Some(validity);
        self.hover_revision = Some(snapshot.revision);

        if let Validity::Invalid(reason) = validity {
            self.phase = DragPhase::Cancelled;
            tracing::debug!(
                target: "trellis.drag",
                node_id = %candidate.id,
                reason = reason.code(),
                "drop rejected"
            );
            self.reset();
            return DropOutcome::Rejected { reason };
        }

        self.phase = DragPhase::Dropping;
        tracing::debug!(
            target: "trellis.drag",
            node_id = %candidate.id,
            new_parent = ?new_parent.as_ref().map(NodeId::as_str),
            "drop accepted, committing"
        );
        let outcome = self.committer.commit(&candidate, new_parent.as_ref()).await;
        self.reset();
        DropOutcome::Committed(outcome)
    }

    /// Abandon the drag from any phase (drag-end without drop, Escape, reset).
    ///
    /// Returns `None` if there was nothing to cancel.
    pub fn cancel(&mut self) -> Option<DragEvent> {
        self.coalescer.cancel_all();
        if self.phase == DragPhase::Idle {
            return None;
        }
        self.phase = DragPhase::Cancelled;
        tracing::debug!(
            target: "trellis.drag",
            node_id = ?self.state.candidate.as_ref().map(|c| c.id.as_str()),
            "drag cancelled"
        );
        self.reset();
        Some(DragEvent::Cancelled)
    }

    /// Styling hints for a node element.
    ///
    /// Only the hovered element fetches a snapshot, to check that the stored
    /// validity still matches the current revision.
    #[must_use]
    pub fn derived_hints(&self, node: &TreeNode) -> DerivedHints {
        let is_dragging = self
            .state
            .candidate
            .as_ref()
            .is_some_and(|candidate| candidate.id == node.id);
        DerivedHints {
            is_dragging,
            ..self.hover_hints(&TargetKey::Node(node.id.clone()))
        }
    }

    /// Styling hints for a column lane.
    #[must_use]
    pub fn column_hints(&self, column: &Column) -> DerivedHints {
        self.hover_hints(&TargetKey::Column(column.id.clone()))
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Current derived state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &DragSessionState {
        &self.state
    }

    /// The node being dragged, if any.
    #[inline]
    #[must_use]
    pub fn candidate(&self) -> Option<&TreeNode> {
        self.state.candidate.as_ref()
    }

    /// Whether a drag is armed or hovering (accepting pointer input).
    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Armed | DragPhase::Hovering)
    }

    /// When the host should next call [`tick`](Self::tick).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.coalescer.next_deadline()
    }

    /// Number of validator evaluations performed so far.
    ///
    /// Re-evaluations made by hint queries are not counted.
    #[inline]
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Configuration the session was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DragConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Internal transitions
// ---------------------------------------------------------------------------

impl DragSession {
    fn evaluate(&mut self, target: &DropTarget, snapshot: &trellis_core::TreeSnapshot) -> Validity {
        self.evaluations += 1;
        self.validator
            .evaluate(self.state.candidate.as_ref(), target, snapshot)
    }

    fn apply_hover(&mut self, target: DropTarget, out: &mut Vec<DragEvent>) {
        if !self.is_dragging() {
            return;
        }

        let snapshot = self.snapshots.snapshot();
        let key = target.key();
        let same_target = self
            .state
            .hover_target
            .as_ref()
            .is_some_and(|current| current.key() == key);
        if self.phase == DragPhase::Hovering
            && same_target
            && self.hover_revision == Some(snapshot.revision)
        {
            return;
        }

        let validity = self.evaluate(&target, &snapshot);
        tracing::debug!(
            target: "trellis.drag",
            drop_target = %key,
            revision = snapshot.revision,
            valid = validity.is_valid(),
            "hover evaluated"
        );
        self.state.hover_target = Some(target);
        self.state.hover_validity = Some(validity);
        self.hover_revision = Some(snapshot.revision);
        self.phase = DragPhase::Hovering;
        out.push(DragEvent::HoverChanged {
            target: key,
            validity,
        });
    }

    fn clear_hover(&mut self, out: &mut Vec<DragEvent>) {
        if self.phase != DragPhase::Hovering {
            return;
        }
        self.state.hover_target = None;
        self.state.hover_validity = None;
        self.hover_revision = None;
        self.phase = DragPhase::Armed;
        tracing::debug!(target: "trellis.drag", "hover cleared");
        out.push(DragEvent::HoverCleared);
    }

    fn hover_hints(&self, key: &TargetKey) -> DerivedHints {
        let (Some(target), Some(stored)) = (&self.state.hover_target, self.state.hover_validity)
        else {
            return DerivedHints::NONE;
        };
        if target.key() != *key {
            return DerivedHints::NONE;
        }

        let snapshot = self.snapshots.snapshot();
        let validity = if self.hover_revision == Some(snapshot.revision) {
            stored
        } else {
            self.validator
                .evaluate(self.state.candidate.as_ref(), target, &snapshot)
        };
        DerivedHints::hovered(validity.is_valid())
    }

    fn reset(&mut self) {
        self.coalescer.cancel_all();
        self.state = DragSessionState::default();
        self.hover_revision = None;
        self.phase = DragPhase::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
