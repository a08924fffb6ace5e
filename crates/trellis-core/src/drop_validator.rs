#![forbid(unsafe_code)]

//! Drop validation: may the dragged node be reparented under this target?
//!
//! [`DropValidator::evaluate`] is the single source of truth for every hover
//! and drop decision. It is pure and synchronous: the same candidate, target,
//! and snapshot always produce the same [`Validity`].
//!
//! # Rules
//!
//! Evaluated in order; the first failing rule decides the reason.
//!
//! | # | Rule | Reason |
//! |---|------|--------|
//! | 1 | a candidate exists and is persisted | [`RejectReason::NoCandidate`], [`RejectReason::UnsavedNode`] |
//! | 2 | node target is not the candidate itself | [`RejectReason::SelfDrop`] |
//! | 3 | column target is not the candidate's current lane | [`RejectReason::SameColumn`] |
//! | 4 | resolve the proposed parent | |
//! | 5 | proposed parent differs from the current parent | [`RejectReason::NoOp`] |
//! | 6 | node target is not a descendant of the candidate | [`RejectReason::Cycle`], [`RejectReason::AncestryUnresolved`] |
//!
//! Dropping onto a sibling (a different node with the same parent) is
//! allowed. Column targets skip rule 6: a column's parent is already part of
//! the snapshot and its relation to the candidate is fully decided by rule 3.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::{DropTarget, NodeId, TreeNode, TreeSnapshot};
use crate::tree_index::{Ancestry, DEFAULT_MAX_ANCESTOR_HOPS, TreeIndex};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the descendant walk cannot resolve (hop cap or cycle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CyclePolicy {
    /// Allow the move unless another rule rejects it.
    #[default]
    FailOpen,
    /// Reject the move with [`RejectReason::AncestryUnresolved`].
    FailClosed,
}

/// Tunables for [`DropValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidatorConfig {
    /// Hop cap for the descendant walk (default: 20).
    pub max_ancestor_hops: usize,
    /// Behavior on unresolved ancestry (default: fail-open).
    pub cycle_policy: CyclePolicy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_ancestor_hops: DEFAULT_MAX_ANCESTOR_HOPS,
            cycle_policy: CyclePolicy::FailOpen,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why a drop target was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// No node is being dragged.
    NoCandidate,
    /// The dragged node has not been saved yet.
    UnsavedNode,
    /// The target is the dragged node.
    SelfDrop,
    /// The target column is the node's current lane.
    SameColumn,
    /// The target would leave the parent unchanged.
    NoOp,
    /// The target is a descendant of the dragged node.
    Cycle,
    /// Ancestry could not be resolved and the policy is fail-closed.
    AncestryUnresolved,
    /// A previous drop is still being committed. Never produced by the
    /// validator; the drag session reports it.
    CommitInFlight,
}

impl RejectReason {
    /// Short machine-friendly code for logs and telemetry.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoCandidate => "no_candidate",
            Self::UnsavedNode => "unsaved_node",
            Self::SelfDrop => "self_drop",
            Self::SameColumn => "same_column",
            Self::NoOp => "no_op",
            Self::Cycle => "cycle",
            Self::AncestryUnresolved => "ancestry_unresolved",
            Self::CommitInFlight => "commit_in_flight",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoCandidate => "no node is being dragged",
            Self::UnsavedNode => "unsaved node",
            Self::SelfDrop => "cannot drop a node onto itself",
            Self::SameColumn => "node is already in this column",
            Self::NoOp => "node already has this parent",
            Self::Cycle => "cannot move a node into its own descendant",
            Self::AncestryUnresolved => "ancestry could not be verified",
            Self::CommitInFlight => "a previous move is still being committed",
        };
        f.write_str(text)
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(RejectReason),
}

impl Validity {
    /// Whether the target accepts the candidate.
    #[inline]
    #[must_use]
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Rejection reason, if any.
    #[inline]
    #[must_use]
    pub fn reason(self) -> Option<RejectReason> {
        match self {
            Self::Valid => None,
            Self::Invalid(reason) => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// DropValidator
// ---------------------------------------------------------------------------

/// Stateless rule evaluator.
#[derive(Debug, Clone, Default)]
pub struct DropValidator {
    config: ValidatorConfig,
}

impl DropValidator {
    /// Create a validator with the given configuration.
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Parent the candidate would receive if dropped on `target` (rule 4).
    #[inline]
    #[must_use]
    pub fn resolve_new_parent(target: &DropTarget) -> Option<&NodeId> {
        target.proposed_parent()
    }

    /// Classify `target` for `candidate` against `snapshot`.
    #[must_use]
    pub fn evaluate(
        &self,
        candidate: Option<&TreeNode>,
        target: &DropTarget,
        snapshot: &TreeSnapshot,
    ) -> Validity {
        let validity = self.check(candidate, target, snapshot);
        if let Validity::Invalid(reason) = validity {
            tracing::debug!(
                target: "trellis.validator",
                candidate = ?candidate.map(|c| c.id.as_str()),
                drop_target = %target.key(),
                revision = snapshot.revision,
                reason = reason.code(),
                "drop target rejected"
            );
        }
        validity
    }

    fn check(
        &self,
        candidate: Option<&TreeNode>,
        target: &DropTarget,
        snapshot: &TreeSnapshot,
    ) -> Validity {
        // Rule 1
        let Some(candidate) = candidate else {
            return Validity::Invalid(RejectReason::NoCandidate);
        };
        if !candidate.is_persisted {
            return Validity::Invalid(RejectReason::UnsavedNode);
        }

        // Rules 2 and 3
        match target {
            DropTarget::Node { node } if node.id == candidate.id => {
                return Validity::Invalid(RejectReason::SelfDrop);
            }
            DropTarget::Column { column } if column.parent_id == candidate.parent_id => {
                return Validity::Invalid(RejectReason::SameColumn);
            }
            _ => {}
        }

        // Rules 4 and 5
        let new_parent = Self::resolve_new_parent(target);
        if new_parent == candidate.parent_id.as_ref() {
            return Validity::Invalid(RejectReason::NoOp);
        }

        // Rule 6
        if let DropTarget::Node { node } = target {
            let index = TreeIndex::with_max_hops(snapshot, self.config.max_ancestor_hops);
            match index.ancestry(node.id.as_str(), candidate.id.as_str()) {
                Ancestry::Descendant => return Validity::Invalid(RejectReason::Cycle),
                Ancestry::Unresolved { .. } if self.config.cycle_policy == CyclePolicy::FailClosed => {
                    return Validity::Invalid(RejectReason::AncestryUnresolved);
                }
                Ancestry::Unresolved { hops } => {
                    tracing::warn!(
                        target: "trellis.validator",
                        candidate = %candidate.id,
                        drop_target = %node.id,
                        hops,
                        "ancestry unresolved, allowing move (fail-open)"
                    );
                }
                Ancestry::NotDescendant => {}
            }
        }

        Validity::Valid
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
