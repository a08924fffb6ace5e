#![forbid(unsafe_code)]

//! Trellis drag and drop
//!
//! This crate turns pointer callbacks into validated, committed node moves.
//!
//! # Key Components
//!
//! - [`DragSession`] - State machine for the single active drag
//! - [`EventCoalescer`] - Cancelable hover/leave timers driven by `now`
//! - [`MoveCommitCoordinator`] - Optimistic apply, backend call, notification
//! - [`DragConfig`] - Every tunable in one place, loadable from TOML/JSON
//! - [`DerivedHints`] - Per-element styling flags for the rendering layer
//!
//! # Role in Trellis
//! `trellis-dnd` is the time- and I/O-facing half of the reparenting engine.
//! It asks `trellis-core` whether a move is allowed and reaches the outside
//! world only through the traits in [`ports`].
//!
//! # How it fits in the system
//! ```text
//! pointer down ─▶ DragSession::begin_drag
//! pointer over ─▶ DragSession::hover ─▶ EventCoalescer ─(tick)─▶ DropValidator
//! pointer up   ─▶ DragSession::drop_on ─▶ MoveCommitCoordinator ─▶ MoveNodeApi
//! ```

pub mod config;
pub mod drag_session;
pub mod event_coalescer;
pub mod hints;
pub mod logging;
pub mod move_commit;
pub mod ports;

pub use config::{ConfigError, DragConfig};
pub use drag_session::{
    BeginDragError, DragEvent, DragPhase, DragSession, DragSessionState, DropOutcome,
};
pub use event_coalescer::{CoalescedTick, CoalescerConfig, EventCoalescer};
pub use hints::DerivedHints;
pub use move_commit::{CommitMessages, MoveCommitCoordinator, MoveOutcome};
pub use ports::{
    Collaborators, MoveApiError, MoveNodeApi, MoveResponse, NotificationSink,
    OptimisticStoreMutator, TreeSnapshotProvider,
};

pub use trellis_core::{
    Column, CyclePolicy, DropTarget, NodeId, RejectReason, TargetKey, TreeNode, TreeSnapshot,
    Validity, ValidatorConfig,
};
pub use web_time::{Duration, Instant};
