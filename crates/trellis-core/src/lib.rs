#![forbid(unsafe_code)]

//! Core: tree model, ancestry index, and drop validation.
//!
//! # Role in Trellis
//! `trellis-core` is the pure decision layer of the reparenting engine. It
//! owns the borrowed view of the hierarchy ([`TreeSnapshot`]), the ancestry
//! queries over it ([`TreeIndex`]), and the single source of truth for
//! "may node A be moved under target T" ([`DropValidator`]).
//!
//! # Primary responsibilities
//! - **Model**: nodes, columns, snapshots, and drop targets.
//! - **TreeIndex**: bounded parent-chain walks that terminate on corrupted data.
//! - **DropValidator**: ordered rule evaluation with structured reasons.
//!
//! # How it fits in the system
//! `trellis-dnd` drives drag sessions, throttles pointer input, and commits
//! moves. It calls into this crate for every hover and drop decision. Nothing
//! here performs I/O or reads the clock, so every decision is reproducible
//! from its inputs alone.

pub mod drop_validator;
pub mod model;
pub mod tree_index;

pub use drop_validator::{CyclePolicy, DropValidator, RejectReason, Validity, ValidatorConfig};
pub use model::{Column, DropTarget, NodeId, TargetKey, TargetKind, TreeNode, TreeSnapshot};
pub use tree_index::{Ancestry, DEFAULT_MAX_ANCESTOR_HOPS, TreeIndex};
