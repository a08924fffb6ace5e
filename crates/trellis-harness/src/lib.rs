#![forbid(unsafe_code)]

//! Test support for Trellis.
//!
//! - [`fakes`]: recording implementations of the collaborator traits
//! - [`fixtures`]: the canonical scenario tree and a [`Harness`] that wires
//!   every fake into a [`DragSession`](trellis_dnd::DragSession)
//! - [`storm`]: deterministic hover/leave bursts

pub mod fakes;
pub mod fixtures;
pub mod storm;

pub use fakes::{
    MoveCall, Notification, RecordingNotifier, RecordingStore, ScriptedMoveApi, SharedSnapshot,
    StoreCall,
};
pub use fixtures::{Harness, scenario_tree};
pub use storm::{HoverStorm, HoverStormConfig, StormPattern, generate_storm, replay};
