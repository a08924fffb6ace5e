#![forbid(unsafe_code)]

//! Hover storm generator for stress-testing the coalescing path.
//!
//! Produces deterministic sequences of timed hover/leave callbacks, the kind
//! a browser fires while the pointer crosses nested elements, and replays
//! them against a [`DragSession`].
//!
//! | Pattern | Description |
//! |---------|-------------|
//! | [`StormPattern::Dwell`] | Many hovers over one target within a few frames |
//! | [`StormPattern::Flicker`] | Hover/leave pairs over one target (sub-element crossings) |
//! | [`StormPattern::Sweep`] | Random walk across a list of targets |

use trellis_core::DropTarget;
use trellis_dnd::{DragEvent, DragSession};
use web_time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StormPattern {
    Dwell { count: usize },
    Flicker { count: usize },
    Sweep { count: usize },
}

impl StormPattern {
    /// Pattern name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dwell { .. } => "dwell",
            Self::Flicker { .. } => "flicker",
            Self::Sweep { .. } => "sweep",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HoverStormConfig {
    pub pattern: StormPattern,
    /// Targets to hover; `Dwell` and `Flicker` use the first one.
    pub targets: Vec<DropTarget>,
    /// Gap between consecutive callbacks.
    pub spacing: Duration,
    pub seed: u64,
}

impl HoverStormConfig {
    pub fn new(pattern: StormPattern, targets: Vec<DropTarget>, seed: u64) -> Self {
        Self {
            pattern,
            targets,
            spacing: Duration::from_millis(2),
            seed,
        }
    }

    #[must_use]
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }
}

// ============================================================================
// Generation
// ============================================================================

/// One pointer callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverAction {
    Hover(DropTarget),
    Leave,
}

/// A callback and when it happens, relative to the storm start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverStep {
    pub offset: Duration,
    pub action: HoverAction,
}

#[derive(Debug, Clone)]
pub struct HoverStorm {
    pub steps: Vec<HoverStep>,
    pub pattern_name: &'static str,
    pub seed: u64,
}

impl HoverStorm {
    /// Offset of the last callback.
    pub fn duration(&self) -> Duration {
        self.steps.last().map_or(Duration::ZERO, |s| s.offset)
    }

    /// Number of hover callbacks.
    pub fn hover_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.action, HoverAction::Hover(_)))
            .count()
    }
}

/// xorshift64, enough for reproducible target choices.
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next() % bound as u64) as usize
    }
}

/// Generate a deterministic storm. Empty when `targets` is empty.
pub fn generate_storm(config: &HoverStormConfig) -> HoverStorm {
    let mut rng = Rng::new(config.seed);
    let actions: Vec<HoverAction> = match (&config.pattern, config.targets.first()) {
        (_, None) => Vec::new(),
        (StormPattern::Dwell { count }, Some(first)) => {
            (0..*count).map(|_| HoverAction::Hover(first.clone())).collect()
        }
        (StormPattern::Flicker { count }, Some(first)) => (0..*count)
            .map(|i| {
                if i % 2 == 0 {
                    HoverAction::Hover(first.clone())
                } else {
                    HoverAction::Leave
                }
            })
            .collect(),
        (StormPattern::Sweep { count }, Some(_)) => (0..*count)
            .map(|_| HoverAction::Hover(config.targets[rng.below(config.targets.len())].clone()))
            .collect(),
    };

    let steps = actions
        .into_iter()
        .enumerate()
        .map(|(i, action)| HoverStep {
            offset: config.spacing * u32::try_from(i).unwrap_or(u32::MAX),
            action,
        })
        .collect::<Vec<_>>();

    tracing::trace!(
        target: "trellis.harness",
        pattern = config.pattern.name(),
        seed = config.seed,
        steps = steps.len(),
        "hover storm generated"
    );

    HoverStorm {
        steps,
        pattern_name: config.pattern.name(),
        seed: config.seed,
    }
}

/// Feed `storm` into `session` starting at `start`, ticking after every
/// callback, then tick once more at `settle` past the last callback.
///
/// Returns every event the session emitted.
pub fn replay(
    session: &mut DragSession,
    storm: &HoverStorm,
    start: Instant,
    settle: Duration,
) -> Vec<DragEvent> {
    let mut events = Vec::new();
    for step in &storm.steps {
        let now = start + step.offset;
        match &step.action {
            HoverAction::Hover(target) => session.hover(target.clone(), now),
            HoverAction::Leave => session.leave(now),
        }
        events.extend(session.tick(now));
    }
    events.extend(session.tick(start + storm.duration() + settle));
    events
}
