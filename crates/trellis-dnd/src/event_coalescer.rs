#![forbid(unsafe_code)]

//! Hover/leave coalescing for high-frequency drag callbacks.
//!
//! Pointer movement during a drag produces a flood of hover and leave
//! notifications, often several per frame as the pointer crosses nested
//! elements. Validating each one would recompute ancestry for every pixel of
//! movement and make target highlighting flicker.
//!
//! [`EventCoalescer`] turns that stream into bounded-rate, cancelable ticks:
//! - **Hover**: the first hover arms a timer (default 50ms). Further hovers
//!   while it is pending do not re-arm it; they only replace the pending
//!   target, so the last hovered target is the one delivered.
//! - **Leave**: arms a delayed clear (default 100ms). Any hover that arrives
//!   before it fires cancels it, so crossing a sub-element boundary inside
//!   the same logical target does not flash the highlight off and on.
//!   The coalescer does not know target containment, so a hover over an
//!   unrelated target cancels the leave too. That is harmless: the new
//!   hover's tick replaces the hovered target, which the leave would only
//!   have cleared.
//!
//! # Design
//!
//! Timers are deadlines, not callbacks. The caller passes `now` into every
//! call and drives delivery with [`poll`](EventCoalescer::poll). Each timer
//! slot is an `Option` that is taken before its tick is returned, so a tick
//! can fire at most once and [`cancel_all`](EventCoalescer::cancel_all)
//! leaves nothing behind to fire into a dead session.
//!
//! # Usage
//!
//! ```
//! use trellis_dnd::event_coalescer::{CoalescedTick, CoalescerConfig, EventCoalescer};
//! use web_time::{Duration, Instant};
//!
//! let mut coalescer = EventCoalescer::new(CoalescerConfig::default());
//! let t0 = Instant::now();
//!
//! assert!(coalescer.on_hover("a", t0)); // arms the timer
//! assert!(!coalescer.on_hover("b", t0 + Duration::from_millis(10))); // coalesced
//!
//! assert!(coalescer.poll(t0 + Duration::from_millis(20)).is_empty());
//! let ticks = coalescer.poll(t0 + Duration::from_millis(50));
//! assert_eq!(ticks, vec![CoalescedTick::Hover("b")]);
//! ```

use web_time::{Duration, Instant};

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default delay between the first hover and its delivery.
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_millis(50);

/// Default delay between a leave and the hover clear.
pub const DEFAULT_LEAVE_DELAY: Duration = Duration::from_millis(100);

/// Coalescing delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CoalescerConfig {
    /// Hover delivery delay (default: 50ms).
    #[cfg_attr(
        feature = "config",
        serde(rename = "hover_delay_ms", with = "crate::config::duration_ms")
    )]
    pub hover_delay: Duration,
    /// Leave-clear delay (default: 100ms).
    #[cfg_attr(
        feature = "config",
        serde(rename = "leave_delay_ms", with = "crate::config::duration_ms")
    )]
    pub leave_delay: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            hover_delay: DEFAULT_HOVER_DELAY,
            leave_delay: DEFAULT_LEAVE_DELAY,
        }
    }
}

/// A coalesced notification that is due for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoalescedTick<T> {
    /// Evaluate this hover target.
    Hover(T),
    /// Clear the current hover target.
    Leave,
}

#[derive(Debug, Clone)]
struct PendingHover<T> {
    target: T,
    deadline: Instant,
}

/// Rate limiter for hover/leave streams.
///
/// # Thread Safety
///
/// `EventCoalescer` is not thread-safe. It belongs to the single event loop
/// that owns the drag session.
///
/// # Performance
///
/// All operations are O(1). At most one hover and one leave are pending.
#[derive(Debug, Clone)]
pub struct EventCoalescer<T> {
    config: CoalescerConfig,
    pending_hover: Option<PendingHover<T>>,
    pending_leave: Option<Instant>,
}

impl<T> EventCoalescer<T> {
    /// Create a coalescer with the given delays.
    #[must_use]
    pub fn new(config: CoalescerConfig) -> Self {
        Self {
            config,
            pending_hover: None,
            pending_leave: None,
        }
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    /// Record a hover over `target`.
    ///
    /// Returns `true` if this call armed a new hover timer, `false` if it was
    /// folded into one already pending. Either way any pending leave is
    /// cancelled.
    pub fn on_hover(&mut self, target: T, now: Instant) -> bool {
        self.pending_leave = None;
        if let Some(pending) = self.pending_hover.as_mut() {
            // Latest target wins; the deadline stays put.
            pending.target = target;
            return false;
        }
        self.pending_hover = Some(PendingHover {
            target,
            deadline: now + self.config.hover_delay,
        });
        true
    }

    /// Record that the pointer left the current target.
    ///
    /// Re-arms the clear timer from `now` if one is already pending.
    pub fn on_leave(&mut self, now: Instant) {
        self.pending_leave = Some(now + self.config.leave_delay);
    }

    /// Take every timer whose deadline is at or before `now`.
    ///
    /// Ticks are ordered by deadline; on a tie the hover comes first.
    pub fn poll(&mut self, now: Instant) -> Vec<CoalescedTick<T>> {
        let mut due: Vec<(Instant, CoalescedTick<T>)> = Vec::with_capacity(2);

        if let Some(pending) = self
            .pending_hover
            .take_if(|pending| pending.deadline <= now)
        {
            due.push((pending.deadline, CoalescedTick::Hover(pending.target)));
        }

        if let Some(deadline) = self.pending_leave
            && deadline <= now
        {
            self.pending_leave = None;
            due.push((deadline, CoalescedTick::Leave));
        }

        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, tick)| tick).collect()
    }

    /// Drop every pending timer without delivering it.
    pub fn cancel_all(&mut self) {
        self.pending_hover = None;
        self.pending_leave = None;
    }

    /// Whether any timer is pending.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_hover.is_some() || self.pending_leave.is_some()
    }

    /// Earliest pending deadline, for scheduling the next [`poll`](Self::poll).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let hover = self.pending_hover.as_ref().map(|pending| pending.deadline);
        match (hover, self.pending_leave) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Target that the pending hover timer will deliver.
    #[must_use]
    pub fn pending_target(&self) -> Option<&T> {
        self.pending_hover.as_ref().map(|pending| &pending.target)
    }
}

impl<T> Default for EventCoalescer<T> {
    fn default() -> Self {
        Self::new(CoalescerConfig::default())
    }
}
