//! The Component capability: the measurement primitive plugged into
//! every node of the call-graph.
//!
//! The design allows either a trait over concrete variants or a tagged sum
//! of known components, provided user-defined components are reachable
//! through the same surface without modifying core code. We take the trait
//! route: [`Component`] is a small object-safe trait, stored as
//! `Box<dyn Component>` in each node, with merging done through
//! [`std::any::Any`] downcasting so mismatched component types fail loudly
//! instead of silently corrupting an aggregate.

use std::any::Any;
use std::fmt;

mod composite;
mod counter;
mod cpu;
mod memory;
mod wall;

pub use composite::Composite;
pub use counter::Counter;
pub use cpu::CpuTime;
pub use memory::PeakRss;
pub use wall::WallClock;

/// What a component measures, used by the reporter to pick formatting
/// rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    Timing,
    Memory,
    Percent,
    Other,
}

/// The measurement primitive stored in each [`Node`][crate::graph::Node].
///
/// Implementors hold two internal numbers, `value` (most recent sample) and
/// `accum` (running sum), plus a lap counter and running min/max of
/// `value`. [`Component::start`]/[`Component::stop`] bracket one interval;
/// [`Component::merge`] folds another component of the same concrete type
/// into this one, used both by re-entrant `TREE` scope and by the
/// cross-thread aggregator.
pub trait Component: Any + Send + fmt::Debug {
    /// Captures a baseline for the next interval.
    ///
    /// Calling `start` while already running is a logic error: the prior
    /// baseline is preserved and the call is a no-op other than logging.
    /// Implementations must honor this.
    fn start(&mut self);

    /// Closes the interval opened by the most recent `start`, folding the
    /// elapsed delta into `value`/`accum`/min/max and incrementing `laps`.
    /// A `stop` with no matching `start` is likewise a no-op logic error.
    fn stop(&mut self);

    /// The most recently recorded `value`.
    fn record(&self) -> f64;

    /// Sum of `value` over every completed interval.
    fn accum(&self) -> f64;

    /// Smallest `value` ever recorded, or `0.0` if none yet.
    fn min(&self) -> f64;

    /// Largest `value` ever recorded, or `0.0` if none yet.
    fn max(&self) -> f64;

    /// Number of completed start/stop intervals.
    fn laps(&self) -> u64;

    /// Population standard deviation of `value` across every completed
    /// interval, or `0.0` with fewer than two laps.
    fn stddev(&self) -> f64;

    /// Whether `start` has been called without a matching `stop` yet.
    fn is_running(&self) -> bool;

    /// Display unit, e.g. `"sec"`, `"KB"`.
    fn unit(&self) -> &'static str;

    /// Measurement category, used to pick rendering rules.
    fn category(&self) -> Category;

    /// Folds `other` into `self`: sums `accum` and `laps`, tracks min/max of
    /// `value`. Implementations should downcast `other` and no-op (logging
    /// a mismatch) if the concrete types differ -- merging across
    /// incompatible component kinds is a programming error, not something
    /// the core can resolve on the caller's behalf.
    fn merge(&mut self, other: &dyn Component);

    /// The inverse of [`Component::merge`]: removes a previously-merged (or
    /// otherwise already-accounted-for) `other` from `self`, subtracting
    /// `accum`/`sum_sq` and `laps`. Used to take a differential reading --
    /// e.g. snapshotting a long-running node's component, continuing to
    /// accumulate, then subtracting the snapshot back out to get only the
    /// delta since it was taken. `min`/`max` cannot be un-tracked exactly
    /// once other samples have been folded in, so they are left as `self`'s
    /// current values rather than guessed at. Same downcast/mismatch
    /// handling as `merge`.
    fn minus(&mut self, other: &dyn Component);

    /// Support for [`Component::merge`]/[`Component::minus`]'s downcast.
    fn as_any(&self) -> &dyn Any;

    /// A fresh, zeroed component of the same concrete kind as `self`, used
    /// when the aggregator needs to create a master-tree node that has no
    /// counterpart yet.
    fn zeroed_like(&self) -> Box<dyn Component>;
}

/// Shared bookkeeping used by every built-in component: the running
/// value/accum/min/max/laps plus an optional in-flight baseline.
#[derive(Debug, Clone, Default)]
pub(crate) struct Accumulator {
    pub value: f64,
    pub accum: f64,
    pub min: f64,
    pub max: f64,
    pub laps: u64,
    pub baseline: Option<f64>,
    /// Running sum of `value^2` across completed intervals, kept alongside
    /// `accum` so [`Accumulator::stddev`] can be recomputed from the two
    /// running sums without retaining every individual sample.
    pub sum_sq: f64,
}

impl Accumulator {
    pub fn start(&mut self, now: f64) {
        if self.baseline.is_some() {
            log::debug!("component: start() called while already running, ignoring");
            return;
        }
        self.baseline = Some(now);
    }

    pub fn stop(&mut self, now: f64) {
        let Some(baseline) = self.baseline.take() else {
            log::debug!("component: stop() called without a matching start(), ignoring");
            return;
        };
        let delta = now - baseline;
        self.value = delta;
        self.accum += delta;
        self.sum_sq += delta * delta;
        if self.laps == 0 {
            self.min = delta;
            self.max = delta;
        } else {
            self.min = self.min.min(delta);
            self.max = self.max.max(delta);
        }
        self.laps += 1;
    }

    pub fn merge(&mut self, other: &Accumulator) {
        self.accum += other.accum;
        self.sum_sq += other.sum_sq;
        self.value = other.value;
        if other.laps > 0 {
            if self.laps == 0 {
                self.min = other.min;
                self.max = other.max;
            } else {
                self.min = self.min.min(other.min);
                self.max = self.max.max(other.max);
            }
        }
        self.laps += other.laps;
    }

    /// Inverse of [`Accumulator::merge`]: removes a previously-folded-in
    /// `other` from the running sums. `min`/`max` are left untouched --
    /// unlike `accum`/`sum_sq`/`laps`, they cannot be reconstructed from a
    /// subtraction once further samples have landed on top of them.
    pub fn minus(&mut self, other: &Accumulator) {
        self.accum -= other.accum;
        self.sum_sq -= other.sum_sq;
        self.laps = self.laps.saturating_sub(other.laps);
    }

    pub fn is_running(&self) -> bool {
        self.baseline.is_some()
    }

    /// Population standard deviation of `value` over every completed
    /// interval, recomputed from the running sums `accum` (= sum of
    /// `value`) and `sum_sq` (= sum of `value^2`) rather than retained
    /// samples: `sqrt(mean(x^2) - mean(x)^2)`.
    pub fn stddev(&self) -> f64 {
        if self.laps < 2 {
            return 0.0;
        }
        let n = self.laps as f64;
        let mean = self.accum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        variance.sqrt()
    }
}
