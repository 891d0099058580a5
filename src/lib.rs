//! In-process hierarchical performance instrumentation.
//!
//! Application code brackets regions of interest with [`measure`] or
//! [`timer`]; each region produces one or more measurements (wall time, CPU
//! time, memory, hardware counters -- see [`component`]). Measurements are
//! organized into a per-thread call-graph rooted at program start ([`graph`]),
//! merged across threads at [`finalize`] ([`aggregator`]), and rendered as
//! text and JSON reports keyed by the hierarchical label path
//! ([`reporter`]).
//!
//! ## Example
//!
//! ```
//! perfgraph::init("my-program", &[]);
//!
//! fn fib(n: u64) -> u64 {
//!     let _m = perfgraph::timer("fib");
//!     match n {
//!         0 | 1 => n,
//!         n => fib(n - 1) + fib(n - 2),
//!     }
//! }
//! std::hint::black_box(fib(20));
//!
//! perfgraph::finalize();
//! let mut out = Vec::new();
//! perfgraph::report(&mut out).unwrap();
//! perfgraph::clear();
//! ```
//!
//! Worker threads spawned via [`spawn`] carry a bookmark back to the node
//! open on the parent thread at spawn time, so their sub-trees can be
//! stitched into the master tree at [`finalize`]; see [`thread_binding`].

pub mod aggregator;
pub mod component;
pub mod error;
pub mod graph;
mod handle;
pub mod registry;
pub mod reporter;
mod runtime;
pub mod settings;
pub mod thread_binding;

pub use component::{Category, Component, Composite, CpuTime, Counter, PeakRss, WallClock};
pub use error::{ProfileError, Result};
pub use graph::ScopeMode;
pub use handle::ScopedMeasurement;
#[cfg(feature = "json")]
pub use reporter::JsonReport;
pub use settings::{MemoryUnit, Settings, TimingUnit};

/// Sets up defaults and captures the command line.
pub fn init(program_name: &str, argv: &[String]) {
    runtime::init(program_name, argv);
}

/// Whether instrumentation is currently enabled.
pub fn is_enabled() -> bool {
    runtime::is_enabled()
}

/// Global on/off toggle. Observed the next time a scoped handle is
/// constructed on any thread; handles already open are unaffected.
pub fn enable(flag: bool) {
    runtime::enable(flag);
}

/// Current maximum tree depth.
pub fn get_max_depth() -> usize {
    runtime::get_max_depth()
}

/// Sets the maximum tree depth; insertions beyond are dropped.
pub fn set_max_depth(n: usize) {
    runtime::set_max_depth(n);
}

/// Returns a copy of the current process-wide settings.
pub fn settings() -> Settings {
    runtime::settings()
}

/// Replaces the process-wide settings wholesale, after validating them.
pub fn set_settings(settings: Settings) {
    runtime::set_settings(settings);
}

/// Opens a scoped measurement for `label` under the global default scope
/// (derived from `Settings::flat_profile`/`timeline_profile`), instrumented
/// with a single [`WallClock`] component. Convenience for the common case.
pub fn timer(label: &str) -> ScopedMeasurement {
    runtime::timer(label)
}

/// Opens a scoped measurement for `label` under `scope`, instrumented with a
/// single [`WallClock`] component.
pub fn measure(label: &str, scope: ScopeMode) -> ScopedMeasurement {
    runtime::measure(label, scope)
}

/// Opens a scoped measurement for `label` under `scope`, instrumented with a
/// caller-constructed component (typically a [`Composite`] bundling several
/// measurements over the same region).
pub fn measure_with(
    label: &str,
    scope: ScopeMode,
    make_component: impl FnOnce() -> Box<dyn Component>,
) -> ScopedMeasurement {
    runtime::measure_with(label, scope, make_component)
}

/// Spawns a thread the way [`std::thread::spawn`] does, but records a
/// bookmark back to the calling thread's current node so the worker's
/// call-graph can be stitched into the master tree at [`finalize`].
pub fn spawn<F, T>(f: F) -> std::io::Result<std::thread::JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    runtime::spawn(f)
}

/// Registers the calling thread's call-graph for inclusion at the next
/// [`finalize`]. Call this from a worker thread, after it is done
/// recording, before it exits -- and join it before calling `finalize`
/// (merging a store that is still being mutated by its owning thread is a
/// data race; see the crate-level concurrency notes in [`aggregator`]).
pub fn retire_current_thread() {
    runtime::retire_current_thread();
}

/// Flushes, merges, and clears: closes any handles still open if
/// `Settings::stack_clearing` is set, merges every worker graph retired via
/// [`retire_current_thread`] into the calling thread's graph when
/// `Settings::collapse_threads` is set, recomputes statistics. Does not emit
/// a report itself -- call [`report`] or [`write_json`] afterwards.
pub fn finalize() {
    runtime::finalize();
}

/// Synchronous text report against the current state, written to `out`.
pub fn report(out: &mut dyn std::io::Write) -> std::io::Result<()> {
    runtime::report(out)
}

/// Same as [`report`], written to a file named `<output_prefix><tag>.txt`
/// under `Settings::output_path` instead of an explicit stream. Falls back
/// to stdout with a warning if the file cannot be created.
pub fn write_report_file(tag: &str) -> Result<()> {
    runtime::write_report_file(tag)
}

/// Same as [`report`], in JSON, written to `path`. Falls back to stdout with
/// a warning if `path` cannot be opened.
#[cfg(feature = "json")]
pub fn write_json(path: &std::path::Path) -> Result<()> {
    runtime::write_json(path)
}

/// Same as [`write_json`], written to a file named `<output_prefix><tag>.json`
/// under `Settings::output_path` instead of an explicit path. Falls back to
/// stdout with a warning if the file cannot be created.
#[cfg(feature = "json")]
pub fn write_json_file(tag: &str) -> Result<()> {
    runtime::write_json_file(tag)
}

/// Discards all recorded nodes on every thread; preserves Settings and the
/// hash registry.
pub fn clear() {
    runtime::clear();
}

/// Discards all recorded nodes *and* resets the hash registry. Not part of
/// the stable surface (`clear()` alone preserves the registry); exposed
/// for tests and long-running hosts that want a full reset between runs.
pub fn reset_all() {
    runtime::reset_all();
}
