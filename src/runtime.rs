//! Global runtime: the process-wide state backing the free functions in
//! [`crate`] (`init`, `finalize`, `measure`, ...).
//!
//! Per design note, the hash registry and cross-thread bookkeeping are
//! necessarily process-wide singletons (every thread must agree on the same
//! label<->hash mapping), but we confine them to this one module behind
//! atomic/lazy initialization rather than scattering `static`s through the
//! crate.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, RwLock};

use crate::aggregator;
use crate::component::{Component, WallClock};
use crate::error::{ProfileError, Result};
use crate::graph::{CallGraph, ScopeMode};
use crate::registry::HashRegistry;
use crate::reporter::{self, RankView};
use crate::settings::Settings;
use crate::thread_binding::{self, with_graph};

struct Runtime {
    registry: HashRegistry,
    settings: RwLock<Settings>,
    worker_graphs: Mutex<Vec<CallGraph>>,
    program_name: Mutex<String>,
    initialized: AtomicBool,
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| Runtime {
        registry: HashRegistry::new(),
        settings: RwLock::new(Settings::default()),
        worker_graphs: Mutex::new(Vec::new()),
        program_name: Mutex::new(String::new()),
        initialized: AtomicBool::new(false),
    })
}

/// Sets up defaults and captures the command line.
///
/// Never fails in a way that blocks the application: an invalid setting
/// degrades to its default and is logged, matching the error design's
/// `ConfigurationError` recovery.
pub fn init(program_name: &str, _argv: &[String]) {
    let rt = runtime();
    *rt.program_name.lock().unwrap() = program_name.to_string();
    rt.settings.write().unwrap().validate();
    rt.initialized.store(true, Ordering::Release);
    log::debug!("perfgraph: initialized for `{program_name}`");
}

/// Whether instrumentation is currently enabled.
pub fn is_enabled() -> bool {
    runtime().settings.read().unwrap().enabled
}

/// Global on/off toggle. Observed the next time a scoped
/// handle is constructed on any thread; handles already open are
/// unaffected.
pub fn enable(flag: bool) {
    runtime().settings.write().unwrap().enabled = flag;
}

/// Current maximum tree depth.
pub fn get_max_depth() -> usize {
    runtime().settings.read().unwrap().max_depth
}

/// Sets the maximum tree depth; insertions beyond it are dropped.
pub fn set_max_depth(n: usize) {
    runtime().settings.write().unwrap().max_depth = n;
    with_graph(|g| g.set_max_depth(n));
}

/// Copies the current settings.
pub fn settings() -> Settings {
    runtime().settings.read().unwrap().clone()
}

/// Replaces the current settings wholesale, after validating them.
pub fn set_settings(mut new_settings: Settings) {
    new_settings.validate();
    *runtime().settings.write().unwrap() = new_settings;
}

fn current_scope() -> ScopeMode {
    runtime().settings.read().unwrap().default_scope()
}

/// Opens a scoped measurement for `label` under the global default scope,
/// with a single [`WallClock`] component.
pub fn timer(label: &str) -> crate::handle::ScopedMeasurement {
    measure_with(label, current_scope(), || Box::new(WallClock::default()))
}

/// Opens a scoped measurement for `label` under `scope`, with a single
/// [`WallClock`] component.
pub fn measure(label: &str, scope: ScopeMode) -> crate::handle::ScopedMeasurement {
    measure_with(label, scope, || Box::new(WallClock::default()))
}

/// Opens a scoped measurement for `label` under `scope`, with a
/// caller-constructed component (or [`crate::component::Composite`] for a
/// component set).
pub fn measure_with(
    label: &str,
    scope: ScopeMode,
    make_component: impl FnOnce() -> Box<dyn Component>,
) -> crate::handle::ScopedMeasurement {
    ensure_thread_initialized();
    let rt = runtime();
    if !rt.settings.read().unwrap().enabled {
        return crate::handle::ScopedMeasurement::open(None, scope, make_component);
    }
    let hash = rt.registry.intern(label);
    crate::handle::ScopedMeasurement::open(hash, scope, make_component)
}

fn ensure_thread_initialized() {
    let rt = runtime();
    let max_depth = rt.settings.read().unwrap().max_depth;
    with_graph(|g| {
        if g.max_depth() != max_depth {
            g.set_max_depth(max_depth);
        }
    });
}

/// Spawns a worker thread that will be reachable from the aggregator via
/// its bookmark. Thin wrapper over [`thread_binding::spawn`].
pub fn spawn<F, T>(f: F) -> io::Result<std::thread::JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread_binding::spawn(f)
}

/// Registers a worker's call-graph for inclusion at the next `finalize()`.
/// Call this from the worker, after it is done recording, before it exits
/// (and before the caller joins it) -- see requirement that workers
/// be joined before `finalize`.
pub fn retire_current_thread() {
    if let Some(graph) = thread_binding::take_graph() {
        runtime().worker_graphs.lock().unwrap().push(graph);
    }
}

/// Flushes, merges, reports, and clears.
///
/// Merges every worker graph registered via [`retire_current_thread`] into
/// the calling thread's own graph (used as the master tree) when
/// `collapse_threads` is set; otherwise workers are kept as separate rank
/// sections. Workers must already be joined: merging a store that is still
/// being mutated by its owning thread is a data race.
pub fn finalize() {
    let rt = runtime();
    let settings = rt.settings.read().unwrap().clone();

    with_graph(|master| {
        if settings.stack_clearing {
            master.close_live_handles();
        }

        let mut workers = rt.worker_graphs.lock().unwrap();
        if settings.collapse_threads {
            // §5: "Merge order across workers during finalization is
            // deterministic for a given set of worker bookmarks and thread
            // ids (sort by tid)" -- independent of the order threads
            // happened to call `retire_current_thread()`.
            workers.sort_by_key(|w| w.tid());
            for worker in workers.drain(..) {
                aggregator::merge_worker(master, worker, &settings);
            }
        }
    });
}

/// Produces the set of rank views to report: the master thread plus, when
/// `collapse_threads` is false, every retired worker graph kept separate.
fn with_rank_views<R>(f: impl FnOnce(&[RankView<'_>]) -> R) -> R {
    let rt = runtime();
    let settings = rt.settings.read().unwrap().clone();
    let guard = rt.worker_graphs.lock().unwrap();
    let mut workers: Vec<&CallGraph> = guard.iter().collect();
    // Deterministic per §5, same ordering rule as the merge path in
    // `finalize()`.
    workers.sort_by_key(|w| w.tid());

    with_graph(|master| {
        let mut views = vec![RankView {
            tid: master.tid(),
            graph: &*master,
        }];
        if !settings.collapse_threads {
            for worker in workers {
                views.push(RankView {
                    tid: worker.tid(),
                    graph: worker,
                });
            }
        }
        f(&views)
    })
}

/// Synchronous text report against the current state.
pub fn report(out: &mut dyn io::Write) -> io::Result<()> {
    let rt = runtime();
    let settings = rt.settings.read().unwrap().clone();
    with_rank_views(|views| reporter::write_text(out, views, &rt.registry, &settings, 0.0))
}

/// Same as [`report`], written to a file under `Settings::output_path`
/// (named `<output_prefix><tag>.txt`, per the "Persisted state layout" in
/// §6) instead of an explicit stream. Falls back to stdout with a warning
/// if the file cannot be created, per `IOError` recovery.
pub fn write_report_file(tag: &str) -> Result<()> {
    let rt = runtime();
    let settings = rt.settings.read().unwrap().clone();
    let path = settings.resolve_output_file(tag, "txt")?;

    match std::fs::File::create(&path) {
        Ok(mut file) => with_rank_views(|views| reporter::write_text(&mut file, views, &rt.registry, &settings, 0.0))
            .map_err(|source| ProfileError::Io {
                path: path.display().to_string(),
                source,
            }),
        Err(source) => {
            log::warn!(
                "perfgraph: failed to open `{}` ({source}), writing report to stdout instead",
                path.display()
            );
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            with_rank_views(|views| reporter::write_text(&mut lock, views, &rt.registry, &settings, 0.0)).map_err(
                |source| ProfileError::Io {
                    path: path.display().to_string(),
                    source,
                },
            )
        }
    }
}

/// Same as [`report`], in JSON, written to `path`.
///
/// Falls back to stdout with a warning if `path` cannot be opened, per
/// `IOError` recovery.
#[cfg(feature = "json")]
pub fn write_json(path: &std::path::Path) -> Result<()> {
    let rt = runtime();
    let json = with_rank_views(|views| reporter::build_json(views, &rt.registry));

    match std::fs::File::create(path) {
        Ok(file) => {
            serde_json::to_writer_pretty(file, &json).map_err(|e| ProfileError::Io {
                path: path.display().to_string(),
                source: io::Error::other(e),
            })?;
            Ok(())
        }
        Err(source) => {
            log::warn!(
                "perfgraph: failed to open `{}` ({source}), writing JSON to stdout instead",
                path.display()
            );
            let stdout = io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), &json).map_err(|e| ProfileError::Io {
                path: path.display().to_string(),
                source: io::Error::other(e),
            })?;
            Ok(())
        }
    }
}

/// Same as [`write_json`], but the destination is resolved from
/// `Settings::output_path`/`output_prefix` (named `<output_prefix><tag>.json`,
/// per §6's "Persisted state layout") instead of an explicit path.
#[cfg(feature = "json")]
pub fn write_json_file(tag: &str) -> Result<()> {
    let settings = runtime().settings.read().unwrap().clone();
    let path = settings.resolve_output_file(tag, "json")?;
    write_json(&path)
}

/// Discards all recorded nodes; preserves settings and the hash registry.
pub fn clear() {
    with_graph(|g| g.clear());
    runtime().worker_graphs.lock().unwrap().clear();
}

/// Discards all recorded nodes *and* resets the hash registry. Not part of
/// the stable surface (`clear()` alone preserves the registry); exposed
/// for tests and long-running hosts that want a full reset between runs.
pub fn reset_all() {
    clear();
    runtime().registry.reset();
}
