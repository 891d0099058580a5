//! Thread binding: one [`CallGraph`] per OS thread, plus the
//! bookmark handed from a parent thread to a worker at spawn time.

use std::cell::RefCell;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crate::graph::{Bookmark, CallGraph};

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

fn next_tid() -> u64 {
    NEXT_TID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    static TID: u64 = next_tid();
    static BOOKMARK: RefCell<Bookmark> = RefCell::new(Bookmark::default());
    static GRAPH: RefCell<Option<CallGraph>> = const { RefCell::new(None) };
}

/// This thread's stable numeric id, assigned on first use (not the OS
/// thread id, which this crate has no portable way to read as an integer).
pub fn current_tid() -> u64 {
    TID.with(|tid| *tid)
}

/// Runs `f` with this thread's call-graph, creating it lazily on first use.
pub fn with_graph<R>(f: impl FnOnce(&mut CallGraph) -> R) -> R {
    GRAPH.with(|cell| {
        let mut slot = cell.borrow_mut();
        let graph = slot.get_or_insert_with(|| {
            let bookmark = BOOKMARK.with(|b| b.borrow().clone());
            CallGraph::new(current_tid(), bookmark)
        });
        f(graph)
    })
}

/// Takes this thread's call-graph out, leaving it empty. Used by the
/// aggregator during finalization, after which the worker's store is
/// cleared.
pub fn take_graph() -> Option<CallGraph> {
    GRAPH.with(|cell| cell.borrow_mut().take())
}

/// Captures a bookmark `(parent_tid, hash_path_of_cursor)` for the calling
/// thread's current position -- call this from the *parent* thread just
/// before spawning a worker, then install it in the worker via
/// [`bind_bookmark`].
pub fn capture_bookmark() -> Bookmark {
    with_graph(|graph| Bookmark {
        parent_tid: Some(graph.tid()),
        parent_hash_path: graph.hash_path(graph.cursor()),
    })
}

/// Installs a bookmark captured by the parent thread as this (not yet
/// materialized) thread's bookmark. Must be called before the first
/// [`with_graph`] use on this thread, i.e. at the very top of the worker's
/// entry point.
pub fn bind_bookmark(bookmark: Bookmark) {
    BOOKMARK.with(|b| *b.borrow_mut() = bookmark);
}

/// Spawns a thread the way [`std::thread::spawn`] does, but captures the
/// calling thread's bookmark first and installs it in the new thread
/// before running `f`, so the worker's call-graph can later be stitched
/// beneath the parent's current node during aggregation.
///
/// A worker spawned before [`crate::init`] still records correctly: its
/// bookmark's `parent_hash_path` is simply empty, so the aggregator
/// stitches it at the root (boundary behavior).
pub fn spawn<F, T>(f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let bookmark = capture_bookmark();
    std::thread::Builder::new().spawn(move || {
        bind_bookmark(bookmark);
        f()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_thread_gets_a_distinct_tid() {
        let main_tid = current_tid();
        let worker_tid = std::thread::spawn(current_tid).join().unwrap();
        assert_ne!(main_tid, worker_tid);
    }

    #[test]
    fn spawn_captures_parent_bookmark() {
        with_graph(|graph| {
            let t = graph.insert(42, crate::graph::ScopeMode::Tree, || {
                Box::new(crate::component::WallClock::default())
            });
            graph.pop(t);
            let _ = graph.insert(42, crate::graph::ScopeMode::Tree, || {
                Box::new(crate::component::WallClock::default())
            });
        });

        let handle = spawn(|| with_graph(|g| g.bookmark().parent_hash_path.clone()));
        let path = handle.join().unwrap();
        assert_eq!(path, vec![42]);
    }
}
