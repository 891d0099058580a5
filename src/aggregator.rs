//! The cross-thread aggregator / finalizer.
//!
//! Merges worker-thread call-graphs into a master tree, stitching each
//! worker's root children beneath the node its bookmark points at. Runs
//! once, at `finalize()`, after the caller has joined all worker threads
//! (merging is not safe against a worker that is still mutating its own
//! store).

use crate::graph::{CallGraph, NodeId};
use crate::settings::Settings;

/// Merges `worker` into `master`, stitching its root-level children under
/// the node identified by its bookmark. If `settings.stack_clearing`
/// is set, any handles still open on `worker` are closed (LIFO) first.
pub fn merge_worker(master: &mut CallGraph, mut worker: CallGraph, settings: &Settings) {
    if settings.stack_clearing {
        worker.close_live_handles();
    }

    let mut path = worker.bookmark().parent_hash_path.clone();
    if path.len() > settings.max_thread_bookmarks {
        log::debug!(
            "aggregator: bookmark path of length {} exceeds max_thread_bookmarks {}, \
             truncating to the ancestors nearest the root",
            path.len(),
            settings.max_thread_bookmarks
        );
        path.truncate(settings.max_thread_bookmarks);
    }

    let attach_point = resolve_attach_point(master, &path);
    let worker_root = worker.root();
    merge_subtree(master, attach_point, &worker, worker_root);
}

/// Walks `path` from the master root, creating any missing intermediate
/// nodes (with a placeholder wall-clock component) along the way. An empty
/// or unresolvable path attaches at the master root ("Reference
/// discipline": a bookmark that can no longer find its parent merges at
/// the root instead).
fn resolve_attach_point(master: &mut CallGraph, path: &[u64]) -> NodeId {
    let mut cursor = master.root();
    for &hash in path {
        cursor = master.find_or_create_child(cursor, hash, || {
            Box::new(crate::component::WallClock::default())
        });
    }
    cursor
}

fn merge_subtree(master: &mut CallGraph, master_parent: NodeId, worker: &CallGraph, worker_node: NodeId) {
    for child in worker.node(worker_node).children() {
        let hash = worker.node(child).hash();
        let master_child =
            master.find_or_create_child(master_parent, hash, || worker.node(child).data().zeroed_like());
        master.merge_component(master_child, worker.node(child).data());
        merge_subtree(master, master_child, worker, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, WallClock};
    use crate::graph::{Bookmark, ScopeMode};

    fn make() -> Box<dyn Component> {
        Box::new(WallClock::default())
    }

    #[test]
    fn worker_with_empty_bookmark_merges_at_root() {
        let mut master = CallGraph::new(1, Bookmark::default());
        let mut worker = CallGraph::new(2, Bookmark::default());
        let t = worker.insert(100, ScopeMode::Tree, make);
        worker.pop(t);

        let settings = Settings::default();
        merge_worker(&mut master, worker, &settings);

        assert_eq!(master.node_count(), 1);
    }

    #[test]
    fn worker_is_stitched_under_bookmarked_parent() {
        let mut master = CallGraph::new(1, Bookmark::default());
        let t = master.insert(10, ScopeMode::Tree, make);

        let bookmark = Bookmark {
            parent_tid: Some(master.tid()),
            parent_hash_path: master.hash_path(t.0.unwrap()),
        };
        master.pop(t);

        let mut worker = CallGraph::new(2, bookmark);
        let wt = worker.insert(200, ScopeMode::Tree, make);
        worker.pop(wt);

        let settings = Settings::default();
        merge_worker(&mut master, worker, &settings);

        // master now has node 10 (depth 1) and node 200 stitched beneath it
        // (depth 2).
        assert_eq!(master.node_count(), 2);
        let child_of_10 = master
            .node(master.root())
            .children()
            .next()
            .map(|id| master.node(id))
            .unwrap();
        assert_eq!(child_of_10.hash(), 10);
        let grandchild = child_of_10.children().next().map(|id| master.node(id)).unwrap();
        assert_eq!(grandchild.hash(), 200);
        assert_eq!(grandchild.depth(), 2);
    }

    #[test]
    fn merging_sums_laps_at_matching_hash_paths() {
        let mut master = CallGraph::new(1, Bookmark::default());
        let t = master.insert(10, ScopeMode::Tree, make);
        master.node_mut(t.0.unwrap()).data_mut().start();
        master.node_mut(t.0.unwrap()).data_mut().stop();
        master.pop(t);

        let mut worker = CallGraph::new(2, Bookmark::default());
        let wt = worker.insert(10, ScopeMode::Tree, make);
        worker.node_mut(wt.0.unwrap()).data_mut().start();
        worker.node_mut(wt.0.unwrap()).data_mut().stop();
        worker.pop(wt);

        let settings = Settings::default();
        merge_worker(&mut master, worker, &settings);

        assert_eq!(master.node_count(), 1);
        let merged_id = master.node(master.root()).children().next().unwrap();
        assert_eq!(master.node(merged_id).laps(), 2);
    }
}
