//! The scoped measurement handle: an RAII bracket around one region.

use std::marker::PhantomData;

use crate::component::Component;
use crate::graph::{InsertToken, ScopeMode};
use crate::registry::Hash64;
use crate::thread_binding::with_graph;

/// An open scoped measurement. Dropping it stops the component and pops
/// the call-graph cursor, on every exit path from the enclosing scope --
/// normal return, early return, or panic/unwind.
///
/// Constructing one while instrumentation is globally disabled, or while
/// depth has been exceeded, yields a sentinel handle whose drop is a
/// no-op.
///
/// A handle is tied to the thread that created it: it is not [`Send`],
/// matching the call-graph store's single-thread ownership.
pub struct ScopedMeasurement {
    token: InsertToken,
    _hash: Hash64,
    _not_send: PhantomData<*const ()>,
}

impl ScopedMeasurement {
    /// Opens a measurement for `label` under `scope`, using `make_component`
    /// to build the component if a new node is created.
    ///
    /// Returns a no-op handle if `label` is empty after trimming (the
    /// registry rejects it) or if the call-graph declines the insertion
    /// (disabled, or depth exceeded).
    pub(crate) fn open(
        hash: Option<Hash64>,
        scope: ScopeMode,
        make_component: impl FnOnce() -> Box<dyn Component>,
    ) -> Self {
        let Some(hash) = hash else {
            return ScopedMeasurement {
                token: InsertToken(None),
                _hash: 0,
                _not_send: PhantomData,
            };
        };

        let token = with_graph(|graph| {
            let token = graph.insert(hash, scope, make_component);
            if let InsertToken(Some(id)) = token {
                graph.node_mut(id).data_mut().start();
            }
            token
        });

        ScopedMeasurement {
            token,
            _hash: hash,
            _not_send: PhantomData,
        }
    }

    /// Whether this handle actually resolved to a node (`false` for the
    /// disabled/depth-exceeded/empty-label sentinel case).
    pub fn is_active(&self) -> bool {
        self.token.0.is_some()
    }
}

impl Drop for ScopedMeasurement {
    fn drop(&mut self) {
        if let InsertToken(Some(id)) = self.token {
            with_graph(|graph| {
                graph.node_mut(id).data_mut().stop();
                graph.pop(InsertToken(Some(id)));
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::WallClock;
    use crate::thread_binding::with_graph;

    fn make() -> Box<dyn Component> {
        Box::new(WallClock::default())
    }

    #[test]
    fn drop_restores_cursor() {
        let before = with_graph(|g| g.cursor());
        {
            let _h = ScopedMeasurement::open(Some(777), ScopeMode::Tree, make);
            let during = with_graph(|g| g.cursor());
            assert_ne!(before, during);
        }
        let after = with_graph(|g| g.cursor());
        assert_eq!(before, after);
    }

    #[test]
    fn empty_label_yields_inactive_handle() {
        let h = ScopedMeasurement::open(None, ScopeMode::Tree, make);
        assert!(!h.is_active());
    }

    #[test]
    fn nested_handles_unwind_in_lifo_order() {
        let before = with_graph(|g| g.cursor());
        let outer = ScopedMeasurement::open(Some(1), ScopeMode::Tree, make);
        {
            let _inner = ScopedMeasurement::open(Some(2), ScopeMode::Tree, make);
        }
        let mid = with_graph(|g| g.cursor());
        drop(outer);
        let after = with_graph(|g| g.cursor());
        assert_eq!(before, after);
        assert_ne!(mid, after);
    }
}
