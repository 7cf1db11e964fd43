//! The namespaced state store.
//!
//! State lives behind a `parking_lot::RwLock<Arc<S>>`. Reads clone the `Arc`
//! (or borrow under the read lock); writes run the root reducer on the state
//! in place through `Arc::make_mut`, which copies the tree only while a
//! snapshot still references the old version. Nothing here is `async`: a
//! store read or write never suspends the calling task.

use crate::error::EngineError;
use crate::undo::{UndoEntry, UndoLog, UndoPoint};
use dashflow_core::reducer::{Namespaced, Reducer};
use dashflow_core::{Domain, RestoreNamespace, UndoDescriptor};
use parking_lot::{Mutex, RwLock};
use std::ops::Deref;
use std::sync::Arc;

/// An immutable view of the state at one revision
///
/// Cheap to clone; holding one keeps that version of the state alive.
#[derive(Debug)]
pub struct StateSnapshot<S> {
    state: Arc<S>,
    revision: u64,
}

impl<S> StateSnapshot<S> {
    /// Revision the snapshot was taken at
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Project a value out of the snapshot
    pub fn select<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.state)
    }

    /// The shared state
    #[must_use]
    pub fn shared(&self) -> Arc<S> {
        Arc::clone(&self.state)
    }
}

impl<S> Clone for StateSnapshot<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            revision: self.revision,
        }
    }
}

impl<S> Deref for StateSnapshot<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.state
    }
}

struct Committed<S> {
    state: Arc<S>,
    revision: u64,
}

type UndoLogOf<D> = UndoLog<<D as Domain>::State, <D as Domain>::Command>;
type UndoEntryOf<D> = UndoEntry<<D as Domain>::State, <D as Domain>::Command>;

struct StoreInner<D: Domain> {
    committed: RwLock<Committed<D::State>>,
    reducer: D::Reducer,
    undo: Mutex<UndoLogOf<D>>,
}

/// The Store - the single shared mutable resource of an engine
///
/// Cloning a `Store` yields another handle to the same state.
///
/// # Example
///
/// ```ignore
/// let store = Store::<Dashboard>::new(DashboardState::default(), dashboard_reducer(), 100);
///
/// store.put(DashboardAction::Meta(MetaAction::Rename("Sales".into())));
/// assert_eq!(store.select(|s| s.meta.title.clone()), "Sales");
/// ```
pub struct Store<D: Domain> {
    inner: Arc<StoreInner<D>>,
}

impl<D: Domain> Clone for Store<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Domain> Store<D> {
    /// Create a store with initial state, the root reducer and the number of
    /// undo entries kept per namespace
    #[must_use]
    pub fn new(initial_state: D::State, reducer: D::Reducer, undo_capacity: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                committed: RwLock::new(Committed {
                    state: Arc::new(initial_state),
                    revision: 0,
                }),
                reducer,
                undo: Mutex::new(UndoLog::new(undo_capacity)),
            }),
        }
    }

    /// Read a value from the current state
    ///
    /// The closure runs under the read lock; keep it short.
    pub fn select<T>(&self, f: impl FnOnce(&D::State) -> T) -> T {
        f(&self.inner.committed.read().state)
    }

    /// Take a snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot<D::State> {
        let committed = self.inner.committed.read();
        StateSnapshot {
            state: Arc::clone(&committed.state),
            revision: committed.revision,
        }
    }

    /// Number of committed mutations so far
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.committed.read().revision
    }

    /// Apply an action through the root reducer
    ///
    /// Returns the new revision.
    pub fn put(&self, action: D::Action) -> u64 {
        let mut committed = self.inner.committed.write();
        let kind = action.kind();
        self.inner
            .reducer
            .reduce(Arc::make_mut(&mut committed.state), action);
        committed.revision += 1;

        tracing::trace!(action = kind, revision = committed.revision, "Action applied");
        metrics::counter!("store.actions.applied").increment(1);
        committed.revision
    }

    /// Apply an action and record an undo entry for it
    ///
    /// Returns the new revision.
    pub fn put_with_undo(&self, action: D::Action, descriptor: UndoDescriptor<D::Command>) -> u64 {
        let mut committed = self.inner.committed.write();
        let namespace = action.namespace();
        let action_kind = action.kind();
        let before = Arc::clone(&committed.state);

        self.inner
            .reducer
            .reduce(Arc::make_mut(&mut committed.state), action);
        committed.revision += 1;
        let revision = committed.revision;

        // Recorded before the write lock is released so undo never sees a
        // mutation without its entry.
        self.inner.undo.lock().record(UndoEntry {
            revision,
            namespace,
            action_kind,
            descriptor,
            before,
        });

        tracing::trace!(action = action_kind, namespace, revision, "Undoable action applied");
        metrics::counter!("store.actions.applied").increment(1);
        revision
    }

    /// Revert `namespace` to its state before the commands selected by `point`
    ///
    /// Returns the reverted entries, oldest first; empty when nothing was
    /// recorded. Other namespaces are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotRestorable`] when the state type does not
    /// support restoring `namespace`. The log is left untouched in that case.
    pub fn undo(
        &self,
        namespace: &str,
        point: &UndoPoint,
    ) -> Result<Vec<UndoEntryOf<D>>, EngineError> {
        let mut committed = self.inner.committed.write();
        let mut log = self.inner.undo.lock();

        let count = log.selection_len(namespace, point);
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(before) = log
            .history(namespace)
            .nth(log.len(namespace).saturating_sub(count))
            .map(|oldest| Arc::clone(&oldest.before))
        else {
            return Ok(Vec::new());
        };

        let mut restored = (*committed.state).clone();
        if !restored.restore_namespace(namespace, &before) {
            return Err(EngineError::NotRestorable(namespace.to_string()));
        }

        committed.state = Arc::new(restored);
        committed.revision += 1;
        let entries = log.take_last(namespace, count);

        tracing::debug!(
            namespace,
            reverted = entries.len(),
            revision = committed.revision,
            "Undo applied"
        );
        metrics::counter!("store.undo.applied").increment(1);
        Ok(entries)
    }

    /// Drop the undo history of `namespace`, e.g. after the namespace was
    /// replaced wholesale
    ///
    /// Returns the number of entries dropped. The state is not touched.
    pub fn clear_undo(&self, namespace: &str) -> usize {
        let dropped = self.inner.undo.lock().clear(namespace);
        if dropped > 0 {
            tracing::debug!(namespace, dropped, "Undo history cleared");
        }
        dropped
    }

    /// Undo entries recorded for `namespace`, oldest first, without the
    /// before-states
    #[must_use]
    pub fn undo_history(&self, namespace: &str) -> Vec<(u64, &'static str, UndoDescriptor<D::Command>)> {
        self.inner
            .undo
            .lock()
            .history(namespace)
            .map(|entry| (entry.revision, entry.action_kind, entry.descriptor.clone()))
            .collect()
    }
}
