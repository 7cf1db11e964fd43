//! Side-channel undo log.
//!
//! Every mutation put with an undo descriptor leaves an [`UndoEntry`] here:
//! the namespace it touched, the action kind, the descriptor, and the state
//! as it was just before the mutation. Entries are kept per namespace, newest
//! last, bounded by the configured capacity (oldest dropped).
//!
//! Entries are grouped by correlation id when undoing: all mutations issued
//! while processing one external command (nested commands included) share
//! that command's correlation id and are undone together.

use dashflow_core::{CorrelationId, UndoDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Which recorded commands an undo should revert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum UndoPoint {
    /// The most recent command
    Last,
    /// The `n` most recent commands
    Count(usize),
    /// Every most-recent command whose correlation id starts with the prefix
    ///
    /// Greedy: walks back from the newest command and stops at the first one
    /// that does not match. Used for multi-step interactions such as drag
    /// then drop, which share a correlation prefix.
    CorrelationPrefix(String),
}

/// One recorded undoable mutation
#[derive(Debug, Clone)]
pub struct UndoEntry<S, C> {
    /// Store revision produced by the mutation
    pub revision: u64,
    /// Namespace the mutation wrote
    pub namespace: &'static str,
    /// Kind of the reducer action
    pub action_kind: &'static str,
    /// Command that issued the mutation
    pub descriptor: UndoDescriptor<C>,
    /// State immediately before the mutation
    pub before: Arc<S>,
}

impl<S, C> UndoEntry<S, C> {
    fn group(&self) -> Option<&CorrelationId> {
        self.descriptor.correlation_id.as_ref()
    }
}

/// Bounded per-namespace undo history
#[derive(Debug)]
pub struct UndoLog<S, C> {
    entries: HashMap<&'static str, VecDeque<UndoEntry<S, C>>>,
    capacity: usize,
}

impl<S, C> UndoLog<S, C> {
    /// Create an empty log keeping at most `capacity` entries per namespace
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    /// Record an entry, dropping the oldest of its namespace when full
    pub fn record(&mut self, entry: UndoEntry<S, C>) {
        if self.capacity == 0 {
            return;
        }
        let history = self.entries.entry(entry.namespace).or_default();
        if history.len() >= self.capacity {
            history.pop_front();
            tracing::debug!(
                namespace = entry.namespace,
                capacity = self.capacity,
                "Undo log at capacity, dropping oldest entry"
            );
        }
        history.push_back(entry);
    }

    /// Number of entries recorded for `namespace`
    #[must_use]
    pub fn len(&self, namespace: &str) -> usize {
        self.entries.get(namespace).map_or(0, VecDeque::len)
    }

    /// Whether nothing is recorded for `namespace`
    #[must_use]
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Recorded entries for `namespace`, oldest first
    pub fn history(&self, namespace: &str) -> impl Iterator<Item = &UndoEntry<S, C>> {
        self.entries.get(namespace).into_iter().flatten()
    }

    /// Number of trailing entries of `namespace` selected by `point`
    #[must_use]
    pub fn selection_len(&self, namespace: &str, point: &UndoPoint) -> usize {
        let Some(history) = self.entries.get(namespace) else {
            return 0;
        };

        let mut taken = 0;
        let mut groups = 0;
        let mut rest = history.iter().rev().peekable();

        while let Some(newest) = rest.peek() {
            let group = newest.group().cloned();
            let accept = match point {
                UndoPoint::Last => groups < 1,
                UndoPoint::Count(n) => groups < *n,
                UndoPoint::CorrelationPrefix(prefix) => {
                    group.as_ref().is_some_and(|id| id.has_prefix(prefix))
                },
            };
            if !accept {
                break;
            }

            // Entries without a correlation id form a group of one.
            taken += 1;
            rest.next();
            if group.is_some() {
                while rest.peek().is_some_and(|entry| entry.group() == group.as_ref()) {
                    taken += 1;
                    rest.next();
                }
            }
            groups += 1;
        }

        taken
    }

    /// Remove and return the trailing `count` entries of `namespace`, oldest first
    pub fn take_last(&mut self, namespace: &str, count: usize) -> Vec<UndoEntry<S, C>> {
        let Some(history) = self.entries.get_mut(namespace) else {
            return Vec::new();
        };
        let split = history.len().saturating_sub(count);
        history.split_off(split).into()
    }

    /// Forget every entry of `namespace`; returns how many were dropped
    pub fn clear(&mut self, namespace: &str) -> usize {
        self.entries.remove(namespace).map_or(0, |history| history.len())
    }
}
