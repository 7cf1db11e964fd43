//! Undo linkage between mutations and the commands that caused them.
//!
//! Reducers know nothing about undo. A handler that wants its mutation to be
//! undoable attaches an [`UndoDescriptor`] when it puts the action; the store
//! files the descriptor in a side-channel log next to a snapshot of the state
//! as it was before the mutation. Undo later asks the state to copy a single
//! namespace back from that snapshot via [`RestoreNamespace`].

use crate::command::CorrelationId;
use serde::{Deserialize, Serialize};

/// Links a committed mutation to the command that produced it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoDescriptor<C> {
    /// The command whose handler issued the mutation
    pub cmd: C,

    /// Correlation id of that command
    pub correlation_id: Option<CorrelationId>,
}

impl<C> UndoDescriptor<C> {
    /// Create a descriptor for a command
    #[must_use]
    pub const fn new(cmd: C, correlation_id: Option<CorrelationId>) -> Self {
        Self {
            cmd,
            correlation_id,
        }
    }
}

/// State that can restore one namespace from an earlier snapshot
///
/// The default implementation supports no namespace, which makes undo a
/// no-op for domains that never attach descriptors.
pub trait RestoreNamespace {
    /// Copy `namespace` from `earlier` into `self`
    ///
    /// Returns `false` when the namespace is unknown or not undoable.
    fn restore_namespace(&mut self, namespace: &str, earlier: &Self) -> bool {
        let _ = (namespace, earlier);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Plain;

    impl RestoreNamespace for Plain {}

    #[derive(Clone, Default, PartialEq, Debug)]
    struct Split {
        layout: Vec<u8>,
        title: String,
    }

    impl RestoreNamespace for Split {
        fn restore_namespace(&mut self, namespace: &str, earlier: &Self) -> bool {
            match namespace {
                "layout" => {
                    self.layout.clone_from(&earlier.layout);
                    true
                },
                _ => false,
            }
        }
    }

    #[test]
    fn test_default_restores_nothing() {
        let mut plain = Plain;
        assert!(!plain.restore_namespace("layout", &Plain));
    }

    #[test]
    fn test_restore_copies_only_the_namespace() {
        let earlier = Split {
            layout: vec![1, 2],
            title: "old".into(),
        };
        let mut current = Split {
            layout: vec![2, 1, 3],
            title: "new".into(),
        };

        assert!(current.restore_namespace("layout", &earlier));
        assert_eq!(current.layout, vec![1, 2]);
        assert_eq!(current.title, "new");
        assert!(!current.restore_namespace("meta", &earlier));
    }
}
