//! Dashboard identity and persistence bookkeeping.

use chrono::{DateTime, Utc};
use dashflow_core::reducer::Reducer;
use serde::{Deserialize, Serialize};

/// The `meta` namespace
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaState {
    /// Backend identifier; `None` until a dashboard was initialized
    pub id: Option<String>,
    /// Dashboard title
    pub title: String,
    /// Revision of the last load or save
    pub saved_revision: Option<u64>,
    /// When the dashboard was last saved
    pub saved_at: Option<DateTime<Utc>>,
}

impl MetaState {
    /// Whether a dashboard was initialized
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.id.is_some()
    }
}

/// Mutations of the `meta` namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaAction {
    /// Replace identity after a load
    Initialize {
        /// Backend identifier
        id: String,
        /// Dashboard title
        title: String,
        /// Loaded revision
        revision: u64,
    },
    /// Change the title
    Rename(String),
    /// Record a successful save
    MarkSaved {
        /// Revision assigned by the backend
        revision: u64,
        /// Save time
        at: DateTime<Utc>,
    },
}

/// Reducer for the `meta` namespace
#[derive(Clone, Copy, Debug, Default)]
pub struct MetaReducer;

impl Reducer for MetaReducer {
    type State = MetaState;
    type Action = MetaAction;

    fn reduce(&self, state: &mut MetaState, action: MetaAction) {
        match action {
            MetaAction::Initialize {
                id,
                title,
                revision,
            } => {
                *state = MetaState {
                    id: Some(id),
                    title,
                    saved_revision: Some(revision),
                    saved_at: None,
                };
            },
            MetaAction::Rename(title) => state.title = title,
            MetaAction::MarkSaved { revision, at } => {
                state.saved_revision = Some(revision);
                state.saved_at = Some(at);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashflow_core::environment::Clock;
    use dashflow_testing::{ReducerTest, test_clock};

    #[test]
    fn test_initialize_resets_save_time() {
        ReducerTest::new(MetaReducer)
            .given_state(MetaState {
                saved_at: Some(test_clock().now()),
                ..MetaState::default()
            })
            .when_action(MetaAction::Initialize {
                id: "dash-1".into(),
                title: "Sales".into(),
                revision: 3,
            })
            .then_state(|state| {
                assert!(state.is_initialized());
                assert_eq!(state.title, "Sales");
                assert_eq!(state.saved_revision, Some(3));
                assert!(state.saved_at.is_none());
            })
            .run();
    }

    #[test]
    fn test_mark_saved() {
        let now = test_clock().now();
        ReducerTest::new(MetaReducer)
            .given_state(MetaState::default())
            .when_action(MetaAction::Rename("Ops".into()))
            .when_action(MetaAction::MarkSaved {
                revision: 4,
                at: now,
            })
            .then_state(move |state| {
                assert_eq!(state.title, "Ops");
                assert_eq!(state.saved_revision, Some(4));
                assert_eq!(state.saved_at, Some(now));
            })
            .run();
    }
}
