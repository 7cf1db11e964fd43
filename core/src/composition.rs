//! Reducer composition utilities
//!
//! The state tree is split into namespaces, each owned by exactly one reducer.
//! This module builds the root reducer out of namespace reducers:
//! - **`scope_reducer`**: give a reducer `&mut` access to its own slice only,
//!   and only for the actions of its namespace
//! - **`combine_reducers`**: run several scoped reducers against the root
//!
//! Because a scoped reducer is handed nothing but its slice, a namespace
//! reducer cannot write foreign state; the borrow checker enforces it.
//!
//! # Examples
//!
//! ```
//! use dashflow_core::reducer::Reducer;
//! use dashflow_core::composition::{combine_reducers, scope_reducer};
//!
//! #[derive(Clone, Default)]
//! struct Root {
//!     title: String,
//!     sections: Vec<String>,
//! }
//!
//! #[derive(Clone)]
//! enum RootAction {
//!     Meta(String),
//!     Layout(String),
//! }
//!
//! struct TitleReducer;
//! impl Reducer for TitleReducer {
//!     type State = String;
//!     type Action = String;
//!     fn reduce(&self, state: &mut String, action: String) {
//!         *state = action;
//!     }
//! }
//!
//! struct SectionsReducer;
//! impl Reducer for SectionsReducer {
//!     type State = Vec<String>;
//!     type Action = String;
//!     fn reduce(&self, state: &mut Vec<String>, action: String) {
//!         state.push(action);
//!     }
//! }
//!
//! let root = combine_reducers(vec![
//!     Box::new(scope_reducer(
//!         TitleReducer,
//!         |root: &mut Root| &mut root.title,
//!         |action: RootAction| match action {
//!             RootAction::Meta(title) => Some(title),
//!             RootAction::Layout(_) => None,
//!         },
//!     )),
//!     Box::new(scope_reducer(
//!         SectionsReducer,
//!         |root: &mut Root| &mut root.sections,
//!         |action: RootAction| match action {
//!             RootAction::Layout(section) => Some(section),
//!             RootAction::Meta(_) => None,
//!         },
//!     )),
//! ]);
//!
//! let mut state = Root::default();
//! root.reduce(&mut state, RootAction::Meta("Sales".into()));
//! root.reduce(&mut state, RootAction::Layout("KPIs".into()));
//! assert_eq!(state.title, "Sales");
//! assert_eq!(state.sections, vec!["KPIs".to_string()]);
//! ```

use crate::reducer::Reducer;

/// Combines reducers that operate on the same state and action types.
///
/// Each reducer sees every action, in registration order. With scoped
/// reducers that means exactly one of them reacts to a given action.
#[must_use]
pub fn combine_reducers<S, A>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A> + Send + Sync>>,
) -> CombinedReducer<S, A>
where
    S: 'static,
    A: Clone + 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A>
where
    S: 'static,
    A: Clone + 'static,
{
    reducers: Vec<Box<dyn Reducer<State = S, Action = A> + Send + Sync>>,
}

impl<S, A> Reducer for CombinedReducer<S, A>
where
    S: 'static,
    A: Clone + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut Self::State, action: Self::Action) {
        for reducer in &self.reducers {
            reducer.reduce(state, action.clone());
        }
    }
}

/// Scopes a namespace reducer to its slice of the root state.
///
/// # Type Parameters
///
/// - `S`: The root state type
/// - `SubS`: The namespace slice
/// - `A`: The root action type
/// - `SubA`: The namespace's own action type
///
/// `slice` projects the root onto the namespace; `extract` returns the
/// namespace action when the root action belongs to this namespace.
pub const fn scope_reducer<S, SubS, A, SubA, R>(
    reducer: R,
    slice: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
) -> ScopedReducer<S, SubS, A, SubA, R>
where
    R: Reducer<State = SubS, Action = SubA>,
{
    ScopedReducer {
        reducer,
        slice,
        extract,
    }
}

/// A reducer that operates on one namespace of the root state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, R>
where
    R: Reducer<State = SubS, Action = SubA>,
{
    reducer: R,
    slice: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
}

impl<S, SubS, A, SubA, R> Reducer for ScopedReducer<S, SubS, A, SubA, R>
where
    R: Reducer<State = SubS, Action = SubA>,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut Self::State, action: Self::Action) {
        if let Some(sub_action) = (self.extract)(action) {
            self.reducer.reduce((self.slice)(state), sub_action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SubState {
        value: i32,
    }

    #[derive(Clone)]
    enum SubAction {
        Add(i32),
        Multiply(i32),
    }

    struct SubReducer;

    impl Reducer for SubReducer {
        type State = SubState;
        type Action = SubAction;

        fn reduce(&self, state: &mut Self::State, action: Self::Action) {
            match action {
                SubAction::Add(n) => state.value += n,
                SubAction::Multiply(n) => state.value *= n,
            }
        }
    }

    #[derive(Clone, Default)]
    struct ParentState {
        left: SubState,
        right: SubState,
        other: String,
    }

    #[derive(Clone)]
    enum ParentAction {
        Left(SubAction),
        Right(SubAction),
    }

    fn left(action: ParentAction) -> Option<SubAction> {
        match action {
            ParentAction::Left(a) => Some(a),
            ParentAction::Right(_) => None,
        }
    }

    fn right(action: ParentAction) -> Option<SubAction> {
        match action {
            ParentAction::Right(a) => Some(a),
            ParentAction::Left(_) => None,
        }
    }

    #[test]
    fn test_scope_reducer_touches_only_its_slice() {
        let scoped = scope_reducer(SubReducer, |p: &mut ParentState| &mut p.left, left);

        let mut state = ParentState {
            left: SubState { value: 5 },
            right: SubState { value: 1 },
            other: "test".to_string(),
        };

        scoped.reduce(&mut state, ParentAction::Left(SubAction::Add(3)));
        assert_eq!(state.left.value, 8);

        scoped.reduce(&mut state, ParentAction::Right(SubAction::Multiply(10)));
        assert_eq!(state.left.value, 8);
        assert_eq!(state.right.value, 1);
        assert_eq!(state.other, "test");
    }

    #[test]
    fn test_combine_routes_by_namespace() {
        let combined = combine_reducers(vec![
            Box::new(scope_reducer(SubReducer, |p: &mut ParentState| &mut p.left, left)),
            Box::new(scope_reducer(SubReducer, |p: &mut ParentState| &mut p.right, right)),
        ]);

        let mut state = ParentState::default();
        combined.reduce(&mut state, ParentAction::Left(SubAction::Add(2)));
        combined.reduce(&mut state, ParentAction::Right(SubAction::Add(7)));
        combined.reduce(&mut state, ParentAction::Left(SubAction::Multiply(3)));

        assert_eq!(state.left.value, 6);
        assert_eq!(state.right.value, 7);
    }
}
