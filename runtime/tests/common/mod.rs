//! Shared fixtures for runtime integration tests
//!
//! A small "board" domain: a title namespace and an items namespace, with
//! handlers covering the shapes the engine has to cope with (validation,
//! nested composition, undo, coordinated runs, cached queries, panics).

#![allow(dead_code)] // Each test binary uses a subset of the fixtures

use dashflow_core::query::QueryError;
use dashflow_core::reducer::{Namespaced, Reducer};
use dashflow_core::{Command, Domain, DomainEvent, HandlerError, Query, RestoreNamespace};
use dashflow_runtime::{
    Engine, EngineBuilder, EngineConfig, Handler, HandlerContext, RunOutcome, UndoPoint,
    async_trait, handler_fn,
};
use dashflow_testing::test_clock;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Domain
// ============================================================================

pub struct Board;

impl Domain for Board {
    type State = BoardState;
    type Action = BoardAction;
    type Command = BoardCommand;
    type Event = BoardEvent;
    type Reducer = BoardReducer;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardState {
    pub title: String,
    pub items: Vec<String>,
}

impl RestoreNamespace for BoardState {
    fn restore_namespace(&mut self, namespace: &str, earlier: &Self) -> bool {
        match namespace {
            "items" => {
                self.items.clone_from(&earlier.items);
                true
            },
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum BoardAction {
    Rename(String),
    Insert { index: usize, item: String },
    Move { from: usize, to: usize },
}

impl Namespaced for BoardAction {
    fn namespace(&self) -> &'static str {
        match self {
            Self::Rename(_) => "title",
            Self::Insert { .. } | Self::Move { .. } => "items",
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Rename(_) => "title/rename",
            Self::Insert { .. } => "items/insert",
            Self::Move { .. } => "items/move",
        }
    }
}

pub struct BoardReducer;

impl Reducer for BoardReducer {
    type State = BoardState;
    type Action = BoardAction;

    fn reduce(&self, state: &mut BoardState, action: BoardAction) {
        match action {
            BoardAction::Rename(title) => state.title = title,
            BoardAction::Insert { index, item } => state.items.insert(index, item),
            BoardAction::Move { from, to } => {
                let item = state.items.remove(from);
                state.items.insert(to, item);
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardCommand {
    Rename(String),
    AddItem(String),
    MoveItem { from: usize, to: usize },
    AddPair(String, String),
    RenameThenFail(String),
    Step(Box<BoardCommand>),
    Explode,
    Slow { key: String, label: String, delay: Duration },
    Lookup(String),
    UndoItems(UndoPoint),
    Recurse,
    Unbound,
}

impl Command for BoardCommand {
    fn kind(&self) -> &'static str {
        match self {
            Self::Rename(_) => "BOARD/CMD.RENAME",
            Self::AddItem(_) => "BOARD/CMD.ADD_ITEM",
            Self::MoveItem { .. } => "BOARD/CMD.MOVE_ITEM",
            Self::AddPair(..) => "BOARD/CMD.ADD_PAIR",
            Self::RenameThenFail(_) => "BOARD/CMD.RENAME_THEN_FAIL",
            Self::Step(_) => "BOARD/CMD.STEP",
            Self::Explode => "BOARD/CMD.EXPLODE",
            Self::Slow { .. } => "BOARD/CMD.SLOW",
            Self::Lookup(_) => "BOARD/CMD.LOOKUP",
            Self::UndoItems(_) => "BOARD/CMD.UNDO_ITEMS",
            Self::Recurse => "BOARD/CMD.RECURSE",
            Self::Unbound => "BOARD/CMD.UNBOUND",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    Renamed { before: String, after: String },
    ItemAdded { index: usize, item: String },
    ItemMoved { from: usize, to: usize },
    PairAdded,
    SlowDone { label: String },
    LookedUp { value: Arc<String> },
    ItemsUndone { reverted: usize },
}

impl DomainEvent for BoardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Renamed { .. } => "BOARD/EVT.RENAMED",
            Self::ItemAdded { .. } => "BOARD/EVT.ITEM_ADDED",
            Self::ItemMoved { .. } => "BOARD/EVT.ITEM_MOVED",
            Self::PairAdded => "BOARD/EVT.PAIR_ADDED",
            Self::SlowDone { .. } => "BOARD/EVT.SLOW_DONE",
            Self::LookedUp { .. } => "BOARD/EVT.LOOKED_UP",
            Self::ItemsUndone { .. } => "BOARD/EVT.ITEMS_UNDONE",
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// Uppercases its parameter after 50ms, counting executions
#[derive(Clone, Default)]
pub struct UppercaseQuery {
    pub executions: Arc<AtomicUsize>,
}

impl Query for UppercaseQuery {
    const NAME: &'static str = "uppercase";
    type Params = String;
    type Output = String;

    fn execute(&self, params: String) -> BoxFuture<'static, Result<String, QueryError>> {
        let executions = Arc::clone(&self.executions);
        async move {
            executions.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if params.is_empty() {
                return Err(QueryError::Failed("empty input".into()));
            }
            Ok(params.to_uppercase())
        }
        .boxed()
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn unexpected(command: &BoardCommand) -> HandlerError {
    HandlerError::Internal(format!("unexpected command {}", command.kind()))
}

struct RenameHandler;

#[async_trait]
impl Handler<Board> for RenameHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Board>,
        command: BoardCommand,
    ) -> Result<BoardEvent, HandlerError> {
        let BoardCommand::Rename(title) = command else {
            return Err(unexpected(&command));
        };
        if title.trim().is_empty() {
            return Err(HandlerError::invalid_arguments("title must not be empty"));
        }
        let before = ctx.select(|s| s.title.clone());
        ctx.put(BoardAction::Rename(title.clone()));
        Ok(BoardEvent::Renamed {
            before,
            after: title,
        })
    }
}

struct AddItemHandler;

#[async_trait]
impl Handler<Board> for AddItemHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Board>,
        command: BoardCommand,
    ) -> Result<BoardEvent, HandlerError> {
        let BoardCommand::AddItem(item) = command else {
            return Err(unexpected(&command));
        };
        if item.is_empty() {
            return Err(HandlerError::invalid_arguments("item must not be empty"));
        }
        let index = ctx.select(|s| s.items.len());
        ctx.put_with_undo(BoardAction::Insert {
            index,
            item: item.clone(),
        });
        Ok(BoardEvent::ItemAdded { index, item })
    }
}

struct MoveItemHandler;

#[async_trait]
impl Handler<Board> for MoveItemHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Board>,
        command: BoardCommand,
    ) -> Result<BoardEvent, HandlerError> {
        let BoardCommand::MoveItem { from, to } = command else {
            return Err(unexpected(&command));
        };
        let len = ctx.select(|s| s.items.len());
        if from >= len || to >= len {
            return Err(HandlerError::invalid_arguments(format!(
                "cannot move item {from} to {to} with {len} items"
            )));
        }
        ctx.put_with_undo(BoardAction::Move { from, to });
        Ok(BoardEvent::ItemMoved { from, to })
    }
}

struct AddPairHandler;

#[async_trait]
impl Handler<Board> for AddPairHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Board>,
        command: BoardCommand,
    ) -> Result<BoardEvent, HandlerError> {
        let BoardCommand::AddPair(first, second) = command else {
            return Err(unexpected(&command));
        };
        ctx.dispatch_nested(BoardCommand::AddItem(first)).await?;
        ctx.dispatch_nested(BoardCommand::AddItem(second)).await?;
        Ok(BoardEvent::PairAdded)
    }
}

struct SlowHandler;

#[async_trait]
impl Handler<Board> for SlowHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<Board>,
        command: BoardCommand,
    ) -> Result<BoardEvent, HandlerError> {
        let BoardCommand::Slow { key, label, delay } = command else {
            return Err(unexpected(&command));
        };
        let outcome = ctx
            .run(key, |_token| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, HandlerError>(label)
            })
            .await;
        match outcome {
            RunOutcome::Succeeded(label) => Ok(BoardEvent::SlowDone { label }),
            RunOutcome::Failed(error) => Err(error),
            RunOutcome::Canceled => Err(HandlerError::Canceled),
        }
    }
}

async fn rename_then_fail(
    ctx: HandlerContext<Board>,
    command: BoardCommand,
) -> Result<BoardEvent, HandlerError> {
    let BoardCommand::RenameThenFail(title) = command else {
        return Err(unexpected(&command));
    };
    ctx.put(BoardAction::Rename(title));
    Err(HandlerError::Collaborator("backend unavailable".into()))
}

async fn step(
    ctx: HandlerContext<Board>,
    command: BoardCommand,
) -> Result<BoardEvent, HandlerError> {
    let BoardCommand::Step(inner) = command else {
        return Err(unexpected(&command));
    };
    ctx.dispatch_nested(*inner).await
}

async fn explode(
    _ctx: HandlerContext<Board>,
    _command: BoardCommand,
) -> Result<BoardEvent, HandlerError> {
    panic!("handler exploded")
}

async fn lookup(
    ctx: HandlerContext<Board>,
    command: BoardCommand,
) -> Result<BoardEvent, HandlerError> {
    let BoardCommand::Lookup(input) = command else {
        return Err(unexpected(&command));
    };
    let value = ctx.query::<UppercaseQuery>(input).await?;
    Ok(BoardEvent::LookedUp { value })
}

async fn undo_items(
    ctx: HandlerContext<Board>,
    command: BoardCommand,
) -> Result<BoardEvent, HandlerError> {
    let BoardCommand::UndoItems(point) = command else {
        return Err(unexpected(&command));
    };
    let reverted = ctx.undo("items", &point)?.len();
    if reverted == 0 {
        return Err(HandlerError::invalid_state("nothing to undo"));
    }
    Ok(BoardEvent::ItemsUndone { reverted })
}

async fn recurse(
    ctx: HandlerContext<Board>,
    _command: BoardCommand,
) -> Result<BoardEvent, HandlerError> {
    ctx.dispatch_nested(BoardCommand::Recurse).await
}

/// Build a board engine with every fixture handler bound
///
/// # Panics
///
/// Panics if a handler is bound twice.
pub fn board_builder(query: UppercaseQuery) -> EngineBuilder<Board> {
    Engine::<Board>::builder(BoardState::default(), BoardReducer)
        .with_clock(Arc::new(test_clock()))
        .handler("BOARD/CMD.RENAME", RenameHandler)
        .and_then(|b| b.handler("BOARD/CMD.ADD_ITEM", AddItemHandler))
        .and_then(|b| b.handler("BOARD/CMD.MOVE_ITEM", MoveItemHandler))
        .and_then(|b| b.handler("BOARD/CMD.ADD_PAIR", AddPairHandler))
        .and_then(|b| b.handler("BOARD/CMD.SLOW", SlowHandler))
        .and_then(|b| b.handler("BOARD/CMD.RENAME_THEN_FAIL", handler_fn(rename_then_fail)))
        .and_then(|b| b.handler("BOARD/CMD.STEP", handler_fn(step)))
        .and_then(|b| b.handler("BOARD/CMD.EXPLODE", handler_fn(explode)))
        .and_then(|b| b.handler("BOARD/CMD.LOOKUP", handler_fn(lookup)))
        .and_then(|b| b.handler("BOARD/CMD.UNDO_ITEMS", handler_fn(undo_items)))
        .and_then(|b| b.handler("BOARD/CMD.RECURSE", handler_fn(recurse)))
        .and_then(|b| b.query(query))
        .expect("fixture handlers are bound once")
}

/// Board engine with the default configuration
pub fn board_engine() -> Engine<Board> {
    board_builder(UppercaseQuery::default()).build()
}

/// Board engine without `CommandStarted` events
pub fn quiet_board_engine() -> Engine<Board> {
    board_builder(UppercaseQuery::default())
        .with_config(EngineConfig::default().with_command_started(false))
        .build()
}
