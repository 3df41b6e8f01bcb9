//! Optimistic mutation coordinator.
//!
//! Each operation writes its intended result to the board first, then calls the store and
//! reconciles: the canonical record replaces the optimistic value on success, and the last
//! confirmed state comes back on failure. Create is the exception; it waits for the
//! server-assigned id before touching the board.

mod command;
mod pending;

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};

use crate::board::Board;
use crate::registry::TaskRegistry;
use crate::store::{StoreError, TaskStore};
use crate::types::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};

pub use command::{Command, CommandOutcome};
pub use pending::MutationKind;

use pending::{PendingTable, Reconcile, Resolution, Ticket};

const TITLE_REQUIRED: &str = "Title is required.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    /// Rejected locally before anything was sent.
    #[error("{0}")]
    Validation(String),
    #[error("task {0} is not on the board")]
    UnknownTask(TaskId),
    #[error("sign in required")]
    SignedOut,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a board-driven mutation (status change, delete) ended up on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Nothing to do, or nobody is signed in; no request was sent.
    Skipped,
    Confirmed,
    RolledBack,
    /// Resolved while a newer mutation on the same task was still in flight.
    Superseded,
}

pub struct MutationCoordinator<S> {
    board: Arc<Board>,
    store: S,
    pending: Mutex<PendingTable>,
}

impl<S: TaskStore> MutationCoordinator<S> {
    pub fn new(board: Arc<Board>, store: S) -> Self {
        Self {
            board,
            store,
            pending: Mutex::new(PendingTable::default()),
        }
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn pending(&self) -> MutexGuard<'_, PendingTable> {
        match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending().is_pending(id)
    }

    pub fn in_flight(&self) -> usize {
        self.pending().len()
    }

    fn signed_in(&self, kind: MutationKind) -> bool {
        let signed_in = self.board.user().is_some();
        if !signed_in {
            debug!(kind = kind.as_str(), "no signed-in user, refusing mutation");
        }
        signed_in
    }

    pub async fn dispatch(&self, command: Command) -> CommandOutcome {
        debug!(command = command.name(), task_id = ?command.task_id(), "dispatching command");
        match command {
            Command::Create(draft) => CommandOutcome::Form(self.create(draft).await),
            Command::Edit { task_id, patch } => {
                CommandOutcome::Form(self.edit(task_id, patch).await)
            }
            Command::ChangeStatus { task_id, status } => {
                CommandOutcome::Board(self.change_status(task_id, status).await)
            }
            Command::Delete { task_id } => CommandOutcome::Board(self.delete(task_id).await),
        }
    }

    pub async fn create(&self, draft: TaskDraft) -> Result<Task, MutationError> {
        if !self.signed_in(MutationKind::Create) {
            return Err(MutationError::SignedOut);
        }
        let draft = draft.normalized();
        if draft.title.is_empty() {
            return Err(MutationError::Validation(TITLE_REQUIRED.to_string()));
        }

        match self.store.create_task(&draft).await {
            Ok(task) => {
                debug!(
                    kind = MutationKind::Create.as_str(),
                    task_id = %task.id,
                    "task created"
                );
                self.board.try_update(|registry| {
                    registry.insert_front(task.clone());
                    Some(())
                });
                Ok(task)
            }
            Err(err) => {
                warn!(
                    kind = MutationKind::Create.as_str(),
                    error = %err,
                    "task creation failed"
                );
                Err(err.into())
            }
        }
    }

    pub async fn change_status(&self, id: TaskId, status: TaskStatus) -> MutationOutcome {
        if !self.signed_in(MutationKind::StatusChange) {
            return MutationOutcome::Skipped;
        }
        let patch = TaskPatch::status(status);
        let Some(ticket) = self.apply_optimistic(MutationKind::StatusChange, id, |registry| {
            let changes = registry
                .get(id)
                .is_some_and(|task| task.status != status);
            changes && registry.patch(id, &patch)
        }) else {
            debug!(task_id = %id, status = %status, "status unchanged, skipping update");
            return MutationOutcome::Skipped;
        };

        let result = self.store.update_task(id, &patch).await;
        if let Err(err) = &result {
            warn!(
                task_id = %id,
                status = %status,
                error = %err,
                "status change failed; rolling back"
            );
        }
        let failed = result.is_err();
        let reconciled = self.reconcile(&ticket, result.map(Some).map_err(drop));
        outcome(failed, reconciled)
    }

    pub async fn edit(&self, id: TaskId, patch: TaskPatch) -> Result<Task, MutationError> {
        if !self.signed_in(MutationKind::FieldEdit) {
            return Err(MutationError::SignedOut);
        }
        if patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(MutationError::Validation(TITLE_REQUIRED.to_string()));
        }

        let ticket = self
            .apply_optimistic(MutationKind::FieldEdit, id, |registry| {
                registry.patch(id, &patch)
            })
            .ok_or(MutationError::UnknownTask(id))?;

        match self.store.update_task(id, &patch).await {
            Ok(task) => {
                self.reconcile(&ticket, Ok(Some(task.clone())));
                Ok(task)
            }
            Err(err) => {
                warn!(task_id = %id, error = %err, "task edit failed; rolling back");
                self.reconcile(&ticket, Err(()));
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: TaskId) -> MutationOutcome {
        if !self.signed_in(MutationKind::Delete) {
            return MutationOutcome::Skipped;
        }
        let Some(ticket) = self.apply_optimistic(MutationKind::Delete, id, |registry| {
            registry.remove(id).is_some()
        }) else {
            debug!(task_id = %id, "task not on board, skipping delete");
            return MutationOutcome::Skipped;
        };

        let result = self.store.delete_task(id).await;
        if let Err(err) = &result {
            warn!(task_id = %id, error = %err, "task delete failed; restoring");
        }
        let failed = result.is_err();
        let reconciled = self.reconcile(&ticket, result.map(|()| None).map_err(drop));
        outcome(failed, reconciled)
    }

    /// Snapshots the task and runs `apply` in a single board write. Returns `None` without
    /// registering anything when the task is absent or `apply` reports no change.
    fn apply_optimistic(
        &self,
        kind: MutationKind,
        id: TaskId,
        apply: impl FnOnce(&mut TaskRegistry) -> bool,
    ) -> Option<Ticket> {
        let mut pending = self.pending();
        let ticket = self.board.try_update(|registry| {
            let position = registry.position(id)?;
            let snapshot = registry.get(id)?.clone();
            if !apply(registry) {
                return None;
            }
            Some(pending.begin(kind, &snapshot, position))
        })?;
        debug!(
            kind = kind.as_str(),
            task_id = %id,
            generation = ticket.generation,
            "applied optimistic update"
        );
        Some(ticket)
    }

    /// Returns `true` when the board was written, `false` when a newer mutation owns it.
    fn reconcile(&self, ticket: &Ticket, result: Result<Option<Task>, ()>) -> bool {
        let resolution = match result {
            Ok(state) => Resolution::Confirmed(state),
            Err(()) => Resolution::Failed,
        };

        let mut pending = self.pending();
        match pending.resolve(ticket, resolution) {
            Reconcile::Apply { state, position } => {
                self.board.try_update(|registry| match state {
                    Some(task) if registry.get(task.id) == Some(&task) => None,
                    Some(task) => {
                        registry.restore(position, task);
                        Some(())
                    }
                    None => registry.remove(ticket.task_id).map(drop),
                });
                debug!(
                    kind = ticket.kind.as_str(),
                    task_id = %ticket.task_id,
                    generation = ticket.generation,
                    "reconciled with store"
                );
                true
            }
            Reconcile::Superseded => {
                debug!(
                    kind = ticket.kind.as_str(),
                    task_id = %ticket.task_id,
                    generation = ticket.generation,
                    "newer mutation in flight; leaving board as is"
                );
                false
            }
        }
    }
}

fn outcome(failed: bool, reconciled: bool) -> MutationOutcome {
    match (reconciled, failed) {
        (false, _) => MutationOutcome::Superseded,
        (true, true) => MutationOutcome::RolledBack,
        (true, false) => MutationOutcome::Confirmed,
    }
}
