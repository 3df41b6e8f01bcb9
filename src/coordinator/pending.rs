//! Bookkeeping for in-flight mutations.
//!
//! Every mutation on an existing task takes a generation number. Per task there is exactly
//! one rollback target, the last state the store confirmed, shared by all overlapping
//! mutations. A resolution may only write the registry when no newer mutation on the same
//! task is still in flight; otherwise the newer optimistic value stays on screen and the
//! newer mutation reconciles later.

use std::collections::{BTreeMap, HashMap};

use crate::types::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    StatusChange,
    FieldEdit,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::StatusChange => "status-change",
            MutationKind::FieldEdit => "field-edit",
            MutationKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub task_id: TaskId,
    pub generation: u64,
    pub kind: MutationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The store accepted the mutation. `None` means the task is gone.
    Confirmed(Option<Task>),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reconcile {
    /// Show `state` (or drop the task when `None`), reinserting at `position` if absent.
    Apply {
        state: Option<Task>,
        position: usize,
    },
    Superseded,
}

#[derive(Debug)]
struct PendingEntry {
    confirmed: Option<Task>,
    deleted: bool,
    position: usize,
    in_flight: BTreeMap<u64, MutationKind>,
}

#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    next_generation: u64,
    entries: HashMap<TaskId, PendingEntry>,
}

impl PendingTable {
    /// Registers a mutation about to be applied optimistically. `snapshot` and `position`
    /// describe the task right before the optimistic write; they only become the rollback
    /// target when no other mutation on the task is already pending.
    pub fn begin(&mut self, kind: MutationKind, snapshot: &Task, position: usize) -> Ticket {
        self.next_generation += 1;
        let generation = self.next_generation;

        let entry = self
            .entries
            .entry(snapshot.id)
            .or_insert_with(|| PendingEntry {
                confirmed: Some(snapshot.clone()),
                deleted: false,
                position,
                in_flight: BTreeMap::new(),
            });
        entry.in_flight.insert(generation, kind);

        Ticket {
            task_id: snapshot.id,
            generation,
            kind,
        }
    }

    pub fn resolve(&mut self, ticket: &Ticket, resolution: Resolution) -> Reconcile {
        let Some(entry) = self.entries.get_mut(&ticket.task_id) else {
            return Reconcile::Superseded;
        };
        entry.in_flight.remove(&ticket.generation);

        // A confirmed delete is final; late successes of older edits must not resurrect it.
        if let Resolution::Confirmed(state) = resolution
            && !entry.deleted
        {
            entry.deleted = state.is_none();
            entry.confirmed = state;
        }

        let newer_in_flight = entry
            .in_flight
            .range(ticket.generation + 1..)
            .next()
            .is_some();
        if newer_in_flight {
            return Reconcile::Superseded;
        }

        let reconcile = Reconcile::Apply {
            state: entry.confirmed.clone(),
            position: entry.position,
        };
        if entry.in_flight.is_empty() {
            self.entries.remove(&ticket.task_id);
        }
        reconcile
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries
            .values()
            .map(|entry| entry.in_flight.len())
            .sum()
    }
}
